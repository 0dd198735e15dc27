//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! # Telnetry Stream Adapter
//!
//! Asynchronous Telnet stream I/O over the `telnetry_protocol` engine.
//!
//! ## Overview
//!
//! [`TelnetStream`] wraps any [`Transport`] (a TCP socket, a TLS-wrapped
//! one, or a test double) and presents a sanitized byte stream to the
//! application:
//!
//! - **Inbound**: transport bytes are staged, fed through the protocol
//!   engine byte by byte, and the surviving data bytes land in the
//!   caller's read window. Negotiation replies, `AYT` answers, and
//!   subnegotiation replies the engine produces are written to the
//!   transport before the next application byte is processed.
//! - **Outbound**: application writes are escaped (`IAC` doubling,
//!   `CR LF` / `CR NUL` canonicalization while `BINARY` is off) and
//!   written atomically. Framing writes (commands, negotiation,
//!   subnegotiation) share the same serialized write path.
//! - **`Synch`**: TCP urgent notifications and in-band `IAC DM` are
//!   correlated by an atomic tracker; data is discarded while a `Synch`
//!   is in flight, and an inbound `AO` answers with a `Synch` of our own.
//!
//! ## Concurrency model
//!
//! Single-threaded cooperative per stream: every operation takes
//! `&mut self`, so there is at most one read and one write in flight, in
//! submission order. The sole cross-task object is the urgent-data
//! tracker shared with a background watcher task. Streams on different
//! runtimes are independent.
//!
//! ## Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use telnetry_protocol::{OptionDescriptor, OptionRegistry, TelnetOption};
//! use telnetry_stream::{HandlerRegistry, StreamConfig, TelnetStream};
//! # async fn example<T: telnetry_stream::Transport, U: telnetry_stream::UrgentWatch>(
//! #     transport: T,
//! #     urgent: U,
//! # ) -> Result<(), telnetry_stream::TelnetError> {
//! let registry = Arc::new(OptionRegistry::new());
//! registry.register(TelnetOption::Echo, OptionDescriptor::remote());
//! registry.register(TelnetOption::SuppressGoAhead, OptionDescriptor::both());
//!
//! let handlers = Arc::new(HandlerRegistry::new());
//! let config = StreamConfig::new(registry).with_ayt_response(&b"[YES]\r\n"[..]);
//! let mut stream = TelnetStream::new(transport, urgent, handlers, config);
//!
//! let mut window = [0u8; 512];
//! let outcome = stream.read_some(&mut window).await?;
//! println!("read {} bytes", outcome.bytes);
//! # Ok(())
//! # }
//! ```

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod config;
mod error;
mod handler;
mod stream;
mod sync;
mod transport;
mod urgent;

pub use self::config::{StreamConfig, DEFAULT_READ_BLOCK_SIZE};
pub use self::error::{TelnetError, TelnetResult};
pub use self::handler::{HandlerRegistry, OptionHandler};
pub use self::stream::{ReadEnd, ReadOutcome, TelnetStream};
pub use self::sync::BlockingTelnetStream;
pub use self::transport::{Transport, UrgentWatch};
pub use self::urgent::{UrgentDataTracker, UrgentState};
