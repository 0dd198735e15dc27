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

//! # Telnetry Protocol Engine
//!
//! This crate implements the Telnet protocol core: a byte-oriented parser
//! and an option negotiation state machine, independent of any transport.
//! It sits between a reliable byte stream (driven by `telnetry_stream` or a
//! harness of your own) and an application consuming a sanitized data
//! stream.
//!
//! ## Overview
//!
//! The Telnet protocol (RFC 854) multiplexes application data with command
//! sequences introduced by the `IAC` (Interpret As Command) byte. This
//! crate handles:
//!
//! - **Data extraction**: IAC un-escaping, the `CR LF` / `CR NUL` line
//!   discipline, and stray-`NUL` suppression when binary transmission is
//!   not negotiated.
//! - **Command signals**: `AYT`, `AO`, `IP`, `BRK`, `EC`, `EL`, `GA`,
//!   `EOR`, `DM`, surfaced as typed [`Signal`]s.
//! - **Option negotiation**: the full RFC 1143 "Q Method" with per-option,
//!   per-direction state and the opposite-request queue bit, immune to
//!   negotiation loops.
//! - **Subnegotiation**: bounded payload collection inside `IAC SB … IAC
//!   SE` framing, with the `STATUS` option (RFC 859) answered internally
//!   from the engine's own status database.
//!
//! ## Core Components
//!
//! ### [`ProtocolFsm`]
//!
//! The seven-state byte parser plus negotiation engine. One instance per
//! stream; feed it bytes with [`ProtocolFsm::process_byte`] and perform
//! the [`FsmEvent`]s it returns.
//!
//! ### [`OptionRegistry`] and [`OptionDescriptor`]
//!
//! What options this endpoint recognizes and with which capabilities
//! (local/remote support, subnegotiation support, payload cap). Shared
//! read-only across streams.
//!
//! ### [`OptionStatusDb`] and [`OptionStatus`]
//!
//! Per-option RFC 1143 negotiation status, both directions tracked
//! independently.
//!
//! ## Usage Example
//!
//! ```rust
//! use std::sync::Arc;
//! use telnetry_protocol::{
//!     consts, FsmConfig, OptionDescriptor, OptionRegistry, ProtocolFsm, TelnetOption,
//! };
//!
//! let registry = Arc::new(OptionRegistry::new());
//! registry.register(TelnetOption::Echo, OptionDescriptor::remote());
//!
//! let mut fsm = ProtocolFsm::new(FsmConfig::new(registry));
//!
//! // Peer offers to echo: IAC WILL ECHO.
//! for byte in [consts::IAC, consts::WILL, consts::option::ECHO] {
//!     let outcome = fsm.process_byte(byte);
//!     if let Some(event) = outcome.event {
//!         // The stream adapter writes the agreement (IAC DO ECHO) here.
//!         let _ = event;
//!     }
//! }
//! ```
//!
//! ## Related RFCs
//!
//! - RFC 854: Telnet Protocol Specification
//! - RFC 855: Telnet Option Specifications
//! - RFC 858: Suppress Go Ahead
//! - RFC 859: Status
//! - RFC 885: End of Record
//! - RFC 1091: Terminal Type
//! - RFC 1143: The Q Method of Implementing TELNET Option Negotiation

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

pub mod consts;

mod command;
mod config;
mod event;
mod fsm;
mod option;
mod result;
mod status;

pub use self::command::TelnetCommand;
pub use self::config::{FsmConfig, UnknownOptionHandler};
pub use self::event::{ByteOutcome, FsmEvent, Negotiation, ProcessStatus, Signal};
pub use self::fsm::{DisableOutcome, ProtocolFsm};
pub use self::option::{
    Direction, OptionDescriptor, OptionRegistry, TelnetOption, DEFAULT_MAX_SUBNEGOTIATION_SIZE,
};
pub use self::result::{ProtocolError, ProtocolResult};
pub use self::status::{OptionStatus, OptionStatusDb, QState, QueueBit};
