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

//! Transport contracts.
//!
//! The stream adapter is transport-agnostic: anything that supplies
//! ordered, reliable bytes plus the TCP urgent-data primitives can sit
//! underneath it — a plain TCP socket, a TLS-wrapped one, or a test
//! double. The adapter enables out-of-band-inline delivery at
//! construction, so urgent bytes arrive in the main data stream and the
//! [`UrgentWatch`] is used only to learn *when* urgent data arrived, never
//! to read it.

use async_trait::async_trait;
use std::io;

///
/// An ordered, reliable byte transport with TCP urgent-data support.
///
#[async_trait]
pub trait Transport: Send {
    /// Reads at least one byte into `buf`, returning the count. `Ok(0)`
    /// means the peer closed the connection.
    async fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes all of `buf`.
    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Sends a single byte flagged urgent (out-of-band).
    async fn send_urgent(&mut self, byte: u8) -> io::Result<()>;

    /// Controls whether urgent bytes are delivered inline with the data
    /// stream. The stream adapter enables this at construction.
    fn set_oob_inline(&mut self, enabled: bool) -> io::Result<()>;
}

///
/// The out-of-band notification side of a transport.
///
/// Held by a background watcher task, concurrently with the data-path
/// [`Transport`] handle.
///
#[async_trait]
pub trait UrgentWatch: Send + 'static {
    /// The zero-byte out-of-band receive: resolves once urgent data has
    /// arrived on the connection. No payload is consumed.
    async fn wait_urgent(&mut self) -> io::Result<()>;
}
