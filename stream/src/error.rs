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

//! Error types for the Telnet stream adapter.

use telnetry_protocol::ProtocolError;
use thiserror::Error;

/// Result type for stream operations.
pub type TelnetResult<T> = std::result::Result<T, TelnetError>;

/// Telnet stream error types.
#[derive(Debug, Error)]
pub enum TelnetError {
    /// I/O error from the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Protocol error from the engine layer.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// An invariant of the stream itself was violated, or a handler
    /// panicked inside the blocking façade.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TelnetError {
    /// Check if the error is recoverable.
    ///
    /// Recoverable errors leave the stream in a usable state; retrying the
    /// operation may succeed, and buffered input survives.
    pub fn is_recoverable(&self) -> bool {
        match self {
            TelnetError::Io(_) => true,
            TelnetError::Protocol(err) => err.is_recoverable(),
            TelnetError::Internal(_) => false,
        }
    }

    /// Check if the error originated below the Telnet layer.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, TelnetError::Io(_))
    }
}
