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

use crate::TelnetOption;
use thiserror::Error;

/// Result type for protocol engine operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

///
/// Errors raised by the protocol engine.
///
/// These do not break the byte stream: the parser logs them, resets to its
/// normal state where necessary, and keeps consuming bytes. They terminate
/// at most the read operation that was in flight when they occurred.
///
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte stream violated the Telnet protocol in a way that forced a
    /// parser reset, or an option reached an impossible negotiation state.
    #[error("telnet protocol violation")]
    ProtocolViolation,

    /// An `IAC` was followed by a byte that is not a Telnet command.
    #[error("invalid telnet command 0x{0:02X}")]
    InvalidCommand(u8),

    /// A subnegotiation was malformed, unsolicited, or referenced an option
    /// that does not carry subnegotiation payloads.
    #[error("invalid subnegotiation")]
    InvalidSubnegotiation,

    /// A subnegotiation payload exceeded the option's size cap. The payload
    /// is discarded and the parser resets.
    #[error("subnegotiation payload for option {option} exceeded {limit} bytes")]
    SubnegotiationOverflow {
        /// The option whose payload overflowed.
        option: TelnetOption,
        /// The descriptor's payload cap.
        limit: usize,
    },

    /// A negotiation command was redundant or arrived in a state where it
    /// makes no sense.
    #[error("invalid negotiation for option {0}")]
    InvalidNegotiation(TelnetOption),

    /// The option is not registered, or not enabled where the operation
    /// requires it to be.
    #[error("option {0} not available")]
    OptionNotAvailable(TelnetOption),

    /// The Q-Method opposite-request queue bit was already set when a
    /// request tried to set it again.
    #[error("negotiation queue error for option {0}")]
    NegotiationQueueError(TelnetOption),

    /// A `GA` arrived while `SUPPRESS-GO-AHEAD` is remotely enabled.
    /// Logged and otherwise ignored.
    #[error("go-ahead ignored while SUPPRESS-GO-AHEAD is active")]
    IgnoredGoAhead,

    /// An invariant of the engine itself was violated. Never silently
    /// swallowed.
    #[error("internal protocol engine error")]
    Internal,
}

impl ProtocolError {
    /// Whether parsing continues after this error with a reset to the
    /// normal state.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ProtocolError::Internal)
    }
}
