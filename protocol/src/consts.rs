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

//! Telnet wire constants per [RFC 854](https://tools.ietf.org/html/rfc854).

/// Interpret As Command, the Telnet escape marker.
pub const IAC: u8 = 255;
/// Demand the other party stop performing an option.
pub const DONT: u8 = 254;
/// Request the other party perform an option.
pub const DO: u8 = 253;
/// Refuse to perform an option.
pub const WONT: u8 = 252;
/// Offer to perform an option.
pub const WILL: u8 = 251;
/// Subnegotiation Begin.
pub const SB: u8 = 250;
/// Go Ahead.
pub const GA: u8 = 249;
/// Erase Line.
pub const EL: u8 = 248;
/// Erase Character.
pub const EC: u8 = 247;
/// Are You There.
pub const AYT: u8 = 246;
/// Abort Output.
pub const AO: u8 = 245;
/// Interrupt Process.
pub const IP: u8 = 244;
/// Break.
pub const BRK: u8 = 243;
/// Data Mark, the in-band partner of TCP urgent data.
pub const DM: u8 = 242;
/// No Operation.
pub const NOP: u8 = 241;
/// Subnegotiation End.
pub const SE: u8 = 240;
/// End of Record [RFC 885](https://tools.ietf.org/html/rfc885).
pub const EOR: u8 = 239;

/// Carriage Return.
pub const CR: u8 = b'\r';
/// Line Feed.
pub const LF: u8 = b'\n';
/// The NUL byte, used in `CR NUL` and the `Synch` discipline.
pub const NUL: u8 = 0x00;

/// Telnet option identifiers.
///
/// [IANA Telnet Options](https://www.iana.org/assignments/telnet-options/telnet-options.xhtml)
pub mod option {
    /// Binary Transmission [RFC 856](https://tools.ietf.org/html/rfc856)
    pub const BINARY: u8 = 0;
    /// Echo [RFC 857](https://tools.ietf.org/html/rfc857)
    pub const ECHO: u8 = 1;
    /// Suppress Go Ahead [RFC 858](https://tools.ietf.org/html/rfc858)
    pub const SGA: u8 = 3;
    /// Status [RFC 859](https://tools.ietf.org/html/rfc859)
    pub const STATUS: u8 = 5;
    /// Timing Mark [RFC 860](https://tools.ietf.org/html/rfc860)
    pub const TM: u8 = 6;
    /// Terminal Type [RFC 1091](https://tools.ietf.org/html/rfc1091)
    pub const TTYPE: u8 = 24;
    /// End of Record [RFC 885](https://tools.ietf.org/html/rfc885)
    pub const EOR: u8 = 25;
    /// Negotiate About Window Size [RFC 1073](https://tools.ietf.org/html/rfc1073)
    pub const NAWS: u8 = 31;
    /// Extended Options List [RFC 861](https://tools.ietf.org/html/rfc861)
    pub const EXOPL: u8 = 255;

    /// Subcommands of the `STATUS` option subnegotiation.
    pub mod status {
        /// Carries the sender's view of the current option status.
        pub const IS: u8 = 0;
        /// Asks the receiver to report its view of the current option status.
        pub const SEND: u8 = 1;
    }
}
