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

use crate::consts;
use std::fmt::Formatter;
use std::sync::RwLock;

/// Default cap on subnegotiation payload size when a descriptor does not
/// specify one. A concrete cap always exists; unbounded buffers are not
/// representable.
pub const DEFAULT_MAX_SUBNEGOTIATION_SIZE: usize = 1024;

///
/// [Telnet Options](https://www.iana.org/assignments/telnet-options/telnet-options.xhtml)
///
/// The option identifier is both the registry key and the wire byte.
/// Options this crate has no dedicated name for round-trip through
/// [`TelnetOption::Unknown`].
///
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetOption {
    /// [`consts::option::BINARY`] Binary Transmission [RFC856](https://tools.ietf.org/html/rfc856)
    TransmitBinary,
    /// [`consts::option::ECHO`] Echo [RFC857](https://tools.ietf.org/html/rfc857)
    Echo,
    /// [`consts::option::SGA`] Suppress Go Ahead [RFC858](https://tools.ietf.org/html/rfc858)
    SuppressGoAhead,
    /// [`consts::option::STATUS`] Status [RFC859](https://tools.ietf.org/html/rfc859)
    Status,
    /// [`consts::option::TM`] Timing Mark [RFC860](https://tools.ietf.org/html/rfc860)
    TimingMark,
    /// [`consts::option::TTYPE`] Terminal Type [RFC1091](https://tools.ietf.org/html/rfc1091)
    TerminalType,
    /// [`consts::option::EOR`] End of Record [RFC885](https://tools.ietf.org/html/rfc885)
    EndOfRecord,
    /// [`consts::option::NAWS`] Negotiate About Window Size [RFC1073](https://tools.ietf.org/html/rfc1073)
    WindowSize,
    /// [`consts::option::EXOPL`] Extended Options List [RFC861](https://tools.ietf.org/html/rfc861)
    ExtendedOptions,
    /// Any other option identifier.
    Unknown(u8),
}

impl TelnetOption {
    /// Maps a wire byte onto an option identifier.
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            consts::option::BINARY => TelnetOption::TransmitBinary,
            consts::option::ECHO => TelnetOption::Echo,
            consts::option::SGA => TelnetOption::SuppressGoAhead,
            consts::option::STATUS => TelnetOption::Status,
            consts::option::TM => TelnetOption::TimingMark,
            consts::option::TTYPE => TelnetOption::TerminalType,
            consts::option::EOR => TelnetOption::EndOfRecord,
            consts::option::NAWS => TelnetOption::WindowSize,
            consts::option::EXOPL => TelnetOption::ExtendedOptions,
            byte => TelnetOption::Unknown(byte),
        }
    }

    /// Returns the wire byte for this option.
    pub fn to_u8(self) -> u8 {
        match self {
            TelnetOption::TransmitBinary => consts::option::BINARY,
            TelnetOption::Echo => consts::option::ECHO,
            TelnetOption::SuppressGoAhead => consts::option::SGA,
            TelnetOption::Status => consts::option::STATUS,
            TelnetOption::TimingMark => consts::option::TM,
            TelnetOption::TerminalType => consts::option::TTYPE,
            TelnetOption::EndOfRecord => consts::option::EOR,
            TelnetOption::WindowSize => consts::option::NAWS,
            TelnetOption::ExtendedOptions => consts::option::EXOPL,
            TelnetOption::Unknown(byte) => byte,
        }
    }
}

impl From<u8> for TelnetOption {
    fn from(byte: u8) -> Self {
        Self::from_u8(byte)
    }
}

impl From<TelnetOption> for u8 {
    fn from(option: TelnetOption) -> Self {
        option.to_u8()
    }
}

impl std::fmt::Display for TelnetOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TelnetOption::TransmitBinary => write!(f, "TransmitBinary"),
            TelnetOption::Echo => write!(f, "Echo"),
            TelnetOption::SuppressGoAhead => write!(f, "SuppressGoAhead"),
            TelnetOption::Status => write!(f, "Status"),
            TelnetOption::TimingMark => write!(f, "TimingMark"),
            TelnetOption::TerminalType => write!(f, "TerminalType"),
            TelnetOption::EndOfRecord => write!(f, "EndOfRecord"),
            TelnetOption::WindowSize => write!(f, "WindowSize"),
            TelnetOption::ExtendedOptions => write!(f, "ExtendedOptions"),
            TelnetOption::Unknown(option) => write!(f, "Unknown({option})"),
        }
    }
}

///
/// The side of the connection a negotiation speaks about.
///
/// `WILL`/`WONT` describe what the *remote* party performs; `DO`/`DONT`
/// describe what the *local* party performs. Each option tracks both
/// directions independently.
///
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Direction {
    /// Our side of the connection.
    Local,
    /// The peer's side of the connection.
    Remote,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Local => write!(f, "local"),
            Direction::Remote => write!(f, "remote"),
        }
    }
}

///
/// Immutable per-option capabilities.
///
/// A descriptor records whether an option may be enabled locally and/or
/// remotely, whether it carries subnegotiation payloads, and the cap on
/// those payloads. The cap is always nonzero; a descriptor with
/// `supports_subnegotiation == false` still carries one so the parser can
/// drain an unsolicited subnegotiation without unbounded buffering.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct OptionDescriptor {
    supports_local: bool,
    supports_remote: bool,
    supports_subnegotiation: bool,
    max_subnegotiation_size: usize,
}

impl OptionDescriptor {
    /// A descriptor refusing everything. This is what
    /// [`OptionRegistry::upsert_default`] memoizes for options a peer
    /// references without registration.
    pub fn refused() -> Self {
        OptionDescriptor {
            supports_local: false,
            supports_remote: false,
            supports_subnegotiation: false,
            max_subnegotiation_size: DEFAULT_MAX_SUBNEGOTIATION_SIZE,
        }
    }

    /// A descriptor allowing the option on our side only.
    pub fn local() -> Self {
        OptionDescriptor {
            supports_local: true,
            ..Self::refused()
        }
    }

    /// A descriptor allowing the option on the peer's side only.
    pub fn remote() -> Self {
        OptionDescriptor {
            supports_remote: true,
            ..Self::refused()
        }
    }

    /// A descriptor allowing the option on both sides.
    pub fn both() -> Self {
        OptionDescriptor {
            supports_local: true,
            supports_remote: true,
            ..Self::refused()
        }
    }

    /// Enables subnegotiation with the given payload cap.
    ///
    /// # Panics
    ///
    /// Panics if `max_size` is zero; a concrete cap must exist.
    pub fn with_subnegotiation(mut self, max_size: usize) -> Self {
        assert!(max_size > 0, "subnegotiation size cap must be nonzero");
        self.supports_subnegotiation = true;
        self.max_subnegotiation_size = max_size;
        self
    }

    /// Whether the option may be enabled in the given direction.
    pub fn supports(&self, direction: Direction) -> bool {
        match direction {
            Direction::Local => self.supports_local,
            Direction::Remote => self.supports_remote,
        }
    }

    /// Whether the option carries subnegotiation payloads.
    pub fn supports_subnegotiation(&self) -> bool {
        self.supports_subnegotiation
    }

    /// Cap on subnegotiation payload size.
    pub fn max_subnegotiation_size(&self) -> usize {
        self.max_subnegotiation_size
    }
}

///
/// The set of options a stream recognizes.
///
/// The registry is a total mapping from option identifier to an optional
/// [`OptionDescriptor`]. It is shared read-only across streams (typically
/// behind an `Arc`), with one exception: when a peer opens a subnegotiation
/// for an unregistered option, the parser memoizes a refuse-everything
/// descriptor via [`upsert_default`] so repeated bad requests stay cheap.
///
/// [`upsert_default`]: OptionRegistry::upsert_default
///
#[derive(Debug)]
pub struct OptionRegistry {
    entries: RwLock<[Option<OptionDescriptor>; 256]>,
}

impl Default for OptionRegistry {
    fn default() -> Self {
        OptionRegistry {
            entries: RwLock::new([None; 256]),
        }
    }
}

impl OptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `descriptor` for `option`, replacing any previous entry.
    pub fn register(&self, option: TelnetOption, descriptor: OptionDescriptor) {
        let mut entries = self.entries.write().expect("option registry poisoned");
        entries[option.to_u8() as usize] = Some(descriptor);
    }

    /// Looks up the descriptor for `option`.
    pub fn get(&self, option: TelnetOption) -> Option<OptionDescriptor> {
        let entries = self.entries.read().expect("option registry poisoned");
        entries[option.to_u8() as usize]
    }

    /// Idempotently inserts a refuse-everything descriptor for `option` and
    /// returns the registered descriptor.
    pub fn upsert_default(&self, option: TelnetOption) -> OptionDescriptor {
        let mut entries = self.entries.write().expect("option registry poisoned");
        *entries[option.to_u8() as usize].get_or_insert_with(OptionDescriptor::refused)
    }
}
