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

///
/// A Telnet command byte, the second byte of an `IAC <command>` sequence.
///
/// Commands occupy the byte range 239..=255; anything below that following an
/// `IAC` is not a command and is reported as [`ProtocolError::InvalidCommand`]
/// by the parser.
///
/// [`ProtocolError::InvalidCommand`]: crate::ProtocolError::InvalidCommand
///
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TelnetCommand {
    /// [`consts::EOR`] End of Record marker.
    EndOfRecord,
    /// [`consts::SE`] End of subnegotiation parameters.
    SubnegotiationEnd,
    /// [`consts::NOP`] No operation.
    NoOperation,
    /// [`consts::DM`] Data Mark, the data-stream portion of a `Synch`.
    DataMark,
    /// [`consts::BRK`] Operator pressed the Break or Attention key.
    Break,
    /// [`consts::IP`] Interrupt the current process.
    InterruptProcess,
    /// [`consts::AO`] Abort output of the current process.
    AbortOutput,
    /// [`consts::AYT`] Request a visible acknowledgement.
    AreYouThere,
    /// [`consts::EC`] Erase the previous character.
    EraseCharacter,
    /// [`consts::EL`] Erase the current line.
    EraseLine,
    /// [`consts::GA`] Go Ahead, the half-duplex turnover marker.
    GoAhead,
    /// [`consts::SB`] Begin subnegotiation parameters.
    SubnegotiationBegin,
    /// [`consts::WILL`] Offer to begin performing an option.
    Will,
    /// [`consts::WONT`] Refuse to perform an option.
    Wont,
    /// [`consts::DO`] Request the other party perform an option.
    Do,
    /// [`consts::DONT`] Demand the other party stop performing an option.
    Dont,
    /// [`consts::IAC`] Interpret As Command escape.
    InterpretAsCommand,
}

impl TelnetCommand {
    /// Maps a wire byte onto a command, returning `None` for bytes outside
    /// the command range.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            consts::EOR => Some(TelnetCommand::EndOfRecord),
            consts::SE => Some(TelnetCommand::SubnegotiationEnd),
            consts::NOP => Some(TelnetCommand::NoOperation),
            consts::DM => Some(TelnetCommand::DataMark),
            consts::BRK => Some(TelnetCommand::Break),
            consts::IP => Some(TelnetCommand::InterruptProcess),
            consts::AO => Some(TelnetCommand::AbortOutput),
            consts::AYT => Some(TelnetCommand::AreYouThere),
            consts::EC => Some(TelnetCommand::EraseCharacter),
            consts::EL => Some(TelnetCommand::EraseLine),
            consts::GA => Some(TelnetCommand::GoAhead),
            consts::SB => Some(TelnetCommand::SubnegotiationBegin),
            consts::WILL => Some(TelnetCommand::Will),
            consts::WONT => Some(TelnetCommand::Wont),
            consts::DO => Some(TelnetCommand::Do),
            consts::DONT => Some(TelnetCommand::Dont),
            consts::IAC => Some(TelnetCommand::InterpretAsCommand),
            _ => None,
        }
    }

    /// Returns the wire byte for this command.
    pub fn to_u8(self) -> u8 {
        match self {
            TelnetCommand::EndOfRecord => consts::EOR,
            TelnetCommand::SubnegotiationEnd => consts::SE,
            TelnetCommand::NoOperation => consts::NOP,
            TelnetCommand::DataMark => consts::DM,
            TelnetCommand::Break => consts::BRK,
            TelnetCommand::InterruptProcess => consts::IP,
            TelnetCommand::AbortOutput => consts::AO,
            TelnetCommand::AreYouThere => consts::AYT,
            TelnetCommand::EraseCharacter => consts::EC,
            TelnetCommand::EraseLine => consts::EL,
            TelnetCommand::GoAhead => consts::GA,
            TelnetCommand::SubnegotiationBegin => consts::SB,
            TelnetCommand::Will => consts::WILL,
            TelnetCommand::Wont => consts::WONT,
            TelnetCommand::Do => consts::DO,
            TelnetCommand::Dont => consts::DONT,
            TelnetCommand::InterpretAsCommand => consts::IAC,
        }
    }

    /// Whether this command opens a three-byte negotiation sequence.
    pub fn is_negotiation(self) -> bool {
        matches!(
            self,
            TelnetCommand::Will | TelnetCommand::Wont | TelnetCommand::Do | TelnetCommand::Dont
        )
    }
}

impl From<TelnetCommand> for u8 {
    fn from(cmd: TelnetCommand) -> Self {
        cmd.to_u8()
    }
}

impl std::fmt::Display for TelnetCommand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TelnetCommand::EndOfRecord => "EOR",
            TelnetCommand::SubnegotiationEnd => "SE",
            TelnetCommand::NoOperation => "NOP",
            TelnetCommand::DataMark => "DM",
            TelnetCommand::Break => "BRK",
            TelnetCommand::InterruptProcess => "IP",
            TelnetCommand::AbortOutput => "AO",
            TelnetCommand::AreYouThere => "AYT",
            TelnetCommand::EraseCharacter => "EC",
            TelnetCommand::EraseLine => "EL",
            TelnetCommand::GoAhead => "GA",
            TelnetCommand::SubnegotiationBegin => "SB",
            TelnetCommand::Will => "WILL",
            TelnetCommand::Wont => "WONT",
            TelnetCommand::Do => "DO",
            TelnetCommand::Dont => "DONT",
            TelnetCommand::InterpretAsCommand => "IAC",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_round_trip() {
        for byte in 239..=255u8 {
            let cmd = TelnetCommand::from_u8(byte).expect("command byte");
            assert_eq!(cmd.to_u8(), byte);
        }
    }

    #[test]
    fn data_bytes_are_not_commands() {
        assert_eq!(TelnetCommand::from_u8(0x00), None);
        assert_eq!(TelnetCommand::from_u8(b'A'), None);
        assert_eq!(TelnetCommand::from_u8(238), None);
    }

    #[test]
    fn negotiation_commands() {
        assert!(TelnetCommand::Will.is_negotiation());
        assert!(TelnetCommand::Dont.is_negotiation());
        assert!(!TelnetCommand::SubnegotiationBegin.is_negotiation());
        assert!(!TelnetCommand::DataMark.is_negotiation());
    }
}
