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

use crate::{consts, Direction, ProtocolError, TelnetCommand, TelnetOption};
use bytes::Bytes;
use std::fmt::Formatter;

///
/// A Telnet-layer semantic event produced by the parser.
///
/// Signals are not failures. The stream adapter absorbs the first four
/// ([`CarriageReturn`], [`EraseCharacter`], [`EraseLine`], [`DataMark`])
/// where it can; the rest terminate the read operation that produced them
/// and are surfaced to the application.
///
/// [`CarriageReturn`]: Signal::CarriageReturn
/// [`EraseCharacter`]: Signal::EraseCharacter
/// [`EraseLine`]: Signal::EraseLine
/// [`DataMark`]: Signal::DataMark
///
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Signal {
    /// A suppressed `CR` must be reinserted into the application buffer.
    CarriageReturn,
    /// Erase the previous character of the currently-filling window.
    EraseCharacter,
    /// Erase the currently-filling window back to its start.
    EraseLine,
    /// An in-band `IAC DM` was consumed.
    DataMark,
    /// A `CR LF` end-of-line sequence completed.
    EndOfLine,
    /// The peer signalled Go Ahead.
    GoAhead,
    /// The peer signalled End of Record.
    EndOfRecord,
    /// The peer requested output be aborted.
    AbortOutput,
    /// The peer requested the current process be interrupted.
    InterruptProcess,
    /// The peer sent a Break.
    Break,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Signal::CarriageReturn => "carriage-return",
            Signal::EraseCharacter => "erase-character",
            Signal::EraseLine => "erase-line",
            Signal::DataMark => "data-mark",
            Signal::EndOfLine => "end-of-line",
            Signal::GoAhead => "go-ahead",
            Signal::EndOfRecord => "end-of-record",
            Signal::AbortOutput => "abort-output",
            Signal::InterruptProcess => "interrupt-process",
            Signal::Break => "break",
        };
        write!(f, "{name}")
    }
}

///
/// A negotiation frame: direction, desired enablement, and option.
///
/// Encodes as `IAC <cmd> <id>` where `<cmd>` follows from direction and
/// enablement: requests about the remote side use `DO`/`DONT`, requests
/// about the local side use `WILL`/`WONT`.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Negotiation {
    /// Which side of the connection the frame speaks about.
    pub direction: Direction,
    /// Whether the frame requests enablement or disablement.
    pub enable: bool,
    /// The option being negotiated.
    pub option: TelnetOption,
}

impl Negotiation {
    /// The command byte this frame encodes with.
    pub fn command(&self) -> TelnetCommand {
        match (self.direction, self.enable) {
            (Direction::Remote, true) => TelnetCommand::Do,
            (Direction::Remote, false) => TelnetCommand::Dont,
            (Direction::Local, true) => TelnetCommand::Will,
            (Direction::Local, false) => TelnetCommand::Wont,
        }
    }

    /// The three wire bytes of this frame.
    pub fn to_bytes(&self) -> [u8; 3] {
        [consts::IAC, self.command().to_u8(), self.option.to_u8()]
    }
}

///
/// An outbound reaction the parser asks the stream adapter to perform.
///
/// The parser never holds handler futures itself; it names the work and the
/// adapter dispatches into the option handler registry and the transport.
///
#[derive(Debug)]
pub enum FsmEvent {
    /// Write a negotiation frame.
    Negotiation(Negotiation),
    /// Write the configured Are-You-There response verbatim.
    AytReply(Bytes),
    /// An option settled enabled: fire the on-enable handler, optionally
    /// after writing the agreement frame.
    OptionEnabled {
        /// The option that settled.
        option: TelnetOption,
        /// The direction that settled.
        direction: Direction,
        /// Agreement frame to write first, if the peer initiated.
        reply: Option<Negotiation>,
    },
    /// An option settled disabled: await the on-disable handler, optionally
    /// after writing the agreement frame.
    OptionDisabled {
        /// The option that settled.
        option: TelnetOption,
        /// The direction that settled.
        direction: Direction,
        /// Agreement frame to write first, if the peer initiated.
        reply: Option<Negotiation>,
    },
    /// A subnegotiation payload arrived for the application handler. The
    /// handler's non-empty reply is written back as a subnegotiation of the
    /// same option.
    Subnegotiation {
        /// The option the payload belongs to.
        option: TelnetOption,
        /// The unescaped payload between `IAC SB <id>` and `IAC SE`.
        payload: Vec<u8>,
    },
    /// A subnegotiation reply the engine built itself (the `STATUS IS`
    /// answer); write it without consulting any handler.
    SubnegotiationReply {
        /// The option the reply belongs to.
        option: TelnetOption,
        /// The unescaped reply payload.
        payload: Vec<u8>,
    },
}

/// How the parser classified one input byte.
#[derive(Debug)]
pub enum ProcessStatus {
    /// Nothing to report; keep feeding bytes.
    Continue,
    /// A processing signal. See [`Signal`] for which ones the adapter
    /// absorbs and which terminate the read.
    Signal(Signal),
    /// A hard protocol error. The parser has already reset where required.
    Error(ProtocolError),
}

///
/// The outcome of feeding one byte to [`ProtocolFsm::process_byte`].
///
/// [`ProtocolFsm::process_byte`]: crate::ProtocolFsm::process_byte
///
#[derive(Debug)]
pub struct ByteOutcome {
    /// Signal or error classification of the byte.
    pub status: ProcessStatus,
    /// Whether the byte is application payload and belongs in the read
    /// window.
    pub forward: bool,
    /// An outbound reaction for the stream adapter, if any.
    pub event: Option<FsmEvent>,
}

impl ByteOutcome {
    pub(crate) fn forward() -> Self {
        ByteOutcome {
            status: ProcessStatus::Continue,
            forward: true,
            event: None,
        }
    }

    pub(crate) fn discard() -> Self {
        ByteOutcome {
            status: ProcessStatus::Continue,
            forward: false,
            event: None,
        }
    }

    pub(crate) fn signal(signal: Signal) -> Self {
        ByteOutcome {
            status: ProcessStatus::Signal(signal),
            forward: false,
            event: None,
        }
    }

    pub(crate) fn error(error: ProtocolError) -> Self {
        ByteOutcome {
            status: ProcessStatus::Error(error),
            forward: false,
            event: None,
        }
    }

    pub(crate) fn event(event: FsmEvent) -> Self {
        ByteOutcome {
            status: ProcessStatus::Continue,
            forward: false,
            event: Some(event),
        }
    }
}
