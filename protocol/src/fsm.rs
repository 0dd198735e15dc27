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

//! The Telnet protocol finite state machine.
//!
//! [`ProtocolFsm`] consumes one inbound byte at a time and classifies it as
//! application payload, a processing signal, a protocol error, or an
//! outbound reaction ([`FsmEvent`]) for the stream adapter to perform. It
//! also owns the [RFC 1143] Q-Method negotiation engine over the per-option
//! status database, and answers `STATUS` ([RFC 859]) subnegotiations from
//! that same database.
//!
//! [RFC 1143]: https://tools.ietf.org/html/rfc1143
//! [RFC 859]: https://tools.ietf.org/html/rfc859

use crate::{
    consts, ByteOutcome, Direction, FsmConfig, FsmEvent, Negotiation, OptionDescriptor,
    OptionRegistry, OptionStatus, OptionStatusDb, ProcessStatus, ProtocolError, ProtocolResult,
    QState, Signal, TelnetCommand, TelnetOption,
};
use bytes::{BufMut, BytesMut};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Parser state. Transient slots (pending command, pending option,
/// subnegotiation buffer) are cleared on every transition back to `Normal`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ProtocolState {
    /// Plain data.
    Normal,
    /// Consumed a bare `CR`; the next byte decides the line discipline.
    HasCr,
    /// Consumed an `IAC`; the next byte is a command.
    HasIac,
    /// Consumed `IAC WILL|WONT|DO|DONT`; the next byte is the option.
    OptionNegotiation,
    /// Consumed `IAC SB`; the next byte is the option.
    SubnegotiationOption,
    /// Accumulating subnegotiation payload.
    Subnegotiation,
    /// Consumed an `IAC` inside a subnegotiation payload.
    SubnegotiationIac,
}

/// The effect of an application-initiated option disablement.
#[derive(Debug, Default)]
pub struct DisableOutcome {
    /// Frame to put on the wire, if the request started a negotiation.
    pub negotiation: Option<Negotiation>,
    /// Whether the caller must await the option handler's on-disable work.
    pub notify_handler: bool,
}

///
/// Byte-stream parser and option negotiation engine for one Telnet stream.
///
/// One instance per stream. The FSM owns the option status database and
/// shares the option registry (read-only apart from the idempotent
/// refuse-everything insertion for unregistered subnegotiations).
///
#[derive(Debug)]
pub struct ProtocolFsm {
    config: FsmConfig,
    status: OptionStatusDb,
    state: ProtocolState,
    current_command: Option<TelnetCommand>,
    current_option: Option<(TelnetOption, OptionDescriptor)>,
    subnegotiation: BytesMut,
}

impl ProtocolFsm {
    /// Creates an FSM in the normal state with every option disabled.
    pub fn new(config: FsmConfig) -> Self {
        ProtocolFsm {
            config,
            status: OptionStatusDb::new(),
            state: ProtocolState::Normal,
            current_command: None,
            current_option: None,
            subnegotiation: BytesMut::new(),
        }
    }

    /// The construction-time configuration.
    pub fn config(&self) -> &FsmConfig {
        &self.config
    }

    /// The shared option registry.
    pub fn registry(&self) -> &Arc<OptionRegistry> {
        self.config.registry()
    }

    /// The negotiation status of `option`.
    pub fn status(&self, option: TelnetOption) -> &OptionStatus {
        self.status.entry(option)
    }

    /// Whether `option` is enabled in `direction`.
    pub fn enabled(&self, option: TelnetOption, direction: Direction) -> bool {
        self.status.entry(option).enabled(direction)
    }

    fn change_state(&mut self, next: ProtocolState) {
        if next == ProtocolState::Normal {
            self.current_command = None;
            self.current_option = None;
            self.subnegotiation.clear();
        }
        self.state = next;
    }

    ///
    /// Feeds one inbound byte through the parser.
    ///
    /// Returns whether the byte is application payload (`forward`), an
    /// optional processing signal or protocol error, and an optional
    /// outbound reaction. Protocol errors reset the parser to the normal
    /// state; the next byte parses cleanly.
    ///
    pub fn process_byte(&mut self, byte: u8) -> ByteOutcome {
        match self.state {
            ProtocolState::Normal => self.handle_normal(byte),
            ProtocolState::HasCr => self.handle_has_cr(byte),
            ProtocolState::HasIac => self.handle_iac(byte),
            ProtocolState::OptionNegotiation => self.handle_option_negotiation(byte),
            ProtocolState::SubnegotiationOption => self.handle_subnegotiation_option(byte),
            ProtocolState::Subnegotiation => self.handle_subnegotiation(byte),
            ProtocolState::SubnegotiationIac => self.handle_subnegotiation_iac(byte),
        }
    }

    fn handle_normal(&mut self, byte: u8) -> ByteOutcome {
        if byte == consts::IAC {
            self.change_state(ProtocolState::HasIac);
            ByteOutcome::discard()
        } else if byte == consts::CR
            && !self
                .status
                .entry(TelnetOption::TransmitBinary)
                .remote_enabled()
        {
            self.change_state(ProtocolState::HasCr);
            ByteOutcome::discard()
        } else if byte == consts::NUL {
            ByteOutcome::discard()
        } else {
            ByteOutcome::forward()
        }
    }

    fn handle_has_cr(&mut self, byte: u8) -> ByteOutcome {
        match byte {
            consts::LF => {
                // CR LF is the Telnet end-of-line sequence.
                self.change_state(ProtocolState::Normal);
                ByteOutcome {
                    status: ProcessStatus::Signal(Signal::EndOfLine),
                    forward: true,
                    event: None,
                }
            }
            consts::NUL => {
                // CR NUL carries a bare carriage return; the NUL is dropped
                // and the adapter reinserts the CR.
                self.change_state(ProtocolState::Normal);
                ByteOutcome::signal(Signal::CarriageReturn)
            }
            consts::IAC => {
                warn!(
                    error = %ProtocolError::ProtocolViolation,
                    "bare CR before IAC; retained the CR"
                );
                self.change_state(ProtocolState::HasIac);
                ByteOutcome::signal(Signal::CarriageReturn)
            }
            _ => {
                warn!(
                    byte,
                    error = %ProtocolError::ProtocolViolation,
                    "bare CR before data byte; retained both"
                );
                self.change_state(ProtocolState::Normal);
                ByteOutcome {
                    status: ProcessStatus::Signal(Signal::CarriageReturn),
                    forward: true,
                    event: None,
                }
            }
        }
    }

    fn handle_iac(&mut self, byte: u8) -> ByteOutcome {
        if byte == consts::IAC {
            // Escaped data byte 0xFF.
            self.change_state(ProtocolState::Normal);
            return ByteOutcome::forward();
        }
        let Some(command) = TelnetCommand::from_u8(byte) else {
            warn!(byte, error = %ProtocolError::InvalidCommand(byte), "IAC followed by non-command byte");
            self.change_state(ProtocolState::Normal);
            return ByteOutcome::discard();
        };
        let mut outcome = ByteOutcome::discard();
        let mut next_state = ProtocolState::Normal;
        match command {
            TelnetCommand::Will | TelnetCommand::Wont | TelnetCommand::Do | TelnetCommand::Dont => {
                self.current_command = Some(command);
                next_state = ProtocolState::OptionNegotiation;
            }
            TelnetCommand::SubnegotiationBegin => {
                next_state = ProtocolState::SubnegotiationOption;
            }
            TelnetCommand::SubnegotiationEnd => {
                // SE outside a subnegotiation. Log it, ignore it, move on.
                warn!(
                    error = %ProtocolError::InvalidSubnegotiation,
                    "SE outside subnegotiation"
                );
            }
            TelnetCommand::DataMark => {
                outcome = ByteOutcome::signal(Signal::DataMark);
            }
            TelnetCommand::GoAhead => {
                if self
                    .status
                    .entry(TelnetOption::SuppressGoAhead)
                    .remote_enabled()
                {
                    debug!(error = %ProtocolError::IgnoredGoAhead, "dropping GA");
                } else {
                    outcome = ByteOutcome::signal(Signal::GoAhead);
                }
            }
            TelnetCommand::AreYouThere => {
                outcome = ByteOutcome::event(FsmEvent::AytReply(self.config.ayt_response().clone()));
            }
            TelnetCommand::EndOfRecord => {
                if self.status.entry(TelnetOption::EndOfRecord).remote_enabled() {
                    outcome = ByteOutcome::signal(Signal::EndOfRecord);
                }
                // Without the EOR option this command is a no-op.
            }
            TelnetCommand::NoOperation => {}
            TelnetCommand::EraseCharacter => {
                outcome = ByteOutcome::signal(Signal::EraseCharacter);
            }
            TelnetCommand::EraseLine => {
                outcome = ByteOutcome::signal(Signal::EraseLine);
            }
            TelnetCommand::AbortOutput => {
                outcome = ByteOutcome::signal(Signal::AbortOutput);
            }
            TelnetCommand::InterruptProcess => {
                outcome = ByteOutcome::signal(Signal::InterruptProcess);
            }
            TelnetCommand::Break => {
                outcome = ByteOutcome::signal(Signal::Break);
            }
            TelnetCommand::InterpretAsCommand => unreachable!("handled as escaped IAC above"),
        }
        self.change_state(next_state);
        outcome
    }

    fn handle_option_negotiation(&mut self, byte: u8) -> ByteOutcome {
        let Some(command) = self.current_command else {
            error!(
                byte,
                error = %ProtocolError::ProtocolViolation,
                "negotiating with no pending command"
            );
            self.change_state(ProtocolState::Normal);
            return ByteOutcome::error(ProtocolError::ProtocolViolation);
        };
        let direction = if matches!(command, TelnetCommand::Will | TelnetCommand::Wont) {
            Direction::Remote
        } else {
            Direction::Local
        };
        let request_to_enable = matches!(command, TelnetCommand::Do | TelnetCommand::Will);
        let option = TelnetOption::from_u8(byte);

        let outcome = match self.config.registry().get(option) {
            Some(descriptor) => {
                self.negotiate_registered(option, descriptor, direction, request_to_enable)
            }
            None => {
                // Peer is negotiating an option we never registered.
                if !self.config.notify_unknown_option(option) {
                    warn!(
                        %option,
                        %direction,
                        %command,
                        error = %ProtocolError::OptionNotAvailable(option),
                        "peer negotiated unregistered option"
                    );
                }
                if request_to_enable {
                    // Unregistered options are refused per RFC 854 / RFC 1143.
                    ByteOutcome::event(FsmEvent::Negotiation(Negotiation {
                        direction,
                        enable: false,
                        option,
                    }))
                } else {
                    // Implicitly disabled already; a disable request is moot.
                    ByteOutcome::discard()
                }
            }
        };
        self.change_state(ProtocolState::Normal);
        outcome
    }

    fn negotiate_registered(
        &mut self,
        option: TelnetOption,
        descriptor: OptionDescriptor,
        direction: Direction,
        request_to_enable: bool,
    ) -> ByteOutcome {
        let status = self.status.entry_mut(option);

        if (request_to_enable && status.enabled(direction))
            || (!request_to_enable && status.disabled(direction))
        {
            // Redundant WILL/DO in YES, or WONT/DONT in NO.
            warn!(
                %option,
                %direction,
                error = %ProtocolError::InvalidNegotiation(option),
                "redundant negotiation request"
            );
            return ByteOutcome::discard();
        }

        if request_to_enable {
            if status.pending_enable(direction) {
                if status.queued(direction) {
                    // Peer agreed, but an opposite request is queued: start
                    // the disable round.
                    status.dequeue(direction);
                    status.pend_disable(direction);
                    ByteOutcome::event(FsmEvent::Negotiation(Negotiation {
                        direction,
                        enable: false,
                        option,
                    }))
                } else {
                    // Our request completed; no reply owed.
                    status.enable(direction);
                    ByteOutcome::event(FsmEvent::OptionEnabled {
                        option,
                        direction,
                        reply: None,
                    })
                }
            } else if status.pending_disable(direction) {
                if status.queued(direction) {
                    // Invalid answer to our WONT/DONT, but the queued request
                    // wanted exactly this. Accept gracefully.
                    status.dequeue(direction);
                    status.enable(direction);
                    ByteOutcome::event(FsmEvent::OptionEnabled {
                        option,
                        direction,
                        reply: None,
                    })
                } else {
                    // Peer ignored our disable request. Stay disabled.
                    warn!(
                        %option,
                        %direction,
                        error = %ProtocolError::InvalidNegotiation(option),
                        "enable request while disablement pending"
                    );
                    status.disable(direction);
                    ByteOutcome::discard()
                }
            } else if descriptor.supports(direction) {
                // Fresh offer we support: agree and enable.
                status.enable(direction);
                ByteOutcome::event(FsmEvent::OptionEnabled {
                    option,
                    direction,
                    reply: Some(Negotiation {
                        direction,
                        enable: true,
                        option,
                    }),
                })
            } else {
                ByteOutcome::event(FsmEvent::Negotiation(Negotiation {
                    direction,
                    enable: false,
                    option,
                }))
            }
        } else {
            // Request to disable.
            if status.pending_disable(direction) {
                if status.queued(direction) {
                    // Disable completed with an enable queued behind it:
                    // re-emit the enable request.
                    status.dequeue(direction);
                    status.pend_enable(direction);
                    ByteOutcome::event(FsmEvent::Negotiation(Negotiation {
                        direction,
                        enable: true,
                        option,
                    }))
                } else {
                    status.disable(direction);
                    ByteOutcome::discard()
                }
            } else if status.pending_enable(direction) {
                // Peer declined our enable request (queued or not, the
                // answer is no).
                if status.queued(direction) {
                    status.dequeue(direction);
                }
                status.disable(direction);
                ByteOutcome::discard()
            } else {
                // YES: honor the disablement and notify the handler.
                status.disable(direction);
                ByteOutcome::event(FsmEvent::OptionDisabled {
                    option,
                    direction,
                    reply: Some(Negotiation {
                        direction,
                        enable: false,
                        option,
                    }),
                })
            }
        }
    }

    fn handle_subnegotiation_option(&mut self, byte: u8) -> ByteOutcome {
        let option = TelnetOption::from_u8(byte);
        let descriptor = match self.config.registry().get(option) {
            Some(descriptor) => {
                if !descriptor.supports_subnegotiation()
                    || !self.status.entry(option).is_enabled()
                {
                    warn!(
                        %option,
                        error = %ProtocolError::InvalidSubnegotiation,
                        "unsolicited subnegotiation; draining without delivery"
                    );
                }
                descriptor
            }
            None => {
                // Memoize a refuse-everything descriptor so repeated bad
                // requests stay cheap.
                let descriptor = self.config.registry().upsert_default(option);
                warn!(
                    %option,
                    error = %ProtocolError::InvalidSubnegotiation,
                    "subnegotiation for unregistered option"
                );
                descriptor
            }
        };
        self.current_option = Some((option, descriptor));
        self.subnegotiation
            .reserve(descriptor.max_subnegotiation_size());
        self.change_state(ProtocolState::Subnegotiation);
        ByteOutcome::discard()
    }

    fn handle_subnegotiation(&mut self, byte: u8) -> ByteOutcome {
        let Some((option, descriptor)) = self.current_option else {
            error!(
                byte,
                error = %ProtocolError::ProtocolViolation,
                "subnegotiation payload with no pending option"
            );
            self.change_state(ProtocolState::Normal);
            return ByteOutcome::error(ProtocolError::ProtocolViolation);
        };
        if byte == consts::IAC {
            self.change_state(ProtocolState::SubnegotiationIac);
            return ByteOutcome::discard();
        }
        let limit = descriptor.max_subnegotiation_size();
        if self.subnegotiation.len() >= limit {
            warn!(
                %option,
                limit,
                error = %ProtocolError::SubnegotiationOverflow { option, limit },
                "discarding oversized subnegotiation"
            );
            self.change_state(ProtocolState::Normal);
            return ByteOutcome::error(ProtocolError::SubnegotiationOverflow { option, limit });
        }
        self.subnegotiation.put_u8(byte);
        ByteOutcome::discard()
    }

    fn handle_subnegotiation_iac(&mut self, byte: u8) -> ByteOutcome {
        let Some((option, descriptor)) = self.current_option else {
            error!(
                byte,
                error = %ProtocolError::ProtocolViolation,
                "subnegotiation IAC with no pending option"
            );
            self.change_state(ProtocolState::Normal);
            return ByteOutcome::error(ProtocolError::ProtocolViolation);
        };

        if byte == consts::SE {
            let outcome = if descriptor.supports_subnegotiation()
                && self.status.entry(option).is_enabled()
            {
                let payload = self.subnegotiation.to_vec();
                if option == TelnetOption::Status {
                    // STATUS is answered from the status database the FSM
                    // owns; it never reaches the option handler directly.
                    self.handle_status_subnegotiation(payload)
                } else {
                    Some(FsmEvent::Subnegotiation { option, payload })
                }
            } else {
                // The rejection was logged when the subnegotiation opened.
                None
            };
            self.change_state(ProtocolState::Normal);
            return match outcome {
                Some(event) => ByteOutcome::event(event),
                None => ByteOutcome::discard(),
            };
        }

        let limit = descriptor.max_subnegotiation_size();
        let needed = if byte == consts::IAC { 1 } else { 2 };
        if self.subnegotiation.len() + needed > limit {
            warn!(
                %option,
                limit,
                error = %ProtocolError::SubnegotiationOverflow { option, limit },
                "discarding oversized subnegotiation"
            );
            self.change_state(ProtocolState::Normal);
            return ByteOutcome::error(ProtocolError::SubnegotiationOverflow { option, limit });
        }
        self.subnegotiation.put_u8(consts::IAC);
        if byte != consts::IAC {
            // Not SE, not an escaped IAC. Assume the peer forgot to escape
            // 0xFF and keep the stray byte.
            warn!(
                byte,
                %option,
                error = %ProtocolError::InvalidCommand(byte),
                "unescaped IAC inside subnegotiation"
            );
            self.subnegotiation.put_u8(byte);
        }
        self.change_state(ProtocolState::Subnegotiation);
        ByteOutcome::discard()
    }

    /// Answers `STATUS` subnegotiations (RFC 859) from the status database.
    fn handle_status_subnegotiation(&mut self, payload: Vec<u8>) -> Option<FsmEvent> {
        let status_entry = self.status.entry(TelnetOption::Status);
        match payload.first().copied() {
            None => {
                warn!(
                    error = %ProtocolError::InvalidSubnegotiation,
                    "empty STATUS subnegotiation"
                );
                None
            }
            Some(consts::option::status::IS) => {
                if status_entry.remote_enabled() {
                    // The peer's view of the world goes to the application.
                    Some(FsmEvent::Subnegotiation {
                        option: TelnetOption::Status,
                        payload,
                    })
                } else {
                    warn!(
                        error = %ProtocolError::OptionNotAvailable(TelnetOption::Status),
                        "STATUS IS received while STATUS is not remotely enabled"
                    );
                    None
                }
            }
            Some(consts::option::status::SEND) => {
                if status_entry.local_enabled() {
                    Some(FsmEvent::SubnegotiationReply {
                        option: TelnetOption::Status,
                        payload: self.build_status_is_payload(),
                    })
                } else {
                    warn!(
                        error = %ProtocolError::OptionNotAvailable(TelnetOption::Status),
                        "STATUS SEND received while STATUS is not locally enabled"
                    );
                    None
                }
            }
            Some(subcommand) => {
                warn!(
                    subcommand,
                    error = %ProtocolError::InvalidSubnegotiation,
                    "STATUS subnegotiation with unknown subcommand"
                );
                None
            }
        }
    }

    /// Builds the `IS` payload enumerating every enabled option: `WILL id`
    /// per locally-enabled option, `DO id` per remotely-enabled option,
    /// `STATUS` itself omitted, `IAC` and `SE` id values doubled.
    fn build_status_is_payload(&self) -> Vec<u8> {
        let mut payload = vec![consts::option::status::IS];
        for (option, status) in self.status.iter() {
            if option == TelnetOption::Status {
                continue;
            }
            let id = option.to_u8();
            if status.local_enabled() {
                payload.push(consts::WILL);
                if id == consts::IAC || id == consts::SE {
                    payload.push(id);
                }
                payload.push(id);
            }
            if status.remote_enabled() {
                payload.push(consts::DO);
                if id == consts::IAC || id == consts::SE {
                    payload.push(id);
                }
                payload.push(id);
            }
        }
        payload
    }

    ///
    /// Application request to enable `option` in `direction`.
    ///
    /// Returns the negotiation frame to write when the request starts a
    /// round; `None` on idempotent success (already enabled or already in
    /// flight, logged as a redundant request).
    ///
    pub fn request_option(
        &mut self,
        option: TelnetOption,
        direction: Direction,
    ) -> ProtocolResult<Option<Negotiation>> {
        if self.config.registry().get(option).is_none() {
            warn!(
                %option,
                %direction,
                error = %ProtocolError::OptionNotAvailable(option),
                "request for unregistered option"
            );
            return Err(ProtocolError::OptionNotAvailable(option));
        }
        let status = self.status.entry_mut(option);
        match (status.state(direction), status.queued(direction)) {
            (QState::Yes, false) => {
                warn!(%option, %direction, "redundant enable request in YES");
                Ok(None)
            }
            (QState::WantYes, false) => {
                warn!(%option, %direction, "redundant enable request in WANTYES");
                Ok(None)
            }
            (QState::WantYes, true) => {
                // The queued opposite request is withdrawn.
                status.dequeue(direction);
                Ok(None)
            }
            (QState::WantNo, false) => {
                if let Err(err) = status.enqueue(option, direction) {
                    warn!(%option, %direction, error = %err, "failed to queue enable request");
                    return Err(err);
                }
                Ok(None)
            }
            (QState::WantNo, true) => {
                warn!(%option, %direction, "redundant enable request in WANTNO/OPPOSITE");
                Ok(None)
            }
            (QState::No, false) => {
                status.pend_enable(direction);
                Ok(Some(Negotiation {
                    direction,
                    enable: true,
                    option,
                }))
            }
            (QState::No, true) | (QState::Yes, true) => {
                error!(
                    %option,
                    %direction,
                    error = %ProtocolError::ProtocolViolation,
                    "impossible negotiation state; resetting option"
                );
                status.reset(direction);
                Err(ProtocolError::ProtocolViolation)
            }
        }
    }

    ///
    /// Application request to disable `option` in `direction`.
    ///
    /// When the request starts a round, the returned [`DisableOutcome`]
    /// carries the frame to write and asks the caller to await the option
    /// handler's on-disable work.
    ///
    pub fn disable_option(
        &mut self,
        option: TelnetOption,
        direction: Direction,
    ) -> ProtocolResult<DisableOutcome> {
        if self.config.registry().get(option).is_none() {
            warn!(
                %option,
                %direction,
                error = %ProtocolError::OptionNotAvailable(option),
                "disable of unregistered option"
            );
            return Err(ProtocolError::OptionNotAvailable(option));
        }
        let status = self.status.entry_mut(option);
        match (status.state(direction), status.queued(direction)) {
            (QState::No, false) => {
                warn!(%option, %direction, "redundant disable request in NO");
                Ok(DisableOutcome::default())
            }
            (QState::WantNo, false) => {
                warn!(%option, %direction, "redundant disable request in WANTNO");
                Ok(DisableOutcome::default())
            }
            (QState::WantNo, true) => {
                status.dequeue(direction);
                Ok(DisableOutcome::default())
            }
            (QState::WantYes, false) => {
                if let Err(err) = status.enqueue(option, direction) {
                    warn!(%option, %direction, error = %err, "failed to queue disable request");
                    return Err(err);
                }
                Ok(DisableOutcome::default())
            }
            (QState::WantYes, true) => {
                warn!(%option, %direction, "redundant disable request in WANTYES/OPPOSITE");
                Ok(DisableOutcome::default())
            }
            (QState::Yes, false) => {
                status.pend_disable(direction);
                Ok(DisableOutcome {
                    negotiation: Some(Negotiation {
                        direction,
                        enable: false,
                        option,
                    }),
                    notify_handler: true,
                })
            }
            (QState::No, true) | (QState::Yes, true) => {
                error!(
                    %option,
                    %direction,
                    error = %ProtocolError::ProtocolViolation,
                    "impossible negotiation state; resetting option"
                );
                status.reset(direction);
                Err(ProtocolError::ProtocolViolation)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_MAX_SUBNEGOTIATION_SIZE;

    fn registry_with(entries: &[(TelnetOption, OptionDescriptor)]) -> Arc<OptionRegistry> {
        let registry = Arc::new(OptionRegistry::new());
        for (option, descriptor) in entries {
            registry.register(*option, *descriptor);
        }
        registry
    }

    fn fsm_with(entries: &[(TelnetOption, OptionDescriptor)]) -> ProtocolFsm {
        ProtocolFsm::new(FsmConfig::new(registry_with(entries)))
    }

    fn feed(fsm: &mut ProtocolFsm, bytes: &[u8]) -> Vec<ByteOutcome> {
        bytes.iter().map(|b| fsm.process_byte(*b)).collect()
    }

    fn last_event(fsm: &mut ProtocolFsm, bytes: &[u8]) -> Option<FsmEvent> {
        feed(fsm, bytes).pop().and_then(|outcome| outcome.event)
    }

    #[test]
    fn plain_data_forwards() {
        let mut fsm = fsm_with(&[]);
        for b in *b"hello" {
            let outcome = fsm.process_byte(b);
            assert!(outcome.forward);
            assert!(matches!(outcome.status, ProcessStatus::Continue));
            assert!(outcome.event.is_none());
        }
    }

    #[test]
    fn stray_nul_is_dropped() {
        let mut fsm = fsm_with(&[]);
        let outcome = fsm.process_byte(consts::NUL);
        assert!(!outcome.forward);
        assert!(matches!(outcome.status, ProcessStatus::Continue));
    }

    #[test]
    fn escaped_iac_forwards_single_ff() {
        let mut fsm = fsm_with(&[]);
        let first = fsm.process_byte(consts::IAC);
        assert!(!first.forward);
        let second = fsm.process_byte(consts::IAC);
        assert!(second.forward);
        assert!(second.event.is_none());
        assert!(matches!(second.status, ProcessStatus::Continue));
    }

    #[test]
    fn cr_lf_signals_end_of_line() {
        let mut fsm = fsm_with(&[]);
        assert!(!fsm.process_byte(consts::CR).forward);
        let outcome = fsm.process_byte(consts::LF);
        assert!(outcome.forward);
        assert!(matches!(
            outcome.status,
            ProcessStatus::Signal(Signal::EndOfLine)
        ));
    }

    #[test]
    fn cr_nul_signals_carriage_return() {
        let mut fsm = fsm_with(&[]);
        fsm.process_byte(consts::CR);
        let outcome = fsm.process_byte(consts::NUL);
        assert!(!outcome.forward);
        assert!(matches!(
            outcome.status,
            ProcessStatus::Signal(Signal::CarriageReturn)
        ));
    }

    #[test]
    fn bare_cr_before_data_retains_both() {
        let mut fsm = fsm_with(&[]);
        fsm.process_byte(consts::CR);
        let outcome = fsm.process_byte(b'x');
        assert!(outcome.forward);
        assert!(matches!(
            outcome.status,
            ProcessStatus::Signal(Signal::CarriageReturn)
        ));
    }

    #[test]
    fn cr_is_data_in_remote_binary_mode() {
        let mut fsm = fsm_with(&[(TelnetOption::TransmitBinary, OptionDescriptor::both())]);
        // Peer: WILL BINARY -> remote side enabled.
        feed(&mut fsm, &[consts::IAC, consts::WILL, consts::option::BINARY]);
        assert!(fsm.enabled(TelnetOption::TransmitBinary, Direction::Remote));

        let outcome = fsm.process_byte(consts::CR);
        assert!(outcome.forward);
        assert!(matches!(outcome.status, ProcessStatus::Continue));
    }

    #[test]
    fn will_for_supported_option_enables_and_agrees() {
        // Scenario: peer sends WILL ECHO with ECHO registered remote.
        let mut fsm = fsm_with(&[(TelnetOption::Echo, OptionDescriptor::remote())]);
        let event = last_event(&mut fsm, &[consts::IAC, consts::WILL, consts::option::ECHO]);
        match event {
            Some(FsmEvent::OptionEnabled {
                option,
                direction,
                reply: Some(reply),
            }) => {
                assert_eq!(option, TelnetOption::Echo);
                assert_eq!(direction, Direction::Remote);
                assert_eq!(reply.to_bytes(), [consts::IAC, consts::DO, 0x01]);
            }
            other => panic!("expected OptionEnabled with agreement, got {other:?}"),
        }
        assert!(fsm.enabled(TelnetOption::Echo, Direction::Remote));
    }

    #[test]
    fn do_for_unsupported_direction_is_refused() {
        // ECHO registered remote-only; peer asks us to perform it locally.
        let mut fsm = fsm_with(&[(TelnetOption::Echo, OptionDescriptor::remote())]);
        let event = last_event(&mut fsm, &[consts::IAC, consts::DO, consts::option::ECHO]);
        match event {
            Some(FsmEvent::Negotiation(neg)) => {
                assert_eq!(neg.to_bytes(), [consts::IAC, consts::WONT, 0x01]);
            }
            other => panic!("expected refusal, got {other:?}"),
        }
        assert!(!fsm.enabled(TelnetOption::Echo, Direction::Local));
    }

    #[test]
    fn unregistered_option_is_refused_without_status() {
        // Scenario: DO 0x63 for an option that was never registered.
        let mut fsm = fsm_with(&[]);
        let event = last_event(&mut fsm, &[consts::IAC, consts::DO, 0x63]);
        match event {
            Some(FsmEvent::Negotiation(neg)) => {
                assert_eq!(neg.to_bytes(), [consts::IAC, consts::WONT, 0x63]);
            }
            other => panic!("expected refusal, got {other:?}"),
        }
        assert!(fsm.status(TelnetOption::Unknown(0x63)).disabled(Direction::Local));
        // No registry entry is created by plain negotiation.
        assert!(fsm.registry().get(TelnetOption::Unknown(0x63)).is_none());
    }

    #[test]
    fn unregistered_disable_is_a_no_op() {
        let mut fsm = fsm_with(&[]);
        let outcomes = feed(&mut fsm, &[consts::IAC, consts::DONT, 0x63]);
        assert!(outcomes.last().unwrap().event.is_none());
    }

    #[test]
    fn unknown_option_handler_is_invoked() {
        use std::sync::atomic::{AtomicU8, Ordering};
        let seen = Arc::new(AtomicU8::new(0));
        let seen_in_handler = Arc::clone(&seen);
        let config = FsmConfig::new(Arc::new(OptionRegistry::new())).with_unknown_option_handler(
            move |option| {
                seen_in_handler.store(option.to_u8(), Ordering::Relaxed);
            },
        );
        let mut fsm = ProtocolFsm::new(config);
        feed(&mut fsm, &[consts::IAC, consts::WILL, 0x42]);
        assert_eq!(seen.load(Ordering::Relaxed), 0x42);
    }

    #[test]
    fn request_then_will_completes_without_reply() {
        let mut fsm = fsm_with(&[(TelnetOption::Echo, OptionDescriptor::remote())]);
        let negotiation = fsm
            .request_option(TelnetOption::Echo, Direction::Remote)
            .unwrap()
            .expect("frame expected");
        assert_eq!(negotiation.to_bytes(), [consts::IAC, consts::DO, 0x01]);
        assert!(fsm.status(TelnetOption::Echo).pending_enable(Direction::Remote));

        let event = last_event(&mut fsm, &[consts::IAC, consts::WILL, consts::option::ECHO]);
        match event {
            Some(FsmEvent::OptionEnabled { reply: None, .. }) => {}
            other => panic!("expected completion without reply, got {other:?}"),
        }
        assert!(fsm.enabled(TelnetOption::Echo, Direction::Remote));
    }

    #[test]
    fn request_then_wont_settles_disabled_without_reply() {
        let mut fsm = fsm_with(&[(TelnetOption::Echo, OptionDescriptor::remote())]);
        fsm.request_option(TelnetOption::Echo, Direction::Remote)
            .unwrap();
        let outcomes = feed(&mut fsm, &[consts::IAC, consts::WONT, consts::option::ECHO]);
        assert!(outcomes.last().unwrap().event.is_none());
        assert!(fsm.status(TelnetOption::Echo).disabled(Direction::Remote));
    }

    #[test]
    fn change_of_mind_queues_and_reemits() {
        // WANTNO/OPPOSITE: disable in flight, enable queued. The peer's
        // agreement to disable must re-emit the queued enable request.
        let mut fsm = fsm_with(&[(TelnetOption::Echo, OptionDescriptor::remote())]);
        fsm.request_option(TelnetOption::Echo, Direction::Remote)
            .unwrap();
        feed(&mut fsm, &[consts::IAC, consts::WILL, consts::option::ECHO]);
        assert!(fsm.enabled(TelnetOption::Echo, Direction::Remote));

        let disable = fsm
            .disable_option(TelnetOption::Echo, Direction::Remote)
            .unwrap();
        assert_eq!(
            disable.negotiation.unwrap().to_bytes(),
            [consts::IAC, consts::DONT, 0x01]
        );
        assert!(disable.notify_handler);

        // Change of mind while the disable is in flight.
        assert!(fsm
            .request_option(TelnetOption::Echo, Direction::Remote)
            .unwrap()
            .is_none());
        assert!(fsm.status(TelnetOption::Echo).queued(Direction::Remote));

        // Peer agrees to disable; the queued enable goes back on the wire.
        let event = last_event(&mut fsm, &[consts::IAC, consts::WONT, consts::option::ECHO]);
        match event {
            Some(FsmEvent::Negotiation(neg)) => {
                assert_eq!(neg.to_bytes(), [consts::IAC, consts::DO, 0x01]);
            }
            other => panic!("expected re-emitted enable request, got {other:?}"),
        }
        assert!(fsm.status(TelnetOption::Echo).pending_enable(Direction::Remote));
    }

    #[test]
    fn wantyes_opposite_answered_positively_starts_disable_round() {
        let mut fsm = fsm_with(&[(TelnetOption::Echo, OptionDescriptor::remote())]);
        fsm.request_option(TelnetOption::Echo, Direction::Remote)
            .unwrap();
        // Change of mind: queue the disable behind the enable in flight.
        fsm.disable_option(TelnetOption::Echo, Direction::Remote)
            .unwrap();
        assert!(fsm.status(TelnetOption::Echo).queued(Direction::Remote));

        // Peer agrees to enable, but we want it off again.
        let event = last_event(&mut fsm, &[consts::IAC, consts::WILL, consts::option::ECHO]);
        match event {
            Some(FsmEvent::Negotiation(neg)) => {
                assert_eq!(neg.to_bytes(), [consts::IAC, consts::DONT, 0x01]);
            }
            other => panic!("expected disable request, got {other:?}"),
        }
        assert!(fsm.status(TelnetOption::Echo).pending_disable(Direction::Remote));
    }

    #[test]
    fn redundant_requests_are_idempotent() {
        let mut fsm = fsm_with(&[(TelnetOption::Echo, OptionDescriptor::remote())]);
        assert!(fsm
            .request_option(TelnetOption::Echo, Direction::Remote)
            .unwrap()
            .is_some());
        // Second request is an idempotent success without a frame.
        assert!(fsm
            .request_option(TelnetOption::Echo, Direction::Remote)
            .unwrap()
            .is_none());
        // Disable of a never-enabled option likewise.
        let outcome = fsm
            .disable_option(TelnetOption::TimingMark, Direction::Remote);
        assert_eq!(
            outcome.unwrap_err(),
            ProtocolError::OptionNotAvailable(TelnetOption::TimingMark)
        );
    }

    #[test]
    fn negotiation_loop_converges() {
        // Both sides racing WILL/DO for the same option must settle in a
        // bounded number of frames (RFC 1143 loop freedom).
        let registry_a = registry_with(&[(TelnetOption::SuppressGoAhead, OptionDescriptor::both())]);
        let registry_b = registry_with(&[(TelnetOption::SuppressGoAhead, OptionDescriptor::both())]);
        let mut a = ProtocolFsm::new(FsmConfig::new(registry_a));
        let mut b = ProtocolFsm::new(FsmConfig::new(registry_b));

        // Both request simultaneously.
        let mut a_to_b: Vec<u8> = fsm_frame(
            a.request_option(TelnetOption::SuppressGoAhead, Direction::Remote)
                .unwrap(),
        );
        let mut b_to_a: Vec<u8> = fsm_frame(
            b.request_option(TelnetOption::SuppressGoAhead, Direction::Remote)
                .unwrap(),
        );

        let mut rounds = 0;
        while !a_to_b.is_empty() || !b_to_a.is_empty() {
            rounds += 1;
            assert!(rounds < 10, "negotiation did not converge");
            let to_b = std::mem::take(&mut a_to_b);
            let to_a = std::mem::take(&mut b_to_a);
            for byte in to_b {
                b_to_a.extend(drain_wire(&mut b, byte));
            }
            for byte in to_a {
                a_to_b.extend(drain_wire(&mut a, byte));
            }
        }

        assert!(a.enabled(TelnetOption::SuppressGoAhead, Direction::Remote));
        assert!(b.enabled(TelnetOption::SuppressGoAhead, Direction::Remote));
        assert!(a.enabled(TelnetOption::SuppressGoAhead, Direction::Local));
        assert!(b.enabled(TelnetOption::SuppressGoAhead, Direction::Local));
    }

    fn fsm_frame(negotiation: Option<Negotiation>) -> Vec<u8> {
        negotiation.map(|n| n.to_bytes().to_vec()).unwrap_or_default()
    }

    fn drain_wire(fsm: &mut ProtocolFsm, byte: u8) -> Vec<u8> {
        let mut wire = Vec::new();
        if let Some(event) = fsm.process_byte(byte).event {
            match event {
                FsmEvent::Negotiation(neg) => wire.extend(neg.to_bytes()),
                FsmEvent::OptionEnabled { reply, .. } | FsmEvent::OptionDisabled { reply, .. } => {
                    if let Some(neg) = reply {
                        wire.extend(neg.to_bytes());
                    }
                }
                other => panic!("unexpected event during negotiation: {other:?}"),
            }
        }
        wire
    }

    #[test]
    fn ayt_produces_configured_reply() {
        let config = FsmConfig::new(Arc::new(OptionRegistry::new()))
            .with_ayt_response(&b"YES\r\n"[..]);
        let mut fsm = ProtocolFsm::new(config);
        let event = last_event(&mut fsm, &[consts::IAC, consts::AYT]);
        match event {
            Some(FsmEvent::AytReply(bytes)) => assert_eq!(&bytes[..], b"YES\r\n"),
            other => panic!("expected AYT reply, got {other:?}"),
        }
    }

    #[test]
    fn ga_is_signalled_unless_sga_active() {
        let mut fsm = fsm_with(&[(TelnetOption::SuppressGoAhead, OptionDescriptor::both())]);
        let outcome = feed(&mut fsm, &[consts::IAC, consts::GA]).pop().unwrap();
        assert!(matches!(
            outcome.status,
            ProcessStatus::Signal(Signal::GoAhead)
        ));

        feed(&mut fsm, &[consts::IAC, consts::WILL, consts::option::SGA]);
        let outcome = feed(&mut fsm, &[consts::IAC, consts::GA]).pop().unwrap();
        assert!(matches!(outcome.status, ProcessStatus::Continue));
    }

    #[test]
    fn eor_requires_option() {
        let mut fsm = fsm_with(&[(TelnetOption::EndOfRecord, OptionDescriptor::remote())]);
        let outcome = feed(&mut fsm, &[consts::IAC, consts::EOR]).pop().unwrap();
        assert!(matches!(outcome.status, ProcessStatus::Continue));

        feed(&mut fsm, &[consts::IAC, consts::WILL, consts::option::EOR]);
        let outcome = feed(&mut fsm, &[consts::IAC, consts::EOR]).pop().unwrap();
        assert!(matches!(
            outcome.status,
            ProcessStatus::Signal(Signal::EndOfRecord)
        ));
    }

    fn fsm_with_enabled_subneg(option: TelnetOption, max: usize) -> ProtocolFsm {
        let mut fsm = fsm_with(&[(
            option,
            OptionDescriptor::both().with_subnegotiation(max),
        )]);
        // Peer: WILL <option> to enable the remote side.
        feed(&mut fsm, &[consts::IAC, consts::WILL, option.to_u8()]);
        assert!(fsm.enabled(option, Direction::Remote));
        fsm
    }

    #[test]
    fn subnegotiation_payload_is_delivered_unescaped() {
        // Scenario: SB TERMINAL-TYPE IAC IAC 0x01 IAC SE.
        let mut fsm = fsm_with_enabled_subneg(TelnetOption::TerminalType, 64);
        let event = last_event(
            &mut fsm,
            &[
                consts::IAC,
                consts::SB,
                consts::option::TTYPE,
                consts::IAC,
                consts::IAC,
                0x01,
                consts::IAC,
                consts::SE,
            ],
        );
        match event {
            Some(FsmEvent::Subnegotiation { option, payload }) => {
                assert_eq!(option, TelnetOption::TerminalType);
                assert_eq!(payload, vec![0xFF, 0x01]);
            }
            other => panic!("expected subnegotiation delivery, got {other:?}"),
        }
    }

    #[test]
    fn subnegotiation_for_unregistered_option_is_drained() {
        let mut fsm = fsm_with(&[]);
        let outcomes = feed(
            &mut fsm,
            &[consts::IAC, consts::SB, 0x63, 1, 2, 3, consts::IAC, consts::SE],
        );
        assert!(outcomes.iter().all(|o| o.event.is_none()));
        // The refusal is memoized in the registry.
        assert_eq!(
            fsm.registry().get(TelnetOption::Unknown(0x63)),
            Some(OptionDescriptor::refused())
        );
        // Parsing continues normally afterwards.
        assert!(fsm.process_byte(b'x').forward);
    }

    #[test]
    fn subnegotiation_overflow_resets_parser() {
        let mut fsm = fsm_with_enabled_subneg(TelnetOption::TerminalType, 4);
        feed(&mut fsm, &[consts::IAC, consts::SB, consts::option::TTYPE]);
        let mut outcomes = feed(&mut fsm, &[0, 1, 2, 3, 4]);
        let overflow = outcomes.pop().unwrap();
        match overflow.status {
            ProcessStatus::Error(ProtocolError::SubnegotiationOverflow { option, limit }) => {
                assert_eq!(option, TelnetOption::TerminalType);
                assert_eq!(limit, 4);
            }
            other => panic!("expected overflow, got {other:?}"),
        }
        // Back in normal state.
        assert!(fsm.process_byte(b'x').forward);
    }

    #[test]
    fn unescaped_iac_in_subnegotiation_is_recovered() {
        let mut fsm = fsm_with_enabled_subneg(TelnetOption::TerminalType, 64);
        let event = last_event(
            &mut fsm,
            &[
                consts::IAC,
                consts::SB,
                consts::option::TTYPE,
                consts::IAC,
                0x07, // stray byte after IAC: keep IAC and the byte
                consts::IAC,
                consts::SE,
            ],
        );
        match event {
            Some(FsmEvent::Subnegotiation { payload, .. }) => {
                assert_eq!(payload, vec![consts::IAC, 0x07]);
            }
            other => panic!("expected recovered payload, got {other:?}"),
        }
    }

    fn status_fsm() -> ProtocolFsm {
        let mut fsm = fsm_with(&[
            (
                TelnetOption::Status,
                OptionDescriptor::both().with_subnegotiation(DEFAULT_MAX_SUBNEGOTIATION_SIZE),
            ),
            (TelnetOption::Echo, OptionDescriptor::both()),
            (TelnetOption::SuppressGoAhead, OptionDescriptor::both()),
        ]);
        // Enable STATUS locally (peer sends DO STATUS).
        feed(&mut fsm, &[consts::IAC, consts::DO, consts::option::STATUS]);
        assert!(fsm.enabled(TelnetOption::Status, Direction::Local));
        fsm
    }

    #[test]
    fn status_send_reports_enabled_options() {
        let mut fsm = status_fsm();
        // Locally enabled: ECHO (peer sends DO ECHO). Remotely enabled:
        // SGA (peer sends WILL SGA).
        feed(&mut fsm, &[consts::IAC, consts::DO, consts::option::ECHO]);
        feed(&mut fsm, &[consts::IAC, consts::WILL, consts::option::SGA]);

        let event = last_event(
            &mut fsm,
            &[
                consts::IAC,
                consts::SB,
                consts::option::STATUS,
                consts::option::status::SEND,
                consts::IAC,
                consts::SE,
            ],
        );
        match event {
            Some(FsmEvent::SubnegotiationReply { option, payload }) => {
                assert_eq!(option, TelnetOption::Status);
                assert_eq!(
                    payload,
                    vec![
                        consts::option::status::IS,
                        consts::WILL,
                        consts::option::ECHO,
                        consts::DO,
                        consts::option::SGA,
                    ]
                );
            }
            other => panic!("expected STATUS IS reply, got {other:?}"),
        }
    }

    #[test]
    fn status_send_without_local_status_is_dropped() {
        // STATUS registered and remotely enabled only.
        let mut fsm = fsm_with(&[(
            TelnetOption::Status,
            OptionDescriptor::both().with_subnegotiation(DEFAULT_MAX_SUBNEGOTIATION_SIZE),
        )]);
        feed(&mut fsm, &[consts::IAC, consts::WILL, consts::option::STATUS]);
        let event = last_event(
            &mut fsm,
            &[
                consts::IAC,
                consts::SB,
                consts::option::STATUS,
                consts::option::status::SEND,
                consts::IAC,
                consts::SE,
            ],
        );
        assert!(event.is_none());
    }

    #[test]
    fn status_is_goes_to_the_application() {
        let mut fsm = fsm_with(&[(
            TelnetOption::Status,
            OptionDescriptor::both().with_subnegotiation(DEFAULT_MAX_SUBNEGOTIATION_SIZE),
        )]);
        // Remote STATUS enabled (peer sends WILL STATUS).
        feed(&mut fsm, &[consts::IAC, consts::WILL, consts::option::STATUS]);
        let event = last_event(
            &mut fsm,
            &[
                consts::IAC,
                consts::SB,
                consts::option::STATUS,
                consts::option::status::IS,
                consts::WILL,
                consts::option::ECHO,
                consts::IAC,
                consts::SE,
            ],
        );
        match event {
            Some(FsmEvent::Subnegotiation { option, payload }) => {
                assert_eq!(option, TelnetOption::Status);
                assert_eq!(
                    payload,
                    vec![consts::option::status::IS, consts::WILL, consts::option::ECHO]
                );
            }
            other => panic!("expected delivery to handler, got {other:?}"),
        }
    }

    #[test]
    fn empty_status_subnegotiation_is_dropped() {
        let mut fsm = status_fsm();
        let event = last_event(
            &mut fsm,
            &[
                consts::IAC,
                consts::SB,
                consts::option::STATUS,
                consts::IAC,
                consts::SE,
            ],
        );
        assert!(event.is_none());
    }

    #[test]
    fn wont_in_yes_fires_disable_with_agreement() {
        let mut fsm = fsm_with(&[(TelnetOption::Echo, OptionDescriptor::remote())]);
        feed(&mut fsm, &[consts::IAC, consts::WILL, consts::option::ECHO]);
        assert!(fsm.enabled(TelnetOption::Echo, Direction::Remote));

        let event = last_event(&mut fsm, &[consts::IAC, consts::WONT, consts::option::ECHO]);
        match event {
            Some(FsmEvent::OptionDisabled {
                option,
                direction,
                reply: Some(reply),
            }) => {
                assert_eq!(option, TelnetOption::Echo);
                assert_eq!(direction, Direction::Remote);
                assert_eq!(reply.to_bytes(), [consts::IAC, consts::DONT, 0x01]);
            }
            other => panic!("expected OptionDisabled, got {other:?}"),
        }
        assert!(fsm.status(TelnetOption::Echo).disabled(Direction::Remote));
    }
}
