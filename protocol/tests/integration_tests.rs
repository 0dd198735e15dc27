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

//! End-to-end protocol engine scenarios: two engines wired back to back,
//! with every outbound reaction fed to the other side.

use std::sync::Arc;
use telnetry_protocol::{
    consts, Direction, FsmConfig, FsmEvent, OptionDescriptor, OptionRegistry, ProcessStatus,
    ProtocolFsm, Signal, TelnetOption,
};

/// A peer wrapping an engine with byte queues, collecting forwarded data
/// and delivered subnegotiations.
struct Peer {
    fsm: ProtocolFsm,
    outbox: Vec<u8>,
    data: Vec<u8>,
    subnegotiations: Vec<(TelnetOption, Vec<u8>)>,
}

impl Peer {
    fn new(entries: &[(TelnetOption, OptionDescriptor)]) -> Self {
        let registry = Arc::new(OptionRegistry::new());
        for (option, descriptor) in entries {
            registry.register(*option, *descriptor);
        }
        Peer {
            fsm: ProtocolFsm::new(FsmConfig::new(registry)),
            outbox: Vec::new(),
            data: Vec::new(),
            subnegotiations: Vec::new(),
        }
    }

    fn feed(&mut self, bytes: &[u8]) -> Vec<Signal> {
        let mut signals = Vec::new();
        for &byte in bytes {
            let outcome = self.fsm.process_byte(byte);
            if outcome.forward {
                self.data.push(byte);
            }
            if let ProcessStatus::Signal(signal) = outcome.status {
                signals.push(signal);
            }
            if let Some(event) = outcome.event {
                self.perform(event);
            }
        }
        signals
    }

    fn perform(&mut self, event: FsmEvent) {
        match event {
            FsmEvent::Negotiation(neg) => self.outbox.extend(neg.to_bytes()),
            FsmEvent::AytReply(bytes) => self.outbox.extend_from_slice(&bytes),
            FsmEvent::OptionEnabled { reply, .. } | FsmEvent::OptionDisabled { reply, .. } => {
                if let Some(neg) = reply {
                    self.outbox.extend(neg.to_bytes());
                }
            }
            FsmEvent::Subnegotiation { option, payload } => {
                self.subnegotiations.push((option, payload));
            }
            FsmEvent::SubnegotiationReply { option, payload } => {
                // Frame the pre-escaped payload verbatim.
                self.outbox
                    .extend([consts::IAC, consts::SB, option.to_u8()]);
                self.outbox.extend_from_slice(&payload);
                self.outbox.extend([consts::IAC, consts::SE]);
            }
        }
    }

    fn take_outbox(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbox)
    }
}

/// Shuttles bytes between the two peers until both queues drain.
fn settle(a: &mut Peer, b: &mut Peer) {
    for _ in 0..32 {
        let to_b = a.take_outbox();
        let to_a = b.take_outbox();
        if to_b.is_empty() && to_a.is_empty() {
            return;
        }
        b.feed(&to_b);
        a.feed(&to_a);
    }
    panic!("negotiation did not settle");
}

#[test]
fn echo_bring_up() {
    // Peer sends WILL ECHO; we have ECHO registered supports-remote.
    let mut us = Peer::new(&[(TelnetOption::Echo, OptionDescriptor::remote())]);
    us.feed(&[consts::IAC, consts::WILL, consts::option::ECHO]);

    assert_eq!(us.take_outbox(), vec![consts::IAC, consts::DO, 0x01]);
    assert!(us.fsm.enabled(TelnetOption::Echo, Direction::Remote));
}

#[test]
fn unregistered_option_refused() {
    let mut us = Peer::new(&[]);
    us.feed(&[consts::IAC, consts::DO, 0x63]);

    assert_eq!(us.take_outbox(), vec![consts::IAC, consts::WONT, 0x63]);
    assert!(us.fsm.registry().get(TelnetOption::Unknown(0x63)).is_none());
}

#[test]
fn simultaneous_requests_converge_enabled() {
    let both = &[(TelnetOption::TransmitBinary, OptionDescriptor::both())][..];
    let mut a = Peer::new(both);
    let mut b = Peer::new(both);

    if let Some(neg) = a
        .fsm
        .request_option(TelnetOption::TransmitBinary, Direction::Local)
        .unwrap()
    {
        a.outbox.extend(neg.to_bytes());
    }
    if let Some(neg) = b
        .fsm
        .request_option(TelnetOption::TransmitBinary, Direction::Remote)
        .unwrap()
    {
        b.outbox.extend(neg.to_bytes());
    }
    settle(&mut a, &mut b);

    assert!(a.fsm.enabled(TelnetOption::TransmitBinary, Direction::Local));
    assert!(b.fsm.enabled(TelnetOption::TransmitBinary, Direction::Remote));
}

#[test]
fn enable_disable_cycle_converges_disabled() {
    let both = &[(TelnetOption::SuppressGoAhead, OptionDescriptor::both())][..];
    let mut a = Peer::new(both);
    let mut b = Peer::new(both);

    if let Some(neg) = a
        .fsm
        .request_option(TelnetOption::SuppressGoAhead, Direction::Remote)
        .unwrap()
    {
        a.outbox.extend(neg.to_bytes());
    }
    settle(&mut a, &mut b);
    assert!(a.fsm.enabled(TelnetOption::SuppressGoAhead, Direction::Remote));
    assert!(b.fsm.enabled(TelnetOption::SuppressGoAhead, Direction::Local));

    let outcome = a
        .fsm
        .disable_option(TelnetOption::SuppressGoAhead, Direction::Remote)
        .unwrap();
    a.outbox.extend(outcome.negotiation.unwrap().to_bytes());
    settle(&mut a, &mut b);

    assert!(a
        .fsm
        .status(TelnetOption::SuppressGoAhead)
        .disabled(Direction::Remote));
    assert!(b
        .fsm
        .status(TelnetOption::SuppressGoAhead)
        .disabled(Direction::Local));
}

#[test]
fn status_round_trip_between_peers() {
    let entries = &[
        (
            TelnetOption::Status,
            OptionDescriptor::both().with_subnegotiation(256),
        ),
        (TelnetOption::Echo, OptionDescriptor::both()),
    ][..];
    let mut a = Peer::new(entries);
    let mut b = Peer::new(entries);

    // B performs STATUS; A asks B to (DO STATUS from A's side).
    if let Some(neg) = a
        .fsm
        .request_option(TelnetOption::Status, Direction::Remote)
        .unwrap()
    {
        a.outbox.extend(neg.to_bytes());
    }
    settle(&mut a, &mut b);
    assert!(b.fsm.enabled(TelnetOption::Status, Direction::Local));

    // B also echoes (A sends DO ECHO -> B locally enabled).
    if let Some(neg) = a
        .fsm
        .request_option(TelnetOption::Echo, Direction::Remote)
        .unwrap()
    {
        a.outbox.extend(neg.to_bytes());
    }
    settle(&mut a, &mut b);

    // A must have STATUS remotely enabled to accept the IS answer.
    assert!(a.fsm.enabled(TelnetOption::Status, Direction::Remote));

    // A asks for B's status report.
    a.outbox.extend([
        consts::IAC,
        consts::SB,
        consts::option::STATUS,
        consts::option::status::SEND,
        consts::IAC,
        consts::SE,
    ]);
    settle(&mut a, &mut b);

    // B's report: ECHO locally enabled; STATUS itself omitted; nothing is
    // enabled on B's remote side.
    let (option, payload) = a.subnegotiations.pop().expect("IS delivered");
    assert_eq!(option, TelnetOption::Status);
    assert_eq!(
        payload,
        vec![consts::option::status::IS, consts::WILL, consts::option::ECHO]
    );
}

#[test]
fn status_is_payload_doubles_iac_and_se_ids() {
    let entries = &[
        (
            TelnetOption::Status,
            OptionDescriptor::both().with_subnegotiation(256),
        ),
        (TelnetOption::Unknown(consts::SE), OptionDescriptor::both()),
        (TelnetOption::ExtendedOptions, OptionDescriptor::both()),
    ][..];
    let mut us = Peer::new(entries);

    // Locally enable STATUS plus the two options whose ids collide with
    // command bytes (240 and 255).
    us.feed(&[consts::IAC, consts::DO, consts::option::STATUS]);
    us.feed(&[consts::IAC, consts::DO, consts::SE]);
    us.feed(&[consts::IAC, consts::DO, consts::option::EXOPL]);
    us.take_outbox();

    us.feed(&[
        consts::IAC,
        consts::SB,
        consts::option::STATUS,
        consts::option::status::SEND,
        consts::IAC,
        consts::SE,
    ]);
    let reply = us.take_outbox();

    // IAC SB STATUS IS WILL 240 240 WILL 255 255 IAC SE.
    assert_eq!(
        reply,
        vec![
            consts::IAC,
            consts::SB,
            consts::option::STATUS,
            consts::option::status::IS,
            consts::WILL,
            consts::SE,
            consts::SE,
            consts::WILL,
            consts::IAC,
            consts::IAC,
            consts::IAC,
            consts::SE,
        ]
    );
}

#[test]
fn data_and_commands_interleave() {
    let mut us = Peer::new(&[(TelnetOption::Echo, OptionDescriptor::remote())]);
    let signals = us.feed(b"login:");
    assert!(signals.is_empty());
    us.feed(&[consts::IAC, consts::WILL, consts::option::ECHO]);
    let signals = us.feed(b"password:");
    assert!(signals.is_empty());

    assert_eq!(us.data, b"login:password:");
    assert_eq!(us.take_outbox(), vec![consts::IAC, consts::DO, 0x01]);
}

#[test]
fn line_discipline_signals() {
    let mut us = Peer::new(&[]);
    let signals = us.feed(b"abc\r\n");
    assert_eq!(signals, vec![Signal::EndOfLine]);
    // The CR itself is suppressed; the LF is forwarded.
    assert_eq!(us.data, b"abc\n");

    us.data.clear();
    let signals = us.feed(&[b'x', consts::CR, consts::NUL, b'y']);
    assert_eq!(signals, vec![Signal::CarriageReturn]);
    // The adapter reinserts the CR; at this layer only x and y forward.
    assert_eq!(us.data, b"xy");
}

#[test]
fn control_commands_surface_as_signals() {
    let mut us = Peer::new(&[]);
    assert_eq!(us.feed(&[consts::IAC, consts::IP]), vec![Signal::InterruptProcess]);
    assert_eq!(us.feed(&[consts::IAC, consts::BRK]), vec![Signal::Break]);
    assert_eq!(us.feed(&[consts::IAC, consts::EC]), vec![Signal::EraseCharacter]);
    assert_eq!(us.feed(&[consts::IAC, consts::EL]), vec![Signal::EraseLine]);
    assert_eq!(us.feed(&[consts::IAC, consts::AO]), vec![Signal::AbortOutput]);
    assert_eq!(us.feed(&[consts::IAC, consts::DM]), vec![Signal::DataMark]);
    // NOP produces nothing at all.
    assert_eq!(us.feed(&[consts::IAC, consts::NOP]), vec![]);
}

#[test]
fn ayt_reply_round_trip() {
    let registry = Arc::new(OptionRegistry::new());
    let config = FsmConfig::new(registry).with_ayt_response(&b"YES\r\n"[..]);
    let mut fsm = ProtocolFsm::new(config);

    let mut reply = None;
    for byte in [consts::IAC, consts::AYT] {
        if let Some(FsmEvent::AytReply(bytes)) = fsm.process_byte(byte).event {
            reply = Some(bytes);
        }
    }
    assert_eq!(reply.as_deref(), Some(&b"YES\r\n"[..]));
}

#[test]
fn terminal_type_subnegotiation_with_escapes() {
    // S6: IAC SB TTYPE IAC IAC 0x01 IAC SE delivers 0xFF 0x01.
    let mut us = Peer::new(&[(
        TelnetOption::TerminalType,
        OptionDescriptor::both().with_subnegotiation(64),
    )]);
    us.feed(&[consts::IAC, consts::WILL, consts::option::TTYPE]);
    us.take_outbox();

    us.feed(&[
        consts::IAC,
        consts::SB,
        consts::option::TTYPE,
        consts::IAC,
        consts::IAC,
        0x01,
        consts::IAC,
        consts::SE,
    ]);
    assert_eq!(
        us.subnegotiations,
        vec![(TelnetOption::TerminalType, vec![0xFF, 0x01])]
    );
}
