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

//! Per-option negotiation status per the [RFC 1143] "Q Method".
//!
//! Each option tracks one `(state, queue bit)` pair per direction. The four
//! states are `NO`, `WANTYES`, `WANTNO`, `YES`; the queue bit records a
//! pending request for the opposite of what is currently being negotiated.
//! Only `WANTYES/OPPOSITE` and `WANTNO/OPPOSITE` carry a set queue bit;
//! the bit is cleared whenever a direction settles in `NO` or `YES`.
//!
//! [RFC 1143]: https://tools.ietf.org/html/rfc1143

use crate::{Direction, ProtocolError, TelnetOption};

/// The four Q-Method negotiation states of one direction of one option.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum QState {
    /// The option is disabled and no negotiation is in flight.
    #[default]
    No,
    /// We asked for the option to be enabled and await the answer.
    WantYes,
    /// We asked for the option to be disabled and await the answer.
    WantNo,
    /// The option is enabled.
    Yes,
}

/// The Q-Method queue bit of one direction of one option.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum QueueBit {
    /// No queued request.
    #[default]
    Empty,
    /// A request for the opposite of the in-flight negotiation is queued.
    Opposite,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct DirectionStatus {
    state: QState,
    queue: QueueBit,
}

///
/// Q-Method status of a single option, both directions tracked independently.
///
/// Invariants:
/// - the queue bit is [`QueueBit::Empty`] whenever the state is
///   [`QState::No`] or [`QState::Yes`];
/// - [`enqueue`] only succeeds from `WANTYES/EMPTY` or `WANTNO/EMPTY`.
///
/// [`enqueue`]: OptionStatus::enqueue
///
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct OptionStatus {
    local: DirectionStatus,
    remote: DirectionStatus,
}

impl OptionStatus {
    fn dir(&self, direction: Direction) -> &DirectionStatus {
        match direction {
            Direction::Local => &self.local,
            Direction::Remote => &self.remote,
        }
    }

    fn dir_mut(&mut self, direction: Direction) -> &mut DirectionStatus {
        match direction {
            Direction::Local => &mut self.local,
            Direction::Remote => &mut self.remote,
        }
    }

    /// The current state in `direction`.
    pub fn state(&self, direction: Direction) -> QState {
        self.dir(direction).state
    }

    /// Whether the option is enabled (`YES`) in `direction`.
    pub fn enabled(&self, direction: Direction) -> bool {
        self.dir(direction).state == QState::Yes
    }

    /// Whether the option is disabled (`NO`) in `direction`.
    pub fn disabled(&self, direction: Direction) -> bool {
        self.dir(direction).state == QState::No
    }

    /// Whether an enable negotiation is in flight in `direction`.
    pub fn pending_enable(&self, direction: Direction) -> bool {
        self.dir(direction).state == QState::WantYes
    }

    /// Whether a disable negotiation is in flight in `direction`.
    pub fn pending_disable(&self, direction: Direction) -> bool {
        self.dir(direction).state == QState::WantNo
    }

    /// Whether the opposite-request queue bit is set in `direction`.
    pub fn queued(&self, direction: Direction) -> bool {
        self.dir(direction).queue == QueueBit::Opposite
    }

    /// Whether the option is enabled in either direction.
    pub fn is_enabled(&self) -> bool {
        self.local.state == QState::Yes || self.remote.state == QState::Yes
    }

    /// Convenience for [`enabled`] in [`Direction::Local`].
    ///
    /// [`enabled`]: OptionStatus::enabled
    pub fn local_enabled(&self) -> bool {
        self.local.state == QState::Yes
    }

    /// Convenience for [`enabled`] in [`Direction::Remote`].
    ///
    /// [`enabled`]: OptionStatus::enabled
    pub fn remote_enabled(&self) -> bool {
        self.remote.state == QState::Yes
    }

    /// Settles `direction` in `YES`, clearing the queue bit.
    pub fn enable(&mut self, direction: Direction) {
        *self.dir_mut(direction) = DirectionStatus {
            state: QState::Yes,
            queue: QueueBit::Empty,
        };
    }

    /// Settles `direction` in `NO`, clearing the queue bit.
    pub fn disable(&mut self, direction: Direction) {
        *self.dir_mut(direction) = DirectionStatus {
            state: QState::No,
            queue: QueueBit::Empty,
        };
    }

    /// Marks an enable negotiation in flight in `direction`.
    pub fn pend_enable(&mut self, direction: Direction) {
        self.dir_mut(direction).state = QState::WantYes;
    }

    /// Marks a disable negotiation in flight in `direction`.
    pub fn pend_disable(&mut self, direction: Direction) {
        self.dir_mut(direction).state = QState::WantNo;
    }

    /// Sets the opposite-request queue bit in `direction`.
    ///
    /// Fails with [`ProtocolError::NegotiationQueueError`] if the bit is
    /// already set or the direction is not in a `WANT*` state.
    pub fn enqueue(&mut self, option: TelnetOption, direction: Direction) -> Result<(), ProtocolError> {
        let status = self.dir_mut(direction);
        if status.queue == QueueBit::Opposite
            || !matches!(status.state, QState::WantYes | QState::WantNo)
        {
            return Err(ProtocolError::NegotiationQueueError(option));
        }
        status.queue = QueueBit::Opposite;
        Ok(())
    }

    /// Clears the opposite-request queue bit in `direction`.
    pub fn dequeue(&mut self, direction: Direction) {
        self.dir_mut(direction).queue = QueueBit::Empty;
    }

    /// Forces `direction` back to `NO`. Used to recover from an impossible
    /// state combination reported as a protocol violation.
    pub fn reset(&mut self, direction: Direction) {
        self.disable(direction);
    }
}

///
/// Status database indexed by option identifier, one [`OptionStatus`] per
/// possible option byte.
///
pub struct OptionStatusDb {
    entries: Box<[OptionStatus; 256]>,
}

impl OptionStatusDb {
    /// Creates a database with every option disabled in both directions.
    pub fn new() -> Self {
        OptionStatusDb {
            entries: Box::new([OptionStatus::default(); 256]),
        }
    }

    /// The status entry for `option`.
    pub fn entry(&self, option: TelnetOption) -> &OptionStatus {
        &self.entries[option.to_u8() as usize]
    }

    /// The mutable status entry for `option`.
    pub fn entry_mut(&mut self, option: TelnetOption) -> &mut OptionStatus {
        &mut self.entries[option.to_u8() as usize]
    }

    /// Iterates over `(option, status)` pairs in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (TelnetOption, &OptionStatus)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(id, status)| (TelnetOption::from_u8(id as u8), status))
    }
}

impl Default for OptionStatusDb {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OptionStatusDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (option, status) in self.iter() {
            if *status != OptionStatus::default() {
                map.entry(&option, status);
            }
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPT: TelnetOption = TelnetOption::Echo;

    #[test]
    fn default_is_fully_disabled() {
        let status = OptionStatus::default();
        for dir in [Direction::Local, Direction::Remote] {
            assert!(status.disabled(dir));
            assert!(!status.enabled(dir));
            assert!(!status.pending_enable(dir));
            assert!(!status.pending_disable(dir));
            assert!(!status.queued(dir));
        }
        assert!(!status.is_enabled());
    }

    #[test]
    fn directions_are_independent() {
        let mut status = OptionStatus::default();
        status.enable(Direction::Remote);
        assert!(status.enabled(Direction::Remote));
        assert!(status.disabled(Direction::Local));
        assert!(status.is_enabled());
    }

    #[test]
    fn enqueue_requires_pending_state() {
        let mut status = OptionStatus::default();
        assert_eq!(
            status.enqueue(OPT, Direction::Local),
            Err(ProtocolError::NegotiationQueueError(OPT))
        );

        status.pend_enable(Direction::Local);
        assert_eq!(status.enqueue(OPT, Direction::Local), Ok(()));
        assert!(status.queued(Direction::Local));

        // Double enqueue is refused.
        assert_eq!(
            status.enqueue(OPT, Direction::Local),
            Err(ProtocolError::NegotiationQueueError(OPT))
        );
    }

    #[test]
    fn settling_clears_the_queue_bit() {
        let mut status = OptionStatus::default();
        status.pend_disable(Direction::Remote);
        status.enqueue(OPT, Direction::Remote).unwrap();
        assert!(status.queued(Direction::Remote));

        status.enable(Direction::Remote);
        assert!(!status.queued(Direction::Remote));

        status.pend_enable(Direction::Remote);
        status.enqueue(OPT, Direction::Remote).unwrap();
        status.disable(Direction::Remote);
        assert!(!status.queued(Direction::Remote));
    }

    #[test]
    fn db_entries_are_per_option() {
        let mut db = OptionStatusDb::new();
        db.entry_mut(TelnetOption::Echo).enable(Direction::Remote);
        assert!(db.entry(TelnetOption::Echo).remote_enabled());
        assert!(!db.entry(TelnetOption::TransmitBinary).remote_enabled());
        assert!(!db.entry(TelnetOption::Unknown(200)).is_enabled());
    }
}
