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

//! Correlation of TCP urgent notifications with in-band `IAC DM`.
//!
//! One Telnet `Synch` produces two independent events: the transport's
//! urgent-data notification and the `IAC DM` in the byte stream. Either
//! may arrive first depending on the peer's stack and timing; the tracker
//! reconciles them with a single three-state atomic. It is the only object
//! shared between the stream pipeline and the urgent watcher task.

use std::sync::atomic::{AtomicU8, Ordering};
use tracing::{debug, error, warn};

/// State of the urgent-data correlation machine.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum UrgentState {
    /// No `Synch` is in progress.
    NoUrgent = 0,
    /// The urgent notification arrived; data is being discarded until the
    /// matching `DM` is consumed.
    HasUrgent = 1,
    /// A `DM` was consumed before its urgent notification arrived.
    UnexpectedDataMark = 2,
}

impl UrgentState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => UrgentState::NoUrgent,
            1 => UrgentState::HasUrgent,
            _ => UrgentState::UnexpectedDataMark,
        }
    }
}

///
/// Atomic three-state tracker for TCP urgent data.
///
/// Both transitions run compare-and-set loops with release ordering on
/// success and relaxed loads, so the pipeline observes a completed
/// transition from the watcher task and vice versa.
///
#[derive(Debug, Default)]
pub struct UrgentDataTracker {
    state: AtomicU8,
}

impl UrgentDataTracker {
    /// Creates a tracker in [`UrgentState::NoUrgent`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The current state.
    pub fn state(&self) -> UrgentState {
        UrgentState::from_u8(self.state.load(Ordering::Relaxed))
    }

    /// Whether inbound data bytes are currently discarded per the `Synch`
    /// discipline.
    pub fn discarding(&self) -> bool {
        self.state() == UrgentState::HasUrgent
    }

    /// Records the transport's urgent-data notification.
    pub fn saw_urgent(&self) {
        loop {
            let current = self.state.load(Ordering::Relaxed);
            let desired = match UrgentState::from_u8(current) {
                UrgentState::NoUrgent => {
                    // The notification arrived first; start discarding.
                    UrgentState::HasUrgent
                }
                UrgentState::UnexpectedDataMark => {
                    // The DM arrived first; this is the late notification
                    // for a Synch that already completed.
                    debug!("urgent notification after its DM; Synch already complete");
                    UrgentState::NoUrgent
                }
                UrgentState::HasUrgent => {
                    // Cannot happen without a reentrant urgent wait.
                    error!(
                        "urgent notification while urgent data already pending; \
                         reentrant urgent wait"
                    );
                    return;
                }
            };
            if self
                .state
                .compare_exchange(current, desired as u8, Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
        }
    }

    /// Records consumption of an in-band `IAC DM`.
    pub fn saw_data_mark(&self) {
        loop {
            let current = self.state.load(Ordering::Relaxed);
            let desired = match UrgentState::from_u8(current) {
                UrgentState::HasUrgent => {
                    // The expected pairing; the Synch is complete.
                    UrgentState::NoUrgent
                }
                UrgentState::NoUrgent => {
                    // Normal on stacks that deliver the data before the
                    // urgent notification.
                    warn!("DM arrived without or before the urgent notification");
                    UrgentState::UnexpectedDataMark
                }
                UrgentState::UnexpectedDataMark => {
                    // The peer sent two DMs in quick succession. Safe:
                    // keep waiting for the one notification.
                    warn!("subsequent DM while expecting the urgent notification");
                    return;
                }
            };
            if self
                .state
                .compare_exchange(current, desired as u8, Ordering::Release, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
        }
    }
}
