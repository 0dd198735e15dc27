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

//! Stream configuration.

use bytes::Bytes;
use std::sync::Arc;
use telnetry_protocol::{FsmConfig, OptionRegistry, TelnetOption};

/// Default size of a single transport read into the staging buffer.
pub const DEFAULT_READ_BLOCK_SIZE: usize = 4096;

///
/// Construction-time configuration of a [`TelnetStream`].
///
/// Wraps the protocol engine's [`FsmConfig`] (registry, AYT response,
/// unknown-option callback) and adds the transport read hint.
///
/// [`TelnetStream`]: crate::TelnetStream
///
#[derive(Debug)]
pub struct StreamConfig {
    fsm: FsmConfig,
    read_block_size: usize,
}

impl StreamConfig {
    /// Creates a config over `registry` with defaults everywhere else.
    pub fn new(registry: Arc<OptionRegistry>) -> Self {
        StreamConfig {
            fsm: FsmConfig::new(registry),
            read_block_size: DEFAULT_READ_BLOCK_SIZE,
        }
    }

    /// Wraps an already-built [`FsmConfig`].
    pub fn from_fsm_config(fsm: FsmConfig) -> Self {
        StreamConfig {
            fsm,
            read_block_size: DEFAULT_READ_BLOCK_SIZE,
        }
    }

    /// Replaces the canned reply sent for an inbound `AYT`.
    pub fn with_ayt_response(mut self, response: impl Into<Bytes>) -> Self {
        self.fsm = self.fsm.with_ayt_response(response);
        self
    }

    /// Installs a callback for negotiation of unregistered options.
    pub fn with_unknown_option_handler(
        mut self,
        handler: impl Fn(TelnetOption) + Send + Sync + 'static,
    ) -> Self {
        self.fsm = self.fsm.with_unknown_option_handler(handler);
        self
    }

    /// Sets the transport read hint.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn with_read_block_size(mut self, size: usize) -> Self {
        assert!(size > 0, "read block size must be nonzero");
        self.read_block_size = size;
        self
    }

    /// The transport read hint.
    pub fn read_block_size(&self) -> usize {
        self.read_block_size
    }

    pub(crate) fn into_fsm_config(self) -> (FsmConfig, usize) {
        (self.fsm, self.read_block_size)
    }
}
