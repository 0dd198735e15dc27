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

use crate::{OptionRegistry, TelnetOption};
use bytes::Bytes;
use std::sync::Arc;

/// Callback invoked when a peer negotiates an option absent from the
/// registry. When unset, the engine logs `option_not_available` instead.
pub type UnknownOptionHandler = Box<dyn Fn(TelnetOption) + Send + Sync>;

///
/// Construction-time configuration of a [`ProtocolFsm`].
///
/// A small record passed by value at construction: the shared option
/// registry, the canned Are-You-There response, and the optional
/// unknown-option callback. There is no global state; two streams with
/// different configs coexist in one process.
///
/// [`ProtocolFsm`]: crate::ProtocolFsm
///
pub struct FsmConfig {
    registry: Arc<OptionRegistry>,
    ayt_response: Bytes,
    unknown_option: Option<UnknownOptionHandler>,
}

impl FsmConfig {
    /// Creates a config over `registry` with the default AYT response and
    /// no unknown-option callback.
    pub fn new(registry: Arc<OptionRegistry>) -> Self {
        FsmConfig {
            registry,
            ayt_response: Bytes::from_static(b"[YES]\r\n"),
            unknown_option: None,
        }
    }

    /// Replaces the canned reply sent for an inbound `AYT`.
    pub fn with_ayt_response(mut self, response: impl Into<Bytes>) -> Self {
        self.ayt_response = response.into();
        self
    }

    /// Installs a callback for negotiation of unregistered options.
    pub fn with_unknown_option_handler(
        mut self,
        handler: impl Fn(TelnetOption) + Send + Sync + 'static,
    ) -> Self {
        self.unknown_option = Some(Box::new(handler));
        self
    }

    /// The shared option registry.
    pub fn registry(&self) -> &Arc<OptionRegistry> {
        &self.registry
    }

    /// The canned Are-You-There response.
    pub fn ayt_response(&self) -> &Bytes {
        &self.ayt_response
    }

    pub(crate) fn notify_unknown_option(&self, option: TelnetOption) -> bool {
        if let Some(handler) = &self.unknown_option {
            handler(option);
            true
        } else {
            false
        }
    }
}

impl std::fmt::Debug for FsmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsmConfig")
            .field("registry", &self.registry)
            .field("ayt_response", &self.ayt_response)
            .field(
                "unknown_option",
                &self.unknown_option.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}
