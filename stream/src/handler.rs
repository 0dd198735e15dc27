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

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use telnetry_protocol::{Direction, TelnetOption};
use tracing::debug;

/// Application callbacks for one registered option.
///
/// All methods have default implementations that do nothing, so a handler
/// implements only what its option needs.
///
/// # Example
///
/// ```no_run
/// use async_trait::async_trait;
/// use telnetry_protocol::{Direction, TelnetOption};
/// use telnetry_stream::OptionHandler;
///
/// struct TerminalTypeHandler;
///
/// #[async_trait]
/// impl OptionHandler for TerminalTypeHandler {
///     async fn on_subnegotiation(&self, _option: TelnetOption, payload: Vec<u8>) -> Vec<u8> {
///         // SEND (0x01) asks for our terminal name: answer IS "XTERM".
///         if payload.first() == Some(&0x01) {
///             let mut reply = vec![0x00];
///             reply.extend_from_slice(b"XTERM");
///             reply
///         } else {
///             Vec::new()
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait OptionHandler: Send + Sync + 'static {
    /// Called when the option settles enabled in `direction`.
    fn on_enable(&self, _option: TelnetOption, _direction: Direction) {}

    /// Called when the option settles disabled in `direction`. The stream
    /// awaits this before the disablement is considered complete, so the
    /// option's effects can be torn down here.
    async fn on_disable(&self, _option: TelnetOption, _direction: Direction) {}

    /// Called with an inbound subnegotiation payload. A non-empty return
    /// value is written back as a subnegotiation of the same option; an
    /// empty one suppresses the reply frame.
    async fn on_subnegotiation(&self, _option: TelnetOption, _payload: Vec<u8>) -> Vec<u8> {
        Vec::new()
    }
}

///
/// Maps option identifiers to application handlers.
///
/// This is behavior only; which options are *recognized* lives in the
/// [`OptionRegistry`] the protocol engine consults. An option without a
/// handler negotiates normally and gets default no-op callbacks.
///
/// [`OptionRegistry`]: telnetry_protocol::OptionRegistry
///
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<u8, Arc<dyn OptionHandler>>>,
}

impl HandlerRegistry {
    /// Creates an empty handler registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `option`, replacing any previous one.
    pub fn register(&self, option: TelnetOption, handler: Arc<dyn OptionHandler>) {
        self.handlers
            .write()
            .expect("handler registry poisoned")
            .insert(option.to_u8(), handler);
    }

    fn get(&self, option: TelnetOption) -> Option<Arc<dyn OptionHandler>> {
        self.handlers
            .read()
            .expect("handler registry poisoned")
            .get(&option.to_u8())
            .cloned()
    }

    /// Fires the on-enable callback for `option`, if one is registered.
    pub fn on_enable(&self, option: TelnetOption, direction: Direction) {
        if let Some(handler) = self.get(option) {
            handler.on_enable(option, direction);
        } else {
            debug!(%option, %direction, "option enabled with no handler registered");
        }
    }

    /// Awaits the on-disable callback for `option`, if one is registered.
    pub async fn on_disable(&self, option: TelnetOption, direction: Direction) {
        if let Some(handler) = self.get(option) {
            handler.on_disable(option, direction).await;
        }
    }

    /// Awaits the subnegotiation callback for `option`. Without a handler
    /// the payload is dropped and no reply is produced.
    pub async fn on_subnegotiation(&self, option: TelnetOption, payload: Vec<u8>) -> Vec<u8> {
        if let Some(handler) = self.get(option) {
            handler.on_subnegotiation(option, payload).await
        } else {
            debug!(%option, "subnegotiation payload dropped: no handler registered");
            Vec::new()
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handlers = self.handlers.read().expect("handler registry poisoned");
        let mut options: Vec<u8> = handlers.keys().copied().collect();
        options.sort_unstable();
        f.debug_struct("HandlerRegistry")
            .field("options", &options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Recording {
        enabled: AtomicBool,
        disabled: AtomicBool,
    }

    #[async_trait]
    impl OptionHandler for Recording {
        fn on_enable(&self, _option: TelnetOption, _direction: Direction) {
            self.enabled.store(true, Ordering::Relaxed);
        }
        async fn on_disable(&self, _option: TelnetOption, _direction: Direction) {
            self.disabled.store(true, Ordering::Relaxed);
        }
        async fn on_subnegotiation(&self, _option: TelnetOption, payload: Vec<u8>) -> Vec<u8> {
            payload
        }
    }

    #[tokio::test]
    async fn dispatch_reaches_registered_handler() {
        let registry = HandlerRegistry::new();
        let handler = Arc::new(Recording {
            enabled: AtomicBool::new(false),
            disabled: AtomicBool::new(false),
        });
        registry.register(TelnetOption::Echo, handler.clone());

        registry.on_enable(TelnetOption::Echo, Direction::Remote);
        assert!(handler.enabled.load(Ordering::Relaxed));

        registry.on_disable(TelnetOption::Echo, Direction::Remote).await;
        assert!(handler.disabled.load(Ordering::Relaxed));

        let reply = registry
            .on_subnegotiation(TelnetOption::Echo, vec![1, 2, 3])
            .await;
        assert_eq!(reply, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn missing_handler_is_a_no_op() {
        let registry = HandlerRegistry::new();
        registry.on_enable(TelnetOption::Echo, Direction::Local);
        registry.on_disable(TelnetOption::Echo, Direction::Local).await;
        let reply = registry
            .on_subnegotiation(TelnetOption::Echo, vec![9])
            .await;
        assert!(reply.is_empty());
    }
}
