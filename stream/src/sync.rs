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

//! Blocking façade over the asynchronous stream.
//!
//! Each operation drives the async twin on a private current-thread
//! runtime and blocks the calling thread until it completes. Synchronous
//! I/O inherently scales poorly; the runtime overhead is minimal next to
//! blocking network latency.

use crate::{
    HandlerRegistry, ReadOutcome, StreamConfig, TelnetError, TelnetStream, Transport, UrgentWatch,
};
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use telnetry_protocol::{Direction, Negotiation, TelnetCommand, TelnetOption};

///
/// A blocking wrapper around [`TelnetStream`].
///
/// Owns a private single-threaded runtime; every method is the blocking
/// twin of the identically-named async operation. The `*_caught` variants
/// additionally convert panics (from handler callbacks or allocation
/// failure paths) into [`TelnetError::Internal`] with zero bytes
/// transferred.
///
pub struct BlockingTelnetStream<T, U> {
    inner: TelnetStream<T, U>,
    runtime: tokio::runtime::Runtime,
}

impl<T, U> BlockingTelnetStream<T, U>
where
    T: Transport,
    U: UrgentWatch,
{
    /// Wraps `transport` with a freshly-built current-thread runtime.
    pub fn new(
        transport: T,
        urgent_watch: U,
        handlers: Arc<HandlerRegistry>,
        config: StreamConfig,
    ) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(BlockingTelnetStream {
            inner: TelnetStream::new(transport, urgent_watch, handlers, config),
            runtime,
        })
    }

    /// The wrapped asynchronous stream.
    pub fn get_ref(&self) -> &TelnetStream<T, U> {
        &self.inner
    }

    /// Blocking twin of [`TelnetStream::read_some`].
    pub fn read_some(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, TelnetError> {
        let inner = &mut self.inner;
        self.runtime.block_on(inner.read_some(buf))
    }

    /// Blocking twin of [`TelnetStream::write_some`].
    pub fn write_some(&mut self, data: &[u8]) -> Result<usize, TelnetError> {
        let inner = &mut self.inner;
        self.runtime.block_on(inner.write_some(data))
    }

    /// Blocking twin of [`TelnetStream::write_raw`].
    pub fn write_raw(&mut self, data: &[u8]) -> Result<usize, TelnetError> {
        let inner = &mut self.inner;
        self.runtime.block_on(inner.write_raw(data))
    }

    /// Blocking twin of [`TelnetStream::write_command`].
    pub fn write_command(&mut self, command: TelnetCommand) -> Result<usize, TelnetError> {
        let inner = &mut self.inner;
        self.runtime.block_on(inner.write_command(command))
    }

    /// Blocking twin of [`TelnetStream::write_negotiation`].
    pub fn write_negotiation(&mut self, negotiation: Negotiation) -> Result<usize, TelnetError> {
        let inner = &mut self.inner;
        self.runtime.block_on(inner.write_negotiation(negotiation))
    }

    /// Blocking twin of [`TelnetStream::write_subnegotiation`].
    pub fn write_subnegotiation(
        &mut self,
        option: TelnetOption,
        payload: &[u8],
    ) -> Result<usize, TelnetError> {
        let inner = &mut self.inner;
        self.runtime
            .block_on(inner.write_subnegotiation(option, payload))
    }

    /// Blocking twin of [`TelnetStream::send_synch`].
    pub fn send_synch(&mut self) -> Result<usize, TelnetError> {
        let inner = &mut self.inner;
        self.runtime.block_on(inner.send_synch())
    }

    /// Blocking twin of [`TelnetStream::request_option`].
    pub fn request_option(
        &mut self,
        option: TelnetOption,
        direction: Direction,
    ) -> Result<usize, TelnetError> {
        let inner = &mut self.inner;
        self.runtime.block_on(inner.request_option(option, direction))
    }

    /// Blocking twin of [`TelnetStream::disable_option`].
    pub fn disable_option(
        &mut self,
        option: TelnetOption,
        direction: Direction,
    ) -> Result<usize, TelnetError> {
        let inner = &mut self.inner;
        self.runtime.block_on(inner.disable_option(option, direction))
    }

    /// Like [`read_some`], but panics are caught and surfaced as
    /// [`TelnetError::Internal`] with zero bytes transferred.
    ///
    /// [`read_some`]: BlockingTelnetStream::read_some
    pub fn read_some_caught(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, TelnetError> {
        catch_unwind(AssertUnwindSafe(|| self.read_some(buf)))
            .unwrap_or_else(|panic| Err(TelnetError::Internal(panic_message(&panic))))
    }

    /// Like [`write_some`], but panics are caught and surfaced as
    /// [`TelnetError::Internal`] with zero bytes transferred.
    ///
    /// [`write_some`]: BlockingTelnetStream::write_some
    pub fn write_some_caught(&mut self, data: &[u8]) -> Result<usize, TelnetError> {
        catch_unwind(AssertUnwindSafe(|| self.write_some(data)))
            .unwrap_or_else(|panic| Err(TelnetError::Internal(panic_message(&panic))))
    }
}

impl<T, U> std::fmt::Debug for BlockingTelnetStream<T, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingTelnetStream")
            .field("inner", &self.inner)
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "operation panicked".to_string()
    }
}
