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

//! The asynchronous Telnet stream adapter.
//!
//! [`TelnetStream`] layers the protocol engine over a [`Transport`]: it
//! drives the parser from a raw staging buffer toward the caller's read
//! window, interleaves the engine's outbound reactions (negotiation
//! replies, `AYT` answers, subnegotiation replies) with application reads,
//! escapes outbound data, and implements the Telnet `Synch` discipline
//! over TCP urgent data.

use crate::{
    HandlerRegistry, StreamConfig, TelnetError, Transport, UrgentDataTracker, UrgentState,
    UrgentWatch,
};
use bytes::{Buf, BufMut, BytesMut};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use telnetry_protocol::{
    consts, Direction, FsmEvent, Negotiation, ProcessStatus, ProtocolError, ProtocolFsm, Signal,
    TelnetCommand, TelnetOption,
};
use tokio::sync::{Mutex as AsyncMutex, Notify};
use tracing::{debug, warn};

/// Why a [`TelnetStream::read_some`] completed.
#[derive(Debug)]
pub enum ReadEnd {
    /// Plain data: the window filled or the buffered input drained.
    Data,
    /// A terminal processing signal. The bytes accumulated before the
    /// signal are in the window.
    Signal(Signal),
    /// A recoverable protocol error. The stream keeps parsing on the next
    /// read.
    Protocol(ProtocolError),
}

/// The result of one [`TelnetStream::read_some`].
#[derive(Debug)]
pub struct ReadOutcome {
    /// Bytes written into the caller's window.
    pub bytes: usize,
    /// Why the operation completed.
    pub end: ReadEnd,
}

impl ReadOutcome {
    /// Whether this is a plain data completion.
    pub fn is_data(&self) -> bool {
        matches!(self.end, ReadEnd::Data)
    }
}

/// State shared with the urgent watcher task.
struct SharedContext {
    urgent: UrgentDataTracker,
    urgent_wait_outstanding: AtomicBool,
    deferred_error: Mutex<Option<io::Error>>,
    closed: Notify,
}

impl SharedContext {
    fn new() -> Self {
        SharedContext {
            urgent: UrgentDataTracker::new(),
            urgent_wait_outstanding: AtomicBool::new(false),
            deferred_error: Mutex::new(None),
            closed: Notify::new(),
        }
    }

    /// Defers `error` for reporting once the buffered byte stream has been
    /// processed. A second error atop a deferred one is logged and dropped.
    fn defer_error(&self, error: io::Error) {
        let mut slot = self.deferred_error.lock().expect("error slot poisoned");
        match slot.as_ref() {
            Some(deferred) => {
                warn!(
                    error = %error,
                    deferred = %deferred,
                    "transport error while another is deferred; dropping the newer one"
                );
            }
            None => *slot = Some(error),
        }
    }

    fn take_deferred_error(&self) -> Option<io::Error> {
        self.deferred_error
            .lock()
            .expect("error slot poisoned")
            .take()
    }
}

///
/// An asynchronous Telnet stream over a reliable byte transport.
///
/// The stream owns the protocol engine, the staging buffers, and the
/// transport handle. All operations take `&mut self`, which enforces the
/// single-reader and single-writer discipline: at most one `read_some` is
/// in flight, and writes — whether application-initiated or engine
/// reactions — are serialized in submission order. The only concurrent
/// collaborator is the urgent watcher task, which communicates through an
/// atomic tracker.
///
/// Cancellation safety: dropping a `read_some` future mid-flight loses no
/// protocol state. Processed bytes are consumed from the staging buffer
/// before every suspension point, so the next `read_some` resumes exactly
/// where the parser stopped; bytes already copied into the abandoned
/// window are not re-delivered.
///
pub struct TelnetStream<T, U> {
    transport: T,
    fsm: ProtocolFsm,
    handlers: Arc<HandlerRegistry>,
    shared: Arc<SharedContext>,
    urgent_watch: Arc<AsyncMutex<U>>,
    /// Raw inbound bytes not yet consumed by the parser.
    input: BytesMut,
    /// Outbound escape staging; `AO` discards whatever is pending here.
    staging: BytesMut,
    /// A forwarded byte that missed a full window (bare-CR reinsertion can
    /// produce two bytes where only one slot remained).
    pending_data: Option<u8>,
    read_block_size: usize,
}

impl<T, U> TelnetStream<T, U>
where
    T: Transport,
    U: UrgentWatch,
{
    ///
    /// Wraps `transport`, enabling out-of-band-inline delivery so urgent
    /// bytes arrive in the main data stream.
    ///
    /// `urgent_watch` is the notification side of the same connection;
    /// `handlers` supplies the application callbacks for registered
    /// options.
    ///
    pub fn new(
        mut transport: T,
        urgent_watch: U,
        handlers: Arc<HandlerRegistry>,
        config: StreamConfig,
    ) -> Self {
        if let Err(error) = transport.set_oob_inline(true) {
            warn!(%error, "failed to enable out-of-band-inline on the transport");
        }
        let (fsm_config, read_block_size) = config.into_fsm_config();
        TelnetStream {
            transport,
            fsm: ProtocolFsm::new(fsm_config),
            handlers,
            shared: Arc::new(SharedContext::new()),
            urgent_watch: Arc::new(AsyncMutex::new(urgent_watch)),
            input: BytesMut::new(),
            staging: BytesMut::new(),
            pending_data: None,
            read_block_size,
        }
    }

    /// The protocol engine, for status queries.
    pub fn fsm(&self) -> &ProtocolFsm {
        &self.fsm
    }

    /// Whether `option` is enabled in `direction`.
    pub fn enabled(&self, option: TelnetOption, direction: Direction) -> bool {
        self.fsm.enabled(option, direction)
    }

    ///
    /// Reads sanitized application bytes into `buf`.
    ///
    /// Completes when the window fills, when the buffered input drains
    /// with at least one byte delivered, or when the parser produces a
    /// terminal signal or protocol error (reported in [`ReadOutcome::end`]
    /// together with the bytes accumulated before it). Transport errors
    /// raised while buffered bytes remained are deferred and surface at
    /// the start of the next call.
    ///
    pub async fn read_some(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, TelnetError> {
        if buf.is_empty() {
            return Ok(ReadOutcome {
                bytes: 0,
                end: ReadEnd::Data,
            });
        }

        let mut written = 0usize;
        if let Some(byte) = self.pending_data.take() {
            buf[written] = byte;
            written += 1;
        }

        loop {
            // Drain buffered input through the parser first.
            while !self.input.is_empty() && written < buf.len() {
                let byte = self.input[0];
                let outcome = self.fsm.process_byte(byte);
                // Consume before any suspension so cancellation cannot
                // re-feed the byte.
                self.input.advance(1);

                match outcome.status {
                    ProcessStatus::Continue => {
                        if outcome.forward && !self.shared.urgent.discarding() {
                            buf[written] = byte;
                            written += 1;
                        }
                    }
                    ProcessStatus::Signal(Signal::CarriageReturn) => {
                        // Reinsert the CR the parser suppressed.
                        buf[written] = consts::CR;
                        written += 1;
                        if outcome.forward && !self.shared.urgent.discarding() {
                            if written < buf.len() {
                                buf[written] = byte;
                                written += 1;
                            } else {
                                self.pending_data = Some(byte);
                            }
                        }
                    }
                    ProcessStatus::Signal(Signal::EraseCharacter) => {
                        if written > 0 {
                            written -= 1;
                        } else {
                            return Ok(ReadOutcome {
                                bytes: written,
                                end: ReadEnd::Signal(Signal::EraseCharacter),
                            });
                        }
                    }
                    ProcessStatus::Signal(Signal::EraseLine) => {
                        if written > 0 {
                            written = 0;
                        } else {
                            return Ok(ReadOutcome {
                                bytes: written,
                                end: ReadEnd::Signal(Signal::EraseLine),
                            });
                        }
                    }
                    ProcessStatus::Signal(Signal::DataMark) => {
                        self.shared.urgent.saw_data_mark();
                        self.launch_urgent_wait();
                    }
                    ProcessStatus::Signal(Signal::AbortOutput) => {
                        // AO discards queued output and answers with a
                        // Synch; the signal completes this read once the
                        // Synch is on the wire.
                        self.staging.clear();
                        if let Err(error) = self.send_synch_frames().await {
                            self.shared.defer_error(error);
                        }
                        return Ok(ReadOutcome {
                            bytes: written,
                            end: ReadEnd::Signal(Signal::AbortOutput),
                        });
                    }
                    ProcessStatus::Signal(signal) => {
                        // Terminal signal: deliver the byte that completed
                        // it (the LF of CR LF), then surface.
                        if outcome.forward && !self.shared.urgent.discarding() {
                            buf[written] = byte;
                            written += 1;
                        }
                        return Ok(ReadOutcome {
                            bytes: written,
                            end: ReadEnd::Signal(signal),
                        });
                    }
                    ProcessStatus::Error(error) => {
                        return Ok(ReadOutcome {
                            bytes: written,
                            end: ReadEnd::Protocol(error),
                        });
                    }
                }

                if let Some(event) = outcome.event {
                    if let Err(error) = self.perform_event(event).await {
                        // A response write failed; keep processing the
                        // buffered bytes and report it later.
                        self.shared.defer_error(error);
                    }
                }
            }

            if written > 0 {
                // Window full, or input drained with progress made.
                return Ok(ReadOutcome {
                    bytes: written,
                    end: ReadEnd::Data,
                });
            }

            // Nothing delivered yet: go to the transport for more bytes.
            if let Some(error) = self.shared.take_deferred_error() {
                return Err(TelnetError::Io(error));
            }
            self.launch_urgent_wait();

            let mut block = vec![0u8; self.read_block_size];
            match self.transport.read_some(&mut block).await {
                Ok(0) => {
                    // Orderly shutdown from the peer.
                    return Ok(ReadOutcome {
                        bytes: 0,
                        end: ReadEnd::Data,
                    });
                }
                Ok(n) => self.input.extend_from_slice(&block[..n]),
                Err(error) => return Err(TelnetError::Io(error)),
            }
        }
    }

    ///
    /// Writes application bytes with Telnet output escaping.
    ///
    /// `IAC` is doubled always; while `BINARY` is not locally enabled,
    /// `LF` becomes `CR LF` and `CR` becomes `CR NUL`. Returns the number
    /// of wire bytes written.
    ///
    pub async fn write_some(&mut self, data: &[u8]) -> Result<usize, TelnetError> {
        let binary = self
            .fsm
            .enabled(TelnetOption::TransmitBinary, Direction::Local);
        self.staging.clear();
        self.staging.reserve(data.len() + data.len() / 8 + 2);
        for &byte in data {
            if byte == consts::LF && !binary {
                self.staging.put_u8(consts::CR);
            }
            self.staging.put_u8(byte);
            if byte == consts::IAC {
                self.staging.put_u8(consts::IAC);
            } else if byte == consts::CR && !binary {
                self.staging.put_u8(consts::NUL);
            }
        }
        let wire_bytes = self.staging.len();
        self.transport.write_all(&self.staging).await?;
        self.staging.clear();
        Ok(wire_bytes)
    }

    /// Writes `data` verbatim, bypassing escaping.
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<usize, TelnetError> {
        self.transport.write_all(data).await?;
        Ok(data.len())
    }

    /// Writes a two-byte `IAC <cmd>` sequence.
    pub async fn write_command(&mut self, command: TelnetCommand) -> Result<usize, TelnetError> {
        let frame = [consts::IAC, command.to_u8()];
        self.transport.write_all(&frame).await?;
        Ok(frame.len())
    }

    /// Writes a three-byte `IAC <cmd> <id>` negotiation frame.
    pub async fn write_negotiation(
        &mut self,
        negotiation: Negotiation,
    ) -> Result<usize, TelnetError> {
        let frame = negotiation.to_bytes();
        self.transport.write_all(&frame).await?;
        Ok(frame.len())
    }

    ///
    /// Writes a subnegotiation of `option` carrying `payload`.
    ///
    /// Rejects options that do not carry subnegotiation payloads
    /// ([`ProtocolError::InvalidSubnegotiation`]) and options not
    /// currently enabled in either direction
    /// ([`ProtocolError::OptionNotAvailable`]). `IAC` bytes inside the
    /// payload are doubled.
    ///
    pub async fn write_subnegotiation(
        &mut self,
        option: TelnetOption,
        payload: &[u8],
    ) -> Result<usize, TelnetError> {
        let supports = self
            .fsm
            .registry()
            .get(option)
            .is_some_and(|descriptor| descriptor.supports_subnegotiation());
        if !supports {
            return Err(ProtocolError::InvalidSubnegotiation.into());
        }
        if !self.fsm.status(option).is_enabled() {
            return Err(ProtocolError::OptionNotAvailable(option).into());
        }
        let n = self.write_subnegotiation_frame(option, payload).await?;
        Ok(n)
    }

    ///
    /// Sends a Telnet `Synch`: three `NUL` bytes with the middle one
    /// flagged urgent, followed by `IAC DM`.
    ///
    /// The triple guarantees the receiver sees the urgent pointer whether
    /// its stack points at the urgent byte or the byte before it.
    ///
    pub async fn send_synch(&mut self) -> Result<usize, TelnetError> {
        let n = self.send_synch_frames().await?;
        Ok(n)
    }

    ///
    /// Asks for `option` to be enabled in `direction`, writing the
    /// negotiation frame the engine produces. Returns the wire bytes
    /// written (zero on idempotent success).
    ///
    pub async fn request_option(
        &mut self,
        option: TelnetOption,
        direction: Direction,
    ) -> Result<usize, TelnetError> {
        match self.fsm.request_option(option, direction)? {
            Some(negotiation) => self.write_negotiation(negotiation).await,
            None => Ok(0),
        }
    }

    ///
    /// Asks for `option` to be disabled in `direction`.
    ///
    /// Writes the negotiation frame the engine produces, then awaits the
    /// option handler's on-disable work so the option's effects are torn
    /// down before this returns.
    ///
    pub async fn disable_option(
        &mut self,
        option: TelnetOption,
        direction: Direction,
    ) -> Result<usize, TelnetError> {
        let outcome = self.fsm.disable_option(option, direction)?;
        let mut wire_bytes = 0;
        if let Some(negotiation) = outcome.negotiation {
            wire_bytes += self.write_negotiation(negotiation).await?;
        }
        if outcome.notify_handler {
            self.handlers.on_disable(option, direction).await;
        }
        Ok(wire_bytes)
    }

    async fn perform_event(&mut self, event: FsmEvent) -> io::Result<()> {
        match event {
            FsmEvent::Negotiation(negotiation) => {
                self.transport.write_all(&negotiation.to_bytes()).await
            }
            FsmEvent::AytReply(bytes) => {
                // Precomputed response; written as-is.
                self.transport.write_all(&bytes).await
            }
            FsmEvent::OptionEnabled {
                option,
                direction,
                reply,
            } => {
                if let Some(negotiation) = reply {
                    self.transport.write_all(&negotiation.to_bytes()).await?;
                }
                self.handlers.on_enable(option, direction);
                Ok(())
            }
            FsmEvent::OptionDisabled {
                option,
                direction,
                reply,
            } => {
                if let Some(negotiation) = reply {
                    self.transport.write_all(&negotiation.to_bytes()).await?;
                }
                self.handlers.on_disable(option, direction).await;
                Ok(())
            }
            FsmEvent::Subnegotiation { option, payload } => {
                let reply = self.handlers.on_subnegotiation(option, payload).await;
                if !reply.is_empty() {
                    self.write_subnegotiation_frame(option, &reply).await?;
                }
                Ok(())
            }
            FsmEvent::SubnegotiationReply { option, payload } => {
                // The engine already escaped this payload; frame verbatim.
                let mut frame = BytesMut::with_capacity(payload.len() + 5);
                frame.put_u8(consts::IAC);
                frame.put_u8(consts::SB);
                frame.put_u8(option.to_u8());
                frame.extend_from_slice(&payload);
                frame.put_u8(consts::IAC);
                frame.put_u8(consts::SE);
                self.transport.write_all(&frame).await
            }
        }
    }

    async fn write_subnegotiation_frame(
        &mut self,
        option: TelnetOption,
        payload: &[u8],
    ) -> io::Result<usize> {
        let mut frame = BytesMut::with_capacity(payload.len() + payload.len() / 8 + 5);
        frame.put_u8(consts::IAC);
        frame.put_u8(consts::SB);
        frame.put_u8(option.to_u8());
        for &byte in payload {
            frame.put_u8(byte);
            if byte == consts::IAC {
                frame.put_u8(consts::IAC);
            }
        }
        frame.put_u8(consts::IAC);
        frame.put_u8(consts::SE);
        self.transport.write_all(&frame).await?;
        Ok(frame.len())
    }

    async fn send_synch_frames(&mut self) -> io::Result<usize> {
        self.transport.write_all(&[consts::NUL]).await?;
        self.transport.send_urgent(consts::NUL).await?;
        self.transport.write_all(&[consts::NUL]).await?;
        self.transport.write_all(&[consts::IAC, consts::DM]).await?;
        Ok(5)
    }

    ///
    /// Launches the zero-byte out-of-band wait on the watcher task, unless
    /// one is already outstanding or urgent data is already pending.
    ///
    fn launch_urgent_wait(&self) {
        let shared = Arc::clone(&self.shared);
        if shared
            .urgent_wait_outstanding
            .swap(true, Ordering::Relaxed)
        {
            return;
        }
        if shared.urgent.state() == UrgentState::HasUrgent {
            // The byte stream already carries urgent data; the wait
            // re-arms after the DM is consumed.
            shared.urgent_wait_outstanding.store(false, Ordering::Relaxed);
            return;
        }
        let watch = Arc::clone(&self.urgent_watch);
        tokio::spawn(async move {
            let mut watch = watch.lock().await;
            let result = tokio::select! {
                result = watch.wait_urgent() => result,
                () = shared.closed.notified() => return,
            };
            drop(watch);
            shared.urgent_wait_outstanding.store(false, Ordering::Relaxed);
            match result {
                Ok(()) => shared.urgent.saw_urgent(),
                Err(error) => {
                    debug!(%error, "out-of-band wait failed");
                    shared.defer_error(error);
                }
            }
        });
    }

}

impl<T, U> Drop for TelnetStream<T, U> {
    fn drop(&mut self) {
        // Release a watcher task still parked on the out-of-band wait.
        self.shared.closed.notify_waiters();
    }
}

impl<T, U> std::fmt::Debug for TelnetStream<T, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnetStream")
            .field("buffered_input", &self.input.len())
            .field("staged_output", &self.staging.len())
            .field("urgent", &self.shared.urgent.state())
            .finish()
    }
}
