//! Per-endpoint connection loop
//!
//! One `Connection` runs on its own thread and owns everything mutable about
//! its endpoint: the transport, the frame assembler (byte buffer and GPS-mode
//! flag) and its counters. The only things shared with other threads are the
//! published [`StateCell`], the stop flag and the event sender.
//!
//! # Loop
//!
//! ```text
//! ┌─▶ not connected ──▶ connect() ──▶ sleep(reconnect_delay) ─┐
//! │                                                           │
//! ├── connected ──▶ read() ─┬─ Received ──▶ assemble, decode, enqueue
//! │                         ├─ TimedOut ──▶ check stop flag
//! │                         ├─ Closed   ──▶ disconnect
//! │                         └─ Err      ──▶ disconnect, sleep(error_cooldown)
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Every iteration runs under `catch_unwind`; a panic is logged and handled
//! like a read error, so one misbehaving connection never takes the process
//! or its sibling connections down.

use super::queue::EventSender;
use crate::config::NetworkConfig;
use crate::core::types::{ConnectionState, Endpoint, StateCell};
use crate::error::Result;
use crate::protocol::{FrameAssembler, WireConvention};
use crate::transport::{ReadOutcome, Transport};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Longest single sleep between stop-flag checks
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Counters for one connection over its lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    pub connects: u64,
    pub failed_connects: u64,
    pub disconnects: u64,
    pub bytes_read: u64,
    pub frames: u64,
    pub events: u64,
    /// Frames that completed but decoded to nothing
    pub decode_failures: u64,
    /// Events decoded after the consumer went away
    pub dropped: u64,
    pub panics: u64,
}

/// Connection to one crane controller
pub struct Connection<T: Transport> {
    endpoint: Endpoint,
    transport: T,
    assembler: FrameAssembler,
    sender: EventSender,
    network: NetworkConfig,
    state: Arc<StateCell>,
    stop: Arc<AtomicBool>,
    chunk: Vec<u8>,
    stats: ConnectionStats,
}

impl<T: Transport> Connection<T> {
    pub fn new(
        endpoint: Endpoint,
        transport: T,
        convention: WireConvention,
        network: NetworkConfig,
        sender: EventSender,
    ) -> Self {
        let source = endpoint.id;
        Self {
            endpoint,
            transport,
            assembler: FrameAssembler::new(convention, source),
            sender,
            network,
            state: Arc::new(StateCell::new()),
            stop: Arc::new(AtomicBool::new(false)),
            chunk: vec![0u8; network.read_chunk_size.max(1)],
            stats: ConnectionStats::default(),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Shared read-only view of this connection's state
    pub fn state_cell(&self) -> Arc<StateCell> {
        Arc::clone(&self.state)
    }

    /// Flag that ends [`Connection::run`] once set
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn stats(&self) -> ConnectionStats {
        self.stats
    }

    fn stopping(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Run until the stop flag is set, then close the socket
    pub fn run(&mut self) -> ConnectionStats {
        log::info!(
            "{} ({}): connection loop started for {}",
            self.endpoint.name,
            self.endpoint.id,
            self.endpoint.address()
        );

        while !self.stopping() {
            match panic::catch_unwind(AssertUnwindSafe(|| self.step())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    log::warn!("{}: read error: {}", self.endpoint.name, e);
                    self.disconnect();
                    self.sleep(self.network.error_cooldown());
                }
                Err(payload) => {
                    let msg = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    log::error!("{}: connection loop panicked: {}", self.endpoint.name, msg);
                    self.stats.panics += 1;
                    self.disconnect();
                    self.sleep(self.network.error_cooldown());
                }
            }
        }

        self.disconnect();
        log::info!(
            "{}: connection loop stopped ({} connects, {} bytes, {} events, {} decode failures)",
            self.endpoint.name,
            self.stats.connects,
            self.stats.bytes_read,
            self.stats.events,
            self.stats.decode_failures
        );
        self.stats
    }

    /// One loop iteration: a connect attempt or a single read
    fn step(&mut self) -> Result<()> {
        if !self.transport.is_connected() {
            self.try_connect();
            self.sleep(self.network.reconnect_delay());
            return Ok(());
        }

        match self.transport.read(&mut self.chunk)? {
            ReadOutcome::Received(n) => self.ingest(n),
            ReadOutcome::TimedOut => {}
            ReadOutcome::Closed => {
                log::info!("{}: closed by peer", self.endpoint.name);
                self.disconnect();
            }
        }
        Ok(())
    }

    fn try_connect(&mut self) {
        self.state.set(ConnectionState::Connecting);
        match self.transport.connect() {
            Ok(()) => {
                self.stats.connects += 1;
                self.state.set(ConnectionState::Connected);
                log::info!(
                    "{}: connected to {}",
                    self.endpoint.name,
                    self.endpoint.address()
                );
            }
            Err(e) => {
                self.stats.failed_connects += 1;
                self.state.set(ConnectionState::Disconnected);
                log::debug!(
                    "{}: connect to {} failed: {}",
                    self.endpoint.name,
                    self.endpoint.address(),
                    e
                );
            }
        }
    }

    /// Assemble, decode and enqueue everything the last read completed
    fn ingest(&mut self, n: usize) {
        self.stats.bytes_read += n as u64;
        let frames = self.assembler.push(&self.chunk[..n]);
        log::trace!(
            "{}: {} bytes -> {} frames ({} buffered)",
            self.endpoint.name,
            n,
            frames.len(),
            self.assembler.buffered()
        );

        let decoder = *self.assembler.decoder();
        for frame in frames {
            self.stats.frames += 1;
            let kind = frame.kind();
            match decoder.decode(frame) {
                Some(event) => {
                    if self.sender.send(event) {
                        self.stats.events += 1;
                    } else {
                        self.stats.dropped += 1;
                    }
                }
                None => {
                    self.stats.decode_failures += 1;
                    log::debug!("{}: dropped undecodable {:?} frame", self.endpoint.name, kind);
                }
            }
        }
    }

    /// Close the socket and forget any partial frame
    fn disconnect(&mut self) {
        if self.transport.is_connected() {
            self.transport.close();
            self.stats.disconnects += 1;
            log::info!(
                "{}: disconnected ({} bytes read, {} events so far)",
                self.endpoint.name,
                self.stats.bytes_read,
                self.stats.events
            );
        }
        if self.assembler.buffered() > 0 {
            log::debug!(
                "{}: discarding {} buffered bytes",
                self.endpoint.name,
                self.assembler.buffered()
            );
        }
        self.assembler.reset();
        self.state.set(ConnectionState::Disconnected);
    }

    /// Sleep in short slices, returning early once stop is requested
    fn sleep(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while !self.stopping() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}
