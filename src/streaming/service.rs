//! Telemetry service: one connection thread per endpoint
//!
//! Explicitly constructed and explicitly started; nothing runs until
//! [`TelemetryService::start`] and everything is joined by
//! [`TelemetryService::stop`] (also called on drop).

use super::connection::{Connection, ConnectionStats};
use super::queue::{EventQueue, TelemetrySink};
use crate::config::{AppConfig, NetworkConfig};
use crate::core::types::{ConnectionState, Endpoint, StateCell};
use crate::error::{Error, Result};
use crate::protocol::{TelemetryEvent, WireConvention};
use crate::transport::{TcpTransport, Transport};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

struct Worker {
    name: String,
    state: Arc<StateCell>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<ConnectionStats>>,
}

/// Owns the endpoint list, the connection threads and the event queue
pub struct TelemetryService {
    endpoints: Vec<Endpoint>,
    convention: WireConvention,
    network: NetworkConfig,
    queue: EventQueue,
    workers: Mutex<Vec<Worker>>,
}

impl TelemetryService {
    pub fn new(endpoints: Vec<Endpoint>, convention: WireConvention, network: NetworkConfig) -> Self {
        Self {
            endpoints,
            convention,
            network,
            queue: EventQueue::new(),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Build from a validated config
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.endpoints(), config.wire, config.network))
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn is_running(&self) -> bool {
        !self.workers.lock().is_empty()
    }

    /// Start one TCP connection thread per endpoint
    pub fn start(&self) -> Result<()> {
        let network = self.network;
        self.start_with(|ep| {
            TcpTransport::new(ep, network.connect_timeout(), network.read_timeout())
        })
    }

    /// Start one connection thread per endpoint over transports from `make`
    ///
    /// Fails if the service is already running. If a thread cannot be
    /// spawned, the ones already started are stopped again.
    pub fn start_with<T, F>(&self, mut make: F) -> Result<()>
    where
        T: Transport + 'static,
        F: FnMut(&Endpoint) -> T,
    {
        let mut workers = self.workers.lock();
        if !workers.is_empty() {
            return Err(Error::Other("telemetry service already started".to_string()));
        }

        for ep in &self.endpoints {
            let mut conn = Connection::new(
                ep.clone(),
                make(ep),
                self.convention,
                self.network,
                self.queue.sender(),
            );
            let state = conn.state_cell();
            let stop = conn.stop_flag();

            let spawned = thread::Builder::new()
                .name(format!("setu-{}", ep.name))
                .spawn(move || conn.run());

            match spawned {
                Ok(handle) => workers.push(Worker {
                    name: ep.name.clone(),
                    state,
                    stop,
                    handle: Some(handle),
                }),
                Err(e) => {
                    log::error!("Failed to spawn connection thread for {}: {}", ep.name, e);
                    Self::shutdown(&mut workers);
                    return Err(Error::ThreadSpawn(format!("{}: {}", ep.name, e)));
                }
            }
        }

        log::info!(
            "Telemetry service started: {} endpoints, {:?} framing, {:?} byte order",
            workers.len(),
            self.convention.framing,
            self.convention.byte_order
        );
        Ok(())
    }

    /// Stop every connection thread and wait for it to exit
    ///
    /// Idempotent. Each thread sees its flag within one read timeout or one
    /// sleep slice, closes its socket and returns.
    pub fn stop(&self) {
        let mut workers = self.workers.lock();
        if workers.is_empty() {
            return;
        }
        log::info!("Stopping telemetry service");
        Self::shutdown(&mut workers);
        log::info!("Telemetry service stopped");
    }

    fn shutdown(workers: &mut Vec<Worker>) {
        // Signal everyone first so the threads wind down in parallel
        for w in workers.iter() {
            w.stop.store(true, Ordering::Relaxed);
        }
        for mut w in workers.drain(..) {
            let Some(handle) = w.handle.take() else {
                continue;
            };
            match handle.join() {
                Ok(stats) => log::debug!("{}: {:?}", w.name, stats),
                Err(_) => log::error!("{}: {}", w.name, Error::ThreadPanic),
            }
        }
    }

    /// Deliver every queued event to `sink` in FIFO order
    ///
    /// Meant to be called once per tick from the single consuming thread.
    pub fn drain<S: TelemetrySink + ?Sized>(&self, sink: &mut S) -> usize {
        self.queue.drain_into(sink)
    }

    /// Take every queued event
    pub fn drain_all(&self) -> Vec<TelemetryEvent> {
        self.queue.drain_all()
    }

    /// `(endpoint name, state)` for every running connection
    pub fn states(&self) -> Vec<(String, ConnectionState)> {
        self.workers
            .lock()
            .iter()
            .map(|w| (w.name.clone(), w.state.get()))
            .collect()
    }
}

impl Drop for TelemetryService {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::CraneId;
    use crate::protocol::ByteOrder;
    use crate::protocol::constants::MSG_OPERATOR_INFO;
    use crate::protocol::fixtures;
    use crate::transport::MockTransport;
    use std::collections::HashMap;
    use std::time::{Duration, Instant};

    fn network() -> NetworkConfig {
        NetworkConfig {
            connect_timeout_ms: 100,
            read_timeout_ms: 20,
            reconnect_delay_ms: 1,
            error_cooldown_ms: 1,
            read_chunk_size: 256,
        }
    }

    fn endpoints() -> Vec<Endpoint> {
        vec![
            Endpoint::new("7_GC5", "mock", 0, CraneId::new(7, 5)),
            Endpoint::new("J_TC2", "mock", 0, CraneId::new(2, 2)),
        ]
    }

    #[test]
    fn test_start_twice_fails_and_stop_is_idempotent() {
        let service = TelemetryService::new(endpoints(), WireConvention::gateway(), network());
        assert!(!service.is_running());

        service.start_with(|_| MockTransport::new()).unwrap();
        assert!(service.is_running());
        assert!(service.start_with(|_| MockTransport::new()).is_err());

        let names: Vec<String> = service.states().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["7_GC5", "J_TC2"]);

        service.stop();
        service.stop();
        assert!(!service.is_running());
        assert!(service.states().is_empty());
    }

    #[test]
    fn test_drain_events_from_all_endpoints() {
        let service = TelemetryService::new(endpoints(), WireConvention::gateway(), network());
        let mocks: HashMap<String, MockTransport> = service
            .endpoints()
            .iter()
            .map(|ep| {
                let mock = MockTransport::new();
                for _ in 0..3 {
                    mock.inject_read(&fixtures::encode_envelope(
                        ByteOrder::Big,
                        MSG_OPERATOR_INFO,
                        ep.id,
                        &[],
                    ));
                }
                (ep.name.clone(), mock)
            })
            .collect();

        service
            .start_with(|ep| mocks[&ep.name].clone())
            .unwrap();

        let mut seen = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        while seen.len() < 6 && Instant::now() < deadline {
            service.drain(&mut |e: TelemetryEvent| seen.push(e.source));
            thread::sleep(Duration::from_millis(5));
        }
        service.stop();

        assert_eq!(seen.len(), 6);
        assert_eq!(seen.iter().filter(|s| **s == CraneId::new(7, 5)).count(), 3);
        assert_eq!(seen.iter().filter(|s| **s == CraneId::new(2, 2)).count(), 3);
        for mock in mocks.values() {
            assert_eq!(mock.connects(), 1);
            assert_eq!(mock.closes(), 1);
        }
    }

    #[test]
    fn test_from_config_validates() {
        let mut config = AppConfig::default();
        config.endpoints.clear();
        assert!(TelemetryService::from_config(&config).is_err());
        assert!(TelemetryService::from_config(&AppConfig::default()).is_ok());
    }
}
