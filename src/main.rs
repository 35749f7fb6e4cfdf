//! SetuIO - Telemetry bridge daemon for crane controller fleets
//!
//! Connects to every configured crane controller, decodes their streams and
//! drains the decoded events once per tick. With no rendering client
//! attached, the daemon acts as a headless monitor: it logs what arrives and
//! periodically reports per-endpoint connection state.

use setu_io::config::AppConfig;
use setu_io::error::{Error, Result};
use setu_io::geo::LocalTangentPlane;
use setu_io::{Payload, TelemetryEvent, TelemetryService, TelemetrySink};
use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Consumer tick (~20 Hz)
const TICK: Duration = Duration::from_millis(50);

/// How often the status summary is logged
const STATUS_INTERVAL: Duration = Duration::from_secs(10);

/// Parse config path from command line arguments.
///
/// Supports:
/// - `setu-io <path>` (positional)
/// - `setu-io --config <path>` (flag-based)
/// - `setu-io -c <path>` (short flag)
///
/// Defaults to `/etc/setu-io.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    "/etc/setu-io.toml".to_string()
}

/// Headless consumer: logs events and counts them per kind
struct Monitor {
    plane: LocalTangentPlane,
    counts: BTreeMap<String, u64>,
}

impl Monitor {
    fn new(plane: LocalTangentPlane) -> Self {
        Self {
            plane,
            counts: BTreeMap::new(),
        }
    }

    /// Log and reset the per-kind counters
    fn report(&mut self) {
        if self.counts.is_empty() {
            log::info!("No telemetry in the last {}s", STATUS_INTERVAL.as_secs());
            return;
        }
        let summary: Vec<String> = self
            .counts
            .iter()
            .map(|(kind, n)| format!("{}={}", kind, n))
            .collect();
        log::info!("Telemetry: {}", summary.join(" "));
        self.counts.clear();
    }
}

impl TelemetrySink for Monitor {
    fn on_event(&mut self, event: TelemetryEvent) {
        *self.counts.entry(format!("{:?}", event.kind)).or_insert(0) += 1;

        match &event.payload {
            Payload::Pose(pose) => log::trace!(
                "{} pose: pos ({:.2}, {:.2}, {:.2}) rot ({:.1}, {:.1}, {:.1})",
                event.source,
                pose.position.x,
                pose.position.y,
                pose.position.z,
                pose.rotation.x,
                pose.rotation.y,
                pose.rotation.z
            ),
            Payload::Gps(fix) => {
                let offset = self.plane.project(fix);
                log::debug!(
                    "{} GPS {:.6},{:.6} -> local ({:.2}, {:.2}) alt {:.1}m, {} sats",
                    event.source,
                    fix.latitude,
                    fix.longitude,
                    offset.x,
                    offset.z,
                    offset.altitude,
                    fix.satellites
                );
            }
            Payload::PointCloud(cloud) => log::debug!(
                "{} point cloud: {} points (claimed {})",
                event.source,
                cloud.points.len(),
                cloud.count
            ),
            Payload::Distances(records) => {
                for r in records.iter().filter(|r| r.alarm_level > 0) {
                    log::warn!(
                        "{} proximity alarm {} to {}: {:.1}m",
                        event.source,
                        r.alarm_level,
                        r.target,
                        r.distance
                    );
                }
            }
            Payload::Cooperation(entries) => log::debug!(
                "{} cooperation list: {} entries",
                event.source,
                entries.len()
            ),
            Payload::Opaque(body) => log::trace!(
                "{} {:?}: {} bytes",
                event.source,
                event.kind,
                body.len()
            ),
        }
    }
}

fn main() -> Result<()> {
    let config_path = parse_config_path();
    let loaded = AppConfig::from_file(&config_path);

    // Logger level comes from the config when it loaded
    let level = match &loaded {
        Ok(config) => config.logging.level.clone(),
        Err(_) => "info".to_string(),
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    log::info!("SetuIO v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Using config: {}", config_path);

    let config = loaded.inspect_err(|e| log::error!("Failed to load config: {}", e))?;
    config.validate()?;

    log::info!(
        "Wire: {:?} framing, {:?} byte order, position offset {}, rotation {}",
        config.wire.framing,
        config.wire.byte_order,
        config.wire.position_offset,
        if config.wire.negate_rotation {
            "negated"
        } else {
            "as sent"
        }
    );
    for ep in config.endpoints() {
        log::info!("Endpoint {} ({}) at {}", ep.name, ep.id, ep.address());
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let service = TelemetryService::from_config(&config)?;
    service.start()?;
    log::info!("SetuIO running. Press Ctrl-C to stop.");

    let mut monitor = Monitor::new(config.gps.plane());
    let mut last_report = Instant::now();

    while running.load(Ordering::Relaxed) {
        let tick_start = Instant::now();
        service.drain(&mut monitor);

        if last_report.elapsed() >= STATUS_INTERVAL {
            let states: Vec<String> = service
                .states()
                .into_iter()
                .map(|(name, state)| format!("{}={:?}", name, state))
                .collect();
            log::info!("Connections: {}", states.join(" "));
            monitor.report();
            last_report = Instant::now();
        }

        if let Some(rest) = TICK.checked_sub(tick_start.elapsed()) {
            thread::sleep(rest);
        }
    }

    log::info!("Shutting down...");
    service.stop();
    service.drain(&mut monitor);

    log::info!("SetuIO stopped");
    Ok(())
}
