//! setu-sim - Synthetic crane controller for bench testing
//!
//! Serves a looping telemetry stream to every client that connects, so the
//! daemon can be exercised without cranes.
//!
//! ```bash
//! setu-sim --listen 127.0.0.1:5001 --mode header
//! setu-sim --listen 127.0.0.1:5002 --mode raw
//! ```
//!
//! Header mode speaks the gateway convention (pose every tick; distances,
//! cooperation list and a point cloud once per second). Raw mode speaks the
//! device-socket convention: binary pose frames, or `$GPGGA` lines with
//! `--gps-only`.

use setu_io::core::types::{CooperationEntry, CraneId, DistanceRecord, GpsFix};
use setu_io::error::{Error, Result};
use setu_io::protocol::constants::*;
use setu_io::protocol::fixtures::{self, WirePose};
use setu_io::protocol::{Framing, WireConvention};
use std::env;
use std::f32::consts::TAU;
use std::io::{ErrorKind, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// Simulator options
struct Options {
    listen: String,
    framing: Framing,
    source: CraneId,
    rate_hz: u32,
    gps_only: bool,
}

fn parse_args() -> Result<Options> {
    let mut opts = Options {
        listen: "127.0.0.1:5001".to_string(),
        framing: Framing::Header,
        source: CraneId::new(7, 5),
        rate_hz: 10,
        gps_only: false,
    };

    let args: Vec<String> = env::args().skip(1).collect();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = || {
            iter.next()
                .cloned()
                .ok_or_else(|| Error::Other(format!("missing value for {}", arg)))
        };
        match arg.as_str() {
            "--listen" | "-l" => opts.listen = value()?,
            "--mode" | "-m" => {
                opts.framing = match value()?.as_str() {
                    "header" => Framing::Header,
                    "raw" => Framing::Raw,
                    other => return Err(Error::Other(format!("unknown mode '{}'", other))),
                }
            }
            "--pier" => opts.source.pier_id = parse_num(&value()?)?,
            "--crane" => opts.source.crane_id = parse_num(&value()?)?,
            "--rate" => opts.rate_hz = parse_num::<u32>(&value()?)?.max(1),
            "--gps-only" => opts.gps_only = true,
            other => return Err(Error::Other(format!("unknown argument '{}'", other))),
        }
    }
    Ok(opts)
}

fn parse_num<T: std::str::FromStr>(s: &str) -> Result<T> {
    s.parse()
        .map_err(|_| Error::Other(format!("invalid number '{}'", s)))
}

/// Crane sweeping its boom in a slow circle
fn pose_at(tick: u64) -> WirePose {
    let phase = (tick % 600) as f32 / 600.0 * TAU;
    WirePose {
        position: [120.0 + 15.0 * phase.cos(), 40.0 + 15.0 * phase.sin(), 32.0],
        rotation: [0.0, phase.to_degrees(), 0.0],
        translation: [0.0, 0.0, 18.0],
        hook1: [0.0, -12.0 - 4.0 * phase.sin(), 0.0],
        ..WirePose::default()
    }
}

fn gps_at(tick: u64) -> GpsFix {
    let drift = (tick % 600) as f64 * 1e-6;
    GpsFix {
        latitude: 34.90235 + drift,
        longitude: 128.59721 + drift,
        altitude: 40.0,
        quality: 1,
        satellites: 9,
    }
}

/// Everything one tick sends in header mode
fn header_tick(opts: &Options, tick: u64) -> Vec<u8> {
    let conv = WireConvention::gateway();
    let order = conv.byte_order;
    let src = opts.source;

    let pose = fixtures::encode_pose_body(&conv, &pose_at(tick), BODY_CRANE_ATTITUDE);
    let mut out = fixtures::encode_envelope(order, MSG_CRANE_ATTITUDE, src, &pose);

    if tick % u64::from(opts.rate_hz) == 0 {
        let neighbour = CraneId::new(src.pier_id, src.crane_id + 1);
        let distance = 30.0 + 20.0 * ((tick % 200) as f32 / 200.0 * TAU).cos();
        let records = [DistanceRecord {
            target: neighbour,
            distance,
            alarm_level: if distance < 15.0 { 1 } else { 0 },
        }];
        let body = fixtures::encode_distance_body(order, &records);
        out.extend(fixtures::encode_envelope(order, MSG_DISTANCE, src, &body));

        let entries = [CooperationEntry {
            request_id: 1,
            from: src,
            to: neighbour,
            state: 0,
            note: "joint lift".to_string(),
        }];
        let body = fixtures::encode_cooperation_body(order, entries.len() as i32, &entries);
        out.extend(fixtures::encode_envelope(order, MSG_COOPERATION_LIST, src, &body));

        let points: Vec<([f32; 3], [f32; 3])> = (0..64)
            .map(|i| {
                let a = i as f32 / 64.0 * TAU;
                ([10.0 * a.cos(), 2.0, 10.0 * a.sin()], [1.0, 0.5, 0.0])
            })
            .collect();
        let body = fixtures::encode_point_cloud_body(order, points.len() as u32, &points);
        out.extend(fixtures::encode_envelope(order, MSG_POINT_CLOUD, src, &body));
    }
    out
}

/// Everything one tick sends in raw mode
///
/// A device socket carries either GPS lines or binary poses, never both:
/// the first `$` line switches the receiver to GPS mode for good.
fn raw_tick(opts: &Options, tick: u64) -> Vec<u8> {
    let conv = WireConvention::device_socket();
    if opts.gps_only {
        fixtures::encode_gpgga(&gps_at(tick)).into_bytes()
    } else {
        fixtures::encode_pose_body(&conv, &pose_at(tick), conv.raw_frame_size)
    }
}

fn serve_client(mut stream: TcpStream, opts: Arc<Options>, running: Arc<AtomicBool>) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "?".to_string());
    log::info!("Client connected: {}", peer);

    let period = Duration::from_secs(1) / opts.rate_hz;
    let mut tick = 0u64;
    while running.load(Ordering::Relaxed) {
        let bytes = match opts.framing {
            Framing::Header => header_tick(&opts, tick),
            Framing::Raw => raw_tick(&opts, tick),
        };
        if let Err(e) = stream.write_all(&bytes) {
            log::info!("Client {} gone: {}", peer, e);
            return;
        }
        log::trace!("Sent {} bytes to {}", bytes.len(), peer);
        tick += 1;
        thread::sleep(period);
    }
    log::info!("Closing client {}", peer);
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Arc::new(parse_args()?);

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    let listener = TcpListener::bind(&opts.listen)?;
    listener.set_nonblocking(true)?;
    log::info!(
        "setu-sim serving {:?} frames as crane {} on {} at {} Hz",
        opts.framing,
        opts.source,
        opts.listen,
        opts.rate_hz
    );

    while running.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(e) = stream.set_nonblocking(false) {
                    log::error!("Failed to set socket to blocking mode: {}", e);
                    continue;
                }
                let opts = Arc::clone(&opts);
                let running = Arc::clone(&running);
                thread::Builder::new()
                    .name("sim-client".to_string())
                    .spawn(move || serve_client(stream, opts, running))
                    .map_err(|e| Error::ThreadSpawn(e.to_string()))?;
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) => log::error!("Accept error: {}", e),
        }
    }

    log::info!("setu-sim stopped");
    Ok(())
}
