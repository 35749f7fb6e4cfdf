//! Core data types for endpoints, connection state and decoded telemetry.
//!
//! Every decoded record is a plain value type: once the decoder builds it,
//! nothing mutates it again on its way to the consumer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Identity of one crane: which pier it stands on and its number there
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CraneId {
    pub pier_id: i32,
    pub crane_id: i32,
}

impl CraneId {
    pub const fn new(pier_id: i32, crane_id: i32) -> Self {
        Self { pier_id, crane_id }
    }
}

impl fmt::Display for CraneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pier_id, self.crane_id)
    }
}

/// One crane controller: identity, network address and display name
///
/// Immutable after creation. A connection owns exactly one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub id: CraneId,
}

impl Endpoint {
    pub fn new(name: &str, host: &str, port: u16, id: CraneId) -> Self {
        Self {
            name: name.to_string(),
            host: host.to_string(),
            port,
            id,
        }
    }

    /// `host:port` form used for resolution and logging
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Connection lifecycle of one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ConnectionState {
    #[default]
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }
}

/// Lock-free cell publishing a connection's state
///
/// Only the owning connection calls [`StateCell::set`]; everyone else reads.
#[derive(Debug, Default)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(ConnectionState::Disconnected as u8))
    }

    #[inline]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set(&self, state: ConnectionState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Three-component vector in the target coordinate convention
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Crane attitude: where the crane is, how it is turned, and its hooks
///
/// Rotation is in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CranePose {
    pub position: Vec3,
    pub rotation: Vec3,
    pub translation: Vec3,
    pub hook1: Vec3,
    pub hook2: Vec3,
    pub hook3: Vec3,
}

/// RGB color of a point, components as sent on the wire
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

/// Point cloud snapshot
///
/// `count` is the (clamped) count claimed on the wire; `points` and `colors`
/// hold only the records actually present and always have the same length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointCloudFrame {
    pub count: u32,
    pub points: Vec<Vec3>,
    pub colors: Vec<Rgb>,
}

/// Distance from the reporting crane to one neighbour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceRecord {
    pub target: CraneId,
    /// Meters
    pub distance: f32,
    /// 0 = clear; higher values are closer approach warnings
    pub alarm_level: i32,
}

/// One slot of the cooperation list
#[derive(Debug, Clone, PartialEq)]
pub struct CooperationEntry {
    pub request_id: i32,
    pub from: CraneId,
    pub to: CraneId,
    pub state: i32,
    pub note: String,
}

/// GPS fix from a `$GPGGA` sentence, angles in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above mean sea level
    pub altitude: f64,
    /// GGA fix quality (0 = invalid, 1 = GPS, 2 = DGPS, 4 = RTK fixed, ...)
    pub quality: u8,
    pub satellites: u8,
}
