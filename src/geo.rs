//! GPS fix to local tangent-plane offset
//!
//! Equirectangular approximation around a fixed origin. Accurate to well
//! under a metre across a port yard; not meant for distances of more than a
//! few kilometres.

use crate::core::types::GpsFix;
use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Offset from the origin in metres
///
/// `x` grows east, `z` grows north, `altitude` is the fix altitude unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LocalOffset {
    pub x: f64,
    pub z: f64,
    pub altitude: f64,
}

/// Tangent plane anchored at an origin given in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalTangentPlane {
    pub origin_latitude: f64,
    pub origin_longitude: f64,
}

impl LocalTangentPlane {
    pub fn new(origin_latitude: f64, origin_longitude: f64) -> Self {
        Self {
            origin_latitude,
            origin_longitude,
        }
    }

    /// Project a latitude/longitude pair (decimal degrees) to `(x, z)` metres
    pub fn project_degrees(&self, latitude: f64, longitude: f64) -> (f64, f64) {
        let d_lon = (longitude - self.origin_longitude).to_radians();
        let d_lat = (latitude - self.origin_latitude).to_radians();
        let x = EARTH_RADIUS_M * d_lon * self.origin_latitude.to_radians().cos();
        let z = EARTH_RADIUS_M * d_lat;
        (x, z)
    }

    pub fn project(&self, fix: &GpsFix) -> LocalOffset {
        let (x, z) = self.project_degrees(fix.latitude, fix.longitude);
        LocalOffset {
            x,
            z,
            altitude: fix.altitude,
        }
    }
}

impl Default for LocalTangentPlane {
    /// Shipyard pier origin used by the first deployment
    fn default() -> Self {
        Self::new(34.90235, 128.59721)
    }
}
