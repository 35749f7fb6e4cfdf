//! SetuIO - Telemetry bridge for crane controller fleets
//!
//! This library turns live TCP byte streams from crane controllers into
//! typed, validated telemetry events for a single consuming thread.
//!
//! ## Pipeline
//!
//! ```text
//! Transport ──▶ FrameAssembler ──▶ PayloadDecoder ──▶ EventQueue ──▶ consumer
//! (1 thread per endpoint)                              (drained once per tick)
//! ```
//!
//! - [`transport`]: one TCP connection per endpoint with reconnect-with-delay
//! - [`protocol`]: framing (header-multiplexed and auto-detect raw) and decoding
//! - [`streaming`]: connection loops, the cross-thread queue and the service
//! - [`geo`]: GPS fix to local tangent-plane offset

pub mod config;
pub mod core;
pub mod error;
pub mod geo;
pub mod protocol;
pub mod streaming;
pub mod transport;

// Re-export commonly used types
pub use config::AppConfig;
pub use crate::core::types::{
    ConnectionState, CraneId, CranePose, Endpoint, GpsFix, PointCloudFrame, Vec3,
};
pub use error::{Error, Result};
pub use geo::LocalTangentPlane;
pub use protocol::{ByteOrder, Framing, MessageKind, PayloadDecoder, WireConvention};
pub use streaming::{EventQueue, Payload, TelemetryEvent, TelemetryService, TelemetrySink};
