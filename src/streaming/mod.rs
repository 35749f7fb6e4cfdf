//! Connection threads and the hand-off of decoded events to the consumer

pub mod connection;
pub mod queue;
pub mod service;

pub use crate::protocol::{Payload, TelemetryEvent};
pub use connection::{Connection, ConnectionStats};
pub use queue::{EventQueue, EventSender, TelemetrySink};
pub use service::TelemetryService;
