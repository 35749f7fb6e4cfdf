//! Crane telemetry wire protocol
//!
//! Byte-level framing and payload decoding for the two wire conventions in
//! the field: the gateway's enveloped stream and the per-device raw socket.

pub mod assembler;
pub mod buffer;
pub mod constants;
pub mod decoder;
pub mod fixtures;
pub mod message;
pub mod nmea;
pub mod wire;

pub use assembler::{AssemblerStats, FrameAssembler};
pub use decoder::{Payload, PayloadDecoder, TelemetryEvent};
pub use message::{Frame, MessageEnvelope, MessageKind};
pub use wire::{ByteOrder, Framing, WireConvention};
