//! Core value types shared by the protocol and streaming layers.
//!
//! - [`types`]: endpoint identity, connection state, decoded telemetry records

pub mod types;
