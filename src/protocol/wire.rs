//! Wire convention: the single per-deployment switch for byte layout
//!
//! Two incompatible layouts have been observed in the field. They differ in
//! byte order, in where the position block starts, and in whether rotation
//! is already negated. Rather than keeping a decoder per variant, every
//! numeric read goes through one [`WireConvention`] chosen in config.
//!
//! | Preset | Byte order | Position offset | Rotation |
//! |--------|------------|-----------------|----------|
//! | [`WireConvention::gateway`] | big-endian | 4 | as sent |
//! | [`WireConvention::device_socket`] | little-endian | 0 | negated |
//!
//! Neither preset is authoritative; pin one per deployment against a
//! captured stream.

use super::constants::{
    POSE_MIN_BODY, POSE_ROTATION, RAW_FRAME_SIZE_FULL, RAW_FRAME_SIZE_SHORT,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Byte order of every multi-byte field in a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

impl ByteOrder {
    #[inline]
    pub fn i32_from(self, bytes: [u8; 4]) -> i32 {
        match self {
            ByteOrder::Big => i32::from_be_bytes(bytes),
            ByteOrder::Little => i32::from_le_bytes(bytes),
        }
    }

    #[inline]
    pub fn u32_from(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Big => u32::from_be_bytes(bytes),
            ByteOrder::Little => u32::from_le_bytes(bytes),
        }
    }

    #[inline]
    pub fn f32_from(self, bytes: [u8; 4]) -> f32 {
        match self {
            ByteOrder::Big => f32::from_be_bytes(bytes),
            ByteOrder::Little => f32::from_le_bytes(bytes),
        }
    }

    #[inline]
    pub fn i32_bytes(self, value: i32) -> [u8; 4] {
        match self {
            ByteOrder::Big => value.to_be_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
        }
    }

    #[inline]
    pub fn f32_bytes(self, value: f32) -> [u8; 4] {
        match self {
            ByteOrder::Big => value.to_be_bytes(),
            ByteOrder::Little => value.to_le_bytes(),
        }
    }

    /// Read an i32 at `offset`, `None` if it does not fit
    #[inline]
    pub fn read_i32(self, data: &[u8], offset: usize) -> Option<i32> {
        word(data, offset).map(|w| self.i32_from(w))
    }

    #[inline]
    pub fn read_u32(self, data: &[u8], offset: usize) -> Option<u32> {
        word(data, offset).map(|w| self.u32_from(w))
    }

    #[inline]
    pub fn read_f32(self, data: &[u8], offset: usize) -> Option<f32> {
        word(data, offset).map(|w| self.f32_from(w))
    }

    /// Read three consecutive f32 values at `offset`
    #[inline]
    pub fn read_f32x3(self, data: &[u8], offset: usize) -> Option<[f32; 3]> {
        Some([
            self.read_f32(data, offset)?,
            self.read_f32(data, offset + 4)?,
            self.read_f32(data, offset + 8)?,
        ])
    }
}

#[inline]
fn word(data: &[u8], offset: usize) -> Option<[u8; 4]> {
    let end = offset.checked_add(4)?;
    data.get(offset..end)?.try_into().ok()
}

/// How a connection's byte stream is divided into messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// One connection, many kinds, 12-byte envelope before every body
    #[default]
    Header,
    /// One device, no envelope: `$` text lines or fixed-size binary pose frames
    Raw,
}

/// Complete wire layout of one deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConvention {
    pub framing: Framing,
    pub byte_order: ByteOrder,
    /// Byte offset of the position block inside a pose body (0 or 4)
    pub position_offset: usize,
    /// Rotation on the wire has the opposite sign to the target convention
    pub negate_rotation: bool,
    /// Size of one binary pose frame in raw mode (40 or 120)
    pub raw_frame_size: usize,
}

impl WireConvention {
    /// Multiplexed gateway layout: big-endian, position at offset 4
    pub const fn gateway() -> Self {
        Self {
            framing: Framing::Header,
            byte_order: ByteOrder::Big,
            position_offset: 4,
            negate_rotation: false,
            raw_frame_size: RAW_FRAME_SIZE_FULL,
        }
    }

    /// Per-device socket layout: little-endian, position at offset 0, rotation negated
    pub const fn device_socket() -> Self {
        Self {
            framing: Framing::Raw,
            byte_order: ByteOrder::Little,
            position_offset: 0,
            negate_rotation: true,
            raw_frame_size: RAW_FRAME_SIZE_SHORT,
        }
    }

    /// Smallest pose body this convention can decode
    pub fn pose_min_body(&self) -> usize {
        POSE_MIN_BODY.max(self.position_offset + POSE_ROTATION + 12)
    }

    pub fn validate(&self) -> Result<()> {
        if self.position_offset != 0 && self.position_offset != 4 {
            return Err(Error::InvalidConfig(format!(
                "position_offset must be 0 or 4, got {}",
                self.position_offset
            )));
        }
        if self.raw_frame_size < self.pose_min_body() {
            return Err(Error::InvalidConfig(format!(
                "raw_frame_size {} is smaller than a pose body ({})",
                self.raw_frame_size,
                self.pose_min_body()
            )));
        }
        Ok(())
    }
}

impl Default for WireConvention {
    fn default() -> Self {
        Self::gateway()
    }
}
