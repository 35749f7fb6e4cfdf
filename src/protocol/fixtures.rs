//! Synthetic frame builders
//!
//! Encodes telemetry the way a crane gateway would put it on the wire.
//! Shared by the test suites and the `setu-sim` bench simulator.

use super::constants::*;
use super::nmea::decimal_to_dm;
use super::wire::{ByteOrder, WireConvention};
use crate::core::types::{CooperationEntry, CraneId, DistanceRecord, GpsFix};

/// Pose values exactly as they appear on the wire
///
/// `position` is in wire axis order (longitudinal, lateral, vertical);
/// `rotation` is in the target sign, the encoder applies the convention's negation.
#[derive(Debug, Clone, Copy, Default)]
pub struct WirePose {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub translation: [f32; 3],
    pub hook1: [f32; 3],
    pub hook2: [f32; 3],
    pub hook3: [f32; 3],
}

fn put_f32x3(out: &mut [u8], order: ByteOrder, offset: usize, v: [f32; 3]) {
    for (i, c) in v.iter().enumerate() {
        let at = offset + i * 4;
        if at + 4 <= out.len() {
            out[at..at + 4].copy_from_slice(&order.f32_bytes(*c));
        }
    }
}

/// 12-byte envelope followed by `body`
pub fn encode_envelope(order: ByteOrder, msg_id: i32, source: CraneId, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ENVELOPE_SIZE + body.len());
    out.extend_from_slice(&order.i32_bytes(msg_id));
    out.extend_from_slice(&order.i32_bytes(source.pier_id));
    out.extend_from_slice(&order.i32_bytes(source.crane_id));
    out.extend_from_slice(body);
    out
}

/// Pose body of `len` bytes; groups that do not fit are left out
pub fn encode_pose_body(convention: &WireConvention, pose: &WirePose, len: usize) -> Vec<u8> {
    let mut body = vec![0u8; len];
    let order = convention.byte_order;
    let base = convention.position_offset;
    let rotation = if convention.negate_rotation {
        pose.rotation.map(|c| -c)
    } else {
        pose.rotation
    };

    put_f32x3(&mut body, order, base + POSE_POSITION, pose.position);
    put_f32x3(&mut body, order, base + POSE_ROTATION, rotation);
    put_f32x3(&mut body, order, base + POSE_TRANSLATION, pose.translation);
    put_f32x3(&mut body, order, base + POSE_HOOK1, pose.hook1);
    put_f32x3(&mut body, order, base + POSE_HOOK2, pose.hook2);
    put_f32x3(&mut body, order, base + POSE_HOOK3, pose.hook3);
    body
}

/// Point cloud body: claimed count, 4 reserved bytes, then the given records
///
/// `claimed` may disagree with `points.len()` to model corrupt streams.
pub fn encode_point_cloud_body(
    order: ByteOrder,
    claimed: u32,
    points: &[([f32; 3], [f32; 3])],
) -> Vec<u8> {
    let mut body = vec![0u8; POINT_CLOUD_COUNT_FIELD + points.len() * POINT_RECORD_SIZE];
    body[..4].copy_from_slice(&order.i32_bytes(claimed as i32));
    for (i, (xyz, rgb)) in points.iter().enumerate() {
        let at = POINT_CLOUD_COUNT_FIELD + i * POINT_RECORD_SIZE;
        put_f32x3(&mut body, order, at, *xyz);
        put_f32x3(&mut body, order, at + 12, *rgb);
    }
    body
}

/// Distance body: count followed by one 16-byte record each
pub fn encode_distance_body(order: ByteOrder, records: &[DistanceRecord]) -> Vec<u8> {
    let mut body = Vec::with_capacity(DISTANCE_COUNT_FIELD + records.len() * DISTANCE_RECORD_SIZE);
    body.extend_from_slice(&order.i32_bytes(records.len() as i32));
    for r in records {
        body.extend_from_slice(&order.i32_bytes(r.target.pier_id));
        body.extend_from_slice(&order.i32_bytes(r.target.crane_id));
        body.extend_from_slice(&order.f32_bytes(r.distance));
        body.extend_from_slice(&order.i32_bytes(r.alarm_level));
    }
    body
}

/// Cooperation list body: count, then always ten 164-byte slots
pub fn encode_cooperation_body(
    order: ByteOrder,
    count: i32,
    entries: &[CooperationEntry],
) -> Vec<u8> {
    let mut body = vec![0u8; COOPERATION_COUNT_FIELD + COOPERATION_SLOTS * COOPERATION_RECORD_SIZE];
    body[..4].copy_from_slice(&order.i32_bytes(count));
    for (slot, e) in entries.iter().take(COOPERATION_SLOTS).enumerate() {
        let at = COOPERATION_COUNT_FIELD + slot * COOPERATION_RECORD_SIZE;
        let ints = [
            e.request_id,
            e.from.pier_id,
            e.from.crane_id,
            e.to.pier_id,
            e.to.crane_id,
            e.state,
        ];
        for (i, v) in ints.iter().enumerate() {
            body[at + i * 4..at + i * 4 + 4].copy_from_slice(&order.i32_bytes(*v));
        }
        let note = e.note.as_bytes();
        let n = note.len().min(COOPERATION_NOTE_SIZE);
        body[at + 24..at + 24 + n].copy_from_slice(&note[..n]);
    }
    body
}

/// `$GPGGA` line with a valid checksum and `\r\n` terminator
pub fn encode_gpgga(fix: &GpsFix) -> String {
    let lat_hemi = if fix.latitude < 0.0 { 'S' } else { 'N' };
    let lon_hemi = if fix.longitude < 0.0 { 'W' } else { 'E' };
    let body = format!(
        "GPGGA,000000,{:09.4},{},{:010.4},{},{},{:02},0.9,{:.1},M,,,,",
        decimal_to_dm(fix.latitude.abs()),
        lat_hemi,
        decimal_to_dm(fix.longitude.abs()),
        lon_hemi,
        fix.quality,
        fix.satellites,
        fix.altitude
    );
    let checksum = body.bytes().fold(0u8, |acc, b| acc ^ b);
    format!("${}*{:02X}\r\n", body, checksum)
}
