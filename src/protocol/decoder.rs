//! Payload decoder: frame body bytes to typed telemetry
//!
//! All layouts are fixed-offset and read through the deployment's
//! [`WireConvention`]. Decoding never fails loudly: a body that cannot be
//! decoded yields `None` and the caller moves on to the next frame.
//!
//! # Pose body
//!
//! Offsets are relative to `o = convention.position_offset` (0 or 4):
//!
//! ```text
//! o+0   position     3 x f32  (longitudinal, lateral, vertical)
//! o+12  rotation     3 x f32  degrees
//! o+24  translation  3 x f32
//! o+36  hook1        3 x f32
//! o+48  hook2        3 x f32
//! o+60  hook3        3 x f32
//! ```
//!
//! Vectors past the end of a short (>= 40 byte) body are left at zero.

use super::constants::*;
use super::message::{Frame, MessageEnvelope, MessageKind};
use super::nmea;
use super::wire::{ByteOrder, WireConvention};
use crate::core::types::{
    CooperationEntry, CraneId, CranePose, DistanceRecord, GpsFix, PointCloudFrame, Rgb, Vec3,
};

/// Decoded payload of one frame
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Pose(CranePose),
    PointCloud(PointCloudFrame),
    Distances(Vec<DistanceRecord>),
    Cooperation(Vec<CooperationEntry>),
    Gps(GpsFix),
    /// Kinds without a typed layout, body passed through untouched
    Opaque(Vec<u8>),
}

/// One decoded frame, as handed to the consumer
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryEvent {
    pub kind: MessageKind,
    pub source: CraneId,
    pub payload: Payload,
}

/// Map wire position axes onto the target convention
///
/// Wire order is (longitudinal, lateral, vertical); the target is Y-up:
/// `x = longitudinal`, `y = vertical`, `z = lateral`. This is the only place
/// the permutation lives.
#[inline]
pub fn remap_axes(wire: [f32; 3]) -> Vec3 {
    Vec3::new(wire[0], wire[2], wire[1])
}

/// True for NaN, infinities and magnitudes beyond [`MAX_ABS_VALUE`]
#[inline]
pub fn is_invalid(value: f32) -> bool {
    !value.is_finite() || value.abs() > MAX_ABS_VALUE
}

/// True for a word that could have been written by a sender on alignment
///
/// Misaligned windows splice the tail of one float onto the head of the
/// next, which in practice lands on NaN, a huge exponent or a tiny one.
#[inline]
fn is_aligned_word(value: f32) -> bool {
    value == 0.0 || (!is_invalid(value) && value.abs() >= MIN_ABS_RAW_VALUE)
}

/// Zero the whole vector if any component is invalid
#[inline]
fn sanitize(v: [f32; 3]) -> [f32; 3] {
    if v.iter().any(|&c| is_invalid(c)) {
        [0.0; 3]
    } else {
        v
    }
}

#[inline]
fn as_vec3(v: [f32; 3]) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}

/// Stateless decoder bound to one wire convention
#[derive(Debug, Clone, Copy)]
pub struct PayloadDecoder {
    convention: WireConvention,
}

impl PayloadDecoder {
    pub fn new(convention: WireConvention) -> Self {
        Self { convention }
    }

    pub fn convention(&self) -> &WireConvention {
        &self.convention
    }

    #[inline]
    fn order(&self) -> ByteOrder {
        self.convention.byte_order
    }

    /// Decode one frame into an event
    pub fn decode(&self, frame: Frame) -> Option<TelemetryEvent> {
        match frame {
            Frame::Sentence { source, line } => {
                let fix = nmea::parse_gpgga(&line)?;
                Some(TelemetryEvent {
                    kind: MessageKind::Sentence,
                    source,
                    payload: Payload::Gps(fix),
                })
            }
            Frame::Message(envelope) => self.decode_envelope(envelope),
        }
    }

    /// Decode one envelope; untyped kinds pass through as [`Payload::Opaque`]
    pub fn decode_envelope(&self, envelope: MessageEnvelope) -> Option<TelemetryEvent> {
        let MessageEnvelope { kind, source, body } = envelope;
        let payload = match kind {
            MessageKind::CraneAttitude => Payload::Pose(self.decode_pose(&body)?),
            MessageKind::PointCloud => Payload::PointCloud(self.decode_point_cloud(&body)?),
            MessageKind::Distance => Payload::Distances(self.decode_distances(&body)?),
            MessageKind::CooperationList => {
                Payload::Cooperation(self.decode_cooperation_list(&body)?)
            }
            _ => Payload::Opaque(body),
        };
        Some(TelemetryEvent {
            kind,
            source,
            payload,
        })
    }

    /// Decode a pose body, zeroing any vector group holding invalid numbers
    pub fn decode_pose(&self, body: &[u8]) -> Option<CranePose> {
        let raw = self.read_pose(body)?;
        Some(self.build_pose(raw.map(sanitize)))
    }

    /// Decode a pose body only if every word it carries is plausible as sent
    ///
    /// Used where no envelope marks frame boundaries: implausible numbers
    /// mean the stream is misaligned, not that the crane is somewhere odd.
    /// Every vector group that fits in the body is checked; each word must be
    /// exactly zero or have a magnitude between [`MIN_ABS_RAW_VALUE`] and
    /// [`MAX_ABS_VALUE`]. Groups past the end of a short body read as zero.
    pub fn decode_pose_strict(&self, body: &[u8]) -> Option<CranePose> {
        let raw = self.read_pose(body)?;
        if !raw.iter().flatten().all(|&c| is_aligned_word(c)) {
            return None;
        }
        Some(self.build_pose(raw))
    }

    /// Raw vector groups in body order: position, rotation, translation, hooks
    fn read_pose(&self, body: &[u8]) -> Option<[[f32; 3]; 6]> {
        if body.len() < self.convention.pose_min_body() {
            return None;
        }
        let base = self.convention.position_offset;
        let order = self.order();
        let read = |offset: usize| order.read_f32x3(body, base + offset).unwrap_or([0.0; 3]);

        Some([
            order.read_f32x3(body, base + POSE_POSITION)?,
            order.read_f32x3(body, base + POSE_ROTATION)?,
            read(POSE_TRANSLATION),
            read(POSE_HOOK1),
            read(POSE_HOOK2),
            read(POSE_HOOK3),
        ])
    }

    fn build_pose(&self, groups: [[f32; 3]; 6]) -> CranePose {
        let [position, rotation, translation, hook1, hook2, hook3] = groups;
        let rotation = if self.convention.negate_rotation {
            rotation.map(|c| -c)
        } else {
            rotation
        };
        CranePose {
            position: remap_axes(position),
            rotation: as_vec3(rotation),
            translation: as_vec3(translation),
            hook1: as_vec3(hook1),
            hook2: as_vec3(hook2),
            hook3: as_vec3(hook3),
        }
    }

    /// Decode a point cloud, keeping only complete records
    ///
    /// The claimed count is clamped to [`MAX_POINT_CLOUD_POINTS`] before
    /// anything is allocated. A body shorter than `8 + count * 24` is not an
    /// error: decoding stops at the last complete record.
    pub fn decode_point_cloud(&self, body: &[u8]) -> Option<PointCloudFrame> {
        let order = self.order();
        if body.len() < POINT_CLOUD_COUNT_FIELD {
            return None;
        }
        let claimed = order.read_u32(body, 0)? as usize;
        let count = claimed.min(MAX_POINT_CLOUD_POINTS);
        let present = (body.len() - POINT_CLOUD_COUNT_FIELD) / POINT_RECORD_SIZE;
        let n = count.min(present);

        let mut points = Vec::with_capacity(n);
        let mut colors = Vec::with_capacity(n);
        for i in 0..n {
            let at = POINT_CLOUD_COUNT_FIELD + i * POINT_RECORD_SIZE;
            let xyz = sanitize(order.read_f32x3(body, at)?);
            let rgb = sanitize(order.read_f32x3(body, at + 12)?);
            points.push(as_vec3(xyz));
            colors.push(Rgb {
                r: rgb[0],
                g: rgb[1],
                b: rgb[2],
            });
        }

        if n < count {
            log::debug!(
                "Point cloud truncated: claimed {}, decoded {}",
                claimed,
                n
            );
        }

        Some(PointCloudFrame {
            count: count as u32,
            points,
            colors,
        })
    }

    /// Decode a distance table
    pub fn decode_distances(&self, body: &[u8]) -> Option<Vec<DistanceRecord>> {
        let order = self.order();
        let count = (order.read_i32(body, 0)?.max(0) as usize).min(MAX_DISTANCE_RECORDS);
        let present = (body.len() - DISTANCE_COUNT_FIELD) / DISTANCE_RECORD_SIZE;

        let records = (0..count.min(present))
            .filter_map(|i| {
                let at = DISTANCE_COUNT_FIELD + i * DISTANCE_RECORD_SIZE;
                let distance = order.read_f32(body, at + 8)?;
                Some(DistanceRecord {
                    target: CraneId::new(order.read_i32(body, at)?, order.read_i32(body, at + 4)?),
                    distance: if is_invalid(distance) { 0.0 } else { distance },
                    alarm_level: order.read_i32(body, at + 12)?,
                })
            })
            .collect();
        Some(records)
    }

    /// Decode the cooperation list
    ///
    /// The body always carries [`COOPERATION_SLOTS`] slots; only the first
    /// `count` of them are live.
    pub fn decode_cooperation_list(&self, body: &[u8]) -> Option<Vec<CooperationEntry>> {
        let order = self.order();
        let count = (order.read_i32(body, 0)?.max(0) as usize).min(COOPERATION_SLOTS);
        let present = (body.len() - COOPERATION_COUNT_FIELD) / COOPERATION_RECORD_SIZE;

        let entries = (0..count.min(present))
            .filter_map(|i| {
                let at = COOPERATION_COUNT_FIELD + i * COOPERATION_RECORD_SIZE;
                let int = |field: usize| order.read_i32(body, at + field * 4);
                let note = &body[at + 24..at + 24 + COOPERATION_NOTE_SIZE];
                let end = note.iter().position(|&b| b == 0).unwrap_or(note.len());
                Some(CooperationEntry {
                    request_id: int(0)?,
                    from: CraneId::new(int(1)?, int(2)?),
                    to: CraneId::new(int(3)?, int(4)?),
                    state: int(5)?,
                    note: String::from_utf8_lossy(&note[..end]).trim().to_string(),
                })
            })
            .collect();
        Some(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::fixtures::{self, WirePose};

    fn gateway() -> PayloadDecoder {
        PayloadDecoder::new(WireConvention::gateway())
    }

    fn sample_pose() -> WirePose {
        WirePose {
            position: [12.5, -3.25, 40.0],
            rotation: [10.0, 0.0, 135.5],
            translation: [0.0, 7.5, 0.0],
            hook1: [1.0, 2.0, 3.0],
            hook2: [4.0, 5.0, 6.0],
            hook3: [7.0, 8.0, 9.0],
        }
    }

    #[test]
    fn test_pose_axis_permutation() {
        let decoder = gateway();
        let body = fixtures::encode_pose_body(decoder.convention(), &sample_pose(), 120);
        let pose = decoder.decode_pose(&body).unwrap();

        // (longitudinal, lateral, vertical) -> (x, y=vertical, z=lateral)
        assert_eq!(pose.position, Vec3::new(12.5, 40.0, -3.25));
        assert_eq!(pose.rotation, Vec3::new(10.0, 0.0, 135.5));
        assert_eq!(pose.translation, Vec3::new(0.0, 7.5, 0.0));
        assert_eq!(pose.hook1, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(pose.hook3, Vec3::new(7.0, 8.0, 9.0));
    }

    #[test]
    fn test_pose_device_socket_convention() {
        let decoder = PayloadDecoder::new(WireConvention::device_socket());
        let body = fixtures::encode_pose_body(decoder.convention(), &sample_pose(), 40);
        let pose = decoder.decode_pose(&body).unwrap();

        assert_eq!(pose.position, Vec3::new(12.5, 40.0, -3.25));
        // Encoder writes the wire sign, decoder restores the target sign
        assert_eq!(pose.rotation, Vec3::new(10.0, 0.0, 135.5));
        // 40-byte frame: translation fits from offset 24..36, hooks do not
        assert_eq!(pose.translation, Vec3::new(0.0, 7.5, 0.0));
        assert_eq!(pose.hook1, Vec3::ZERO);
    }

    #[test]
    fn test_conventions_not_interchangeable() {
        let body = fixtures::encode_pose_body(&WireConvention::gateway(), &sample_pose(), 120);
        let wrong = PayloadDecoder::new(WireConvention {
            byte_order: ByteOrder::Little,
            ..WireConvention::gateway()
        });
        let pose = wrong.decode_pose(&body).unwrap();
        assert_ne!(pose.position, Vec3::new(12.5, 40.0, -3.25));
    }

    #[test]
    fn test_short_pose_body_fails() {
        let decoder = gateway();
        assert!(decoder.decode_pose(&[0u8; 39]).is_none());
        assert!(decoder.decode_pose(&[]).is_none());
        assert!(decoder.decode_pose(&[0u8; 40]).is_some());
    }

    #[test]
    fn test_position_sanitized_independently() {
        let decoder = gateway();

        let mut wire = sample_pose();
        wire.position[1] = f32::NAN;
        let body = fixtures::encode_pose_body(decoder.convention(), &wire, 120);
        let pose = decoder.decode_pose(&body).unwrap();
        assert_eq!(pose.position, Vec3::ZERO);
        assert_eq!(pose.rotation, Vec3::new(10.0, 0.0, 135.5));

        let mut wire = sample_pose();
        wire.position[2] = 2_000_000.0;
        let body = fixtures::encode_pose_body(decoder.convention(), &wire, 120);
        assert_eq!(decoder.decode_pose(&body).unwrap().position, Vec3::ZERO);
    }

    #[test]
    fn test_rotation_sanitized_independently() {
        let decoder = gateway();
        let mut wire = sample_pose();
        wire.rotation[0] = f32::INFINITY;
        let body = fixtures::encode_pose_body(decoder.convention(), &wire, 120);
        let pose = decoder.decode_pose(&body).unwrap();

        assert_eq!(pose.rotation, Vec3::ZERO);
        assert_eq!(pose.position, Vec3::new(12.5, 40.0, -3.25));
    }

    #[test]
    fn test_strict_pose_rejects_implausible() {
        let decoder = gateway();
        let mut wire = sample_pose();
        wire.rotation[2] = f32::NAN;
        let body = fixtures::encode_pose_body(decoder.convention(), &wire, 120);

        assert!(decoder.decode_pose(&body).is_some());
        assert!(decoder.decode_pose_strict(&body).is_none());

        // Any group that fits counts, hooks included
        let mut wire = sample_pose();
        wire.hook2 = [f32::NAN; 3];
        let body = fixtures::encode_pose_body(decoder.convention(), &wire, 120);
        assert_eq!(decoder.decode_pose(&body).unwrap().hook2, Vec3::ZERO);
        assert!(decoder.decode_pose_strict(&body).is_none());
    }

    #[test]
    fn test_strict_pose_rejects_tiny_words() {
        let decoder = PayloadDecoder::new(WireConvention::device_socket());

        let mut wire = sample_pose();
        wire.translation[1] = 1.0e-30;
        let body = fixtures::encode_pose_body(decoder.convention(), &wire, 40);
        assert!(decoder.decode_pose(&body).is_some());
        assert!(decoder.decode_pose_strict(&body).is_none());

        let mut wire = sample_pose();
        wire.position[0] = f32::from_bits(1);
        let body = fixtures::encode_pose_body(decoder.convention(), &wire, 40);
        assert!(decoder.decode_pose_strict(&body).is_none());

        // Exact zeros are fine, and hooks beyond a 40-byte frame are not read
        let mut wire = sample_pose();
        wire.hook1 = [f32::NAN; 3];
        let body = fixtures::encode_pose_body(decoder.convention(), &wire, 40);
        let pose = decoder.decode_pose_strict(&body).unwrap();
        assert_eq!(pose.position, Vec3::new(12.5, 40.0, -3.25));
        assert_eq!(pose.rotation, Vec3::new(10.0, 0.0, 135.5));
        assert_eq!(pose.hook1, Vec3::ZERO);
    }

    #[test]
    fn test_point_cloud_clamp_and_truncation() {
        let decoder = gateway();
        let points = [([1.0, 2.0, 3.0], [0.5, 0.5, 0.5]); 5];
        let mut body = fixtures::encode_point_cloud_body(ByteOrder::Big, 10_000_000, &points);
        // Half a record of trailing junk
        body.extend_from_slice(&[0xAB; 12]);

        let cloud = decoder.decode_point_cloud(&body).unwrap();
        assert_eq!(cloud.points.len(), 5);
        assert_eq!(cloud.colors.len(), 5);
        assert_eq!(cloud.count as usize, MAX_POINT_CLOUD_POINTS);
        assert_eq!(cloud.points[4], Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_point_cloud_count_limits_records() {
        let decoder = gateway();
        let points = [([1.0, 2.0, 3.0], [1.0, 0.0, 0.0]); 4];
        let body = fixtures::encode_point_cloud_body(ByteOrder::Big, 2, &points);

        let cloud = decoder.decode_point_cloud(&body).unwrap();
        assert_eq!(cloud.count, 2);
        assert_eq!(cloud.points.len(), 2);
        assert_eq!(cloud.colors[1], Rgb { r: 1.0, g: 0.0, b: 0.0 });
    }

    #[test]
    fn test_point_cloud_too_short() {
        assert!(gateway().decode_point_cloud(&[0u8; 7]).is_none());
        let cloud = gateway().decode_point_cloud(&[0u8; 8]).unwrap();
        assert!(cloud.points.is_empty());
    }

    #[test]
    fn test_distances() {
        let decoder = gateway();
        let records = [
            DistanceRecord {
                target: CraneId::new(0, 2),
                distance: 35.5,
                alarm_level: 0,
            },
            DistanceRecord {
                target: CraneId::new(1, 4),
                distance: 8.25,
                alarm_level: 2,
            },
        ];
        let body = fixtures::encode_distance_body(ByteOrder::Big, &records);
        assert_eq!(decoder.decode_distances(&body).unwrap(), records.to_vec());

        // Negative count decodes as empty
        let body = fixtures::encode_distance_body(ByteOrder::Big, &[]);
        let mut neg = body.clone();
        neg[..4].copy_from_slice(&(-3i32).to_be_bytes());
        assert!(decoder.decode_distances(&neg).unwrap().is_empty());
    }

    #[test]
    fn test_cooperation_list() {
        let decoder = gateway();
        let entries = [CooperationEntry {
            request_id: 77,
            from: CraneId::new(0, 5),
            to: CraneId::new(2, 1),
            state: 1,
            note: "lift beam B-12".to_string(),
        }];
        let body = fixtures::encode_cooperation_body(ByteOrder::Big, 1, &entries);
        assert_eq!(body.len(), 4 + 1640);
        assert_eq!(decoder.decode_cooperation_list(&body).unwrap(), entries.to_vec());

        // Count above the slot total is clamped to the slots
        let body = fixtures::encode_cooperation_body(ByteOrder::Big, 500, &entries);
        assert_eq!(decoder.decode_cooperation_list(&body).unwrap().len(), 10);
    }

    #[test]
    fn test_opaque_passthrough() {
        let decoder = gateway();
        let env = MessageEnvelope {
            kind: MessageKind::CraneStatus,
            source: CraneId::new(3, 1),
            body: vec![9; 256],
        };
        let event = decoder.decode_envelope(env).unwrap();
        assert_eq!(event.kind, MessageKind::CraneStatus);
        assert_eq!(event.source, CraneId::new(3, 1));
        assert_eq!(event.payload, Payload::Opaque(vec![9; 256]));
    }

    #[test]
    fn test_sentence_frame() {
        let decoder = PayloadDecoder::new(WireConvention::device_socket());
        let frame = Frame::Sentence {
            source: CraneId::new(9, 1),
            line: b"$GPGGA,123456,3454.141,N,12835.8326,E,1,08,0.9,40.0,M,,,,*47\n".to_vec(),
        };
        let event = decoder.decode(frame).unwrap();
        assert_eq!(event.kind, MessageKind::Sentence);
        assert!(matches!(event.payload, Payload::Gps(fix) if fix.altitude == 40.0));

        let junk = Frame::Sentence {
            source: CraneId::new(9, 1),
            line: b"$GPVTG,,T,,M,0.0,N,0.0,K*4E\n".to_vec(),
        };
        assert!(decoder.decode(junk).is_none());
    }
}
