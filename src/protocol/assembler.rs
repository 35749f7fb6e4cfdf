//! Frame assembly: byte stream to complete frames
//!
//! Both framing modes are exposed as pure functions of the buffered bytes
//! ([`split_header_frames`], [`split_raw_frames`]) returning the frames found
//! and how many leading bytes they used. [`FrameAssembler`] wraps them with a
//! per-connection [`StreamBuffer`] so trailing partial data carries over to
//! the next chunk.
//!
//! # Header mode
//!
//! ```text
//! ┌───────────┬────────────┬─────────────┬──────────────────────┐
//! │ msgId i32 │ pierId i32 │ craneId i32 │ body (kind-specific) │
//! └───────────┴────────────┴─────────────┴──────────────────────┘
//! ```
//!
//! Body length comes from the fixed table, or for counted kinds from the
//! count field right after the envelope. A corrupt envelope is not
//! resynchronized: header mode trusts the stream alignment.
//!
//! Counted bodies are framed on the length they claim, but only the first
//! [`max_body_len`] bytes are kept. The frame is emitted once that prefix
//! is buffered; the rest of the body is dropped as it arrives
//! ([`Split::skip`]) so the next envelope starts where the sender put it.
//!
//! # Raw mode
//!
//! A `$` starts a text line running to `\n`; once one is seen the connection
//! is in GPS mode and stray binary is skipped byte by byte. Otherwise the
//! stream is fixed-size binary pose frames; a frame that fails to decode
//! costs one byte and the scan retries one position later.

use super::buffer::StreamBuffer;
use super::constants::*;
use super::decoder::PayloadDecoder;
use super::message::{Frame, MessageEnvelope, MessageKind};
use super::wire::{ByteOrder, Framing, WireConvention};
use crate::core::types::CraneId;

/// Frames found in a buffer and the number of leading bytes they consumed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Split {
    pub frames: Vec<Frame>,
    pub consumed: usize,
    /// Oversized-body bytes dropped (included in `consumed`)
    pub discarded: usize,
    /// Oversized-body bytes not yet received that must be dropped on arrival
    pub skip: usize,
}

/// Result of a raw-mode split
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSplit {
    pub frames: Vec<Frame>,
    pub consumed: usize,
    /// Bytes dropped for resynchronization (included in `consumed`)
    pub discarded: usize,
    /// GPS-mode flag after the split
    pub gps_mode: bool,
}

/// Body length a header-mode message claims, or `None` if more bytes are needed
///
/// `body` is everything buffered after the envelope. For counted kinds the
/// count field must be present before a length can be given; the length is
/// taken from the count as sent, however large.
pub fn header_body_len(kind: MessageKind, body: &[u8], order: ByteOrder) -> Option<usize> {
    if let Some(len) = kind.fixed_body_len() {
        return Some(len);
    }
    match kind {
        MessageKind::PointCloud => {
            if body.len() < POINT_CLOUD_COUNT_FIELD {
                return None;
            }
            let count = order.read_u32(body, 0)? as usize;
            Some(POINT_CLOUD_COUNT_FIELD.saturating_add(count.saturating_mul(POINT_RECORD_SIZE)))
        }
        MessageKind::Distance => {
            let count = order.read_i32(body, 0)?.max(0) as usize;
            Some(DISTANCE_COUNT_FIELD.saturating_add(count.saturating_mul(DISTANCE_RECORD_SIZE)))
        }
        MessageKind::CooperationList => {
            // Count is read but the body always holds every slot
            order.read_i32(body, 0)?;
            Some(COOPERATION_COUNT_FIELD + COOPERATION_SLOTS * COOPERATION_RECORD_SIZE)
        }
        _ => Some(0),
    }
}

/// Most body bytes kept in memory for one message of `kind`
///
/// Counted kinds are capped at their record ceiling; the decoder reads no
/// further than that anyway.
pub fn max_body_len(kind: MessageKind) -> usize {
    match kind {
        MessageKind::PointCloud => {
            POINT_CLOUD_COUNT_FIELD + MAX_POINT_CLOUD_POINTS * POINT_RECORD_SIZE
        }
        MessageKind::Distance => DISTANCE_COUNT_FIELD + MAX_DISTANCE_RECORDS * DISTANCE_RECORD_SIZE,
        _ => usize::MAX,
    }
}

/// One message taken off the front of a buffer
struct HeaderFrame {
    envelope: MessageEnvelope,
    /// Bytes of the buffer it used, dropped tail included
    consumed: usize,
    /// Tail bytes dropped from the buffer
    dropped: usize,
    /// Tail bytes still to come
    skip: usize,
}

/// Extract one header-mode message from the front of `buf`
fn next_header_frame(buf: &[u8], order: ByteOrder) -> Option<HeaderFrame> {
    if buf.len() < ENVELOPE_SIZE {
        return None;
    }
    let kind = MessageKind::from(order.read_i32(buf, 0)?);
    let source = CraneId::new(order.read_i32(buf, 4)?, order.read_i32(buf, 8)?);
    let claimed = header_body_len(kind, &buf[ENVELOPE_SIZE..], order)?;
    let kept = claimed.min(max_body_len(kind));
    let kept_end = ENVELOPE_SIZE + kept;
    if buf.len() < kept_end {
        return None;
    }

    let excess = claimed - kept;
    let dropped = excess.min(buf.len() - kept_end);
    Some(HeaderFrame {
        envelope: MessageEnvelope {
            kind,
            source,
            body: buf[ENVELOPE_SIZE..kept_end].to_vec(),
        },
        consumed: kept_end + dropped,
        dropped,
        skip: excess - dropped,
    })
}

/// Split header-mode frames off the front of `buf`
///
/// Never emits a partial frame; bytes after the last complete frame are
/// left for the caller to keep. A non-zero [`Split::skip`] means the buffer
/// ended inside the dropped tail of an oversized body, and that many of the
/// next incoming bytes belong to it.
pub fn split_header_frames(buf: &[u8], order: ByteOrder) -> Split {
    let mut split = Split::default();
    while let Some(frame) = next_header_frame(&buf[split.consumed..], order) {
        split.frames.push(Frame::Message(frame.envelope));
        split.consumed += frame.consumed;
        split.discarded += frame.dropped;
        if frame.skip > 0 {
            split.skip = frame.skip;
            break;
        }
    }
    split
}

/// Split raw-mode frames off the front of `buf`
///
/// `gps_mode` is the connection's flag going in; the updated flag comes back
/// in [`RawSplit::gps_mode`]. Binary frames are attributed to `source`.
pub fn split_raw_frames(
    buf: &[u8],
    gps_mode: bool,
    decoder: &PayloadDecoder,
    source: CraneId,
) -> RawSplit {
    let frame_size = decoder.convention().raw_frame_size;
    let mut split = RawSplit {
        gps_mode,
        ..RawSplit::default()
    };

    loop {
        let rest = &buf[split.consumed..];
        let Some(&first) = rest.first() else {
            break;
        };

        if first == SENTENCE_START {
            match rest.iter().position(|&b| b == SENTENCE_END) {
                Some(end) => {
                    split.frames.push(Frame::Sentence {
                        source,
                        line: rest[..=end].to_vec(),
                    });
                    split.consumed += end + 1;
                    split.gps_mode = true;
                }
                None if rest.len() > MAX_SENTENCE_LEN => {
                    // Runaway line: the `$` was noise
                    split.consumed += 1;
                    split.discarded += 1;
                }
                None => break,
            }
            continue;
        }

        if split.gps_mode {
            // Same outcome as dropping one byte at a time until the next `$`
            let skip = rest
                .iter()
                .position(|&b| b == SENTENCE_START)
                .unwrap_or(rest.len());
            split.consumed += skip;
            split.discarded += skip;
            continue;
        }

        if rest.len() < frame_size {
            break;
        }
        let candidate = &rest[..frame_size];
        if decoder.decode_pose_strict(candidate).is_some() {
            split.frames.push(Frame::Message(MessageEnvelope {
                kind: MessageKind::CraneAttitude,
                source,
                body: candidate.to_vec(),
            }));
            split.consumed += frame_size;
        } else {
            split.consumed += 1;
            split.discarded += 1;
        }
    }

    split
}

/// Running totals for one assembler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblerStats {
    pub bytes_in: u64,
    pub frames_out: u64,
    pub bytes_discarded: u64,
}

/// Per-connection frame assembler
///
/// Owns the connection's byte buffer and GPS-mode flag; touched only by the
/// connection's own thread.
#[derive(Debug)]
pub struct FrameAssembler {
    buffer: StreamBuffer,
    decoder: PayloadDecoder,
    source: CraneId,
    gps_mode: bool,
    /// Incoming bytes still owed to an oversized header-mode body
    skip: usize,
    stats: AssemblerStats,
}

impl FrameAssembler {
    /// Create an assembler for one endpoint
    ///
    /// `source` tags raw-mode frames, which carry no envelope of their own.
    pub fn new(convention: WireConvention, source: CraneId) -> Self {
        Self {
            buffer: StreamBuffer::new(),
            decoder: PayloadDecoder::new(convention),
            source,
            gps_mode: false,
            skip: 0,
            stats: AssemblerStats::default(),
        }
    }

    pub fn framing(&self) -> Framing {
        self.decoder.convention().framing
    }

    /// Decoder for the frames this assembler produces
    pub fn decoder(&self) -> &PayloadDecoder {
        &self.decoder
    }

    /// Append a chunk and return every frame it completed, in stream order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.stats.bytes_in += chunk.len() as u64;
        let owed = self.skip.min(chunk.len());
        self.skip -= owed;
        self.stats.bytes_discarded += owed as u64;
        self.buffer.extend(&chunk[owed..]);

        let (frames, consumed) = match self.framing() {
            Framing::Header => {
                let split =
                    split_header_frames(self.buffer.as_slice(), self.decoder.convention().byte_order);
                if split.discarded > 0 || split.skip > 0 {
                    log::warn!(
                        "Crane {}: message body over the memory ceiling, dropping {} bytes",
                        self.source,
                        split.discarded + split.skip
                    );
                }
                self.skip = split.skip;
                self.stats.bytes_discarded += split.discarded as u64;
                (split.frames, split.consumed)
            }
            Framing::Raw => {
                let split = split_raw_frames(
                    self.buffer.as_slice(),
                    self.gps_mode,
                    &self.decoder,
                    self.source,
                );
                if split.gps_mode && !self.gps_mode {
                    log::info!("Crane {}: text sentences detected, switching to GPS mode", self.source);
                }
                if split.discarded > 0 {
                    log::debug!("Crane {}: dropped {} bytes to resync", self.source, split.discarded);
                }
                self.gps_mode = split.gps_mode;
                self.stats.bytes_discarded += split.discarded as u64;
                (split.frames, split.consumed)
            }
        };

        self.buffer.advance(consumed);
        self.stats.frames_out += frames.len() as u64;
        frames
    }

    /// Forget buffered bytes, any pending skip and GPS mode (new connection)
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.gps_mode = false;
        self.skip = 0;
    }

    /// Incoming bytes still to be dropped for an oversized body
    pub fn pending_skip(&self) -> usize {
        self.skip
    }

    /// Bytes waiting for the rest of their frame
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_gps_mode(&self) -> bool {
        self.gps_mode
    }

    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }
}
