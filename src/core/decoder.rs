//! # Incremental Datagram Decoder
//!
//! Consumes byte chunks of any size and reassembles [`UdpPacket`]s, resuming
//! exactly where the previous chunk stopped.
//!
//! ## States
//! - **Seeking marker** (`byte_offset == 0`): bytes are dropped from the front
//!   until `"$UDP$"` sits at the front of the buffer. A trailing partial marker
//!   is kept so a marker split across two chunks is still found.
//! - **Parsing header** (`byte_offset` 5..13): source port, destination port,
//!   length and checksum are read two bytes at a time as they arrive.
//! - **Awaiting body** (`can_read`): body bytes accumulate until `length - 8`
//!   are buffered. Anything past that is split off and returned as overflow.
//! - **Frame complete** (`end_of_packet`): `packet_is_valid` holds the result
//!   of the checksum comparison.
//!
//! The frame stays in the buffer, marker included, until it is validated. A
//! rejected frame returns everything after the first byte of its marker as
//! overflow, so a marker completed by line noise (`"$UDP"` followed by the
//! `'$'` of a real packet) costs one rescan instead of the packet behind it.
//! While a body is incomplete, a later marker that already starts a complete,
//! valid frame takes precedence and the current frame is rejected.
//!
//! A corrupted frame is never an error. It completes with
//! `packet_is_valid == false` and the caller keeps feeding overflow.
//!
//! ## Reuse
//! The first `feed` after a completed frame discards that frame and starts a
//! fresh marker scan, so one decoder serves a whole stream:
//!
//! ```rust
//! use telemetry_protocol::core::builder::{PacketBuilder, UdpPacketBuilder};
//! use telemetry_protocol::core::decoder::UdpPacketDecoder;
//! use telemetry_protocol::core::packet::Packet;
//!
//! let mut first = UdpPacketBuilder::new(1, 0)?;
//! first.add(1u8);
//! let mut second = UdpPacketBuilder::new(2, 0)?;
//! second.add(2u8);
//!
//! let mut stream = first.to_packet()?.to_bytes().to_vec();
//! stream.extend_from_slice(&second.to_packet()?.to_bytes());
//!
//! let mut decoder = UdpPacketDecoder::new();
//! let overflow = decoder.feed(&stream);
//! assert_eq!(decoder.to_packet().map(|p| p.header().dest_port()), Some(1));
//!
//! decoder.feed(&overflow);
//! assert_eq!(decoder.to_packet().map(|p| p.header().dest_port()), Some(2));
//! # Ok::<(), telemetry_protocol::error::ProtocolError>(())
//! ```

use std::sync::Arc;

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::config::DecoderConfig;
use crate::core::checksum;
use crate::core::header::{UdpHeader, UDP_HEADER_LEN, UDP_MAX_BODY_LEN};
use crate::core::packet::{UdpPacket, PSEUDO_HEADER, PSEUDO_HEADER_LEN};
use crate::utils::metrics::Metrics;

/// Offset of the source port field from the start of the marker
const SOURCE_PORT_OFFSET: usize = PSEUDO_HEADER_LEN;
const DEST_PORT_OFFSET: usize = SOURCE_PORT_OFFSET + 2;
const LENGTH_OFFSET: usize = DEST_PORT_OFFSET + 2;
const CHECKSUM_OFFSET: usize = LENGTH_OFFSET + 2;

/// Offset of the first body byte from the start of the marker
pub const BODY_OFFSET: usize = PSEUDO_HEADER_LEN + UDP_HEADER_LEN;

/// Why a packet can or cannot be read yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// Marker or header fields still missing
    InHeader,
    /// Header parsed, body incomplete
    AwaitingBody,
    /// Frame complete but rejected (checksum mismatch or malformed header)
    Invalid,
    /// Frame complete and valid
    Complete,
}

/// Valid packets and rejected frame count from one [`UdpPacketDecoder::decode`] call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DecodeBatch {
    pub packets: Vec<UdpPacket>,
    pub rejected: usize,
}

/// What a marker found further along the buffer currently starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Candidate {
    Valid,
    Invalid,
    Incomplete,
}

/// Incremental decoder for marker-framed datagrams.
///
/// One instance per logical stream; calls on one instance must be serialized.
#[derive(Debug)]
pub struct UdpPacketDecoder {
    /// Current frame from its marker onward, or unsynchronized input
    buffer: BytesMut,
    body: Bytes,
    byte_offset: usize,
    source_port: u16,
    dest_port: u16,
    length: u16,
    checksum: i16,
    can_read: bool,
    end_of_packet: bool,
    packet_is_valid: bool,
    read_pos: usize,
    /// Markers after the current one whose frames are not yet complete
    candidates: Vec<usize>,
    /// First buffer position not yet checked for a later marker
    scanned_to: usize,
    max_body_len: usize,
    metrics: Option<Arc<Metrics>>,
}

impl Default for UdpPacketDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl UdpPacketDecoder {
    pub fn new() -> Self {
        Self::with_config(&DecoderConfig::default())
    }

    pub fn with_config(config: &DecoderConfig) -> Self {
        Self {
            buffer: BytesMut::with_capacity(config.buffer_capacity),
            body: Bytes::new(),
            byte_offset: 0,
            source_port: 0,
            dest_port: 0,
            length: 0,
            checksum: 0,
            can_read: false,
            end_of_packet: false,
            packet_is_valid: false,
            read_pos: 0,
            candidates: Vec::new(),
            scanned_to: 0,
            max_body_len: config.max_body_size.min(UDP_MAX_BODY_LEN),
            metrics: None,
        }
    }

    /// Report decoding activity to a shared collector.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Add a chunk to the stream and return any bytes past the current frame.
    ///
    /// The overflow is empty until a frame completes. When it is not empty it
    /// must be fed back, to this decoder or another one, to continue the stream.
    /// For a rejected frame the overflow starts one byte after its marker.
    pub fn feed(&mut self, chunk: &[u8]) -> Bytes {
        if self.end_of_packet {
            self.reset();
        }

        if let Some(metrics) = &self.metrics {
            metrics.chunk_fed(chunk.len() as u64);
        }

        self.buffer.extend_from_slice(chunk);
        self.parse_header();

        self.can_read = self.byte_offset >= BODY_OFFSET;
        if !self.can_read {
            return Bytes::new();
        }

        self.complete_frame()
    }

    /// Feed a chunk and keep re-feeding overflow until the decoder needs more data.
    ///
    /// Trailing partial frames stay buffered for the next call.
    pub fn decode(&mut self, chunk: &[u8]) -> DecodeBatch {
        let mut batch = DecodeBatch::default();
        let mut pending = self.feed(chunk);

        while self.end_of_packet {
            match self.to_packet() {
                Some(packet) => batch.packets.push(packet),
                None => batch.rejected += 1,
            }

            if pending.is_empty() {
                break;
            }
            let next = pending;
            pending = self.feed(&next);
        }

        batch
    }

    /// The decoded packet, if the frame is complete and valid.
    pub fn to_packet(&self) -> Option<UdpPacket> {
        if self.end_of_packet && self.packet_is_valid {
            Some(UdpPacket::from_wire(self.wire_header(), self.body.clone()))
        } else {
            None
        }
    }

    /// Header fields parsed so far, once all four are available.
    pub fn header(&self) -> Option<UdpHeader> {
        self.can_read.then(|| self.wire_header())
    }

    pub fn status(&self) -> DecodeStatus {
        if !self.can_read {
            DecodeStatus::InHeader
        } else if !self.end_of_packet {
            DecodeStatus::AwaitingBody
        } else if !self.packet_is_valid {
            DecodeStatus::Invalid
        } else {
            DecodeStatus::Complete
        }
    }

    /// Whether the header has been fully parsed.
    pub fn can_read(&self) -> bool {
        self.can_read
    }

    /// Whether the body has been fully received.
    pub fn end_of_packet(&self) -> bool {
        self.end_of_packet
    }

    /// Whether the completed frame passed validation.
    pub fn packet_is_valid(&self) -> bool {
        self.packet_is_valid
    }

    /// Marker and header bytes consumed since the last resync (0..=13).
    pub fn byte_offset(&self) -> usize {
        self.byte_offset
    }

    /// Body bytes consumed by the typed readers.
    pub fn offset(&self) -> usize {
        self.read_pos
    }

    /// Body bytes received but not yet consumed by the typed readers.
    pub fn remaining(&self) -> usize {
        if self.can_read {
            self.received_body().len().saturating_sub(self.read_pos)
        } else {
            0
        }
    }

    /// Drop all buffered data and return to marker scanning.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.body = Bytes::new();
        self.byte_offset = 0;
        self.source_port = 0;
        self.dest_port = 0;
        self.length = 0;
        self.checksum = 0;
        self.can_read = false;
        self.end_of_packet = false;
        self.packet_is_valid = false;
        self.read_pos = 0;
        self.candidates.clear();
        self.scanned_to = 0;
    }

    fn wire_header(&self) -> UdpHeader {
        UdpHeader::from_wire(self.source_port, self.dest_port, self.length, self.checksum)
    }

    fn parse_header(&mut self) {
        if self.byte_offset == 0 && !self.seek_marker() {
            return;
        }

        while self.byte_offset < BODY_OFFSET && self.buffer.len() >= self.byte_offset + 2 {
            let value = wire_u16(&self.buffer, self.byte_offset);
            match self.byte_offset {
                SOURCE_PORT_OFFSET => self.source_port = value,
                DEST_PORT_OFFSET => self.dest_port = value,
                LENGTH_OFFSET => self.length = value,
                CHECKSUM_OFFSET => self.checksum = value as i16,
                _ => {}
            }
            self.byte_offset += 2;
        }
    }

    /// Drop bytes until the marker is at the front of the buffer.
    fn seek_marker(&mut self) -> bool {
        let discard = match find_marker(&self.buffer) {
            Some(pos) => pos,
            None => self.buffer.len() - partial_marker_len(&self.buffer),
        };

        if discard > 0 {
            self.buffer.advance(discard);
            debug!(discarded = discard, "Resynchronizing on packet marker");
            if let Some(metrics) = &self.metrics {
                metrics.bytes_skipped(discard as u64);
            }
        }

        if self.buffer.starts_with(PSEUDO_HEADER) {
            self.byte_offset = PSEUDO_HEADER_LEN;
            self.scanned_to = 1;
            true
        } else {
            false
        }
    }

    fn complete_frame(&mut self) -> Bytes {
        let declared = self.length as usize;
        if declared < UDP_HEADER_LEN || declared - UDP_HEADER_LEN > self.max_body_len {
            warn!(
                length = declared,
                max_body = self.max_body_len,
                "Rejecting frame with malformed length"
            );
            return self.reject();
        }

        let frame_len = BODY_OFFSET + declared - UDP_HEADER_LEN;
        if self.buffer.len() < frame_len {
            if self.later_frame_is_complete() {
                debug!(
                    buffered = self.buffer.len(),
                    needed = frame_len,
                    "Abandoning incomplete frame for a later valid one"
                );
                return self.reject();
            }
            trace!(
                buffered = self.buffer.len(),
                needed = frame_len,
                "Awaiting body bytes"
            );
            return Bytes::new();
        }

        let valid = self.dest_port != 0
            && checksum::verify(
                self.source_port,
                self.dest_port,
                &self.buffer[BODY_OFFSET..frame_len],
                self.checksum,
            );
        if !valid {
            warn!(
                source_port = self.source_port,
                dest_port = self.dest_port,
                checksum = self.checksum,
                "Rejecting frame with invalid checksum or destination"
            );
            return self.reject();
        }

        let overflow = self.buffer.split_off(frame_len).freeze();
        self.body = self.buffer.split().freeze().slice(BODY_OFFSET..);
        debug!(
            source_port = self.source_port,
            dest_port = self.dest_port,
            body_len = self.body.len(),
            overflow = overflow.len(),
            "Decoded packet"
        );
        self.finish(true);

        overflow
    }

    /// Complete the frame as invalid and hand back everything after its
    /// first marker byte for rescanning.
    fn reject(&mut self) -> Bytes {
        self.finish(false);
        self.buffer.advance(1);
        self.buffer.split().freeze()
    }

    /// Whether a marker past the current one starts a complete, valid frame.
    ///
    /// Positions are scanned once; frames still incomplete are rechecked on
    /// later feeds.
    fn later_frame_is_complete(&mut self) -> bool {
        let visible = (self.buffer.len() + 1).saturating_sub(PSEUDO_HEADER_LEN);
        for at in self.scanned_to.max(1)..visible {
            if self.buffer[at..].starts_with(PSEUDO_HEADER) {
                self.candidates.push(at);
            }
        }
        self.scanned_to = self.scanned_to.max(visible);

        let buffer = &self.buffer;
        let max_body_len = self.max_body_len;
        let mut found = false;
        self.candidates
            .retain(|&at| match classify_frame(&buffer[at..], max_body_len) {
                Candidate::Valid => {
                    found = true;
                    true
                }
                Candidate::Incomplete => true,
                Candidate::Invalid => false,
            });
        found
    }

    fn finish(&mut self, valid: bool) {
        self.end_of_packet = true;
        self.packet_is_valid = valid;
        if let Some(metrics) = &self.metrics {
            if valid {
                metrics.packet_decoded();
            } else {
                metrics.frame_rejected();
            }
        }
    }

    fn received_body(&self) -> &[u8] {
        if self.end_of_packet {
            &self.body
        } else {
            self.buffer.get(BODY_OFFSET..).unwrap_or_default()
        }
    }

    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.take_slice(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Some(out)
    }

    fn take_slice(&mut self, len: usize) -> Option<&[u8]> {
        if !self.can_read || self.remaining() < len {
            return None;
        }
        let start = self.read_pos;
        self.read_pos += len;
        Some(&self.received_body()[start..start + len])
    }

    /// Read `len` body bytes as UTF-8 text.
    ///
    /// Returns `None`, consuming nothing, when fewer than `len` bytes remain or
    /// the bytes are not valid UTF-8.
    pub fn try_read_string(&mut self, len: usize) -> Option<String> {
        if !self.can_read || self.remaining() < len {
            return None;
        }
        let start = self.read_pos;
        let text = std::str::from_utf8(&self.received_body()[start..start + len])
            .ok()?
            .to_owned();
        self.read_pos += len;
        Some(text)
    }

    /// Read one UTF-8 encoded character.
    ///
    /// Consumes its one to four bytes, or nothing when the sequence is
    /// incomplete or invalid.
    pub fn try_read_char(&mut self) -> Option<char> {
        if !self.can_read || self.remaining() == 0 {
            return None;
        }
        let rest = &self.received_body()[self.read_pos..];
        let width = utf8_width(rest[0])?;
        let ch = std::str::from_utf8(rest.get(..width)?).ok()?.chars().next()?;
        self.read_pos += width;
        Some(ch)
    }

    /// Read `len` raw body bytes.
    pub fn try_read_bytes(&mut self, len: usize) -> Option<Bytes> {
        self.take_slice(len).map(Bytes::copy_from_slice)
    }
}

macro_rules! typed_readers {
    ($($name:ident => $ty:ty, $width:literal);* $(;)?) => {
        impl UdpPacketDecoder {
            $(
                #[doc = concat!("Read a little-endian `", stringify!($ty), "` from the body.")]
                pub fn $name(&mut self) -> Option<$ty> {
                    self.take::<$width>().map(<$ty>::from_le_bytes)
                }
            )*
        }
    };
}

typed_readers! {
    try_read_u8 => u8, 1;
    try_read_i8 => i8, 1;
    try_read_u16 => u16, 2;
    try_read_i16 => i16, 2;
    try_read_u32 => u32, 4;
    try_read_i32 => i32, 4;
    try_read_u64 => u64, 8;
    try_read_i64 => i64, 8;
    try_read_f32 => f32, 4;
    try_read_f64 => f64, 8;
}

fn wire_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

/// Classify the frame whose marker starts `frame`.
fn classify_frame(frame: &[u8], max_body_len: usize) -> Candidate {
    if frame.len() < BODY_OFFSET {
        return Candidate::Incomplete;
    }

    let declared = wire_u16(frame, LENGTH_OFFSET) as usize;
    if declared < UDP_HEADER_LEN || declared - UDP_HEADER_LEN > max_body_len {
        return Candidate::Invalid;
    }
    let Some(body) = frame.get(BODY_OFFSET..BODY_OFFSET + declared - UDP_HEADER_LEN) else {
        return Candidate::Incomplete;
    };

    let source_port = wire_u16(frame, SOURCE_PORT_OFFSET);
    let dest_port = wire_u16(frame, DEST_PORT_OFFSET);
    let received = wire_u16(frame, CHECKSUM_OFFSET) as i16;
    if dest_port != 0 && checksum::verify(source_port, dest_port, body, received) {
        Candidate::Valid
    } else {
        Candidate::Invalid
    }
}

/// Encoded length of a UTF-8 sequence from its lead byte.
fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

fn find_marker(buf: &[u8]) -> Option<usize> {
    buf.windows(PSEUDO_HEADER_LEN)
        .position(|window| window == PSEUDO_HEADER)
}

/// Length of the longest buffer suffix that is a proper prefix of the marker.
fn partial_marker_len(buf: &[u8]) -> usize {
    (1..PSEUDO_HEADER_LEN)
        .rev()
        .find(|&len| buf.len() >= len && buf[buf.len() - len..] == PSEUDO_HEADER[..len])
        .unwrap_or(0)
}
