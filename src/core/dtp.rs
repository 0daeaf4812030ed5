//! # Data Transfer Packets
//!
//! Length-prefixed packets tagged with the identity of their sender. Unlike
//! datagrams they carry no framing marker and no checksum, so they are meant
//! for channels that already delimit frames.
//!
//! ## Wire Format
//! ```text
//! [PacketSize(4, LE)] [SenderId(16)] [Body(PacketSize - 20)]
//! ```
//! `PacketSize` counts the header plus the body.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::core::builder::PacketBuilder;
use crate::core::header::Header;
use crate::core::packet::Packet;
use crate::error::{ProtocolError, Result};

/// Size of the DTP header in bytes
pub const DTP_HEADER_LEN: usize = 20;

/// Largest body a DTP packet can carry
pub const DTP_MAX_BODY_LEN: usize = u32::MAX as usize - DTP_HEADER_LEN;

/// Opaque 16-byte identifier of a transmitting entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SenderId([u8; 16]);

impl SenderId {
    /// The all-zero identifier.
    pub const NIL: SenderId = SenderId([0; 16]);

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Draw a fresh identifier from the operating system RNG.
    pub fn random() -> Result<Self> {
        let mut bytes = [0u8; 16];
        getrandom::fill(&mut bytes).map_err(|e| ProtocolError::Entropy(e.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// DTP header: total packet size and sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DtpHeader {
    packet_size: u32,
    sender: SenderId,
}

impl DtpHeader {
    pub fn packet_size(&self) -> u32 {
        self.packet_size
    }

    pub fn sender(&self) -> SenderId {
        self.sender
    }

    pub fn encode(&self) -> [u8; DTP_HEADER_LEN] {
        let mut out = [0u8; DTP_HEADER_LEN];
        out[..4].copy_from_slice(&self.packet_size.to_le_bytes());
        out[4..].copy_from_slice(self.sender.as_bytes());
        out
    }
}

impl Header for DtpHeader {
    fn header_len(&self) -> usize {
        DTP_HEADER_LEN
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.encode().to_vec()
    }
}

/// A finalized sender-tagged packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtpPacket {
    header: DtpHeader,
    body: Bytes,
}

impl DtpPacket {
    pub fn new(sender: SenderId, body: impl Into<Bytes>) -> Result<Self> {
        let body = body.into();
        if body.len() > DTP_MAX_BODY_LEN {
            return Err(ProtocolError::OversizedPacket {
                size: body.len(),
                max: DTP_MAX_BODY_LEN,
            });
        }

        Ok(Self {
            header: DtpHeader {
                packet_size: (body.len() + DTP_HEADER_LEN) as u32,
                sender,
            },
            body,
        })
    }

    /// Parse one packet from the front of `bytes`.
    ///
    /// Bytes past the declared packet size are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < DTP_HEADER_LEN {
            return Err(ProtocolError::TruncatedFrame {
                needed: DTP_HEADER_LEN,
                available: bytes.len(),
            });
        }

        let mut size = [0u8; 4];
        size.copy_from_slice(&bytes[..4]);
        let packet_size = u32::from_le_bytes(size) as usize;
        if packet_size < DTP_HEADER_LEN {
            return Err(ProtocolError::InvalidHeader);
        }
        if bytes.len() < packet_size {
            return Err(ProtocolError::TruncatedFrame {
                needed: packet_size,
                available: bytes.len(),
            });
        }

        let mut sender = [0u8; 16];
        sender.copy_from_slice(&bytes[4..DTP_HEADER_LEN]);
        trace!(packet_size, "Parsed DTP packet");

        Self::new(
            SenderId(sender),
            Bytes::copy_from_slice(&bytes[DTP_HEADER_LEN..packet_size]),
        )
    }

    pub fn sender(&self) -> SenderId {
        self.header.sender
    }
}

impl Packet for DtpPacket {
    type Header = DtpHeader;

    fn header(&self) -> &DtpHeader {
        &self.header
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    fn max_body_len(&self) -> usize {
        DTP_MAX_BODY_LEN
    }

    fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(DTP_HEADER_LEN + self.body.len());
        out.put_slice(&self.header.encode());
        out.put_slice(&self.body);
        out.freeze()
    }
}

/// Builds [`DtpPacket`]s tagged with one sender.
#[derive(Debug, Clone)]
pub struct DtpPacketBuilder {
    sender: SenderId,
    body: BytesMut,
}

impl DtpPacketBuilder {
    pub fn new(sender: SenderId) -> Self {
        Self {
            sender,
            body: BytesMut::new(),
        }
    }
}

impl PacketBuilder for DtpPacketBuilder {
    type Packet = DtpPacket;

    fn body_mut(&mut self) -> &mut BytesMut {
        &mut self.body
    }

    fn pending_len(&self) -> usize {
        self.body.len()
    }

    fn to_packet(&mut self) -> Result<DtpPacket> {
        if self.body.len() > DTP_MAX_BODY_LEN {
            return Err(ProtocolError::OversizedPacket {
                size: self.body.len(),
                max: DTP_MAX_BODY_LEN,
            });
        }

        DtpPacket::new(self.sender, self.body.split().freeze())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn sender() -> SenderId {
        SenderId::from_bytes([
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD,
            0xEE, 0xFF,
        ])
    }

    #[test]
    fn test_layout() {
        let mut builder = DtpPacketBuilder::new(sender());
        builder.add(42u16).add("ok");
        let packet = builder.to_packet().unwrap();
        let bytes = packet.to_bytes();

        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[..4], &24u32.to_le_bytes());
        assert_eq!(&bytes[4..20], sender().as_bytes());
        assert_eq!(&bytes[20..], &[42, 0, b'o', b'k']);
        assert_eq!(packet.header().packet_size(), 24);
        assert_eq!(packet.header().header_len(), DTP_HEADER_LEN);
    }

    #[test]
    fn test_parse_ignores_trailing_bytes() {
        let packet = DtpPacket::new(sender(), vec![1u8, 2, 3]).unwrap();
        let mut wire = packet.to_bytes().to_vec();
        wire.extend_from_slice(&[9, 9]);

        let parsed = DtpPacket::from_bytes(&wire).unwrap();
        assert_eq!(parsed, packet);
        assert_eq!(parsed.sender(), sender());
    }

    #[test]
    fn test_parse_rejects_short_input() {
        assert!(matches!(
            DtpPacket::from_bytes(&[0u8; 10]),
            Err(ProtocolError::TruncatedFrame { needed: 20, available: 10 })
        ));

        let packet = DtpPacket::new(sender(), vec![0u8; 8]).unwrap();
        let wire = packet.to_bytes();
        assert!(matches!(
            DtpPacket::from_bytes(&wire[..25]),
            Err(ProtocolError::TruncatedFrame { needed: 28, available: 25 })
        ));
    }

    #[test]
    fn test_parse_rejects_size_below_header() {
        let mut wire = vec![0u8; DTP_HEADER_LEN];
        wire[..4].copy_from_slice(&19u32.to_le_bytes());
        assert!(matches!(
            DtpPacket::from_bytes(&wire),
            Err(ProtocolError::InvalidHeader)
        ));
    }

    #[test]
    fn test_sender_display() {
        assert_eq!(
            sender().to_string(),
            "00112233-4455-6677-8899-aabbccddeeff"
        );
        assert_eq!(SenderId::NIL.to_string().len(), 36);
    }

    #[test]
    fn test_random_senders_differ() {
        let a = SenderId::random().unwrap();
        let b = SenderId::random().unwrap();
        assert_ne!(a, b);
    }
}
