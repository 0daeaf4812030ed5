//! Packets: an immutable header paired with its body.
//!
//! [`Packet`] is the encoding contract every packet format implements.
//! [`UdpPacket`] is the marker-framed datagram:
//!
//! ```text
//! ["$UDP$"(5)] [UdpHeader(8)] [Body(Length - 8)]
//! ```
//!
//! The marker lets several packets share one byte stream and lets the decoder
//! resynchronize after garbage or a mid-stream start.

use bytes::{BufMut, Bytes, BytesMut};

use crate::core::header::{Header, UdpHeader, UDP_HEADER_LEN, UDP_MAX_BODY_LEN};
use crate::error::Result;

/// Framing marker written before every datagram
pub const PSEUDO_HEADER: &[u8; 5] = b"$UDP$";

/// Length of the framing marker
pub const PSEUDO_HEADER_LEN: usize = PSEUDO_HEADER.len();

/// Encoding contract shared by all packet formats.
pub trait Packet {
    type Header: Header;

    /// The protocol header.
    fn header(&self) -> &Self::Header;

    /// The transmitted data.
    fn body(&self) -> &[u8];

    /// Largest body this format can carry.
    fn max_body_len(&self) -> usize;

    /// Serialize framing, header and body.
    fn to_bytes(&self) -> Bytes;
}

/// A finalized datagram. The header always describes the body it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpPacket {
    header: UdpHeader,
    body: Bytes,
}

impl UdpPacket {
    /// Finalize `header` over `body`, computing length and checksum.
    pub fn new(mut header: UdpHeader, body: impl Into<Bytes>) -> Result<Self> {
        let body = body.into();
        header.set_parameters(&body)?;
        Ok(Self { header, body })
    }

    /// Build a packet for `dest_port` from `source_port` in one step.
    pub fn with_ports(dest_port: u16, source_port: u16, body: impl Into<Bytes>) -> Result<Self> {
        Self::new(UdpHeader::new(dest_port, source_port)?, body)
    }

    /// Pair a header received off the wire with its already-verified body.
    pub(crate) fn from_wire(header: UdpHeader, body: Bytes) -> Self {
        Self { header, body }
    }

    /// Number of bytes [`to_bytes`](Packet::to_bytes) produces.
    pub fn encoded_len(&self) -> usize {
        PSEUDO_HEADER_LEN + UDP_HEADER_LEN + self.body.len()
    }

    /// Append the wire form to `dst` without an intermediate allocation.
    pub fn write_to(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        dst.put_slice(PSEUDO_HEADER);
        dst.put_slice(&self.header.encode());
        dst.put_slice(&self.body);
    }

    /// Cheap handle on the body.
    pub fn body_bytes(&self) -> Bytes {
        self.body.clone()
    }
}

impl Packet for UdpPacket {
    type Header = UdpHeader;

    fn header(&self) -> &UdpHeader {
        &self.header
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    fn max_body_len(&self) -> usize {
        UDP_MAX_BODY_LEN
    }

    fn to_bytes(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(self.encoded_len());
        self.write_to(&mut out);
        out.freeze()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::error::ProtocolError;

    #[test]
    fn test_packet_layout() {
        let packet = UdpPacket::with_ports(7, 3, vec![0xAAu8, 0xBB, 0xCC]).unwrap();
        let bytes = packet.to_bytes();

        assert_eq!(bytes.len(), 5 + 8 + 3);
        assert_eq!(packet.encoded_len(), bytes.len());
        assert_eq!(&bytes[..5], b"$UDP$");
        assert_eq!(&bytes[5..13], &packet.header().encode());
        assert_eq!(&bytes[13..], &[0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn test_header_describes_body() {
        let packet = UdpPacket::with_ports(1, 0, b"payload".to_vec()).unwrap();
        assert_eq!(packet.header().length() as usize, packet.body().len() + 8);
        assert!(packet.header().verify(packet.body()));
        assert_eq!(packet.max_body_len(), 65527);
    }

    #[test]
    fn test_empty_body() {
        let packet = UdpPacket::with_ports(1, 0, Bytes::new()).unwrap();
        assert_eq!(packet.header().length(), 8);
        assert_eq!(packet.to_bytes().len(), 13);
    }

    #[test]
    fn test_invalid_construction() {
        assert!(matches!(
            UdpPacket::with_ports(0, 1, Bytes::new()),
            Err(ProtocolError::InvalidPort)
        ));
        assert!(matches!(
            UdpPacket::with_ports(1, 1, vec![0u8; 70_000]),
            Err(ProtocolError::OversizedPacket { size: 70_000, .. })
        ));
    }

    #[test]
    fn test_write_to_appends() {
        let packet = UdpPacket::with_ports(2, 0, vec![1u8]).unwrap();
        let mut buf = BytesMut::from(&b"xy"[..]);
        packet.write_to(&mut buf);
        assert_eq!(&buf[..2], b"xy");
        assert_eq!(&buf[2..], &packet.to_bytes()[..]);
    }
}
