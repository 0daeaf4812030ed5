//! Packet headers.
//!
//! [`Header`] is the serialization contract shared by every packet format.
//! [`UdpHeader`] is the 8-byte datagram header:
//!
//! ```text
//! [SourcePort(2)] [DestPort(2)] [Length(2)] [Checksum(2)]   all little-endian
//! ```
//!
//! `Length` counts the header plus the body; `Checksum` is computed by
//! [`checksum`](crate::core::checksum::checksum).

use crate::core::checksum;
use crate::error::{ProtocolError, Result};

/// Serialization contract for a protocol header.
pub trait Header {
    /// Number of bytes the header occupies on the wire.
    fn header_len(&self) -> usize;

    /// Serialize the header into its wire representation.
    fn to_bytes(&self) -> Vec<u8>;
}

/// Size of the datagram header in bytes
pub const UDP_HEADER_LEN: usize = 8;

/// Largest body a datagram can carry (`u16::MAX - 8`)
pub const UDP_MAX_BODY_LEN: usize = u16::MAX as usize - UDP_HEADER_LEN;

/// Datagram header: ports, total length and checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpHeader {
    source_port: u16,
    dest_port: u16,
    length: u16,
    checksum: i16,
}

impl UdpHeader {
    /// Create a header addressed to `dest_port`.
    ///
    /// Length and checksum stay zero until [`set_parameters`](Self::set_parameters)
    /// is called with the final body.
    pub fn new(dest_port: u16, source_port: u16) -> Result<Self> {
        if dest_port == 0 {
            return Err(ProtocolError::InvalidPort);
        }

        Ok(Self {
            source_port,
            dest_port,
            length: 0,
            checksum: 0,
        })
    }

    /// Rebuild a header from fields read off the wire.
    pub(crate) fn from_wire(source_port: u16, dest_port: u16, length: u16, checksum: i16) -> Self {
        Self {
            source_port,
            dest_port,
            length,
            checksum,
        }
    }

    /// Compute and store length and checksum for `body`.
    pub fn set_parameters(&mut self, body: &[u8]) -> Result<()> {
        if body.len() > UDP_MAX_BODY_LEN {
            return Err(ProtocolError::OversizedPacket {
                size: body.len(),
                max: UDP_MAX_BODY_LEN,
            });
        }

        self.length = (body.len() + UDP_HEADER_LEN) as u16;
        self.checksum = self.generate_checksum(body);
        Ok(())
    }

    /// Checksum of `body` as sent from this header's source to its destination.
    pub fn generate_checksum(&self, body: &[u8]) -> i16 {
        checksum::checksum(self.source_port, self.dest_port, body)
    }

    /// Whether `body` matches the stored checksum.
    pub fn verify(&self, body: &[u8]) -> bool {
        checksum::verify(self.source_port, self.dest_port, body, self.checksum)
    }

    pub fn source_port(&self) -> u16 {
        self.source_port
    }

    pub fn dest_port(&self) -> u16 {
        self.dest_port
    }

    /// Total datagram length: header plus body.
    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn checksum(&self) -> i16 {
        self.checksum
    }

    /// Serialize the four fields in wire order.
    pub fn encode(&self) -> [u8; UDP_HEADER_LEN] {
        let mut out = [0u8; UDP_HEADER_LEN];
        out[0..2].copy_from_slice(&self.source_port.to_le_bytes());
        out[2..4].copy_from_slice(&self.dest_port.to_le_bytes());
        out[4..6].copy_from_slice(&self.length.to_le_bytes());
        out[6..8].copy_from_slice(&self.checksum.to_le_bytes());
        out
    }
}

impl Header for UdpHeader {
    fn header_len(&self) -> usize {
        UDP_HEADER_LEN
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.encode().to_vec()
    }
}
