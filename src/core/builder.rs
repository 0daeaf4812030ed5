//! Packet builders.
//!
//! A builder accumulates typed values into a pending body and finalizes it
//! into an immutable packet. Multi-byte numbers are written little-endian,
//! text as UTF-8 with no length prefix, and byte spans verbatim. Protocols that
//! need length-delimited strings add the length themselves:
//!
//! ```rust
//! use telemetry_protocol::core::builder::{PacketBuilder, UdpPacketBuilder};
//! use telemetry_protocol::core::packet::Packet;
//!
//! let mut builder = UdpPacketBuilder::new(1, 0)?;
//! let text = "Hello World!";
//! builder.add(text.len() as u32).add(text);
//!
//! let packet = builder.to_packet()?;
//! assert_eq!(packet.body().len(), 4 + 12);
//! # Ok::<(), telemetry_protocol::error::ProtocolError>(())
//! ```
//!
//! ## Reuse
//! A successful `to_packet` consumes the pending body; the builder keeps its
//! addressing and starts the next packet empty. A failed `to_packet` leaves the
//! body in place, and `reset` discards it explicitly.

use bytes::{BufMut, Bytes, BytesMut};

use crate::core::header::{UdpHeader, UDP_MAX_BODY_LEN};
use crate::core::packet::UdpPacket;
use crate::error::{ProtocolError, Result};

/// A value with a fixed binary encoding inside a packet body.
pub trait WireEncode {
    fn encode_into(&self, dst: &mut BytesMut);
}

macro_rules! impl_wire_encode_le {
    ($($ty:ty => $put:ident),* $(,)?) => {
        $(
            impl WireEncode for $ty {
                #[inline]
                fn encode_into(&self, dst: &mut BytesMut) {
                    dst.$put(*self);
                }
            }
        )*
    };
}

impl_wire_encode_le! {
    u8 => put_u8,
    i8 => put_i8,
    u16 => put_u16_le,
    i16 => put_i16_le,
    u32 => put_u32_le,
    i32 => put_i32_le,
    u64 => put_u64_le,
    i64 => put_i64_le,
    f32 => put_f32_le,
    f64 => put_f64_le,
}

impl WireEncode for char {
    fn encode_into(&self, dst: &mut BytesMut) {
        let mut utf8 = [0u8; 4];
        dst.put_slice(self.encode_utf8(&mut utf8).as_bytes());
    }
}

impl WireEncode for str {
    fn encode_into(&self, dst: &mut BytesMut) {
        dst.put_slice(self.as_bytes());
    }
}

impl WireEncode for String {
    fn encode_into(&self, dst: &mut BytesMut) {
        dst.put_slice(self.as_bytes());
    }
}

impl WireEncode for [u8] {
    fn encode_into(&self, dst: &mut BytesMut) {
        dst.put_slice(self);
    }
}

impl<const N: usize> WireEncode for [u8; N] {
    fn encode_into(&self, dst: &mut BytesMut) {
        dst.put_slice(self);
    }
}

impl WireEncode for Vec<u8> {
    fn encode_into(&self, dst: &mut BytesMut) {
        dst.put_slice(self);
    }
}

impl WireEncode for Bytes {
    fn encode_into(&self, dst: &mut BytesMut) {
        dst.put_slice(self);
    }
}

impl<T: WireEncode + ?Sized> WireEncode for &T {
    fn encode_into(&self, dst: &mut BytesMut) {
        (**self).encode_into(dst);
    }
}

/// Shared accumulation logic for every packet format.
pub trait PacketBuilder {
    type Packet;

    /// The pending body.
    fn body_mut(&mut self) -> &mut BytesMut;

    /// Bytes accumulated so far.
    fn pending_len(&self) -> usize;

    /// Finalize the pending body into a packet.
    fn to_packet(&mut self) -> Result<Self::Packet>;

    /// Append one value to the pending body.
    fn add<T: WireEncode>(&mut self, value: T) -> &mut Self {
        value.encode_into(self.body_mut());
        self
    }

    /// Discard the pending body.
    fn reset(&mut self) {
        self.body_mut().clear();
    }
}

/// Builds [`UdpPacket`]s addressed to a fixed pair of ports.
#[derive(Debug, Clone)]
pub struct UdpPacketBuilder {
    header: UdpHeader,
    body: BytesMut,
}

impl UdpPacketBuilder {
    /// Start a builder for packets sent to `dest_port`.
    pub fn new(dest_port: u16, source_port: u16) -> Result<Self> {
        Ok(Self {
            header: UdpHeader::new(dest_port, source_port)?,
            body: BytesMut::new(),
        })
    }

    pub fn dest_port(&self) -> u16 {
        self.header.dest_port()
    }

    pub fn source_port(&self) -> u16 {
        self.header.source_port()
    }
}

impl PacketBuilder for UdpPacketBuilder {
    type Packet = UdpPacket;

    fn body_mut(&mut self) -> &mut BytesMut {
        &mut self.body
    }

    fn pending_len(&self) -> usize {
        self.body.len()
    }

    fn to_packet(&mut self) -> Result<UdpPacket> {
        if self.body.len() > UDP_MAX_BODY_LEN {
            return Err(ProtocolError::OversizedPacket {
                size: self.body.len(),
                max: UDP_MAX_BODY_LEN,
            });
        }

        let body = self.body.split().freeze();
        UdpPacket::new(self.header, body)
    }
}
