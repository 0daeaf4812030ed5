//! # Stream Codec
//!
//! Adapts [`UdpPacketDecoder`] to `tokio_util::codec` so datagrams can be read
//! from and written to any `AsyncRead`/`AsyncWrite` with `FramedRead` and
//! `FramedWrite`. Invalid frames never surface as errors; they are skipped and
//! counted by [`UdpCodec::rejected`].

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::core::decoder::UdpPacketDecoder;
use crate::core::packet::UdpPacket;
use crate::error::ProtocolError;

/// Frames marker-delimited datagrams over a byte stream.
///
/// Incoming bytes are moved into an incremental [`UdpPacketDecoder`]; frames
/// that fail validation are skipped and counted, so a stream only ever yields
/// valid packets.
#[derive(Debug, Default)]
pub struct UdpCodec {
    decoder: UdpPacketDecoder,
    rejected: u64,
}

impl UdpCodec {
    pub fn new(decoder: UdpPacketDecoder) -> Self {
        Self {
            decoder,
            rejected: 0,
        }
    }

    /// Frames dropped because they failed validation.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

impl Decoder for UdpCodec {
    type Item = UdpPacket;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while !src.is_empty() {
            let chunk = src.split();
            let overflow = self.decoder.feed(&chunk);
            if !self.decoder.end_of_packet() {
                // everything is buffered inside the decoder
                return Ok(None);
            }

            src.extend_from_slice(&overflow);
            match self.decoder.to_packet() {
                Some(packet) => return Ok(Some(packet)),
                None => {
                    self.rejected += 1;
                    debug!(rejected = self.rejected, "Skipping invalid frame");
                }
            }
        }

        Ok(None)
    }
}

impl Encoder<UdpPacket> for UdpCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: UdpPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.write_to(dst);
        Ok(())
    }
}
