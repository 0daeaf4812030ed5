//! # Core Protocol Components
//!
//! Packet formats, builders, checksums and stream decoding.
//!
//! ## Components
//! - **Checksum**: one's-complement 16-bit arithmetic
//! - **Header / Packet**: the datagram format and the shared encoding contracts
//! - **Builder**: typed accumulation of packet bodies
//! - **Decoder**: incremental, resynchronizing stream decoder
//! - **Codec**: `tokio_util` framing over the decoder
//! - **DTP**: length-prefixed, sender-tagged packets
//!
//! ## Wire Format
//! ```text
//! ["$UDP$"(5)] [SourcePort(2)] [DestPort(2)] [Length(2)] [Checksum(2)] [Body(Length - 8)]
//! ```
//! All integers are little-endian.

pub mod builder;
pub mod checksum;
pub mod codec;
pub mod decoder;
pub mod dtp;
pub mod header;
pub mod packet;
