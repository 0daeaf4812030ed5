//! # telemetry-protocol
//!
//! A small binary protocol stack for telemetry links: marker-framed datagrams
//! with a one's-complement header checksum, an incremental decoder that
//! tolerates arbitrary chunk boundaries and resynchronizes after garbage, a
//! fixed-size frame queue, and in-memory radio channels to carry them.
//!
//! ```rust
//! use telemetry_protocol::{PacketBuilder, UdpPacketBuilder, UdpPacketDecoder, Packet};
//!
//! let mut builder = UdpPacketBuilder::new(1, 0)?;
//! let text = "Hello World!";
//! builder.add(text.len() as u32).add(text);
//! let wire = builder.to_packet()?.to_bytes();
//!
//! let mut decoder = UdpPacketDecoder::new();
//! let (head, tail) = wire.split_at(7);
//! decoder.feed(head);
//! decoder.feed(tail);
//!
//! assert!(decoder.packet_is_valid());
//! let len = decoder.try_read_u32().unwrap_or_default();
//! assert_eq!(decoder.try_read_string(len as usize).as_deref(), Some(text));
//! # Ok::<(), telemetry_protocol::ProtocolError>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod stream;
pub mod transport;
pub mod utils;

pub use crate::core::builder::{PacketBuilder, UdpPacketBuilder, WireEncode};
pub use crate::core::codec::UdpCodec;
pub use crate::core::decoder::{DecodeBatch, DecodeStatus, UdpPacketDecoder};
pub use crate::core::dtp::{DtpPacket, DtpPacketBuilder, SenderId};
pub use crate::core::header::{Header, UdpHeader};
pub use crate::core::packet::{Packet, UdpPacket};
pub use config::ProtocolConfig;
pub use error::{ProtocolError, Result};
pub use stream::DataStream;
