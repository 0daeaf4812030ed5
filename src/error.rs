//! # Error Types
//!
//! Error handling for packet construction, configuration and channel access.
//!
//! ## Error Categories
//! - **Construction errors**: zero destination port, body too large for the
//!   length field, zero frame size
//! - **Input errors**: truncated or inconsistent DTP frames, wrong channel frame length
//! - **Configuration errors**: unreadable or invalid configuration
//! - **I/O errors**: surfaced through the codec adapter
//!
//! Checksum mismatches and missing markers are *not* errors: the decoder reports
//! them through its state flags so a corrupted frame never aborts a stream.
//!
//! ## Example Usage
//! ```rust
//! use telemetry_protocol::core::builder::UdpPacketBuilder;
//! use telemetry_protocol::error::ProtocolError;
//!
//! match UdpPacketBuilder::new(0, 7) {
//!     Err(ProtocolError::InvalidPort) => {}
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::io;
use thiserror::Error;

// ProtocolError is the primary error type for all protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Destination port must be non-zero")]
    InvalidPort,

    #[error("Packet body too large: {size} bytes (maximum {max})")]
    OversizedPacket { size: usize, max: usize },

    #[error("Frame size must be greater than 0")]
    InvalidFrameSize,

    #[error("Frame length mismatch: expected {expected} bytes, got {actual}")]
    FrameLengthMismatch { expected: usize, actual: usize },

    #[error("Channel {channel} out of range (channel count {count})")]
    ChannelOutOfRange { channel: usize, count: usize },

    #[error("Invalid packet header")]
    InvalidHeader,

    #[error("Truncated frame: need {needed} bytes, have {available}")]
    TruncatedFrame { needed: usize, available: usize },

    #[error("Entropy source failure: {0}")]
    Entropy(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
