//! # Radio Channels
//!
//! An in-memory medium of numbered channels. Each channel is an append-only
//! list of fixed-size frames stamped with their transmit time and sender.
//! Receivers tune to one channel and pull new frames into their own
//! [`DataStream`].
//!
//! The channel set, its receivers and the receiver tracker are ordinary owned
//! values; a simulation passes them by reference to whatever needs them.
//!
//! Packets larger than one frame are sent with [`frame_bytes`], which pads the
//! encoded packet with zeros up to a whole number of frames. The padding is
//! dropped by the decoder while it scans for the next marker.

use std::collections::HashSet;
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use tracing::{debug, instrument};

use crate::config::ChannelConfig;
use crate::core::dtp::SenderId;
use crate::error::{ProtocolError, Result};
use crate::stream::DataStream;

/// Source of transmit timestamps, in seconds.
pub trait Clock {
    fn now(&self) -> f64;
}

/// Seconds elapsed since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// One frame on a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AirFrame {
    pub data: Bytes,
    pub transmit_time: f64,
    pub source: SenderId,
}

/// The set of radio channels.
pub struct Air<C = MonotonicClock> {
    channels: Vec<Vec<AirFrame>>,
    frame_size: usize,
    clock: C,
}

impl Air<MonotonicClock> {
    pub fn new(config: &ChannelConfig) -> Result<Self> {
        Self::with_clock(config, MonotonicClock::new())
    }
}

impl<C: Clock> Air<C> {
    pub fn with_clock(config: &ChannelConfig, clock: C) -> Result<Self> {
        if config.frame_size == 0 {
            return Err(ProtocolError::InvalidFrameSize);
        }

        Ok(Self {
            channels: vec![Vec::new(); config.channel_count],
            frame_size: config.frame_size,
            clock,
        })
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Append one frame to `channel`.
    #[instrument(level = "trace", skip(self, data), fields(len = data.len()))]
    pub fn write_to_channel(&mut self, channel: usize, data: &[u8], source: SenderId) -> Result<()> {
        if data.len() != self.frame_size {
            return Err(ProtocolError::FrameLengthMismatch {
                expected: self.frame_size,
                actual: data.len(),
            });
        }

        let transmit_time = self.clock.now();
        self.channel_mut(channel)?.push(AirFrame {
            data: Bytes::copy_from_slice(data),
            transmit_time,
            source,
        });
        Ok(())
    }

    /// Split `bytes` into frames and append them all to `channel`.
    ///
    /// Fails without writing anything unless the length is a multiple of the
    /// frame size.
    pub fn transmit(&mut self, channel: usize, bytes: &[u8], source: SenderId) -> Result<usize> {
        if bytes.len() % self.frame_size != 0 {
            return Err(ProtocolError::FrameLengthMismatch {
                expected: bytes.len().next_multiple_of(self.frame_size),
                actual: bytes.len(),
            });
        }
        self.frames(channel)?;

        let mut written = 0;
        for frame in bytes.chunks_exact(self.frame_size) {
            self.write_to_channel(channel, frame, source)?;
            written += 1;
        }
        debug!(channel, frames = written, sender = %source, "Transmitted on channel");
        Ok(written)
    }

    /// All frames written to `channel`, oldest first.
    pub fn frames(&self, channel: usize) -> Result<&[AirFrame]> {
        let count = self.channels.len();
        self.channels
            .get(channel)
            .map(Vec::as_slice)
            .ok_or(ProtocolError::ChannelOutOfRange { channel, count })
    }

    fn channel_mut(&mut self, channel: usize) -> Result<&mut Vec<AirFrame>> {
        let count = self.channels.len();
        self.channels
            .get_mut(channel)
            .ok_or(ProtocolError::ChannelOutOfRange { channel, count })
    }
}

/// Pad `bytes` with zeros to a whole number of `frame_size` frames.
pub fn frame_bytes(bytes: &[u8], frame_size: usize) -> Result<Bytes> {
    if frame_size == 0 {
        return Err(ProtocolError::InvalidFrameSize);
    }

    let mut out = BytesMut::with_capacity(bytes.len().next_multiple_of(frame_size));
    out.extend_from_slice(bytes);
    out.resize(bytes.len().next_multiple_of(frame_size), 0);
    Ok(out.freeze())
}

/// A receiver tuned to one channel.
#[derive(Debug)]
pub struct Receiver {
    id: SenderId,
    channel: usize,
    cursor: usize,
    stream: DataStream,
}

impl Receiver {
    /// Tune a new receiver to `channel`, starting at the channel's current end.
    pub fn new<C: Clock>(id: SenderId, channel: usize, air: &Air<C>) -> Result<Self> {
        let cursor = air.frames(channel)?.len();
        Ok(Self {
            id,
            channel,
            cursor,
            stream: DataStream::new(air.frame_size())?,
        })
    }

    pub fn id(&self) -> SenderId {
        self.id
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Switch to `channel`. Frames already on it are skipped.
    pub fn tune<C: Clock>(&mut self, channel: usize, air: &Air<C>) -> Result<()> {
        self.cursor = air.frames(channel)?.len();
        self.channel = channel;
        debug!(receiver = %self.id, channel, "Receiver tuned");
        Ok(())
    }

    /// Copy frames written since the last poll into the receive stream.
    ///
    /// Returns the number of frames received.
    pub fn poll<C: Clock>(&mut self, air: &Air<C>) -> Result<usize> {
        let frames = air.frames(self.channel)?;
        let new = frames.get(self.cursor..).unwrap_or_default();
        for frame in new {
            self.stream.write(&frame.data);
        }
        self.cursor = frames.len();
        Ok(new.len())
    }

    /// Frames received and not yet read.
    pub fn stream(&mut self) -> &mut DataStream {
        &mut self.stream
    }
}

/// The set of known receivers.
#[derive(Debug, Default, Clone)]
pub struct ReceiverTracker {
    receivers: HashSet<SenderId>,
}

impl ReceiverTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a receiver. Returns `false` if it was already known.
    pub fn add(&mut self, receiver: SenderId) -> bool {
        self.receivers.insert(receiver)
    }

    pub fn contains(&self, receiver: &SenderId) -> bool {
        self.receivers.contains(receiver)
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::float_cmp)]
    use super::*;
    use std::cell::Cell;

    struct StepClock(Cell<f64>);

    impl Clock for StepClock {
        fn now(&self) -> f64 {
            let t = self.0.get();
            self.0.set(t + 1.0);
            t
        }
    }

    fn air() -> Air<StepClock> {
        Air::with_clock(&ChannelConfig::default(), StepClock(Cell::new(0.0))).unwrap()
    }

    fn id(n: u8) -> SenderId {
        SenderId::from_bytes([n; 16])
    }

    #[test]
    fn test_write_to_channel() {
        let mut air = air();
        air.write_to_channel(3, &[1, 2, 3, 4], id(1)).unwrap();
        air.write_to_channel(3, &[5, 6, 7, 8], id(2)).unwrap();

        let frames = air.frames(3).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(&frames[0].data[..], &[1, 2, 3, 4]);
        assert_eq!(frames[0].transmit_time, 0.0);
        assert_eq!(frames[1].transmit_time, 1.0);
        assert_eq!(frames[1].source, id(2));
        assert!(air.frames(0).unwrap().is_empty());
    }

    #[test]
    fn test_channel_and_length_checks() {
        let mut air = air();
        assert!(matches!(
            air.write_to_channel(8, &[0; 4], id(1)),
            Err(ProtocolError::ChannelOutOfRange { channel: 8, count: 8 })
        ));
        assert!(matches!(
            air.write_to_channel(0, &[0; 3], id(1)),
            Err(ProtocolError::FrameLengthMismatch { expected: 4, actual: 3 })
        ));
        assert!(matches!(
            air.transmit(0, &[0; 6], id(1)),
            Err(ProtocolError::FrameLengthMismatch { expected: 8, actual: 6 })
        ));
        assert!(air.frames(0).unwrap().is_empty());
    }

    #[test]
    fn test_zero_frame_size_rejected() {
        let config = ChannelConfig {
            frame_size: 0,
            ..ChannelConfig::default()
        };
        assert!(matches!(
            Air::new(&config),
            Err(ProtocolError::InvalidFrameSize)
        ));
    }

    #[test]
    fn test_frame_bytes_pads_with_zeros() {
        assert_eq!(&frame_bytes(&[1, 2, 3], 4).unwrap()[..], &[1, 2, 3, 0]);
        assert_eq!(&frame_bytes(&[1, 2, 3, 4], 4).unwrap()[..], &[1, 2, 3, 4]);
        assert!(frame_bytes(&[], 4).unwrap().is_empty());
        assert!(frame_bytes(&[1], 0).is_err());
    }

    #[test]
    fn test_receiver_polls_new_frames_only() {
        let mut air = air();
        air.transmit(1, &[9; 8], id(1)).unwrap();

        let mut receiver = Receiver::new(id(7), 1, &air).unwrap();
        assert_eq!(receiver.poll(&air).unwrap(), 0);

        air.transmit(1, &[1, 2, 3, 4, 5, 6, 7, 8], id(1)).unwrap();
        air.transmit(2, &[0; 4], id(1)).unwrap();
        assert_eq!(receiver.poll(&air).unwrap(), 2);
        assert_eq!(receiver.poll(&air).unwrap(), 0);

        let stream = receiver.stream();
        assert_eq!(stream.packet_count(), 2);
        assert_eq!(stream.read_many(2).as_deref(), Some(&[1, 2, 3, 4, 5, 6, 7, 8][..]));
    }

    #[test]
    fn test_receiver_tune() {
        let mut air = air();
        air.transmit(2, &[1; 4], id(1)).unwrap();

        let mut receiver = Receiver::new(id(7), 1, &air).unwrap();
        receiver.tune(2, &air).unwrap();
        assert_eq!(receiver.channel(), 2);
        assert_eq!(receiver.poll(&air).unwrap(), 0);

        air.transmit(2, &[2; 4], id(1)).unwrap();
        assert_eq!(receiver.poll(&air).unwrap(), 1);

        assert!(receiver.tune(99, &air).is_err());
        assert_eq!(receiver.channel(), 2);
    }

    #[test]
    fn test_receiver_tracker() {
        let mut tracker = ReceiverTracker::new();
        assert!(tracker.is_empty());
        assert!(tracker.add(id(1)));
        assert!(!tracker.add(id(1)));
        assert!(tracker.add(id(2)));
        assert!(tracker.contains(&id(1)));
        assert!(!tracker.contains(&id(3)));
        assert_eq!(tracker.len(), 2);
    }
}
