//! # Fixed-Size Frame Queue
//!
//! [`DataStream`] slices incoming byte arrays into frames of one fixed size
//! and hands them back in FIFO order. It is the consumer for channels with
//! uniform frames, independent of the marker-framed decoder.
//!
//! `write` only accepts input whose length is a positive exact multiple of the
//! frame size. Anything else is ignored as a whole, including the complete
//! frames it contains.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::error::{ProtocolError, Result};

/// FIFO of equally sized frames.
#[derive(Debug, Clone)]
pub struct DataStream {
    packet_size: usize,
    queue: VecDeque<Bytes>,
}

impl DataStream {
    pub fn new(packet_size: usize) -> Result<Self> {
        if packet_size == 0 {
            return Err(ProtocolError::InvalidFrameSize);
        }

        Ok(Self {
            packet_size,
            queue: VecDeque::new(),
        })
    }

    /// Enqueue `bytes` as `bytes.len() / packet_size` frames.
    ///
    /// No-op unless the length is a positive multiple of the frame size.
    pub fn write(&mut self, bytes: &[u8]) {
        if bytes.is_empty() || bytes.len() % self.packet_size != 0 {
            trace!(
                len = bytes.len(),
                packet_size = self.packet_size,
                "Ignoring write that is not a whole number of frames"
            );
            return;
        }

        let frames = Bytes::copy_from_slice(bytes);
        for start in (0..frames.len()).step_by(self.packet_size) {
            self.queue
                .push_back(frames.slice(start..start + self.packet_size));
        }
    }

    /// Dequeue the oldest frame.
    pub fn read(&mut self) -> Option<Bytes> {
        self.queue.pop_front()
    }

    /// Dequeue up to `count` frames into one buffer.
    ///
    /// Returns a shorter buffer when fewer frames are queued and `None` when
    /// the queue is empty.
    pub fn read_many(&mut self, count: usize) -> Option<Bytes> {
        if self.queue.is_empty() {
            return None;
        }

        let mut out = BytesMut::with_capacity(count.min(self.queue.len()) * self.packet_size);
        for _ in 0..count {
            match self.queue.pop_front() {
                Some(frame) => out.extend_from_slice(&frame),
                None => break,
            }
        }
        Some(out.freeze())
    }

    pub fn can_read(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Number of queued frames.
    pub fn packet_count(&self) -> usize {
        self.queue.len()
    }

    /// Number of queued bytes.
    pub fn len(&self) -> usize {
        self.queue.len() * self.packet_size
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn packet_size(&self) -> usize {
        self.packet_size
    }
}
