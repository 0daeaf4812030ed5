//! Observability and Metrics
//!
//! Decoding counters for one or more streams.
//!
//! Uses atomic counters so a single collector can be shared behind an `Arc`
//! by decoders running on different threads. Collectors are owned values; there
//! is no process-wide instance.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Metrics collector for decoding activity
#[derive(Debug)]
pub struct Metrics {
    /// Total bytes handed to decoders
    pub bytes_fed: AtomicU64,
    /// Bytes dropped while scanning for a packet marker
    pub bytes_discarded: AtomicU64,
    /// Frames that completed and passed validation
    pub packets_decoded: AtomicU64,
    /// Frames that completed but failed validation
    pub frames_rejected: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            bytes_fed: AtomicU64::new(0),
            bytes_discarded: AtomicU64::new(0),
            packets_decoded: AtomicU64::new(0),
            frames_rejected: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a chunk handed to a decoder
    pub fn chunk_fed(&self, byte_count: u64) {
        self.bytes_fed.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record bytes skipped during resynchronization
    pub fn bytes_skipped(&self, byte_count: u64) {
        self.bytes_discarded.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a valid packet
    pub fn packet_decoded(&self) {
        self.packets_decoded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected frame
    pub fn frame_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bytes_fed: self.bytes_fed.load(Ordering::Relaxed),
            bytes_discarded: self.bytes_discarded.load(Ordering::Relaxed),
            packets_decoded: self.packets_decoded.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            bytes_fed = snapshot.bytes_fed,
            bytes_discarded = snapshot.bytes_discarded,
            packets_decoded = snapshot.packets_decoded,
            frames_rejected = snapshot.frames_rejected,
            uptime_seconds = snapshot.uptime_seconds,
            "Decoder metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bytes_fed: u64,
    pub bytes_discarded: u64,
    pub packets_decoded: u64,
    pub frames_rejected: u64,
    pub uptime_seconds: u64,
}
