//! Link configuration and metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Gateway link configuration
#[derive(Debug, Clone, Default)]
pub struct LinkConfig {
    /// Per-node channel capacity (None = unbounded)
    ///
    /// When bounded, packets arriving at a full channel are dropped.
    pub channel_capacity: Option<usize>,
}

impl LinkConfig {
    pub fn bounded(channel_capacity: usize) -> Self {
        Self {
            channel_capacity: Some(channel_capacity),
        }
    }
}

/// Ingestion metrics, shared by all node sessions
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Total packets received from sources
    pub packets_received: AtomicU64,

    /// Packets dropped at a full channel
    pub packets_dropped: AtomicU64,

    /// Last observed queue length
    pub queue_len: AtomicUsize,

    /// Frames completed across all nodes
    pub frames_completed: AtomicU64,

    /// Handshakes that could not be answered
    pub handshake_failures: AtomicU64,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.packets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame(&self) {
        self.frames_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handshake_failure(&self) {
        self.handshake_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
            frames_completed: self.frames_completed.load(Ordering::Relaxed),
            handshake_failures: self.handshake_failures.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub packets_received: u64,
    pub packets_dropped: u64,
    pub queue_len: usize,
    pub frames_completed: u64,
    pub handshake_failures: u64,
}
