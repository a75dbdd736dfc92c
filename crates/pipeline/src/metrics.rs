//! Router metrics
//!
//! Atomic counters for tracking what the router accepted and dropped.
//! All operations use relaxed ordering; values are eventually consistent.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for the router
///
/// Every frame handed to `Router::route` lands in exactly one of
/// `records_routed`, `frames_malformed`, `severity_unsupported` or
/// `sink_closed`.
#[derive(Debug, Default)]
pub struct RouterMetrics {
    /// Frames handed to the router
    frames_received: AtomicU64,

    /// Raw bytes handed to the router
    bytes_received: AtomicU64,

    /// Records enqueued to every active sink
    records_routed: AtomicU64,

    /// Frames rejected by the framer
    frames_malformed: AtomicU64,

    /// Records dropped for a severity with no configured color
    severity_unsupported: AtomicU64,

    /// Records dropped because a sink queue was already closed
    sink_closed: AtomicU64,
}

impl RouterMetrics {
    /// Create new metrics instance with all counters at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            frames_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            records_routed: AtomicU64::new(0),
            frames_malformed: AtomicU64::new(0),
            severity_unsupported: AtomicU64::new(0),
            sink_closed: AtomicU64::new(0),
        }
    }

    /// Record a frame entering the router
    #[inline]
    pub fn record_received(&self, byte_count: u64) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a record enqueued to its sinks
    #[inline]
    pub fn record_routed(&self) {
        self.records_routed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame rejected by the framer
    #[inline]
    pub fn record_malformed(&self) {
        self.frames_malformed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a record dropped for an unsupported severity
    #[inline]
    pub fn record_unsupported(&self) {
        self.severity_unsupported.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a record dropped because a sink was closed
    #[inline]
    pub fn record_sink_closed(&self) {
        self.sink_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time copy of all counters
    #[inline]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            records_routed: self.records_routed.load(Ordering::Relaxed),
            frames_malformed: self.frames_malformed.load(Ordering::Relaxed),
            severity_unsupported: self.severity_unsupported.load(Ordering::Relaxed),
            sink_closed: self.sink_closed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of router metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub bytes_received: u64,
    pub records_routed: u64,
    pub frames_malformed: u64,
    pub severity_unsupported: u64,
    pub sink_closed: u64,
}

impl MetricsSnapshot {
    /// Records dropped for any reason
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.frames_malformed + self.severity_unsupported + self.sink_closed
    }
}
