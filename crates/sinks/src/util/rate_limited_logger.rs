//! Rate-limited error logging
//!
//! A sink whose disk is full fails on every record. `RateLimitedLogger`
//! emits at most one `error!` per interval and reports how many failures
//! were folded into it.

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval between logged errors
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Logs at most once per interval, counting suppressed errors
#[derive(Debug)]
pub struct RateLimitedLogger {
    /// Sink name included in every event
    sink: String,

    min_interval: Duration,

    last_logged: Mutex<Option<Instant>>,

    /// Errors since the last emitted event
    pending: AtomicU64,

    total: AtomicU64,
}

impl RateLimitedLogger {
    /// Create a logger for the named sink
    pub fn new(sink: impl Into<String>, min_interval: Duration) -> Self {
        Self {
            sink: sink.into(),
            min_interval,
            last_logged: Mutex::new(None),
            pending: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Record an error, logging it if the interval has elapsed
    ///
    /// Returns true if an event was emitted.
    pub fn error(&self, message: &str, error: &dyn Display) -> bool {
        self.pending.fetch_add(1, Ordering::Relaxed);
        let total = self.total.fetch_add(1, Ordering::Relaxed) + 1;

        if !self.should_log(Instant::now()) {
            return false;
        }

        let count = self.pending.swap(0, Ordering::Relaxed);
        if count > 1 {
            tracing::error!(
                sink = %self.sink,
                error = %error,
                suppressed = count - 1,
                total_errors = total,
                "{message}"
            );
        } else {
            tracing::error!(sink = %self.sink, error = %error, total_errors = total, "{message}");
        }
        true
    }

    fn should_log(&self, now: Instant) -> bool {
        let mut last = self.last_logged.lock();
        match *last {
            Some(at) if now.duration_since(at) < self.min_interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Errors recorded since the last emitted event
    pub fn pending_count(&self) -> u64 {
        self.pending.load(Ordering::Relaxed)
    }

    /// Errors recorded over the logger's lifetime
    pub fn total_count(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}
