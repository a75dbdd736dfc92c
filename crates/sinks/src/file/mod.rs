//! File sink
//!
//! Writes every record as one plain-text line to size-rotated files.
//!
//! # Tasks
//!
//! - **Consumer**: pops lines from the sink's `MemoryBoundedQueue`, writes
//!   them, rotates when the threshold is reached
//! - **Flusher**: flushes the buffered writer every `flush_interval`
//!   (100ms by default) so lines become durable without a flush per line
//!
//! Both share the `RotatingFile` behind a `parking_lot::Mutex`; nothing
//! else touches it.
//!
//! # Stopping
//!
//! - Queue closed (graceful): the consumer drains every queued line,
//!   flushes, and exits
//! - Abort token cancelled (abrupt): the consumer exits at its next wake,
//!   flushing only what was already written
//!
//! # Failures
//!
//! Open and write errors are logged through a `RateLimitedLogger` and the
//! sink moves on to the next record. With no file open, the next write
//! retries opening one. A failed rotation keeps writing to the old file.

mod writer;

pub use writer::{RotatingFile, WriteOutcome, file_name};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tlslog_pipeline::{MemoryBoundedQueue, SinkHandle};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use crate::util::{DEFAULT_LOG_INTERVAL, RateLimitedLogger};

// =============================================================================
// Constants
// =============================================================================

/// Default rotation threshold (1000 KB)
const DEFAULT_MAX_FILE_SIZE: u64 = 1000 * 1024;

/// Default flush interval
const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(100);

// =============================================================================
// Configuration
// =============================================================================

/// File sink configuration
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Directory that receives the `syslog_*.txt` files
    pub directory: PathBuf,

    /// Rotate once the current file reaches this many bytes
    pub max_file_size: u64,

    /// Interval of the background flush
    pub flush_interval: Duration,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

impl FileSinkConfig {
    /// Set output directory
    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.directory = directory.into();
        self
    }

    /// Set rotation threshold in bytes
    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Set flush interval
    #[must_use]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }
}

// =============================================================================
// Metrics
// =============================================================================

/// File sink metrics
#[derive(Debug, Default)]
pub struct FileSinkMetrics {
    lines_written: AtomicU64,
    bytes_written: AtomicU64,
    write_errors: AtomicU64,
    rotations: AtomicU64,
    flushes: AtomicU64,
}

impl FileSinkMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            lines_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
        }
    }

    /// Record a written line (bytes include the newline)
    #[inline]
    pub fn record_line(&self, bytes: u64) {
        self.lines_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a failed open or write
    #[inline]
    pub fn record_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed rotation
    #[inline]
    pub fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a flush
    #[inline]
    pub fn record_flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> FileSinkMetricsSnapshot {
        FileSinkMetricsSnapshot {
            lines_written: self.lines_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of file sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileSinkMetricsSnapshot {
    pub lines_written: u64,
    pub bytes_written: u64,
    pub write_errors: u64,
    pub rotations: u64,
    pub flushes: u64,
}

/// Cloneable handle to file sink metrics, valid after `run()` consumes the sink
#[derive(Clone, Debug)]
pub struct FileSinkMetricsHandle {
    metrics: Arc<FileSinkMetrics>,
}

impl FileSinkMetricsHandle {
    /// Get snapshot
    pub fn snapshot(&self) -> FileSinkMetricsSnapshot {
        self.metrics.snapshot()
    }
}

// =============================================================================
// Sink
// =============================================================================

/// Rotating plaintext file sink
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    queue: Arc<MemoryBoundedQueue<String>>,
    abort: CancellationToken,
    file: Arc<Mutex<RotatingFile>>,
    metrics: Arc<FileSinkMetrics>,
    error_log: Arc<RateLimitedLogger>,
}

impl FileSink {
    /// Create a file sink consuming `queue`
    pub fn new(
        config: FileSinkConfig,
        queue: Arc<MemoryBoundedQueue<String>>,
        abort: CancellationToken,
    ) -> Self {
        let name = "file".to_string();
        let file = RotatingFile::new(config.directory.clone(), config.max_file_size);
        Self {
            error_log: Arc::new(RateLimitedLogger::new(name.clone(), DEFAULT_LOG_INTERVAL)),
            name,
            config,
            queue,
            abort,
            file: Arc::new(Mutex::new(file)),
            metrics: Arc::new(FileSinkMetrics::new()),
        }
    }

    /// Open the first output file now instead of on the first record
    ///
    /// A failure is not fatal; the first write will retry.
    pub fn open(&self) -> Option<PathBuf> {
        match self.file.lock().open() {
            Ok(path) => Some(path),
            Err(e) => {
                self.metrics.record_error();
                self.error_log.error("failed to open output file", &e);
                None
            }
        }
    }

    /// Get the sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Output directory
    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> FileSinkMetricsHandle {
        FileSinkMetricsHandle {
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Spawn the consumer and return the router-facing handle
    pub fn spawn(self) -> SinkHandle {
        let name = self.name.clone();
        let queue = Arc::clone(&self.queue);
        let abort = self.abort.clone();
        let task = tokio::spawn(async move {
            self.run().await;
        });
        SinkHandle::new(name, queue, abort, task)
    }

    /// Run the consumer loop until the queue is drained or the sink aborted
    pub async fn run(self) -> FileSinkMetricsSnapshot {
        tracing::info!(
            sink = %self.name,
            directory = %self.config.directory.display(),
            max_file_size = self.config.max_file_size,
            "file sink starting"
        );

        let flush_stop = CancellationToken::new();
        let flusher = tokio::spawn(flush_loop(
            Arc::clone(&self.file),
            Arc::clone(&self.metrics),
            Arc::clone(&self.error_log),
            self.config.flush_interval,
            flush_stop.clone(),
        ));

        loop {
            tokio::select! {
                biased;

                _ = self.abort.cancelled() => {
                    tracing::debug!(
                        sink = %self.name,
                        pending = self.queue.len(),
                        "file sink aborted"
                    );
                    break;
                }

                item = self.queue.pop() => match item {
                    Some(line) => self.write_line(&line),
                    None => break,
                },
            }
        }

        flush_stop.cancel();
        if let Err(e) = flusher.await {
            tracing::warn!(sink = %self.name, error = %e, "flush task panicked");
        }
        self.flush();

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            sink = %self.name,
            lines = snapshot.lines_written,
            bytes = snapshot.bytes_written,
            rotations = snapshot.rotations,
            errors = snapshot.write_errors,
            "file sink stopped"
        );
        snapshot
    }

    fn write_line(&self, line: &str) {
        let result = self.file.lock().write_line(line);
        match result {
            Ok(outcome) => {
                self.metrics.record_line(line.len() as u64 + 1);
                match outcome {
                    WriteOutcome::Written => {}
                    WriteOutcome::Rotated { previous, current } => {
                        self.metrics.record_rotation();
                        tracing::info!(
                            sink = %self.name,
                            previous = %previous.display(),
                            current = %current.display(),
                            "rotated output file"
                        );
                    }
                    WriteOutcome::RotationFailed { error } => {
                        self.metrics.record_error();
                        self.error_log
                            .error("rotation failed, keeping current file", &error);
                    }
                }
            }
            Err(e) => {
                self.metrics.record_error();
                self.error_log.error("failed to write record", &e);
            }
        }
    }

    fn flush(&self) {
        flush_once(&self.file, &self.metrics, &self.error_log);
    }
}

fn flush_once(
    file: &Mutex<RotatingFile>,
    metrics: &FileSinkMetrics,
    error_log: &RateLimitedLogger,
) {
    match file.lock().flush() {
        Ok(()) => metrics.record_flush(),
        Err(e) => {
            metrics.record_error();
            error_log.error("failed to flush output file", &e);
        }
    }
}

async fn flush_loop(
    file: Arc<Mutex<RotatingFile>>,
    metrics: Arc<FileSinkMetrics>,
    error_log: Arc<RateLimitedLogger>,
    period: Duration,
    stop: CancellationToken,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = ticker.tick() => flush_once(&file, &metrics, &error_log),
        }
    }
}
