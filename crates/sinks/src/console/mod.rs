//! Console sink
//!
//! Writes each queued entry verbatim, newline terminated, to the console
//! (stdout by default). Entries arrive pre-colored from the router, so the
//! sink never looks inside them.
//!
//! Same two stop modes as the file sink: a closed queue drains, a cancelled
//! abort token exits at the next wake. There is no rotation.

use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tlslog_pipeline::{MemoryBoundedQueue, SinkHandle};
use tokio_util::sync::CancellationToken;

use crate::util::{DEFAULT_LOG_INTERVAL, RateLimitedLogger};

/// Entries written between flushes when the queue stays non-empty
const MAX_ENTRIES_PER_FLUSH: usize = 256;

/// Console sink metrics
#[derive(Debug, Default)]
pub struct ConsoleSinkMetrics {
    entries_written: AtomicU64,
    bytes_written: AtomicU64,
    write_errors: AtomicU64,
}

impl ConsoleSinkMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            entries_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
        }
    }

    #[inline]
    fn record_entry(&self, bytes: u64) {
        self.entries_written.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    #[inline]
    fn record_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> ConsoleSinkMetricsSnapshot {
        ConsoleSinkMetricsSnapshot {
            entries_written: self.entries_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of console sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsoleSinkMetricsSnapshot {
    pub entries_written: u64,
    pub bytes_written: u64,
    pub write_errors: u64,
}

/// Cloneable handle to console sink metrics
#[derive(Clone, Debug)]
pub struct ConsoleSinkMetricsHandle {
    metrics: Arc<ConsoleSinkMetrics>,
}

impl ConsoleSinkMetricsHandle {
    /// Get snapshot
    pub fn snapshot(&self) -> ConsoleSinkMetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Colorized console sink
pub struct ConsoleSink {
    name: String,
    queue: Arc<MemoryBoundedQueue<String>>,
    abort: CancellationToken,
    writer: Box<dyn Write + Send>,
    metrics: Arc<ConsoleSinkMetrics>,
    error_log: RateLimitedLogger,
}

impl ConsoleSink {
    /// Create a console sink writing to stdout
    pub fn new(queue: Arc<MemoryBoundedQueue<String>>, abort: CancellationToken) -> Self {
        Self::with_writer(queue, abort, Box::new(io::stdout()))
    }

    /// Create a console sink writing to any writer
    pub fn with_writer(
        queue: Arc<MemoryBoundedQueue<String>>,
        abort: CancellationToken,
        writer: Box<dyn Write + Send>,
    ) -> Self {
        let name = "console".to_string();
        Self {
            error_log: RateLimitedLogger::new(name.clone(), DEFAULT_LOG_INTERVAL),
            name,
            queue,
            abort,
            writer,
            metrics: Arc::new(ConsoleSinkMetrics::new()),
        }
    }

    /// Get the sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> ConsoleSinkMetricsHandle {
        ConsoleSinkMetricsHandle {
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
    pub async fn run(mut self) -> ConsoleSinkMetricsSnapshot {
        tracing::debug!(sink = %self.name, "console sink starting");

        loop {
            let first = tokio::select! {
                biased;
                _ = self.abort.cancelled() => break,
                item = self.queue.pop() => match item {
                    Some(entry) => entry,
                    None => break,
                },
            };

            self.write_entry(&first);

            // write whatever else is already queued before paying for a flush
            for _ in 1..MAX_ENTRIES_PER_FLUSH {
                if self.abort.is_cancelled() {
                    break;
                }
                let Some(entry) = self.queue.try_pop() else {
                    break;
                };
                self.write_entry(&entry);
            }
            self.flush();
        }

        self.flush();

        let snapshot = self.metrics.snapshot();
        tracing::debug!(
            sink = %self.name,
            entries = snapshot.entries_written,
            errors = snapshot.write_errors,
            "console sink stopped"
        );
        snapshot
    }

    fn write_entry(&mut self, entry: &str) {
        let result = self
            .writer
            .write_all(entry.as_bytes())
            .and_then(|()| self.writer.write_all(b"\n"));

        match result {
            Ok(()) => self.metrics.record_entry(entry.len() as u64 + 1),
            Err(e) => {
                self.metrics.record_error();
                self.error_log.error("failed to write to console", &e);
            }
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.writer.flush() {
            self.metrics.record_error();
            self.error_log.error("failed to flush console", &e);
        }
    }
}
