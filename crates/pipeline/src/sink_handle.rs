//! Sink handle for pipeline communication
//!
//! `SinkHandle` owns the producer side of a sink: its queue, the token that
//! aborts its consumer task, and the task itself. The router talks to sinks
//! only through handles, without knowing their concrete types.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{PipelineError, Result};
use crate::queue::MemoryBoundedQueue;

/// How sinks terminate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Drain every queued record, flush, then exit
    Graceful,
    /// Exit promptly, discarding queued records
    Abrupt,
}

impl ShutdownMode {
    /// Map the `graceful` flag used by process wiring
    #[inline]
    pub const fn from_graceful(graceful: bool) -> Self {
        if graceful { Self::Graceful } else { Self::Abrupt }
    }

    /// Check if this mode drains queued records
    #[inline]
    pub const fn is_graceful(self) -> bool {
        matches!(self, Self::Graceful)
    }
}

/// Handle to a running sink
///
/// # Example
///
/// ```ignore
/// let queue = Arc::new(MemoryBoundedQueue::new(budget));
/// let abort = CancellationToken::new();
/// let task = tokio::spawn(sink.run(Arc::clone(&queue), abort.clone()));
/// let handle = SinkHandle::new("file", queue, abort, task);
/// ```
pub struct SinkHandle {
    /// Human-readable name for logging
    name: String,

    /// Producer side of the sink's queue
    queue: Arc<MemoryBoundedQueue<String>>,

    /// Cancels the consumer loop without draining
    abort: CancellationToken,

    /// Consumer task, taken on join
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SinkHandle {
    /// Create a new sink handle
    pub fn new(
        name: impl Into<String>,
        queue: Arc<MemoryBoundedQueue<String>>,
        abort: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            name: name.into(),
            queue,
            abort,
            task: Mutex::new(Some(task)),
        }
    }

    /// Get the sink's name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the sink's queue
    #[inline]
    pub fn queue(&self) -> &Arc<MemoryBoundedQueue<String>> {
        &self.queue
    }

    /// Enqueue a line, waiting while the sink's budget is exhausted
    ///
    /// # Errors
    ///
    /// Returns `SinkClosed` once the sink has been stopped.
    pub async fn send(&self, line: String) -> Result<()> {
        self.queue
            .push(line)
            .await
            .map_err(|_| PipelineError::SinkClosed(self.name.clone()))
    }

    /// Check if the sink stopped accepting records
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.queue.is_closed()
    }

    /// Tell the consumer task to stop
    ///
    /// Graceful closes the queue so the consumer drains and exits. Abrupt
    /// cancels the consumer and discards whatever is still queued, which
    /// also releases producers waiting on the budget.
    pub fn stop(&self, mode: ShutdownMode) {
        match mode {
            ShutdownMode::Graceful => self.queue.close(),
            ShutdownMode::Abrupt => {
                self.abort.cancel();
                self.queue.close();
                let dropped = self.queue.clear();
                if dropped > 0 {
                    tracing::warn!(sink = %self.name, dropped, "discarded queued records");
                }
            }
        }
    }

    /// Wait for the consumer task to exit
    ///
    /// Returns false if the task panicked or did not finish in time. A
    /// second call returns true immediately.
    pub async fn join(&self, timeout: Duration) -> bool {
        let Some(task) = self.task.lock().take() else {
            return true;
        };

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::error!(sink = %self.name, error = %e, "sink task panicked");
                false
            }
            Err(_) => {
                tracing::warn!(sink = %self.name, "sink task did not finish within timeout");
                false
            }
        }
    }
}

impl fmt::Debug for SinkHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkHandle")
            .field("name", &self.name)
            .field("queue", &self.queue)
            .field("aborted", &self.abort.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_collector(
        queue: Arc<MemoryBoundedQueue<String>>,
        abort: CancellationToken,
    ) -> (JoinHandle<()>, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let out = Arc::clone(&seen);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = abort.cancelled() => break,
                    item = queue.pop() => match item {
                        Some(line) => out.lock().push(line),
                        None => break,
                    },
                }
            }
        });
        (task, seen)
    }

    #[test]
    fn test_shutdown_mode_from_graceful() {
        assert_eq!(ShutdownMode::from_graceful(true), ShutdownMode::Graceful);
        assert_eq!(ShutdownMode::from_graceful(false), ShutdownMode::Abrupt);
        assert!(ShutdownMode::Graceful.is_graceful());
        assert!(!ShutdownMode::Abrupt.is_graceful());
    }

    #[tokio::test]
    async fn test_send_and_graceful_stop() {
        let queue = Arc::new(MemoryBoundedQueue::new(4096));
        let abort = CancellationToken::new();
        let (task, seen) = spawn_collector(Arc::clone(&queue), abort.clone());
        let handle = SinkHandle::new("test", queue, abort, task);

        handle.send("a".into()).await.unwrap();
        handle.send("b".into()).await.unwrap();
        handle.stop(ShutdownMode::Graceful);

        assert!(handle.join(Duration::from_secs(1)).await);
        assert_eq!(*seen.lock(), vec!["a".to_string(), "b".to_string()]);

        let err = handle.send("c".into()).await.unwrap_err();
        assert!(err.is_closed());
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_abrupt_stop_discards_queue() {
        let queue = Arc::new(MemoryBoundedQueue::new(4096));
        let abort = CancellationToken::new();
        // no consumer running: everything stays queued
        let task = tokio::spawn(async {});
        let handle = SinkHandle::new("test", Arc::clone(&queue), abort.clone(), task);

        handle.send("a".into()).await.unwrap();
        handle.stop(ShutdownMode::Abrupt);

        assert!(abort.is_cancelled());
        assert!(queue.is_empty());
        assert!(handle.join(Duration::from_secs(1)).await);
        assert!(handle.join(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_debug_output() {
        let queue = Arc::new(MemoryBoundedQueue::new(64));
        let handle = SinkHandle::new("file", queue, CancellationToken::new(), tokio::spawn(async {}));
        let debug = format!("{handle:?}");
        assert!(debug.contains("file"));
        assert!(debug.contains("aborted: false"));
    }
}
