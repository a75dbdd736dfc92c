//! Supervisor - listener, accept loop and shutdown protocol
//!
//! # State Machine
//!
//! ```text
//! Stopped ──bind()──▶ Listening ──shutdown()──▶ ShuttingDown ──▶ Stopped
//! ```
//!
//! # Registry
//!
//! Every accepted connection gets a `ConnectionHandle`. The worker task owns
//! it; the supervisor keeps only a `Weak` under a mutex, pruned on insert.
//! Shutdown upgrades what it can and requests teardown; expired entries are
//! connections that already finished and are skipped.
//!
//! # Shutdown
//!
//! `shutdown(graceful)` runs once; later calls return immediately.
//!
//! 1. Cancel the accept loop, which drops the listener
//! 2. Request teardown on every live connection
//! 3. Graceful: wait for workers (bounded), then let the sinks drain
//! 4. Abrupt: stop the sinks first so blocked workers are released, then
//!    wait for workers (bounded)

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use socket2::{SockRef, TcpKeepalive};
use tlslog_pipeline::{Router, ShutdownMode};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::common::{SourceMetrics, SourceMetricsSnapshot};
use crate::worker::{ConnectionHandle, ConnectionWorker, WorkerConfig};

/// Pause after a failed accept (e.g. EMFILE) before retrying
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Idle time before TCP keepalive probes start
const KEEPALIVE_TIME: Duration = Duration::from_secs(60);

/// Interval between keepalive probes
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

// =============================================================================
// Configuration
// =============================================================================

/// Supervisor configuration
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub address: String,

    /// Listen port (0 picks a free port)
    pub port: u16,

    /// TCP nodelay (disable Nagle's algorithm)
    pub nodelay: bool,

    /// TCP keepalive enabled
    pub keepalive: bool,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Bound on each shutdown wait
    pub shutdown_timeout: Duration,

    /// Per-connection settings
    pub worker: WorkerConfig,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 60119,
            nodelay: true,
            keepalive: true,
            max_connections: 0,
            shutdown_timeout: Duration::from_secs(10),
            worker: WorkerConfig::default(),
        }
    }
}

impl SupervisorConfig {
    /// Get the socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Supervisor errors
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Failed to bind to address
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// `run()` called after shutdown
    #[error("supervisor is shut down")]
    ShutDown,
}

/// Supervisor lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SupervisorState {
    Stopped = 0,
    Listening = 1,
    ShuttingDown = 2,
}

impl SupervisorState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Listening,
            2 => Self::ShuttingDown,
            _ => Self::Stopped,
        }
    }
}

// =============================================================================
// Supervisor
// =============================================================================

/// Accepts TLS connections and runs one worker task per connection
pub struct Supervisor {
    config: SupervisorConfig,
    acceptor: TlsAcceptor,
    router: Arc<Router>,
    metrics: Arc<SourceMetrics>,

    /// Bound listener, taken by `run()`
    listener: Mutex<Option<TcpListener>>,

    /// Non-owning references to live connections
    registry: Mutex<Vec<Weak<ConnectionHandle>>>,

    /// Worker tasks
    tracker: TaskTracker,

    /// Stops the accept loop
    stop: CancellationToken,

    state: AtomicU8,
    shutdown_started: AtomicBool,
}

impl Supervisor {
    /// Create a supervisor; nothing is bound until `bind()` or `run()`
    pub fn new(config: SupervisorConfig, acceptor: TlsAcceptor, router: Arc<Router>) -> Self {
        Self {
            config,
            acceptor,
            router,
            metrics: Arc::new(SourceMetrics::new()),
            listener: Mutex::new(None),
            registry: Mutex::new(Vec::new()),
            tracker: TaskTracker::new(),
            stop: CancellationToken::new(),
            state: AtomicU8::new(SupervisorState::Stopped as u8),
            shutdown_started: AtomicBool::new(false),
        }
    }

    /// Current state
    pub fn state(&self) -> SupervisorState {
        SupervisorState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Shared router
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> SourceMetricsHandle {
        SourceMetricsHandle {
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Number of connections whose worker is still running
    pub fn connection_count(&self) -> usize {
        self.registry
            .lock()
            .iter()
            .filter(|handle| handle.strong_count() > 0)
            .count()
    }

    /// Open the listening socket
    ///
    /// Returns the bound address, which differs from the configured one when
    /// port 0 was requested.
    pub async fn bind(&self) -> Result<SocketAddr, SourceError> {
        if self.shutdown_started.load(Ordering::Acquire) {
            return Err(SourceError::ShutDown);
        }

        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| SourceError::Bind {
                address: address.clone(),
                source,
            })?;
        let local = listener.local_addr()?;

        *self.listener.lock() = Some(listener);
        self.set_state(SupervisorState::Listening);

        tracing::info!(
            address = %local,
            max_connections = self.config.max_connections,
            "TLS listener bound"
        );
        Ok(local)
    }

    /// Accept connections until `shutdown()` is called
    ///
    /// Binds first if `bind()` was not called. Never waits on workers.
    pub async fn run(&self) -> Result<(), SourceError> {
        let pending = self.listener.lock().take();
        let listener = match pending {
            Some(listener) => listener,
            None => {
                self.bind().await?;
                self.listener.lock().take().ok_or(SourceError::ShutDown)?
            }
        };

        loop {
            tokio::select! {
                biased;

                _ = self.stop.cancelled() => break,

                result = listener.accept() => match result {
                    Ok((stream, peer)) => self.accept(stream, peer),
                    Err(e) => {
                        self.metrics.error();
                        tracing::warn!(error = %e, "accept error");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        tracing::info!("TLS listener closed");
        Ok(())
    }

    fn accept(&self, stream: TcpStream, peer: SocketAddr) {
        let max = self.config.max_connections;
        if max > 0 && self.connection_count() >= max {
            self.metrics.connection_rejected();
            tracing::warn!(
                peer = %peer,
                max_connections = max,
                "connection limit reached, rejecting"
            );
            return;
        }

        self.configure_socket(&stream);

        let handle = Arc::new(ConnectionHandle::new(peer));
        self.register(&handle);
        self.metrics.connection_opened();

        let worker = ConnectionWorker::new(
            handle,
            self.acceptor.clone(),
            Arc::clone(&self.router),
            Arc::clone(&self.metrics),
            self.config.worker.clone(),
        );
        let metrics = Arc::clone(&self.metrics);
        let span = tracing::info_span!("connection", peer = %peer);

        self.tracker.spawn(
            async move {
                tracing::debug!("connection accepted");
                worker.run(stream).await;
                metrics.connection_closed();
            }
            .instrument(span),
        );
    }

    /// Track a new connection
    ///
    /// `shutdown` cancels `stop` before sweeping the registry under the same
    /// lock, so a connection registered after the sweep is torn down here.
    fn register(&self, handle: &Arc<ConnectionHandle>) {
        let mut registry = self.registry.lock();
        if self.stop.is_cancelled() {
            handle.request_teardown();
        }
        registry.retain(|entry| entry.strong_count() > 0);
        registry.push(Arc::downgrade(handle));
    }

    /// Set nodelay and keepalive; failures are logged and ignored
    fn configure_socket(&self, stream: &TcpStream) {
        let socket = SockRef::from(stream);

        if self.config.nodelay
            && let Err(e) = socket.set_tcp_nodelay(true)
        {
            tracing::debug!(error = %e, "failed to set TCP_NODELAY");
        }

        if self.config.keepalive {
            let keepalive = TcpKeepalive::new()
                .with_time(KEEPALIVE_TIME)
                .with_interval(KEEPALIVE_INTERVAL);

            if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
                tracing::debug!(error = %e, "failed to set TCP keepalive");
            }
        }
    }

    /// Stop accepting, tear down connections and stop the sinks
    ///
    /// Idempotent: only the first call does anything. Safe to call from a
    /// signal handling task while `run()` is in progress.
    pub async fn shutdown(&self, graceful: bool) {
        if self.shutdown_started.swap(true, Ordering::AcqRel) {
            tracing::debug!("shutdown already requested");
            return;
        }

        let mode = ShutdownMode::from_graceful(graceful);
        self.set_state(SupervisorState::ShuttingDown);
        tracing::info!(mode = ?mode, "shutting down");

        self.stop.cancel();
        drop(self.listener.lock().take());

        let torn_down = self.request_teardown();
        tracing::debug!(connections = torn_down, "teardown requested");

        self.tracker.close();
        let timeout = self.config.shutdown_timeout;

        if mode.is_graceful() {
            self.wait_for_workers(timeout).await;
            self.router.shutdown(mode, timeout).await;
        } else {
            self.router.shutdown(mode, timeout).await;
            self.wait_for_workers(timeout).await;
        }

        self.set_state(SupervisorState::Stopped);
        tracing::info!("shutdown complete");
    }

    /// Request teardown on every live connection, returning how many
    fn request_teardown(&self) -> usize {
        let registry = self.registry.lock();
        let mut count = 0;
        for handle in registry.iter().filter_map(Weak::upgrade) {
            handle.request_teardown();
            count += 1;
        }
        count
    }

    async fn wait_for_workers(&self, timeout: Duration) {
        if tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                remaining = self.tracker.len(),
                "connection workers did not finish in time"
            );
        }
    }

    fn set_state(&self, state: SupervisorState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Cloneable handle to source metrics, valid after the supervisor is dropped
#[derive(Clone, Debug)]
pub struct SourceMetricsHandle {
    metrics: Arc<SourceMetrics>,
}

impl SourceMetricsHandle {
    /// Get a snapshot of connection counters
    pub fn snapshot(&self) -> SourceMetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
#[path = "supervisor_test.rs"]
mod supervisor_test;
