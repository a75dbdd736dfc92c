//! Connection worker - one per accepted connection
//!
//! # State Machine
//!
//! ```text
//! Handshaking ──ok──▶ Streaming ──EOF / error / teardown──▶ Closing ──▶ Done
//!      │                                                       ▲
//!      └────────────────── failure / timeout ──────────────────┘
//! ```
//!
//! Reads accumulate in a per-connection buffer. Every complete frame at
//! its front, as delimited by the octet count, goes to the router; a
//! partial tail waits for the next read. A frame longer than
//! `read_buffer_size` is reported and skipped. A prefix that is not a
//! count loses the frame boundary, so the buffered bytes are discarded and
//! reading resumes with the next read.
//!
//! # Teardown
//!
//! The worker owns the TLS stream. The supervisor asks for teardown through
//! the shared `ConnectionHandle`; the worker notices at its next read and
//! closes. `close_notify` is sent at most once, guarded by the handle.
//!
//! Teardown never interrupts routing of frames already read, so a record
//! read before shutdown still reaches the queues.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tlslog_pipeline::Router;
use tlslog_protocol::{FrameError, frame_length};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_rustls::TlsAcceptor;
use tokio_rustls::server::TlsStream;
use tokio_util::sync::CancellationToken;

use crate::common::SourceMetrics;

/// Default TLS handshake deadline
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default deadline for a single read
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Default read buffer (20 KB)
const DEFAULT_READ_BUFFER_SIZE: usize = 20 * 1024;

/// Upper bound on sending `close_notify` to an unresponsive peer
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

// =============================================================================
// Configuration
// =============================================================================

/// Per-connection settings
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Deadline for the TLS handshake
    pub handshake_timeout: Duration,

    /// Deadline for each read; expiry is a transport error
    pub read_timeout: Duration,

    /// Read buffer size, also the largest frame accepted
    pub read_buffer_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

// =============================================================================
// State
// =============================================================================

/// Lifecycle of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    Handshaking = 0,
    Streaming = 1,
    Closing = 2,
    Done = 3,
}

impl WorkerState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Handshaking,
            1 => Self::Streaming,
            2 => Self::Closing,
            _ => Self::Done,
        }
    }
}

/// How a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEnd {
    /// Handshake failed or timed out
    HandshakeFailed,
    /// Peer closed the stream cleanly
    Eof,
    /// Teardown requested by the supervisor
    TornDown,
    /// Sink queues closed; the pipeline is shutting down
    SinkClosed,
    /// Read failed
    ReadError(ReadErrorKind),
}

/// Classification of a failed read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadErrorKind {
    /// Read deadline expired
    Timeout,
    /// Peer reset or aborted the connection, or closed it without `close_notify`
    Reset,
    /// TLS protocol violation (bad record, alert, decrypt failure)
    Protocol,
    /// Anything else
    Other,
}

impl ReadErrorKind {
    /// Classify an I/O error from a TLS stream read
    pub fn classify(error: &io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::TimedOut => Self::Timeout,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => Self::Reset,
            io::ErrorKind::InvalidData => Self::Protocol,
            _ => Self::Other,
        }
    }

    /// Short label for logs
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Reset => "reset",
            Self::Protocol => "protocol",
            Self::Other => "other",
        }
    }

    /// Transport-level failure (as opposed to a TLS protocol failure)
    pub const fn is_transport(self) -> bool {
        matches!(self, Self::Timeout | Self::Reset)
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Shared view of one connection
///
/// The worker holds the only strong reference; the supervisor's registry
/// holds a `Weak`, so a finished connection simply expires.
#[derive(Debug)]
pub struct ConnectionHandle {
    peer: SocketAddr,
    state: AtomicU8,
    teardown: CancellationToken,
    closed: AtomicBool,
}

impl ConnectionHandle {
    /// Create a handle for a connection from `peer`
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            state: AtomicU8::new(WorkerState::Handshaking as u8),
            teardown: CancellationToken::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Remote address
    #[inline]
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Current state
    #[inline]
    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Ask the worker to close the connection; safe to call any number of times
    pub fn request_teardown(&self) {
        self.teardown.cancel();
    }

    /// Check if teardown was requested
    #[inline]
    pub fn is_teardown_requested(&self) -> bool {
        self.teardown.is_cancelled()
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Returns true for the first caller only
    fn begin_close(&self) -> bool {
        !self.closed.swap(true, Ordering::AcqRel)
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Drives one connection from handshake to teardown
pub struct ConnectionWorker {
    handle: Arc<ConnectionHandle>,
    acceptor: TlsAcceptor,
    router: Arc<Router>,
    metrics: Arc<SourceMetrics>,
    config: WorkerConfig,
}

impl ConnectionWorker {
    /// Create a worker
    pub fn new(
        handle: Arc<ConnectionHandle>,
        acceptor: TlsAcceptor,
        router: Arc<Router>,
        metrics: Arc<SourceMetrics>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            handle,
            acceptor,
            router,
            metrics,
            config,
        }
    }

    /// Get the shared handle
    pub fn handle(&self) -> &Arc<ConnectionHandle> {
        &self.handle
    }

    /// Run the connection to completion
    ///
    /// Never fails: every error is scoped to this connection, logged and
    /// reported through the returned `ConnectionEnd`.
    pub async fn run<IO>(self, io: IO) -> ConnectionEnd
    where
        IO: AsyncRead + AsyncWrite + Unpin,
    {
        self.handle.set_state(WorkerState::Handshaking);

        let handshake = timeout(self.config.handshake_timeout, self.acceptor.accept(io));
        let accepted = tokio::select! {
            biased;

            _ = self.handle.teardown.cancelled() => None,
            result = handshake => Some(result),
        };

        let mut stream = match accepted {
            Some(Ok(Ok(stream))) => stream,
            Some(Ok(Err(e))) => {
                self.metrics.handshake_failure();
                tracing::warn!(error = %e, "TLS handshake failed");
                self.finish();
                return ConnectionEnd::HandshakeFailed;
            }
            Some(Err(_)) => {
                self.metrics.handshake_failure();
                tracing::warn!(
                    timeout = ?self.config.handshake_timeout,
                    "TLS handshake timed out"
                );
                self.finish();
                return ConnectionEnd::HandshakeFailed;
            }
            None => {
                self.finish();
                return ConnectionEnd::TornDown;
            }
        };

        self.handle.set_state(WorkerState::Streaming);
        tracing::debug!("TLS session established");

        let end = self.read_loop(&mut stream).await;
        match end {
            ConnectionEnd::Eof => tracing::info!("client disconnected"),
            ConnectionEnd::TornDown => tracing::debug!("connection torn down"),
            ConnectionEnd::SinkClosed => tracing::debug!("sinks closed, dropping connection"),
            _ => {}
        }

        self.close(&mut stream).await;
        end
    }

    async fn read_loop<IO>(&self, stream: &mut TlsStream<IO>) -> ConnectionEnd
    where
        IO: AsyncRead + AsyncWrite + Unpin,
    {
        let mut buf = BytesMut::with_capacity(self.config.read_buffer_size);
        // bytes of an oversized frame not yet read
        let mut skip = 0usize;

        loop {
            buf.reserve(self.config.read_buffer_size);

            let read = tokio::select! {
                biased;

                _ = self.handle.teardown.cancelled() => return ConnectionEnd::TornDown,
                result = timeout(self.config.read_timeout, stream.read_buf(&mut buf)) => result,
            };

            match read {
                Ok(Ok(0)) => {
                    self.route_tail(&buf).await;
                    return ConnectionEnd::Eof;
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    let kind = ReadErrorKind::classify(&e);
                    self.metrics.error();
                    tracing::warn!(
                        kind = kind.as_str(),
                        transport = kind.is_transport(),
                        error = %e,
                        "connection read failed"
                    );
                    return ConnectionEnd::ReadError(kind);
                }
                Err(_) => {
                    self.metrics.error();
                    tracing::warn!(
                        kind = ReadErrorKind::Timeout.as_str(),
                        timeout = ?self.config.read_timeout,
                        "connection read timed out"
                    );
                    return ConnectionEnd::ReadError(ReadErrorKind::Timeout);
                }
            }

            if self.route_frames(&mut buf, &mut skip).await {
                return ConnectionEnd::SinkClosed;
            }
        }
    }

    /// Route every complete frame at the front of `buf`
    ///
    /// Leaves a partial frame in place. Returns true once the sinks are
    /// closed.
    async fn route_frames(&self, buf: &mut BytesMut, skip: &mut usize) -> bool {
        loop {
            if *skip > 0 {
                let n = (*skip).min(buf.len());
                buf.advance(n);
                *skip -= n;
                if *skip > 0 {
                    return false;
                }
            }

            match frame_length(&buf[..], self.config.read_buffer_size) {
                Ok(Some(len)) => {
                    let frame = buf.split_to(len);
                    self.metrics.frame_received(len as u64);

                    // Frame and severity errors were already reported by the router
                    if let Err(e) = self.router.route(&frame).await
                        && e.is_closed()
                    {
                        return true;
                    }
                }
                Ok(None) => return false,
                Err(e @ FrameError::TooLarge { length, .. }) => {
                    self.metrics.frame_received(length as u64);
                    self.router.reject(&e, length);
                    *skip = length;
                }
                Err(e) => {
                    self.metrics.frame_received(buf.len() as u64);
                    self.router.reject(&e, buf.len());
                    buf.clear();
                    return false;
                }
            }
        }
    }

    /// Report a frame cut short by end of stream
    async fn route_tail(&self, tail: &[u8]) {
        if tail.is_empty() {
            return;
        }
        self.metrics.frame_received(tail.len() as u64);
        // always rejected: a complete frame would have been split off
        let _ = self.router.route(tail).await;
    }

    /// Send `close_notify` and move to Done, once
    async fn close<IO>(&self, stream: &mut TlsStream<IO>)
    where
        IO: AsyncRead + AsyncWrite + Unpin,
    {
        if !self.handle.begin_close() {
            return;
        }
        self.handle.set_state(WorkerState::Closing);

        match timeout(CLOSE_TIMEOUT, stream.shutdown()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(error = %e, "TLS shutdown failed"),
            Err(_) => tracing::debug!("TLS shutdown timed out"),
        }

        self.handle.set_state(WorkerState::Done);
    }

    /// Teardown for connections that never reached Streaming
    fn finish(&self) {
        if self.handle.begin_close() {
            self.handle.set_state(WorkerState::Closing);
        }
        self.handle.set_state(WorkerState::Done);
    }
}

#[cfg(test)]
#[path = "worker_test.rs"]
mod worker_test;
