//! Router - decodes frames and fans records out to the sinks
//!
//! Every connection worker shares one `Router` behind an `Arc`. For each raw
//! frame the router:
//!
//! 1. Validates and decodes it with `parse_frame`
//! 2. Resolves the severity to a routable `Level` (3, 6 or 7)
//! 3. Pushes the plain body to the file sink
//! 4. If screen output is enabled, pushes the colorized body to the console sink
//!
//! Rejected records are dropped from every sink and produce exactly one
//! `warn!` diagnostic; the caller keeps reading.
//!
//! # Console Atomicity
//!
//! The console entry is painted in one piece (`color_start + body +
//! end_line`, rendered by owo-colors) before it is queued, so no other record can interleave between a record's color
//! start and its reset.

use std::sync::Arc;
use std::time::Duration;

use tlslog_protocol::{ColorCode, FrameError, Level, RESET, parse_frame};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::metrics::{MetricsSnapshot, RouterMetrics};
use crate::queue::ITEM_OVERHEAD_BYTES;
use crate::sink_handle::{ShutdownMode, SinkHandle};

/// Longest 16-color SGR start sequence (`ESC[9Xm`)
const MAX_SGR_BYTES: usize = 5;

/// Bytes a console entry adds on top of the rendered body
pub const COLOR_WRAP_BYTES: usize = MAX_SGR_BYTES + RESET.len();

/// Largest queue charge a record read into a `read_buffer_size` buffer can
/// produce; each queue budget must be at least this large.
#[inline]
pub const fn max_item_size(read_buffer_size: usize) -> usize {
    read_buffer_size + COLOR_WRAP_BYTES + ITEM_OVERHEAD_BYTES
}

/// Color assigned to each routable level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub error: ColorCode,
    pub info: ColorCode,
    pub debug: ColorCode,
}

impl Palette {
    /// Create a palette from explicit colors
    #[inline]
    pub const fn new(error: ColorCode, info: ColorCode, debug: ColorCode) -> Self {
        Self { error, info, debug }
    }

    /// Color for a level
    #[inline]
    pub const fn color(&self, level: Level) -> ColorCode {
        match level {
            Level::Error => self.error,
            Level::Info => self.info,
            Level::Debug => self.debug,
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(ColorCode::BRIGHT_RED, ColorCode::BLUE, ColorCode::BRIGHT_BLACK)
    }
}

/// Routes decoded records to the file sink and the optional console sink
pub struct Router {
    /// Always active
    file: SinkHandle,

    /// Present when screen output is enabled
    console: Option<SinkHandle>,

    palette: Palette,

    metrics: Arc<RouterMetrics>,
}

impl Router {
    /// Create a router writing to the file sink only
    pub fn new(file: SinkHandle, palette: Palette) -> Self {
        Self {
            file,
            console: None,
            palette,
            metrics: Arc::new(RouterMetrics::new()),
        }
    }

    /// Enable screen output through the given console sink
    #[must_use]
    pub fn with_console(mut self, console: SinkHandle) -> Self {
        self.console = Some(console);
        self
    }

    /// Check if records are also written to the console
    #[inline]
    pub fn screen_enabled(&self) -> bool {
        self.console.is_some()
    }

    /// Get metrics reference
    #[inline]
    pub fn metrics(&self) -> &Arc<RouterMetrics> {
        &self.metrics
    }

    /// Get a handle for reporting that outlives borrows of the router
    pub fn metrics_handle(&self) -> RouterMetricsHandle {
        RouterMetricsHandle {
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Configured color for a syslog severity
    ///
    /// `None` for every severity other than 3, 6 and 7.
    #[inline]
    pub fn severity_color(&self, severity: u8) -> Option<ColorCode> {
        Level::from_severity(severity).map(|level| self.palette.color(level))
    }

    /// SGR sequence that opens a colored console segment
    #[inline]
    pub fn color_start(&self, level: Level) -> String {
        self.palette.color(level).sgr()
    }

    /// Sequence that closes a colored console segment
    #[inline]
    pub fn end_line(&self) -> &'static str {
        RESET
    }

    /// Decode one raw frame and enqueue it to every active sink
    ///
    /// Waits while a sink queue is at its memory ceiling. Returns the level
    /// the record was routed at.
    ///
    /// # Errors
    ///
    /// - `Frame` / `UnsupportedSeverity`: the record was dropped and a
    ///   diagnostic emitted; keep reading
    /// - `SinkClosed`: the pipeline is shutting down
    pub async fn route(&self, raw: &[u8]) -> Result<Level> {
        self.metrics.record_received(raw.len() as u64);

        let record = match parse_frame(raw) {
            Ok(record) => record,
            Err(e) => {
                self.report_malformed(&e, raw.len());
                return Err(e.into());
            }
        };

        let Some(level) = record.level() else {
            self.metrics.record_unsupported();
            warn!(
                priority = record.priority,
                severity = record.severity,
                "dropping record with unsupported severity"
            );
            return Err(PipelineError::UnsupportedSeverity {
                priority: record.priority,
                severity: record.severity,
            });
        };

        let console_line = self
            .console
            .as_ref()
            .map(|_| self.colorize(level, &record.rendered_body));

        if let Err(e) = self.file.send(record.rendered_body).await {
            self.metrics.record_sink_closed();
            return Err(e);
        }

        if let (Some(console), Some(line)) = (&self.console, console_line)
            && let Err(e) = console.send(line).await
        {
            self.metrics.record_sink_closed();
            return Err(e);
        }

        self.metrics.record_routed();
        Ok(level)
    }

    /// Drop bytes a connection could not split into a frame
    ///
    /// Counted and reported the same way as a frame `route` rejects.
    pub fn reject(&self, error: &FrameError, bytes: usize) {
        self.metrics.record_received(bytes as u64);
        self.report_malformed(error, bytes);
    }

    fn report_malformed(&self, error: &FrameError, bytes: usize) {
        self.metrics.record_malformed();
        warn!(error = %error, bytes, "dropping malformed frame");
    }

    /// Compose a single console entry: color start, body, reset
    #[inline]
    fn colorize(&self, level: Level, body: &str) -> String {
        self.palette.color(level).paint(body)
    }

    /// Propagate the termination mode to every sink
    ///
    /// Graceful waits (bounded by `timeout` per sink) for consumers to drain
    /// and exit. Abrupt waits only for the prompt exit of the cancelled
    /// consumers.
    pub async fn shutdown(&self, mode: ShutdownMode, timeout: Duration) {
        info!(mode = ?mode, "stopping sinks");

        let sinks = std::iter::once(&self.file).chain(self.console.as_ref());
        for sink in sinks.clone() {
            debug!(sink = %sink.name(), pending = sink.queue().len(), "stopping sink");
            sink.stop(mode);
        }

        for sink in sinks {
            if sink.join(timeout).await {
                debug!(sink = %sink.name(), "sink stopped");
            }
        }

        let snapshot = self.metrics.snapshot();
        info!(
            routed = snapshot.records_routed,
            dropped = snapshot.dropped(),
            "sinks stopped"
        );
    }
}

/// Cloneable handle to router metrics
#[derive(Clone, Debug)]
pub struct RouterMetricsHandle {
    metrics: Arc<RouterMetrics>,
}

impl RouterMetricsHandle {
    /// Get a snapshot of router counters
    #[inline]
    pub fn snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
