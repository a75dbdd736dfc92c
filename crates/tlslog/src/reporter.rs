//! Periodic metrics reporter
//!
//! Logs one line per component every interval, plus a final report when
//! cancelled so the totals of a run end up in the log.

use std::time::Duration;

use tlslog_pipeline::RouterMetricsHandle;
use tlslog_sinks::console::ConsoleSinkMetricsHandle;
use tlslog_sinks::file::FileSinkMetricsHandle;
use tlslog_sources::SourceMetricsHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Metrics handles of every running component
pub struct MetricsReporter {
    interval: Duration,
    source: SourceMetricsHandle,
    router: RouterMetricsHandle,
    file: FileSinkMetricsHandle,
    console: Option<ConsoleSinkMetricsHandle>,
}

impl MetricsReporter {
    pub fn new(
        interval: Duration,
        source: SourceMetricsHandle,
        router: RouterMetricsHandle,
        file: FileSinkMetricsHandle,
        console: Option<ConsoleSinkMetricsHandle>,
    ) -> Self {
        Self {
            interval,
            source,
            router,
            file,
            console,
        }
    }

    /// Report every interval until cancelled, then once more
    ///
    /// The first report comes one interval after start.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval = ?self.interval, "metrics reporter started");

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    self.report();
                    info!("metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => self.report(),
            }
        }
    }

    fn report(&self) {
        let source = self.source.snapshot();
        info!(
            connections_active = source.connections_active,
            connections_total = source.connections_total,
            connections_rejected = source.connections_rejected,
            handshake_failures = source.handshake_failures,
            frames = source.frames_received,
            bytes = source.bytes_received,
            errors = source.errors,
            "source metrics"
        );

        let router = self.router.snapshot();
        info!(
            frames = router.frames_received,
            routed = router.records_routed,
            malformed = router.frames_malformed,
            unsupported_severity = router.severity_unsupported,
            sink_closed = router.sink_closed,
            dropped = router.dropped(),
            "router metrics"
        );

        let file = self.file.snapshot();
        info!(
            sink = "file",
            lines = file.lines_written,
            bytes = file.bytes_written,
            rotations = file.rotations,
            flushes = file.flushes,
            errors = file.write_errors,
            "sink metrics"
        );

        if let Some(console) = &self.console {
            let console = console.snapshot();
            info!(
                sink = "console",
                lines = console.entries_written,
                bytes = console.bytes_written,
                errors = console.write_errors,
                "sink metrics"
            );
        }
    }
}
