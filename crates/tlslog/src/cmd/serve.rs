//! Serve command - run the collector
//!
//! Wiring, in startup order:
//!
//! ```text
//! config ─▶ output dir ─▶ TLS acceptor ─▶ sinks ─▶ router ─▶ supervisor ─▶ bind
//! ```
//!
//! Any failure before the listener is bound is fatal. After that the
//! collector runs until SIGINT or SIGTERM, then shuts down gracefully or
//! abruptly per `[shutdown] graceful`.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use tlslog_config::{Config, OutputConfig};
use tlslog_pipeline::{MemoryBoundedQueue, Palette, Router};
use tlslog_sinks::console::{ConsoleSink, ConsoleSinkMetricsHandle};
use tlslog_sinks::file::{FileSink, FileSinkConfig, FileSinkMetricsHandle};
use tlslog_sources::{Supervisor, SupervisorConfig, WorkerConfig, load_acceptor};

use crate::cmd::LoadedConfig;
use crate::reporter::MetricsReporter;

/// Serve command arguments
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file (defaults to configs/config.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Run the serve command
pub async fn run(loaded: LoadedConfig) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        config = %loaded.source_display(),
        "tlslog starting"
    );

    if let Err(e) = run_server(loaded.config).await {
        error!(error = %format!("{e:#}"), "server error");
        return Err(e);
    }

    info!("tlslog shutdown complete");
    Ok(())
}

/// Metrics handles of the spawned sinks
struct SinkMetrics {
    file: FileSinkMetricsHandle,
    console: Option<ConsoleSinkMetricsHandle>,
}

/// Main server run loop
async fn run_server(config: Config) -> Result<()> {
    let output = &config.output;
    fs::create_dir_all(&output.directory).with_context(|| {
        format!(
            "failed to create output directory {}",
            output.directory.display()
        )
    })?;

    let acceptor = load_acceptor(&config.server.cert_path, &config.server.key_path)
        .context("failed to load TLS certificate")?;

    let colors = config
        .resolved_colors()
        .context("invalid console colors")?;
    let palette = Palette::new(colors.error, colors.info, colors.debug);

    let (router, sink_metrics) = start_pipeline(output, palette);
    let router = Arc::new(router);

    let supervisor = Arc::new(Supervisor::new(
        supervisor_config(&config),
        acceptor,
        Arc::clone(&router),
    ));

    let local = match supervisor.bind().await {
        Ok(local) => local,
        Err(e) => {
            // sinks are already running
            supervisor.shutdown(false).await;
            return Err(e).context("failed to start TLS listener");
        }
    };

    let accept_task = {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move { supervisor.run().await })
    };

    let cancel = CancellationToken::new();
    let metrics_task = if let Some(interval) = config.metrics.reporting_interval() {
        let reporter = MetricsReporter::new(
            interval,
            supervisor.metrics_handle(),
            router.metrics_handle(),
            sink_metrics.file,
            sink_metrics.console,
        );
        Some(tokio::spawn(reporter.run(cancel.clone())))
    } else {
        info!("metrics reporting disabled");
        None
    };

    info!(
        address = %local,
        directory = %output.directory.display(),
        screen = output.screen,
        queue_budget = output.queue_budget(),
        "tlslog running"
    );

    wait_for_shutdown().await;
    info!("shutdown signal received, stopping collector...");

    supervisor.shutdown(config.shutdown.graceful).await;

    match tokio::time::timeout(config.shutdown.timeout, accept_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!(error = %e, "accept loop failed"),
        Ok(Err(e)) => warn!(error = %e, "accept task panicked"),
        Err(_) => warn!("accept loop did not stop within timeout"),
    }

    cancel.cancel();
    if let Some(task) = metrics_task
        && let Err(e) = task.await
    {
        warn!(error = %e, "metrics reporter panicked");
    }

    Ok(())
}

/// Spawn the file sink, plus the console sink when screen output is on
///
/// Every queue gets `output.queue_budget()` bytes.
fn start_pipeline(output: &OutputConfig, palette: Palette) -> (Router, SinkMetrics) {
    let budget = output.queue_budget();

    let file_config = FileSinkConfig::default()
        .with_directory(&output.directory)
        .with_max_file_size(output.file_max_size_bytes())
        .with_flush_interval(output.flush_interval);
    let file_sink = FileSink::new(
        file_config,
        Arc::new(MemoryBoundedQueue::new(budget)),
        CancellationToken::new(),
    );
    if let Some(path) = file_sink.open() {
        info!(path = %path.display(), "output file opened");
    }
    let file_metrics = file_sink.metrics_handle();
    let mut router = Router::new(file_sink.spawn(), palette);

    let console_metrics = if output.screen {
        let console = ConsoleSink::new(
            Arc::new(MemoryBoundedQueue::new(budget)),
            CancellationToken::new(),
        );
        let metrics = console.metrics_handle();
        router = router.with_console(console.spawn());
        Some(metrics)
    } else {
        None
    };

    (
        router,
        SinkMetrics {
            file: file_metrics,
            console: console_metrics,
        },
    )
}

/// Map the `[server]` and `[shutdown]` sections onto the supervisor
fn supervisor_config(config: &Config) -> SupervisorConfig {
    let server = &config.server;
    SupervisorConfig {
        address: server.bind_address.clone(),
        port: server.port,
        nodelay: server.nodelay,
        keepalive: server.keepalive,
        max_connections: server.max_connections,
        shutdown_timeout: config.shutdown.timeout,
        worker: WorkerConfig {
            handshake_timeout: server.handshake_timeout,
            read_timeout: server.read_timeout,
            read_buffer_size: server.read_buffer_size,
        },
    }
}

/// Wait for SIGINT or SIGTERM
///
/// A handler that cannot be installed is logged and never fires.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::time::Duration;

    #[test]
    fn test_supervisor_config_mapping() {
        let config = Config::from_str(
            r#"
[server]
bind_address = "127.0.0.1"
port = 6514
read_buffer_size = 4096
handshake_timeout = "3s"
max_connections = 8
nodelay = false

[shutdown]
timeout = "2s"
"#,
        )
        .unwrap();

        let mapped = supervisor_config(&config);
        assert_eq!(mapped.bind_address(), "127.0.0.1:6514");
        assert!(!mapped.nodelay);
        assert_eq!(mapped.max_connections, 8);
        assert_eq!(mapped.shutdown_timeout, Duration::from_secs(2));
        assert_eq!(mapped.worker.read_buffer_size, 4096);
        assert_eq!(mapped.worker.handshake_timeout, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_start_pipeline_screen_toggle() {
        let dir = tempfile::tempdir().unwrap();
        let mut output = OutputConfig {
            directory: dir.path().to_path_buf(),
            ..OutputConfig::default()
        };

        let (router, metrics) = start_pipeline(&output, Palette::default());
        assert!(!router.screen_enabled());
        assert!(metrics.console.is_none());
        router
            .shutdown(tlslog_pipeline::ShutdownMode::Graceful, Duration::from_secs(5))
            .await;

        output.screen = true;
        let (router, metrics) = start_pipeline(&output, Palette::default());
        assert!(router.screen_enabled());
        assert!(metrics.console.is_some());
        router
            .shutdown(tlslog_pipeline::ShutdownMode::Graceful, Duration::from_secs(5))
            .await;
    }
}
