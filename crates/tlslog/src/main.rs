//! tlslog - TLS syslog collector
//!
//! # Usage
//!
//! ```bash
//! # Run the collector (default)
//! tlslog
//! tlslog --config configs/config.toml
//!
//! # Validate a configuration file
//! tlslog check -c configs/config.toml
//!
//! # Send sample records to a running collector
//! tlslog test --server 127.0.0.1:60119 --ca server.pem
//! ```

mod cmd;
mod reporter;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tlslog_config::{LogConfig, LogFormat, LogLevel, LogOutput};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// tlslog - TLS syslog collector
#[derive(Parser, Debug)]
#[command(name = "tlslog")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides RUST_LOG and the config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the collector
    Serve(cmd::serve::ServeArgs),

    /// Load and validate the configuration, then print a summary
    Check(cmd::check::CheckArgs),

    /// Send sample records of every supported severity over TLS
    Test(cmd::test::TestArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Serve(mut args)) => {
            // CLI global --config overrides subcommand config if both specified
            if args.config.is_none() && cli.config.is_some() {
                args.config = cli.config;
            }
            serve(args, cli.log_level.as_deref()).await
        }
        Some(Command::Check(mut args)) => {
            if args.config.is_none() && cli.config.is_some() {
                args.config = cli.config;
            }
            // Check doesn't need logging - just outputs to stdout
            cmd::check::run(args)
        }
        Some(Command::Test(args)) => {
            // Test doesn't need logging - just outputs to stdout
            cmd::test::run(args).await
        }
        // No subcommand = run collector
        None => {
            let args = cmd::serve::ServeArgs { config: cli.config };
            serve(args, cli.log_level.as_deref()).await
        }
    }
}

/// Load config, initialize logging from it, then serve
async fn serve(args: cmd::serve::ServeArgs, cli_level: Option<&str>) -> Result<()> {
    let loaded = cmd::load_config(args.config.as_deref())?;

    let env_level = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let level = resolve_log_level(cli_level, env_level.as_deref(), loaded.config.log.level);
    init_logging(&loaded.config.log, &level)?;

    cmd::serve::run(loaded).await
}

/// Resolve log level: CLI flag > RUST_LOG > config file
fn resolve_log_level(cli_level: Option<&str>, env_level: Option<&str>, configured: LogLevel) -> String {
    cli_level
        .or(env_level)
        .filter(|level| !level.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| configured.as_str().to_string())
}

/// Initialize the tracing subscriber for logging
///
/// Diagnostics go to stderr unless configured otherwise; stdout belongs to
/// the console sink.
fn init_logging(log: &LogConfig, level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let writer = match &log.output {
        LogOutput::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogOutput::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogOutput::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
    };

    let layer = match log.format {
        LogFormat::Console => fmt::layer()
            .with_writer(writer)
            .with_ansi(log.ansi_enabled())
            .with_target(true)
            .with_thread_ids(false)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry().with(layer).with(filter).init();

    Ok(())
}
