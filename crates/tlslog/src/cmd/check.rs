//! Check command - validate a configuration without starting the collector
//!
//! ```bash
//! tlslog check -c configs/config.toml
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tlslog_config::Config;

use crate::cmd::{LoadedConfig, load_config};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to configuration file (defaults to configs/config.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: CheckArgs) -> Result<()> {
    let loaded = load_config(args.config.as_deref())?;
    print!("{}", summary(&loaded)?);
    Ok(())
}

/// Human-readable summary of the effective configuration
fn summary(loaded: &LoadedConfig) -> Result<String> {
    let config: &Config = &loaded.config;
    let server = &config.server;
    let output = &config.output;
    let colors = config.resolved_colors()?;

    let mut lines = vec![
        format!("config: {} (valid)", loaded.source_display()),
        format!("listen: {}", server.listen_address()),
        format!(
            "tls: cert={} key={}",
            server.cert_path.display(),
            server.key_path.display()
        ),
        format!(
            "timeouts: handshake={:?} read={:?}",
            server.handshake_timeout, server.read_timeout
        ),
        format!("read buffer: {} bytes", server.read_buffer_size),
        format!(
            "file output: {} (rotate at {} bytes, flush every {:?})",
            output.directory.display(),
            output.file_max_size_bytes(),
            output.flush_interval
        ),
        format!("screen output: {}", if output.screen { "on" } else { "off" }),
        format!(
            "queues: {} x {} bytes",
            output.active_sinks(),
            output.queue_budget()
        ),
        format!(
            "colors: error={} info={} debug={}",
            colors.error, colors.info, colors.debug
        ),
        format!(
            "shutdown: {} within {:?}",
            if config.shutdown.graceful { "graceful" } else { "abrupt" },
            config.shutdown.timeout
        ),
    ];

    if config.metrics.enabled {
        lines.push(format!("metrics: every {:?}", config.metrics.interval));
    } else {
        lines.push("metrics: off".to_string());
    }

    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}
