//! Configuration validation
//!
//! Runs after parsing:
//! - Port, sizes and timeouts are non-zero
//! - Certificate and key paths are set
//! - Colors resolve to console codes 0-15
//! - Each sink queue can hold the largest record a connection can produce
//! - Diagnostics stay off stdout while the console sink owns it

use std::time::Duration;

use tlslog_pipeline::max_item_size;

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::logging::LogOutput;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server(config)?;
    validate_output(config)?;
    config.colors.resolve()?;
    non_zero_duration("shutdown", "timeout", config.shutdown.timeout)?;
    if let Some(interval) = config.metrics.reporting_interval() {
        non_zero_duration("metrics", "interval", interval)?;
    }
    if config.output.screen && config.log.output == LogOutput::Stdout {
        return Err(ConfigError::invalid_value(
            "log",
            "output",
            "stdout is taken by screen output; use stderr or a file",
        ));
    }
    Ok(())
}

fn validate_server(config: &Config) -> Result<()> {
    let server = &config.server;

    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::missing_field("server", "bind_address"));
    }
    if server.port == 0 {
        return Err(ConfigError::invalid_value("server", "port", "must be non-zero"));
    }
    if server.cert_path.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("server", "cert_path"));
    }
    if server.key_path.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("server", "key_path"));
    }
    if server.read_buffer_size == 0 {
        return Err(ConfigError::invalid_value(
            "server",
            "read_buffer_size",
            "must be greater than 0",
        ));
    }
    non_zero_duration("server", "handshake_timeout", server.handshake_timeout)?;
    non_zero_duration("server", "read_timeout", server.read_timeout)?;
    Ok(())
}

fn validate_output(config: &Config) -> Result<()> {
    let output = &config.output;

    if output.file_max_size_kb == 0 {
        return Err(ConfigError::invalid_value(
            "output",
            "file_max_size_kb",
            "must be greater than 0",
        ));
    }
    if output.max_memory_size_kb == 0 {
        return Err(ConfigError::invalid_value(
            "output",
            "max_memory_size_kb",
            "must be greater than 0",
        ));
    }
    non_zero_duration("output", "flush_interval", output.flush_interval)?;

    // A record larger than its queue's budget could never be enqueued
    let largest = max_item_size(config.server.read_buffer_size);
    let budget = output.queue_budget();
    if budget < largest {
        return Err(ConfigError::invalid_value(
            "output",
            "max_memory_size_kb",
            format!(
                "per-sink budget of {budget} bytes ({} sink(s)) is below the largest record \
                 ({largest} bytes for read_buffer_size {})",
                output.active_sinks(),
                config.server.read_buffer_size
            ),
        ));
    }
    Ok(())
}

fn non_zero_duration(section: &'static str, field: &'static str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(ConfigError::invalid_value(section, field, "must be greater than 0"));
    }
    Ok(())
}
