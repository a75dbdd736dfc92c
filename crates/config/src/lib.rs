//! tlslog Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Every section is optional; an empty file is a valid configuration.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use tlslog_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[output]\nscreen = true").unwrap();
//! assert!(config.output.screen);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [server]
//! port = 60119
//! cert_path = "server.pem"
//!
//! [output]
//! screen = true
//! directory = "logs"
//!
//! [colors]
//! error = "BRIGHT_RED"
//! ```
//!
//! See `configs/config.toml` for all available options.

mod colors;
mod error;
mod logging;
mod metrics;
mod output;
mod server;
mod shutdown;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use colors::{ColorSpec, ColorsConfig, ResolvedColors};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use metrics::MetricsConfig;
pub use output::OutputConfig;
pub use server::ServerConfig;
pub use shutdown::ShutdownConfig;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// TLS listener
    pub server: ServerConfig,

    /// File and screen output
    pub output: OutputConfig,

    /// Console colors per level
    pub colors: ColorsConfig,

    /// Signal handling
    pub shutdown: ShutdownConfig,

    /// Diagnostic logging
    pub log: LogConfig,

    /// Metrics reporting
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Load `path` if given, otherwise the defaults
    ///
    /// An explicitly given path must exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Resolved console colors
    ///
    /// # Errors
    ///
    /// Fails only for configurations that were not validated.
    pub fn resolved_colors(&self) -> Result<ResolvedColors> {
        self.colors.resolve()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::str::FromStr;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.server.port, 60119);
        assert!(!config.output.screen);
        assert!(config.shutdown.graceful);
        assert_eq!(config.log.output, LogOutput::Stderr);

        let colors = config.resolved_colors().unwrap();
        assert_eq!(colors.error.code(), 12);
        assert_eq!(colors.info.code(), 1);
        assert_eq!(colors.debug.code(), 8);
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[server]
bind_address = "127.0.0.1"
port = 6514
cert_path = "certs/cert.pem"
key_path = "certs/key.pem"
handshake_timeout = "5s"
read_timeout = "2m"
read_buffer_size = 8192
max_connections = 100

[output]
screen = true
directory = "logs"
file_max_size_kb = 10
max_memory_size_kb = 4096
flush_interval = "250ms"

[colors]
error = "red"
info = "GREEN"
debug = 7

[shutdown]
graceful = false
timeout = "3s"

[log]
level = "debug"
format = "json"

[metrics]
interval = "10s"
"#;
        let config = Config::from_str(toml).unwrap();

        assert_eq!(config.server.listen_address(), "127.0.0.1:6514");
        assert_eq!(config.server.cert_path, PathBuf::from("certs/cert.pem"));
        assert_eq!(config.server.read_timeout, Duration::from_secs(120));
        assert_eq!(config.server.max_connections, 100);
        assert_eq!(config.output.queue_budget(), 2048 * 1024);
        assert_eq!(config.output.flush_interval, Duration::from_millis(250));
        assert!(!config.shutdown.graceful);
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.metrics.interval, Duration::from_secs(10));

        let colors = config.resolved_colors().unwrap();
        assert_eq!(colors.error.code(), 4);
        assert_eq!(colors.info.code(), 2);
        assert_eq!(colors.debug.code(), 7);
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_str("invalid { toml");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[server]\nport = 7000\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.server.port, 7000);
    }

    #[test]
    fn test_load_or_default() {
        let config = Config::load_or_default(None).unwrap();
        assert_eq!(config.server.port, 60119);

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = Config::load_or_default(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
    }
}
