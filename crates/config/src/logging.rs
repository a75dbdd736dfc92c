//! `[log]` section: the collector's own diagnostics
//!
//! Diagnostics go to stderr unless configured otherwise. Stdout carries
//! the console sink, so `output = "stdout"` is rejected while
//! `[output] screen` is on.

use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

/// Minimum level of emitted diagnostics
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// `EnvFilter` directive for this level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One human-readable line per event
    #[default]
    Console,
    /// One JSON object per event
    Json,
}

/// Where diagnostics are written
///
/// `"stderr"` and `"stdout"` name the streams; any other string is a file
/// path, opened in append mode.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stderr,
    Stdout,
    #[serde(untagged)]
    File(PathBuf),
}

impl LogOutput {
    /// True for stderr and stdout
    pub fn is_stream(&self) -> bool {
        !matches!(self, Self::File(_))
    }
}

/// Diagnostic logging settings
///
/// ```toml
/// [log]
/// level = "debug"
/// format = "json"
/// output = "/var/log/tlslog/collector.log"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,

    /// Colored console format; defaults to on for streams, off for files
    pub ansi: Option<bool>,
}

impl LogConfig {
    /// Whether console-format lines carry ANSI colors
    pub fn ansi_enabled(&self) -> bool {
        self.ansi.unwrap_or_else(|| self.output.is_stream())
    }
}
