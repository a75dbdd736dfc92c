//! Sink output settings
//!
//! Sizes are configured in KB and multiplied by 1024.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Output configuration
///
/// # Example
///
/// ```toml
/// [output]
/// screen = true
/// directory = "/var/log/tlslog"
/// file_max_size_kb = 1000
/// max_memory_size_kb = 1000000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Also write colorized records to stdout
    /// Default: false
    pub screen: bool,

    /// Directory for the rotated `syslog_*.txt` files
    /// Default: current directory
    pub directory: PathBuf,

    /// Rotation threshold in KB
    /// Default: 1000
    pub file_max_size_kb: u64,

    /// Memory budget shared by all sink queues, in KB
    /// Default: 1000000
    pub max_memory_size_kb: u64,

    /// Background flush interval of the file sink
    /// Default: 100ms
    #[serde(with = "humantime_serde")]
    pub flush_interval: Duration,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            screen: false,
            directory: PathBuf::from("."),
            file_max_size_kb: 1000,
            max_memory_size_kb: 1_000_000,
            flush_interval: Duration::from_millis(100),
        }
    }
}

impl OutputConfig {
    /// Rotation threshold in bytes
    pub fn file_max_size_bytes(&self) -> u64 {
        self.file_max_size_kb.saturating_mul(1024)
    }

    /// Total queue memory budget in bytes
    pub fn max_memory_bytes(&self) -> u64 {
        self.max_memory_size_kb.saturating_mul(1024)
    }

    /// Number of sinks fed by the router
    pub fn active_sinks(&self) -> u64 {
        if self.screen { 2 } else { 1 }
    }

    /// Memory budget of each sink queue: the total split evenly
    pub fn queue_budget(&self) -> usize {
        let budget = self.max_memory_bytes() / self.active_sinks();
        usize::try_from(budget).unwrap_or(usize::MAX)
    }
}
