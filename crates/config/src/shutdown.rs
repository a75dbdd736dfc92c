//! Shutdown behavior on SIGINT / SIGTERM

use std::time::Duration;

use serde::Deserialize;

/// Shutdown configuration
///
/// # Example
///
/// ```toml
/// [shutdown]
/// graceful = true
/// timeout = "10s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Drain every queued record before exiting (false discards them)
    /// Default: true
    pub graceful: bool,

    /// Bound on each wait for workers and sinks
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            graceful: true,
            timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_abrupt() {
        let config: ShutdownConfig = toml::from_str("graceful = false").unwrap();
        assert!(!config.graceful);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }
}
