//! `[metrics]` section
//!
//! The collector logs its counters (connections, frames, drops, lines
//! written) once per `interval` while enabled.

use std::time::Duration;

use serde::Deserialize;

/// Periodic counter reporting
///
/// ```toml
/// [metrics]
/// enabled = true
/// interval = "60s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,

    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(60),
        }
    }
}

impl MetricsConfig {
    /// Reporting interval, `None` when reporting is off
    pub fn reporting_interval(&self) -> Option<Duration> {
        self.enabled.then_some(self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_every_minute_by_default() {
        let config: MetricsConfig = toml::from_str("").unwrap();
        assert_eq!(config.reporting_interval(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_disabled_has_no_interval() {
        let config: MetricsConfig = toml::from_str("enabled = false\ninterval = \"5s\"").unwrap();
        assert_eq!(config.reporting_interval(), None);
    }

    #[test]
    fn test_humantime_interval() {
        let config: MetricsConfig = toml::from_str(r#"interval = "2m 30s""#).unwrap();
        assert_eq!(config.interval, Duration::from_secs(150));
    }
}
