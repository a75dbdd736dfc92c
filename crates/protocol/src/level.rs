//! Routable severity levels
//!
//! Only three syslog severities carry a configured color: error (3),
//! informational (6) and debug (7). Everything else is unsupported and the
//! record is dropped by the router.

use std::fmt;

/// A severity the collector routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    /// Severity 3
    Error,
    /// Severity 6
    Info,
    /// Severity 7
    Debug,
}

impl Level {
    /// All routable levels, in configuration order
    pub const ALL: [Level; 3] = [Level::Error, Level::Info, Level::Debug];

    /// Map a syslog severity (0-7) to a routable level
    #[inline]
    pub const fn from_severity(severity: u8) -> Option<Self> {
        match severity {
            3 => Some(Self::Error),
            6 => Some(Self::Info),
            7 => Some(Self::Debug),
            _ => None,
        }
    }

    /// The syslog severity number for this level
    #[inline]
    pub const fn severity(self) -> u8 {
        match self {
            Self::Error => 3,
            Self::Info => 6,
            Self::Debug => 7,
        }
    }

    /// Configuration key for this level
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_severity_supported() {
        assert_eq!(Level::from_severity(3), Some(Level::Error));
        assert_eq!(Level::from_severity(6), Some(Level::Info));
        assert_eq!(Level::from_severity(7), Some(Level::Debug));
    }

    #[test]
    fn test_from_severity_unsupported() {
        for severity in [0, 1, 2, 4, 5, 8, 255] {
            assert_eq!(Level::from_severity(severity), None, "severity {severity}");
        }
    }

    #[test]
    fn test_severity_inverse() {
        for level in Level::ALL {
            assert_eq!(Level::from_severity(level.severity()), Some(level));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Level::Error.to_string(), "error");
        assert_eq!(Level::Debug.as_str(), "debug");
    }
}
