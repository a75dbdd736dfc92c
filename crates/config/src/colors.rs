//! Console colors per level
//!
//! Each color is a name (`"BRIGHT_RED"`, case-insensitive, `-` or `_`) or a
//! numeric console code 0-15. Values are resolved during validation.

use std::fmt;

use serde::Deserialize;
use tlslog_protocol::ColorCode;

use crate::error::{ConfigError, Result};

/// A color as written in the config file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    /// Numeric console code
    Code(i64),
    /// Color name
    Name(String),
}

impl ColorSpec {
    /// Resolve to a color code
    ///
    /// # Errors
    ///
    /// `InvalidValue` for unknown names and codes outside 0-15.
    pub fn resolve(&self, field: &'static str) -> Result<ColorCode> {
        let resolved = match self {
            Self::Code(code) => u8::try_from(*code).ok().and_then(ColorCode::new),
            Self::Name(name) => ColorCode::from_name(name),
        };
        resolved.ok_or_else(|| {
            let message = format!(
                "unknown color {self}, expected a name or a code 0-{}",
                ColorCode::MAX
            );
            ConfigError::invalid_value("colors", field, message)
        })
    }
}

impl fmt::Display for ColorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{code}"),
            Self::Name(name) => write!(f, "'{name}'"),
        }
    }
}

impl From<ColorCode> for ColorSpec {
    fn from(color: ColorCode) -> Self {
        Self::Code(i64::from(color.code()))
    }
}

/// Colors configuration
///
/// # Example
///
/// ```toml
/// [colors]
/// error = "BRIGHT_RED"
/// info = "blue"
/// debug = 8
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    /// Severity 3 records
    /// Default: BRIGHT_RED (12)
    pub error: ColorSpec,

    /// Severity 6 records
    /// Default: BLUE (1)
    pub info: ColorSpec,

    /// Severity 7 records
    /// Default: BRIGHT_BLACK (8)
    pub debug: ColorSpec,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            error: ColorCode::BRIGHT_RED.into(),
            info: ColorCode::BLUE.into(),
            debug: ColorCode::BRIGHT_BLACK.into(),
        }
    }
}

/// Resolved colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColors {
    pub error: ColorCode,
    pub info: ColorCode,
    pub debug: ColorCode,
}

impl ColorsConfig {
    /// Resolve all three colors
    pub fn resolve(&self) -> Result<ResolvedColors> {
        Ok(ResolvedColors {
            error: self.error.resolve("error")?,
            info: self.info.resolve("info")?,
            debug: self.debug.resolve("debug")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let colors = ColorsConfig::default().resolve().unwrap();
        assert_eq!(colors.error.code(), 12);
        assert_eq!(colors.info.code(), 1);
        assert_eq!(colors.debug.code(), 8);
    }

    #[test]
    fn test_names_and_codes() {
        let toml = r#"
error = "red"
info = "Bright-Cyan"
debug = 0
"#;
        let config: ColorsConfig = toml::from_str(toml).unwrap();
        let colors = config.resolve().unwrap();
        assert_eq!(colors.error.code(), 4);
        assert_eq!(colors.info.code(), 11);
        assert_eq!(colors.debug.code(), 0);
    }

    #[test]
    fn test_unknown_name_rejected() {
        let config: ColorsConfig = toml::from_str(r#"error = "PURPLE""#).unwrap();
        let err = config.resolve().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { section: "colors", field: "error", .. }
        ));
        assert!(err.to_string().contains("PURPLE"));
    }

    #[test]
    fn test_out_of_range_code_rejected() {
        for code in ["16", "-1", "255"] {
            let config: ColorsConfig = toml::from_str(&format!("debug = {code}")).unwrap();
            assert!(config.resolve().is_err(), "code {code} accepted");
        }
    }
}
