//! Command implementations for the tlslog CLI

pub mod check;
pub mod serve;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tlslog_config::Config;

/// Files tried, in order, when no `--config` is given
const DEFAULT_CONFIG_PATHS: [&str; 2] = ["configs/config.toml", "config.toml"];

/// A configuration and the file it came from
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    /// `None` when running on defaults
    pub source: Option<PathBuf>,
}

impl LoadedConfig {
    /// Where the configuration came from, for logs and summaries
    pub fn source_display(&self) -> String {
        self.source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(defaults)".to_string())
    }
}

/// Load `path`, or the first default path that exists, or the defaults
///
/// An explicitly given path must exist.
pub fn load_config(path: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        return load_file(path);
    }

    match DEFAULT_CONFIG_PATHS.iter().map(Path::new).find(|p| p.exists()) {
        Some(path) => load_file(path),
        None => Ok(LoadedConfig {
            config: Config::load_or_default(None).context("invalid default configuration")?,
            source: None,
        }),
    }
}

fn load_file(path: &Path) -> Result<LoadedConfig> {
    let config = Config::from_file(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    Ok(LoadedConfig {
        config,
        source: Some(path.to_path_buf()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn test_explicit_path_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tlslog.toml");
        fs::write(&path, "[server]\nport = 6514\n").unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.config.server.port, 6514);
        assert_eq!(loaded.source.as_deref(), Some(path.as_path()));
        assert_eq!(loaded.source_display(), path.display().to_string());
    }

    #[test]
    fn test_invalid_file_has_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[server]\nport = 0\n").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("failed to load configuration"));
    }
}
