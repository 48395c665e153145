//! Configuration management for converge

mod runner;
pub mod serde_utils;

pub use runner::{BackoffConfig, RunnerConfig};

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Get the default configuration directory
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("converge")
}

/// Get the default configuration file path
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.toml")
}

/// Load configuration from a file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

/// Resolve the runner configuration.
///
/// An explicit path must exist. Without one, the default location is used
/// when present and built-in defaults otherwise.
pub fn resolve_runner_config(explicit: Option<&Path>) -> Result<RunnerConfig, ConfigError> {
    let config: RunnerConfig = match explicit {
        Some(path) => load_config(path)?,
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                load_config(&default_path)?
            } else {
                tracing::debug!("No config at {:?}, using defaults", default_path);
                RunnerConfig::default()
            }
        }
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_load_config_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "concurrency = 8\ncommand_timeout = 45\n").unwrap();

        let loaded: RunnerConfig = load_config(&path).unwrap();
        assert_eq!(loaded.concurrency, 8);
        assert_eq!(loaded.command_timeout, Duration::from_secs(45));
        assert_eq!(loaded.port, 22);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            resolve_runner_config(Some(&path)),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "concurrency = 2\n[backoff]\ninitial = 3\nmax = 30\nmultiplier = 1.5\njitter = 0.0\n").unwrap();

        let config = resolve_runner_config(Some(&path)).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.backoff.initial, Duration::from_secs(3));
        assert_eq!(config.connect_attempts, 3);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "concurrency = 0\n").unwrap();
        assert!(matches!(
            resolve_runner_config(Some(&path)),
            Err(ConfigError::Invalid(_))
        ));
    }
}
