//! Runner configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::duration_secs;
use crate::error::ConfigError;

/// Configuration for a convergence run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Task list (YAML)
    pub tasks_file: PathBuf,

    /// Host list (YAML)
    pub hosts_file: PathBuf,

    /// Default SSH port for hosts that do not set one
    pub port: u16,

    /// Private key for public-key authentication; password auth when unset
    pub private_key_path: Option<PathBuf>,

    /// Connection timeout
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Timeout for a single remote command
    #[serde(with = "duration_secs")]
    pub command_timeout: Duration,

    /// Connection attempts per host before giving up
    pub connect_attempts: u32,

    /// Backoff between connection attempts
    pub backoff: BackoffConfig,

    /// Number of hosts processed at once
    pub concurrency: usize,

    /// Also write logs to this file (truncated at start)
    pub log_file: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tasks_file: PathBuf::from("config.yaml"),
            hosts_file: PathBuf::from("hosts.yaml"),
            port: 22,
            private_key_path: None,
            connect_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(300),
            connect_attempts: 3,
            backoff: BackoffConfig::default(),
            concurrency: 4,
            log_file: None,
        }
    }
}

impl RunnerConfig {
    /// Reject values the runner cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.connect_attempts == 0 {
            return Err(ConfigError::Invalid(
                "connect_attempts must be at least 1".into(),
            ));
        }
        if self.command_timeout.is_zero() {
            return Err(ConfigError::Invalid("command_timeout must be positive".into()));
        }
        self.backoff.validate()
    }
}

/// Exponential backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Initial delay
    #[serde(with = "duration_secs")]
    pub initial: Duration,

    /// Maximum delay
    #[serde(with = "duration_secs")]
    pub max: Duration,

    /// Multiplier for each retry
    pub multiplier: f64,

    /// Jitter factor (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}

impl BackoffConfig {
    /// Delays must never shrink and never pass `max`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::Invalid(
                "backoff.multiplier must be a finite number >= 1.0".into(),
            ));
        }
        // NaN fails the range check too
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::Invalid("backoff.jitter must be within 0.0..=1.0".into()));
        }
        if self.initial > self.max {
            return Err(ConfigError::Invalid(format!(
                "backoff.initial ({}s) exceeds backoff.max ({}s)",
                self.initial.as_secs(),
                self.max.as_secs()
            )));
        }
        Ok(())
    }
}
