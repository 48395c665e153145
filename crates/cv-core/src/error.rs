//! Core error types for converge

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::outcome::FailureKind;

/// Connection-related errors. Fatal for the host, never for the run.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host unreachable or handshake failed
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    /// Connection attempt timed out
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    /// Host key verification failed
    #[error("Host key verification failed: {message}")]
    HostKeyRejected { message: String },

    /// Private key could not be loaded
    #[error("Private key not found at {path}: {reason}")]
    KeyNotFound { path: PathBuf, reason: String },
}

impl ConnectionError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConnectionError::ConnectionRefused(_) | ConnectionError::Timeout(_)
        )
    }
}

/// Transport-level failure running a remote command.
///
/// A nonzero exit status is not a `CommandError`.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Command did not finish in time
    #[error("Command '{command}' timed out after {after:?}")]
    Timeout { command: String, after: Duration },

    /// The channel failed or closed early
    #[error("Channel error running '{command}': {message}")]
    Channel { command: String, message: String },
}

/// File transfer errors
#[derive(Error, Debug)]
pub enum SessionError {
    /// File does not exist on the remote host
    #[error("File not found: {path}")]
    NotFound { path: String },

    /// File exists but could not be read
    #[error("Failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    /// File could not be written or its metadata could not be applied
    #[error("Failed to write {path}: {reason}")]
    Write { path: String, reason: String },

    /// Transport failure during the transfer
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Failure of a single task
#[derive(Error, Debug)]
pub enum TaskError {
    /// Transport failure
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Package manager rejected the action
    #[error("Failed to {action} package '{name}' (exit {exit_status}): {stderr}")]
    PackageAction {
        name: String,
        action: &'static str,
        exit_status: u32,
        stderr: String,
    },

    /// File could not be read or written
    #[error("Failed to manage file {path}: {source}")]
    FileAction {
        path: String,
        #[source]
        source: SessionError,
    },

    /// Service unit does not exist
    #[error("Service '{name}' is not installed")]
    ServiceNotFound { name: String },

    /// Remote system rejected the action or a precondition failed
    #[error("{resource}: {message}")]
    ResourceState { resource: String, message: String },
}

impl TaskError {
    /// Wrap a session error as a file failure, keeping transport errors distinct
    pub fn file(path: impl Into<String>, source: SessionError) -> Self {
        match source {
            SessionError::Command(e) => TaskError::Command(e),
            other => TaskError::FileAction {
                path: path.into(),
                source: other,
            },
        }
    }

    /// Classification used in task outcomes
    pub fn kind(&self) -> FailureKind {
        match self {
            TaskError::Command(_) => FailureKind::Command,
            TaskError::PackageAction { .. } => FailureKind::PackageAction,
            TaskError::FileAction { .. } => FailureKind::FileAction,
            TaskError::ServiceNotFound { .. } => FailureKind::ServiceNotFound,
            TaskError::ResourceState { .. } => FailureKind::ResourceState,
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// YAML parse error in a task or host list
    #[error("YAML parse error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A task record failed validation
    #[error("Invalid task #{index}: {message}")]
    InvalidTask { index: usize, message: String },

    /// A host record failed validation
    #[error("Invalid host #{index}: {message}")]
    InvalidHost { index: usize, message: String },
}
