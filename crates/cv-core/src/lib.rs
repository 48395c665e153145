//! cv-core: Core abstractions and configuration for converge
//!
//! This crate provides the task model, the remote session capability
//! traits, the change tracker, outcome types and the configuration
//! loaders shared by the SSH transport, the engine and the CLI.

pub mod changes;
pub mod config;
pub mod error;
pub mod inventory;
pub mod outcome;
pub mod shell;
pub mod traits;
pub mod types;

pub use changes::ChangeSet;
pub use error::{CommandError, ConfigError, ConnectionError, SessionError, TaskError};
pub use outcome::{Convergence, FailureKind, FleetReport, HostReport, HostStatus, TaskOutcome};
pub use types::{
    Credentials, FileMetadata, FileMode, FileStat, FileTask, Host, PackageState, PackageTask,
    ServiceState, ServiceTask, Task,
};
