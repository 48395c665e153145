//! Remote session traits

use async_trait::async_trait;

use crate::error::{CommandError, ConnectionError, SessionError};
use crate::types::{FileMetadata, FileStat, Host};

/// Result of a remote command that ran to completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_status: u32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }

    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Command and file-transfer capability on one remote host.
///
/// Every change a reconciler makes to a host goes through this trait.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Run a command. A nonzero exit is returned as output, not as an error.
    async fn execute(&self, command: &str) -> Result<CommandOutput, CommandError>;

    /// Read a file. Returns `SessionError::NotFound` if it does not exist.
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, SessionError>;

    /// Owner, group and mode of a file, or `None` if it does not exist.
    /// Symlinks are followed.
    async fn file_metadata(&self, path: &str) -> Result<Option<FileStat>, SessionError>;

    /// Replace a file's content and apply the given metadata
    async fn write_file(
        &self,
        path: &str,
        content: &[u8],
        metadata: &FileMetadata,
    ) -> Result<(), SessionError>;

    /// Apply metadata to an existing file
    async fn set_metadata(&self, path: &str, metadata: &FileMetadata) -> Result<(), SessionError>;

    /// Close the session gracefully
    async fn close(&self) -> Result<(), CommandError>;
}

/// Opens sessions to hosts
#[async_trait]
pub trait Connector: Send + Sync {
    /// The session type produced by this connector
    type Session: RemoteSession;

    async fn connect(&self, host: &Host) -> Result<Self::Session, ConnectionError>;
}
