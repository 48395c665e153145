//! Remote session over an SSH connection
//!
//! Every operation opens a fresh exec channel on the shared connection.
//! File transfer is done with plain shell tools so no SFTP subsystem is
//! needed on the managed host.

use std::time::Duration;

use async_trait::async_trait;
use russh::{ChannelMsg, Disconnect};

use cv_core::traits::{CommandOutput, RemoteSession};
use cv_core::{CommandError, FileMetadata, FileStat, SessionError};

use super::connector::SshHandle;
use super::remote_fs::{
    read_command, read_result, set_metadata_command, stat_command, stat_result, write_command,
    write_result,
};

/// An authenticated SSH session to one host
pub struct SshSession {
    handle: SshHandle,
    /// Host label for logs
    host: String,
    command_timeout: Duration,
}

impl SshSession {
    pub(crate) fn new(handle: SshHandle, host: String, command_timeout: Duration) -> Self {
        Self {
            handle,
            host,
            command_timeout,
        }
    }

    /// Run a command with the session timeout, optionally feeding stdin
    async fn run(&self, command: &str, stdin: Option<&[u8]>) -> Result<CommandOutput, CommandError> {
        tracing::trace!(host = %self.host, "exec: {}", command);
        match tokio::time::timeout(self.command_timeout, self.exec(command, stdin)).await {
            Ok(result) => result,
            Err(_) => Err(CommandError::Timeout {
                command: command.to_string(),
                after: self.command_timeout,
            }),
        }
    }

    async fn exec(&self, command: &str, stdin: Option<&[u8]>) -> Result<CommandOutput, CommandError> {
        let channel_err = |e: russh::Error| CommandError::Channel {
            command: command.to_string(),
            message: e.to_string(),
        };

        let mut channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(channel_err)?;
        channel.exec(true, command).await.map_err(channel_err)?;
        if let Some(data) = stdin {
            channel.data(data).await.map_err(channel_err)?;
        }
        channel.eof().await.map_err(channel_err)?;

        let mut output = CommandOutput::default();
        let mut exit_status = None;
        while let Some(msg) = channel.wait().await {
            match msg {
                ChannelMsg::Data { ref data } => output.stdout.extend_from_slice(data),
                // Extended data type 1 is stderr
                ChannelMsg::ExtendedData { ref data, ext: 1 } => {
                    output.stderr.extend_from_slice(data)
                }
                ChannelMsg::ExitStatus { exit_status: status } => exit_status = Some(status),
                ChannelMsg::ExitSignal { signal_name, .. } => {
                    tracing::debug!(host = %self.host, "Command killed by signal {:?}", signal_name);
                }
                _ => {}
            }
        }

        match exit_status {
            Some(status) => {
                output.exit_status = status;
                Ok(output)
            }
            None => Err(CommandError::Channel {
                command: command.to_string(),
                message: "channel closed without exit status".into(),
            }),
        }
    }
}

#[async_trait]
impl RemoteSession for SshSession {
    async fn execute(&self, command: &str) -> Result<CommandOutput, CommandError> {
        self.run(command, None).await
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, SessionError> {
        let output = self.run(&read_command(path), None).await?;
        read_result(path, output)
    }

    async fn file_metadata(&self, path: &str) -> Result<Option<FileStat>, SessionError> {
        let output = self.run(&stat_command(path), None).await?;
        stat_result(path, &output)
    }

    async fn write_file(
        &self,
        path: &str,
        content: &[u8],
        metadata: &FileMetadata,
    ) -> Result<(), SessionError> {
        let output = self.run(&write_command(path, metadata), Some(content)).await?;
        write_result(path, &output)?;
        tracing::debug!(host = %self.host, "Wrote {} bytes to {}", content.len(), path);
        Ok(())
    }

    async fn set_metadata(&self, path: &str, metadata: &FileMetadata) -> Result<(), SessionError> {
        let output = self.run(&set_metadata_command(path, metadata), None).await?;
        write_result(path, &output)
    }

    async fn close(&self) -> Result<(), CommandError> {
        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| CommandError::Channel {
                command: "disconnect".into(),
                message: e.to_string(),
            })?;
        tracing::info!(host = %self.host, "SSH connection closed");
        Ok(())
    }
}
