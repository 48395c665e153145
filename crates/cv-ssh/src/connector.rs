//! Outbound SSH connector
//!
//! Opens an authenticated session to one managed host, retrying transient
//! failures with exponential backoff.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client::{self, Config, Handle};
use russh_keys::key::{KeyPair, PublicKey};

use cv_core::config::{BackoffConfig, RunnerConfig};
use cv_core::traits::Connector;
use cv_core::{ConnectionError, Credentials, Host};

use super::retry::{retry_connect, RetryDelays};
use super::session::SshSession;

/// Connection tuning shared by every host in a run
#[derive(Debug, Clone)]
pub struct SshOptions {
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
    pub connect_attempts: u32,
    pub backoff: BackoffConfig,
}

impl SshOptions {
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            command_timeout: config.command_timeout,
            connect_attempts: config.connect_attempts,
            backoff: config.backoff.clone(),
        }
    }
}

/// Opens SSH sessions with credentials resolved once for the whole run
pub struct SshConnector {
    credentials: Credentials,
    options: SshOptions,
    /// Private key; password authentication is used when absent
    key: Option<Arc<KeyPair>>,
}

impl SshConnector {
    /// Create a connector, loading the private key if one is given
    pub fn new(
        credentials: Credentials,
        options: SshOptions,
        private_key_path: Option<&Path>,
    ) -> Result<Self, ConnectionError> {
        let key = match private_key_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConnectionError::KeyNotFound {
                        path: path.to_path_buf(),
                        reason: "File does not exist".into(),
                    });
                }
                let key = russh_keys::load_secret_key(path, None).map_err(|e| {
                    ConnectionError::KeyNotFound {
                        path: path.to_path_buf(),
                        reason: format!("Failed to load key: {}", e),
                    }
                })?;
                Some(Arc::new(key))
            }
            None => None,
        };

        Ok(Self {
            credentials,
            options,
            key,
        })
    }

    /// Connect, retrying transient failures up to the configured attempt count.
    ///
    /// Authentication and host key failures are returned immediately.
    pub async fn connect_with_retry(&self, host: &Host) -> Result<SshSession, ConnectionError> {
        let delays = RetryDelays::new(&self.options.backoff);
        let target = host.to_string();

        match retry_connect(&target, self.options.connect_attempts, &delays, || {
            self.try_connect(host)
        })
        .await
        {
            Ok(session) => {
                tracing::info!(host = %host, "Connected");
                Ok(session)
            }
            Err(e) => {
                tracing::error!(host = %host, "SSH connection failed: {}", e);
                Err(e)
            }
        }
    }

    /// Attempt a single connection
    async fn try_connect(&self, host: &Host) -> Result<SshSession, ConnectionError> {
        let ssh_config = Arc::new(Config::default());
        let handler = ClientHandler::new(host.fingerprint.clone());

        tracing::debug!(host = %host, "Connecting");
        let mut handle = tokio::time::timeout(
            self.options.connect_timeout,
            client::connect(ssh_config, (host.address.as_str(), host.port), handler),
        )
        .await
        .map_err(|_| ConnectionError::Timeout(self.options.connect_timeout))?
        .map_err(|e| {
            let err_str = e.to_string();
            // russh reports a rejected key as "Unknown server key"
            if err_str.contains("server key") {
                return ConnectionError::HostKeyRejected {
                    message: format!("{} presented an unexpected host key", host),
                };
            }
            ConnectionError::ConnectionRefused(format!("Failed to connect to {}: {}", host, e))
        })?;

        let username = self.credentials.username.as_str();
        tracing::debug!(host = %host, "Authenticating as user '{}'", username);
        let authenticated = match &self.key {
            Some(key) => handle.authenticate_publickey(username, Arc::clone(key)).await,
            None => {
                handle
                    .authenticate_password(username, self.credentials.secret())
                    .await
            }
        }
        .map_err(|e| ConnectionError::ConnectionRefused(format!("Authentication error: {}", e)))?;

        if !authenticated {
            return Err(ConnectionError::AuthenticationFailed {
                user: username.to_string(),
            });
        }

        Ok(SshSession::new(
            handle,
            host.to_string(),
            self.options.command_timeout,
        ))
    }
}

#[async_trait]
impl Connector for SshConnector {
    type Session = SshSession;

    async fn connect(&self, host: &Host) -> Result<SshSession, ConnectionError> {
        self.connect_with_retry(host).await
    }
}

/// SSH client handler
pub(crate) struct ClientHandler {
    /// Pinned fingerprint from the host list
    expected_fingerprint: Option<String>,
}

impl ClientHandler {
    fn new(expected_fingerprint: Option<String>) -> Self {
        Self {
            expected_fingerprint,
        }
    }
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = anyhow::Error;

    /// Accept any key unless the host list pins a fingerprint
    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        let fingerprint = server_public_key.fingerprint();
        tracing::debug!("Server host key: SHA256:{}", fingerprint);

        match &self.expected_fingerprint {
            Some(expected) => {
                let expected = expected.strip_prefix("SHA256:").unwrap_or(expected);
                if expected == fingerprint {
                    Ok(true)
                } else {
                    tracing::warn!(
                        "Host key mismatch: expected SHA256:{}, got SHA256:{}",
                        expected,
                        fingerprint
                    );
                    Ok(false)
                }
            }
            None => Ok(true),
        }
    }
}

/// Handle type held by sessions
pub(crate) type SshHandle = Handle<ClientHandler>;
