//! cv-ssh: SSH transport for converge
//!
//! Opens password- or key-authenticated sessions to managed hosts and
//! implements the [`RemoteSession`](cv_core::traits::RemoteSession)
//! capability over russh exec channels.

mod connector;
mod remote_fs;
mod retry;
mod session;

pub use connector::{SshConnector, SshOptions};
pub use session::SshSession;
