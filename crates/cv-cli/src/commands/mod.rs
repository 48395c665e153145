//! CLI command implementations

mod apply;
mod config;
mod validate;

pub use apply::{apply_command, resolve_credentials, ApplyOptions};
pub use config::{config_init, config_path, config_show};
pub use validate::validate_command;
