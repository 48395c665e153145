//! Config command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success, print_warning};
use cv_core::config::{self, RunnerConfig};

fn config_file(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_path)
}

/// Print the path of the configuration file in use
pub fn config_path(config_path: Option<&Path>) {
    println!("{}", config_file(config_path).display());
}

/// Show the configuration file, or the built-in defaults when there is none
pub fn config_show(config_path: Option<&Path>) -> Result<()> {
    let path = config_file(config_path);

    if !path.exists() {
        print_warning(&format!("No configuration file found at {:?}", path));
        print_info("Using built-in defaults (run 'converge config init' to create a file):");
        println!();
        println!("{}", toml::to_string_pretty(&RunnerConfig::default())?);
        return Ok(());
    }

    print_info(&format!("Configuration file: {:?}", path));
    println!();

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    println!("{}", content);

    Ok(())
}

/// Write a commented default configuration file
pub fn config_init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = config_file(config_path);

    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {:?}", dir))?;
            print_success(&format!("Created config directory: {:?}", dir));
        }
    }

    std::fs::write(&path, default_config_template())
        .with_context(|| format!("Failed to write config file: {:?}", path))?;
    print_success(&format!("Created configuration file: {:?}", path));

    Ok(())
}

fn default_config_template() -> &'static str {
    r#"# converge configuration

# Task list and host list (YAML), relative to the working directory
tasks_file = "config.yaml"
hosts_file = "hosts.yaml"

# SSH port for hosts that do not set one
port = 22

# Public-key authentication; password authentication (SSH_PASSWORD) when unset
# private_key_path = "~/.ssh/id_ed25519"

# Timeouts in seconds, or with a unit: "90s", "5m", "1h"
connect_timeout = 30
command_timeout = 300

# Connection attempts per host (authentication failures are never retried)
connect_attempts = 3

# Hosts processed at once
concurrency = 4

# Also write logs to this file, truncated at the start of each run
# log_file = "converge.log"

[backoff]
# Initial retry delay in seconds
initial = 1
# Maximum retry delay in seconds
max = 30
# Backoff multiplier
multiplier = 2.0
# Jitter factor
jitter = 0.25
"#
}
