//! Validate command implementation

use std::path::PathBuf;

use anyhow::{Context, Result};

use cv_core::config::RunnerConfig;
use cv_core::inventory::{load_hosts, load_tasks};

use crate::output::{format_hosts, format_tasks, print_success};

/// Load and check the task and host lists without contacting any host
pub fn validate_command(
    config: &RunnerConfig,
    tasks_file: Option<PathBuf>,
    hosts_file: Option<PathBuf>,
) -> Result<()> {
    let tasks_file = tasks_file.unwrap_or_else(|| config.tasks_file.clone());
    let hosts_file = hosts_file.unwrap_or_else(|| config.hosts_file.clone());

    let tasks = load_tasks(&tasks_file)
        .with_context(|| format!("Failed to load tasks from {:?}", tasks_file))?;
    let hosts = load_hosts(&hosts_file, config.port)
        .with_context(|| format!("Failed to load hosts from {:?}", hosts_file))?;

    println!("Tasks ({}):", tasks_file.display());
    println!("{}", format_tasks(&tasks));
    println!();
    println!("Hosts ({}):", hosts_file.display());
    println!("{}", format_hosts(&hosts));
    println!();
    print_success(&format!("{} task(s), {} host(s)", tasks.len(), hosts.len()));

    Ok(())
}
