//! Apply command implementation

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use cv_core::config::RunnerConfig;
use cv_core::inventory::{load_hosts, load_tasks};
use cv_core::{Credentials, FleetReport};
use cv_engine::FleetDriver;
use cv_ssh::{SshConnector, SshOptions};

use crate::output::{format_host_tasks, format_report, print_error, print_success, print_warning};

/// Command-line overrides for a run
#[derive(Debug, Default)]
pub struct ApplyOptions {
    pub tasks_file: Option<PathBuf>,
    pub hosts_file: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub private_key: Option<PathBuf>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub json: bool,
}

/// Resolve credentials once for the whole run.
///
/// A password is required unless a private key is configured.
pub fn resolve_credentials(
    username: Option<String>,
    password: Option<String>,
    has_key: bool,
) -> Result<Credentials> {
    let username = username
        .filter(|u| !u.is_empty())
        .context("SSH username not set (use --user or SSH_USERNAME)")?;
    let password = match password {
        Some(p) => p,
        None if has_key => String::new(),
        None => anyhow::bail!("SSH password not set (use --password or SSH_PASSWORD)"),
    };
    Ok(Credentials::new(username, password))
}

/// Converge every host in the host list and print the result
pub async fn apply_command(mut config: RunnerConfig, options: ApplyOptions) -> Result<FleetReport> {
    if let Some(path) = options.tasks_file {
        config.tasks_file = path;
    }
    if let Some(path) = options.hosts_file {
        config.hosts_file = path;
    }
    if let Some(n) = options.concurrency {
        config.concurrency = n.max(1);
    }
    if options.private_key.is_some() {
        config.private_key_path = options.private_key;
    }

    let tasks = load_tasks(&config.tasks_file)
        .with_context(|| format!("Failed to load tasks from {:?}", config.tasks_file))?;
    let hosts = load_hosts(&config.hosts_file, config.port)
        .with_context(|| format!("Failed to load hosts from {:?}", config.hosts_file))?;

    let credentials = resolve_credentials(
        options.username,
        options.password,
        config.private_key_path.is_some(),
    )?;

    if hosts.is_empty() {
        print_warning("Host list is empty, nothing to do");
        return Ok(FleetReport::default());
    }

    let connector = SshConnector::new(
        credentials,
        SshOptions::from_config(&config),
        config.private_key_path.as_deref(),
    )
    .context("Failed to set up SSH connector")?;

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Received Ctrl+C, finishing current tasks and stopping");
            cancel_on_signal.cancel();
        }
    });

    tracing::info!(
        tasks = tasks.len(),
        hosts = hosts.len(),
        "Applying {:?} to hosts from {:?}",
        config.tasks_file,
        config.hosts_file
    );

    let report = FleetDriver::new(connector, tasks)
        .with_concurrency(config.concurrency)
        .with_cancellation(cancel)
        .run(&hosts)
        .await;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(report)
}

fn print_summary(report: &FleetReport) {
    println!("{}", format_report(report));

    for host in report.hosts.iter().filter(|h| !h.tasks.is_empty()) {
        if !host.is_success() {
            println!();
            println!("{}:", host.host);
            println!("{}", format_host_tasks(host));
        }
    }

    let failed = report.failed_hosts().count();
    if failed == 0 {
        print_success(&format!("{} host(s) converged", report.hosts.len()));
    } else {
        print_error(&format!(
            "{} of {} host(s) did not converge",
            failed,
            report.hosts.len()
        ));
    }
}
