//! converge CLI
//!
//! Applies a declared list of packages, files and services to remote hosts:
//! - `apply` converges every host and prints a report
//! - `validate` checks the task and host lists without connecting
//! - `config` manages the runner configuration file

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use converge::commands::{self, ApplyOptions};
use converge::logging::init_logging;
use converge::output::print_error;
use cv_core::config::{resolve_runner_config, RunnerConfig};

#[derive(Parser)]
#[command(name = "converge")]
#[command(author, version, about = "Converge remote hosts to a declared configuration over SSH")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the task list to every host in the host list
    Apply {
        /// Task list (overrides config)
        #[arg(short, long)]
        tasks: Option<PathBuf>,
        /// Host list (overrides config)
        #[arg(long)]
        hosts: Option<PathBuf>,
        /// Hosts processed at once (overrides config)
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
        /// Private key for public-key authentication (overrides config)
        #[arg(short, long)]
        key: Option<PathBuf>,
        /// SSH username
        #[arg(short, long, env = "SSH_USERNAME")]
        user: Option<String>,
        /// SSH password
        #[arg(long, env = "SSH_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the task and host lists without connecting to any host
    Validate {
        /// Task list (overrides config)
        #[arg(short, long)]
        tasks: Option<PathBuf>,
        /// Host list (overrides config)
        #[arg(long)]
        hosts: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Show config file path
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Apply {
            tasks,
            hosts,
            concurrency,
            key,
            user,
            password,
            json,
        } => {
            let config = load_runner_config(config_path)?;
            init_logging(cli.quiet, cli.verbose, config.log_file.as_deref())?;

            let options = ApplyOptions {
                tasks_file: tasks,
                hosts_file: hosts,
                concurrency,
                private_key: key,
                username: user,
                password,
                json,
            };
            let report = commands::apply_command(config, options).await?;
            if report.is_success() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }

        Commands::Validate { tasks, hosts } => {
            let config = load_runner_config(config_path)?;
            init_logging(cli.quiet, cli.verbose, None)?;
            commands::validate_command(&config, tasks, hosts)?;
            Ok(ExitCode::SUCCESS)
        }

        Commands::Config { action } => {
            init_logging(cli.quiet, cli.verbose, None)?;
            match action {
                ConfigAction::Show => commands::config_show(config_path)?,
                ConfigAction::Path => commands::config_path(config_path),
                ConfigAction::Init { force } => commands::config_init(config_path, force)?,
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_runner_config(path: Option<&Path>) -> Result<RunnerConfig> {
    resolve_runner_config(path).with_context(|| match path {
        Some(path) => format!("Failed to load config from {:?}", path),
        None => "Failed to load default config".to_string(),
    })
}
