//! CLI integration tests
//!
//! Tests the converge CLI using assert_cmd. Nothing here opens an SSH
//! connection.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const TASKS: &str = r#"
- type: package
  name: apache2
  state: present
- type: file
  path: /var/www/html/index.php
  content: "<?php echo 'Hello, world!'; ?>"
  mode: "0644"
  manage_file: true
- type: service
  name: apache2
  state: reload
"#;

const HOSTS: &str = r#"
servers:
  - host: web1.example.com
  - host: 10.0.0.7
    port: 2222
"#;

fn converge() -> Command {
    let mut cmd = Command::cargo_bin("converge")
        .expect("Failed to locate converge binary - ensure it's built before running tests");
    cmd.env_remove("SSH_USERNAME")
        .env_remove("SSH_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

/// Workspace with an empty config file, a task list and a host list
fn workspace(tasks: &str, hosts: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("config.yaml"), tasks).unwrap();
    std::fs::write(dir.path().join("hosts.yaml"), hosts).unwrap();
    let config = dir.path().join("converge.toml");
    std::fs::write(&config, "").unwrap();
    (dir, config)
}

fn file_arg(dir: &Path, name: &str) -> String {
    dir.join(name).display().to_string()
}

#[test]
fn test_cli_help() {
    converge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("converge"))
        .stdout(predicate::str::contains("apply"));
}

#[test]
fn test_cli_version() {
    converge()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("converge"));
}

#[test]
fn test_cli_apply_help() {
    converge()
        .args(["apply", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SSH_USERNAME"))
        .stdout(predicate::str::contains("--json"));
}

#[test]
fn test_cli_unknown_command() {
    converge()
        .arg("nonexistent-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_validate_prints_tasks_and_hosts() {
    let (dir, config) = workspace(TASKS, HOSTS);

    converge()
        .arg("-c")
        .arg(&config)
        .args(["validate", "--tasks"])
        .arg(file_arg(dir.path(), "config.yaml"))
        .arg("--hosts")
        .arg(file_arg(dir.path(), "hosts.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("/var/www/html/index.php"))
        .stdout(predicate::str::contains("www-data:www-data 0644"))
        .stdout(predicate::str::contains("2222"))
        .stdout(predicate::str::contains("3 task(s), 2 host(s)"));
}

#[test]
fn test_validate_uses_config_paths() {
    let (dir, _) = workspace(TASKS, HOSTS);
    let config = dir.path().join("custom.toml");
    std::fs::write(
        &config,
        format!(
            "tasks_file = {:?}\nhosts_file = {:?}\n",
            file_arg(dir.path(), "config.yaml"),
            file_arg(dir.path(), "hosts.yaml")
        ),
    )
    .unwrap();

    converge()
        .arg("-c")
        .arg(&config)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 task(s), 2 host(s)"));
}

#[test]
fn test_validate_rejects_bad_task() {
    let (dir, config) = workspace("- type: package\n  name: \"\"\n  state: present\n", HOSTS);

    converge()
        .arg("-c")
        .arg(&config)
        .args(["validate", "--tasks"])
        .arg(file_arg(dir.path(), "config.yaml"))
        .arg("--hosts")
        .arg(file_arg(dir.path(), "hosts.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid task #0"));
}

#[test]
fn test_validate_missing_task_file() {
    let (dir, config) = workspace(TASKS, HOSTS);

    converge()
        .arg("-c")
        .arg(&config)
        .args(["validate", "--tasks"])
        .arg(file_arg(dir.path(), "missing.yaml"))
        .arg("--hosts")
        .arg(file_arg(dir.path(), "hosts.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load tasks"));
}

#[test]
fn test_apply_without_credentials_fails_before_connecting() {
    let (dir, config) = workspace(TASKS, HOSTS);

    converge()
        .arg("-c")
        .arg(&config)
        .args(["apply", "--tasks"])
        .arg(file_arg(dir.path(), "config.yaml"))
        .arg("--hosts")
        .arg(file_arg(dir.path(), "hosts.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("SSH_USERNAME"));
}

#[test]
fn test_apply_without_password_fails() {
    let (dir, config) = workspace(TASKS, HOSTS);

    converge()
        .arg("-c")
        .arg(&config)
        .env("SSH_USERNAME", "deploy")
        .args(["apply", "--tasks"])
        .arg(file_arg(dir.path(), "config.yaml"))
        .arg("--hosts")
        .arg(file_arg(dir.path(), "hosts.yaml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("SSH_PASSWORD"));
}

#[test]
fn test_apply_with_empty_host_list_succeeds() {
    let (dir, config) = workspace(TASKS, "servers: []\n");

    converge()
        .arg("-c")
        .arg(&config)
        .args(["apply", "--user", "deploy", "--password", "secret", "--tasks"])
        .arg(file_arg(dir.path(), "config.yaml"))
        .arg("--hosts")
        .arg(file_arg(dir.path(), "hosts.yaml"))
        .assert()
        .success()
        .stderr(predicate::str::contains("nothing to do"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let dir = tempfile::tempdir().unwrap();

    converge()
        .arg("-c")
        .arg(dir.path().join("nope.toml"))
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_config_init_and_show() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("converge").join("config.toml");

    converge()
        .arg("-c")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    converge()
        .arg("-c")
        .arg(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("command_timeout = 300"));

    converge()
        .arg("-c")
        .arg(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}
