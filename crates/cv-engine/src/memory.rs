//! In-memory remote hosts
//!
//! [`MemoryHost`] implements [`RemoteSession`] against a simulated
//! Debian/systemd host that understands the command vocabulary in
//! [`crate::commands`]. Every operation is recorded so callers can assert on
//! exactly which commands ran and which of them changed state.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use cv_core::outcome::HostReport;
use cv_core::traits::{CommandOutput, Connector, EventSink, RemoteSession};
use cv_core::{
    CommandError, ConnectionError, FileMetadata, FileStat, Host, SessionError, Task, TaskOutcome,
};

use crate::commands::unit_name;

/// A file stored on a [`MemoryHost`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFile {
    pub content: Vec<u8>,
    pub metadata: FileMetadata,
}

#[derive(Debug, Default)]
struct HostState {
    packages: BTreeSet<String>,
    /// Packages apt cannot find
    unavailable: BTreeSet<String>,
    /// Unit name -> running
    units: BTreeMap<String, bool>,
    /// Package -> unit it ships
    package_units: BTreeMap<String, String>,
    files: BTreeMap<String, MemoryFile>,
    /// User and group names with their numeric ids
    accounts: BTreeMap<String, u32>,
    /// Operations matching these exit nonzero
    failing: Vec<String>,
    /// Operations matching these fail at the transport level
    broken: Vec<String>,
    history: Vec<String>,
    mutations: Vec<String>,
    closed: bool,
}

impl HostState {
    /// Metadata as chown would store it: numeric ids resolve to known names
    fn resolve(&self, metadata: &FileMetadata) -> FileMetadata {
        let name_for = |account: &str| {
            account
                .parse::<u32>()
                .ok()
                .and_then(|id| self.accounts.iter().find(|(_, known)| **known == id))
                .map_or_else(|| account.to_string(), |(name, _)| name.clone())
        };
        FileMetadata {
            owner: name_for(&metadata.owner),
            group: name_for(&metadata.group),
            mode: metadata.mode,
        }
    }

    fn matches(patterns: &[String], operation: &str) -> bool {
        patterns.iter().any(|p| operation.contains(p.as_str()))
    }

    fn record(&mut self, operation: &str) -> Result<bool, CommandError> {
        self.history.push(operation.to_string());
        if Self::matches(&self.broken, operation) {
            return Err(CommandError::Channel {
                command: operation.to_string(),
                message: "connection reset by peer".into(),
            });
        }
        Ok(Self::matches(&self.failing, operation))
    }

    fn run(&mut self, command: &str) -> CommandOutput {
        let tokens: Vec<&str> = command.split_whitespace().collect();
        let last = tokens.last().copied().unwrap_or_default();

        match tokens.as_slice() {
            ["dpkg-query", ..] => {
                if self.packages.contains(last) {
                    ok("install ok installed")
                } else {
                    exit(1, &format!("dpkg-query: no packages found matching {}", last))
                }
            }
            [_, "apt-get", "install", "-y", name] => {
                if self.unavailable.contains(*name) {
                    return exit(100, &format!("E: Unable to locate package {}", name));
                }
                self.packages.insert(name.to_string());
                if let Some(unit) = self.package_units.get(*name).cloned() {
                    self.units.insert(unit, true);
                }
                self.mutations.push(command.to_string());
                ok("")
            }
            [_, "apt-get", "purge", "-y", name, ..] => {
                self.packages.remove(*name);
                if let Some(unit) = self.package_units.get(*name) {
                    self.units.remove(unit);
                }
                self.mutations.push(command.to_string());
                ok("")
            }
            ["systemctl", "list-unit-files", ..] => match self.units.get(last) {
                Some(_) => ok(&format!("{} enabled enabled\n", last)),
                None => ok(""),
            },
            ["systemctl", "is-active", ..] => match self.units.get(last) {
                Some(true) => ok(""),
                _ => exit(3, ""),
            },
            ["systemctl", verb @ ("start" | "stop" | "restart" | "reload"), unit] => {
                let Some(running) = self.units.get_mut(*unit) else {
                    return exit(5, &format!("Failed to {} {}: Unit {} not found.", verb, unit, unit));
                };
                match *verb {
                    "start" | "restart" => *running = true,
                    "stop" => *running = false,
                    _ if !*running => {
                        return exit(1, &format!("{} is not active, cannot reload.", unit));
                    }
                    _ => {}
                }
                self.mutations.push(command.to_string());
                ok("")
            }
            _ => exit(127, &format!("{}: command not found", tokens.first().unwrap_or(&""))),
        }
    }
}

fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        exit_status: 0,
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

fn exit(status: u32, stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_status: status,
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// A simulated remote host. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    state: Arc<Mutex<HostState>>,
}

impl MemoryHost {
    /// A bare host: no packages, no units, no files
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_package(self, name: &str) -> Self {
        self.state().packages.insert(name.to_string());
        self
    }

    /// Make apt fail to find a package
    pub fn without_candidate(self, name: &str) -> Self {
        self.state().unavailable.insert(name.to_string());
        self
    }

    pub fn with_unit(self, name: &str, running: bool) -> Self {
        self.state().units.insert(unit_name(name), running);
        self
    }

    /// Installing `package` also installs and starts `unit`
    pub fn with_package_unit(self, package: &str, unit: &str) -> Self {
        self.state()
            .package_units
            .insert(package.to_string(), unit_name(unit));
        self
    }

    pub fn with_file(self, path: &str, content: &[u8], metadata: FileMetadata) -> Self {
        self.state().files.insert(
            path.to_string(),
            MemoryFile {
                content: content.to_vec(),
                metadata,
            },
        );
        self
    }

    /// A user and group named `name` with id `id`
    pub fn with_account(self, name: &str, id: u32) -> Self {
        self.state().accounts.insert(name.to_string(), id);
        self
    }

    /// Operations containing `pattern` exit nonzero (or fail, for file writes)
    pub fn fail_commands_containing(self, pattern: &str) -> Self {
        self.state().failing.push(pattern.to_string());
        self
    }

    /// Operations containing `pattern` fail with a transport error
    pub fn break_commands_containing(self, pattern: &str) -> Self {
        self.state().broken.push(pattern.to_string());
        self
    }

    pub fn is_installed(&self, package: &str) -> bool {
        self.state().packages.contains(package)
    }

    pub fn is_running(&self, unit: &str) -> bool {
        self.state()
            .units
            .get(&unit_name(unit))
            .copied()
            .unwrap_or(false)
    }

    pub fn file(&self, path: &str) -> Option<MemoryFile> {
        self.state().files.get(path).cloned()
    }

    /// Every operation attempted, in order
    pub fn history(&self) -> Vec<String> {
        self.state().history.clone()
    }

    /// Operations that changed host state, in order
    pub fn mutations(&self) -> Vec<String> {
        self.state().mutations.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

#[async_trait]
impl RemoteSession for MemoryHost {
    async fn execute(&self, command: &str) -> Result<CommandOutput, CommandError> {
        let mut state = self.state();
        if state.record(command)? {
            return Ok(exit(1, "injected failure"));
        }
        Ok(state.run(command))
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>, SessionError> {
        let mut state = self.state();
        if state.record(&format!("read {}", path))? {
            return Err(SessionError::Read {
                path: path.to_string(),
                reason: "Permission denied".into(),
            });
        }
        state
            .files
            .get(path)
            .map(|f| f.content.clone())
            .ok_or_else(|| SessionError::NotFound {
                path: path.to_string(),
            })
    }

    async fn file_metadata(&self, path: &str) -> Result<Option<FileStat>, SessionError> {
        let mut state = self.state();
        if state.record(&format!("stat {}", path))? {
            return Err(SessionError::Read {
                path: path.to_string(),
                reason: "Permission denied".into(),
            });
        }
        Ok(state.files.get(path).map(|f| FileStat {
            metadata: f.metadata.clone(),
            uid: state.accounts.get(&f.metadata.owner).copied(),
            gid: state.accounts.get(&f.metadata.group).copied(),
        }))
    }

    async fn write_file(
        &self,
        path: &str,
        content: &[u8],
        metadata: &FileMetadata,
    ) -> Result<(), SessionError> {
        let operation = format!("write {}", path);
        let mut state = self.state();
        if state.record(&operation)? {
            return Err(SessionError::Write {
                path: path.to_string(),
                reason: "Read-only file system".into(),
            });
        }
        let metadata = state.resolve(metadata);
        state.files.insert(
            path.to_string(),
            MemoryFile {
                content: content.to_vec(),
                metadata,
            },
        );
        state.mutations.push(operation);
        Ok(())
    }

    async fn set_metadata(&self, path: &str, metadata: &FileMetadata) -> Result<(), SessionError> {
        let operation = format!("set-metadata {}", path);
        let mut state = self.state();
        if state.record(&operation)? {
            return Err(SessionError::Write {
                path: path.to_string(),
                reason: "Operation not permitted".into(),
            });
        }
        let metadata = state.resolve(metadata);
        match state.files.get_mut(path) {
            Some(file) => file.metadata = metadata,
            None => {
                return Err(SessionError::Write {
                    path: path.to_string(),
                    reason: "No such file or directory".into(),
                })
            }
        }
        state.mutations.push(operation);
        Ok(())
    }

    async fn close(&self) -> Result<(), CommandError> {
        self.state().closed = true;
        Ok(())
    }
}

/// Connector over a fixed set of in-memory hosts; unknown addresses are
/// unreachable
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    hosts: HashMap<String, MemoryHost>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(mut self, address: &str, host: MemoryHost) -> Self {
        self.hosts.insert(address.to_string(), host);
        self
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Session = MemoryHost;

    async fn connect(&self, host: &Host) -> Result<MemoryHost, ConnectionError> {
        self.hosts
            .get(&host.address)
            .cloned()
            .ok_or_else(|| ConnectionError::ConnectionRefused(format!("no route to {}", host)))
    }
}

/// One recorded task event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEvent {
    pub host: String,
    pub index: usize,
    pub task: String,
    pub outcome: TaskOutcome,
}

/// Event sink that keeps everything it receives
#[derive(Debug, Default)]
pub struct RecordingSink {
    tasks: Mutex<Vec<TaskEvent>>,
    hosts: Mutex<Vec<HostReport>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_events(&self) -> Vec<TaskEvent> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn host_reports(&self) -> Vec<HostReport> {
        self.hosts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl EventSink for RecordingSink {
    fn task_finished(&self, host: &Host, index: usize, task: &Task, outcome: &TaskOutcome) {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(TaskEvent {
                host: host.to_string(),
                index,
                task: task.to_string(),
                outcome: outcome.clone(),
            });
    }

    fn host_finished(&self, report: &HostReport) {
        self.hosts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_package_lifecycle() {
        let host = MemoryHost::new().with_package_unit("apache2", "apache2");

        let out = host.execute("dpkg-query -W -f='${Status}' apache2").await.unwrap();
        assert_eq!(out.exit_status, 1);

        host.execute("DEBIAN_FRONTEND=noninteractive apt-get install -y apache2")
            .await
            .unwrap();
        assert!(host.is_installed("apache2"));
        assert!(host.is_running("apache2"));

        host.execute("DEBIAN_FRONTEND=noninteractive apt-get purge -y apache2 && apt-get autoremove -y")
            .await
            .unwrap();
        assert!(!host.is_installed("apache2"));
        assert!(!host.is_running("apache2"));
        assert_eq!(host.mutations().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let host = MemoryHost::new();
        let out = host.execute("yum install -y php").await.unwrap();
        assert_eq!(out.exit_status, 127);
    }

    #[tokio::test]
    async fn test_broken_operation_is_transport_error() {
        let host = MemoryHost::new().break_commands_containing("read /etc");
        assert!(matches!(
            host.read_file("/etc/motd").await,
            Err(SessionError::Command(_))
        ));
    }

    #[tokio::test]
    async fn test_connector_shares_state() {
        let host = MemoryHost::new();
        let connector = MemoryConnector::new().with_host("web1", host.clone());

        let session = connector.connect(&Host::new("web1")).await.unwrap();
        session.close().await.unwrap();
        assert!(host.is_closed());

        assert!(connector.connect(&Host::new("web2")).await.is_err());
    }
}
