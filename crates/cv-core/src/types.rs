//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// A remote host to converge
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Host {
    /// Hostname or IP address
    pub address: String,
    /// SSH port
    pub port: u16,
    /// Expected host key fingerprint (`SHA256:...`), if pinned
    pub fingerprint: Option<String>,
}

impl Host {
    /// Create a host on the default SSH port
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port: 22,
            fingerprint: None,
        }
    }

    /// Override the SSH port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port == 22 {
            write!(f, "{}", self.address)
        } else {
            write!(f, "{}:{}", self.address, self.port)
        }
    }
}

/// Login credentials, resolved once from the environment
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    secret: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// One declared configuration task.
///
/// The order of tasks in a list is the order in which they are applied. A
/// service task only sees changes made by tasks that precede it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Package(PackageTask),
    File(FileTask),
    Service(ServiceTask),
}

impl Task {
    /// Short kind label used in logs and reports
    pub fn kind(&self) -> &'static str {
        match self {
            Task::Package(_) => "package",
            Task::File(_) => "file",
            Task::Service(_) => "service",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Package(p) => write!(f, "package {} {}", p.name, p.state),
            Task::File(file) => write!(f, "file {}", file.path),
            Task::Service(s) => write!(f, "service {} {}", s.name, s.state),
        }
    }
}

/// Desired state of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageState {
    Present,
    Absent,
}

impl fmt::Display for PackageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageState::Present => write!(f, "present"),
            PackageState::Absent => write!(f, "absent"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageTask {
    pub name: String,
    pub state: PackageState,
}

/// Requested service transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Start,
    Stop,
    Restart,
    Reload,
}

impl ServiceState {
    /// The systemctl verb for this transition
    pub fn verb(&self) -> &'static str {
        match self {
            ServiceState::Start => "start",
            ServiceState::Stop => "stop",
            ServiceState::Restart => "restart",
            ServiceState::Reload => "reload",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTask {
    pub name: String,
    pub state: ServiceState,
}

/// A managed file.
///
/// When `manage_file` is false the task is skipped entirely, metadata
/// included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    /// Absolute path on the remote host
    pub path: String,
    /// Desired content; `None` manages metadata only
    pub content: Option<Vec<u8>>,
    pub metadata: FileMetadata,
    pub manage_file: bool,
}

/// Ownership and permission bits of a remote file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub owner: String,
    pub group: String,
    pub mode: FileMode,
}

impl fmt::Display for FileMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.owner, self.group, self.mode)
    }
}

/// Metadata of an existing remote file as the host reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    /// Owner and group by name
    pub metadata: FileMetadata,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

impl FileStat {
    /// Whether the file already has `desired`. An all-digit owner or group
    /// is compared with the numeric id, as chown would interpret it.
    pub fn satisfies(&self, desired: &FileMetadata) -> bool {
        self.metadata.mode == desired.mode
            && account_matches(&self.metadata.owner, self.uid, &desired.owner)
            && account_matches(&self.metadata.group, self.gid, &desired.group)
    }
}

fn account_matches(name: &str, id: Option<u32>, wanted: &str) -> bool {
    if name == wanted {
        return true;
    }
    match (id, wanted.parse::<u32>()) {
        (Some(id), Ok(wanted_id)) => wanted.bytes().all(|b| b.is_ascii_digit()) && id == wanted_id,
        _ => false,
    }
}

/// Unix permission bits, parsed from an octal string such as `"0644"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileMode(u32);

impl FileMode {
    pub fn new(bits: u32) -> Option<Self> {
        (bits <= 0o7777).then_some(Self(bits))
    }

    /// Parse an octal mode; accepts `644`, `0644` and `0o644`
    pub fn parse(s: &str) -> Option<Self> {
        let digits = s.trim();
        let digits = digits.strip_prefix("0o").unwrap_or(digits);
        if digits.is_empty() || !digits.chars().all(|c| ('0'..='7').contains(&c)) {
            return None;
        }
        u32::from_str_radix(digits, 8).ok().and_then(Self::new)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

impl TryFrom<String> for FileMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid file mode '{}'", value))
    }
}

impl From<FileMode> for String {
    fn from(mode: FileMode) -> Self {
        mode.to_string()
    }
}
