//! Task list and host list loading
//!
//! Both files are YAML. Records are validated once here into the closed
//! [`Task`] type so the engine never checks for optional keys.
//!
//! Task list:
//!
//! ```yaml
//! - type: package
//!   name: apache2
//!   state: present
//! - type: file
//!   path: /var/www/html/index.php
//!   content: "<?php echo 'Hello, world!'; ?>"
//!   owner: www-data
//!   group: www-data
//!   mode: "0644"
//!   manage_file: true
//! - type: service
//!   name: apache2
//!   state: reload
//! ```
//!
//! Host list:
//!
//! ```yaml
//! servers:
//!   - host: 10.0.0.5
//!   - host: web2.example.com
//!     port: 2222
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::error::ConfigError;
use crate::types::{
    FileMetadata, FileMode, FileTask, Host, PackageState, PackageTask, ServiceState, ServiceTask,
    Task,
};

const DEFAULT_OWNER: &str = "www-data";
const DEFAULT_GROUP: &str = "www-data";
const DEFAULT_MODE: u32 = 0o644;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TaskRecord {
    Package {
        name: String,
        state: PackageState,
    },
    File {
        path: String,
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        owner: Option<String>,
        #[serde(default)]
        group: Option<String>,
        #[serde(default)]
        mode: Option<ModeValue>,
        #[serde(default)]
        manage_file: bool,
    },
    Service {
        name: String,
        state: ServiceState,
    },
}

/// Modes may be written as strings (`"0644"`, `0644`) or as integers
/// (`644`). Either way the digits are octal.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModeValue {
    Text(String),
    Number(u64),
}

impl ModeValue {
    fn parse(&self) -> Option<FileMode> {
        match self {
            ModeValue::Text(s) => FileMode::parse(s),
            ModeValue::Number(n) => FileMode::parse(&n.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HostList {
    servers: Vec<HostRecord>,
}

#[derive(Debug, Deserialize)]
struct HostRecord {
    host: String,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    fingerprint: Option<String>,
}

/// Load and validate a task list file
pub fn load_tasks(path: &Path) -> Result<Vec<Task>, ConfigError> {
    let content = read(path)?;
    let records: Vec<serde_yaml::Value> =
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
    validate_tasks(records)
}

/// Parse a task list from YAML text
pub fn parse_tasks(yaml: &str) -> Result<Vec<Task>, ConfigError> {
    let records: Vec<serde_yaml::Value> = serde_yaml::from_str(yaml).map_err(|source| {
        ConfigError::Yaml {
            path: "<inline>".into(),
            source,
        }
    })?;
    validate_tasks(records)
}

/// Load and validate a host list file
pub fn load_hosts(path: &Path, default_port: u16) -> Result<Vec<Host>, ConfigError> {
    let content = read(path)?;
    let list: HostList = serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    validate_hosts(list, default_port)
}

/// Parse a host list from YAML text
pub fn parse_hosts(yaml: &str, default_port: u16) -> Result<Vec<Host>, ConfigError> {
    let list: HostList = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
        path: "<inline>".into(),
        source,
    })?;
    validate_hosts(list, default_port)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read {:?}: {}", path, e)))
}

fn validate_tasks(records: Vec<serde_yaml::Value>) -> Result<Vec<Task>, ConfigError> {
    records
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let record: TaskRecord =
                serde_yaml::from_value(value).map_err(|e| ConfigError::InvalidTask {
                    index,
                    message: e.to_string(),
                })?;
            into_task(record).map_err(|message| ConfigError::InvalidTask { index, message })
        })
        .collect()
}

fn into_task(record: TaskRecord) -> Result<Task, String> {
    match record {
        TaskRecord::Package { name, state } => Ok(Task::Package(PackageTask {
            name: non_empty(name, "package name")?,
            state,
        })),
        TaskRecord::Service { name, state } => Ok(Task::Service(ServiceTask {
            name: non_empty(name, "service name")?,
            state,
        })),
        TaskRecord::File {
            path,
            content,
            owner,
            group,
            mode,
            manage_file,
        } => {
            if !path.starts_with('/') {
                return Err(format!("file path '{}' must be absolute", path));
            }
            let mode = match mode {
                Some(value) => value
                    .parse()
                    .ok_or_else(|| format!("invalid mode {:?} for {}", value, path))?,
                None => FileMode::new(DEFAULT_MODE).ok_or("invalid default mode")?,
            };
            Ok(Task::File(FileTask {
                path,
                content: content.map(String::into_bytes),
                metadata: FileMetadata {
                    owner: non_empty(owner.unwrap_or_else(|| DEFAULT_OWNER.into()), "owner")?,
                    group: non_empty(group.unwrap_or_else(|| DEFAULT_GROUP.into()), "group")?,
                    mode,
                },
                manage_file,
            }))
        }
    }
}

fn validate_hosts(list: HostList, default_port: u16) -> Result<Vec<Host>, ConfigError> {
    list.servers
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let address = record.host.trim().to_string();
            if address.is_empty() {
                return Err(ConfigError::InvalidHost {
                    index,
                    message: "host must not be empty".into(),
                });
            }
            Ok(Host {
                address,
                port: record.port.unwrap_or(default_port),
                fingerprint: record.fingerprint,
            })
        })
        .collect()
}

fn non_empty(value: String, what: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(format!("{} must not be empty", what))
    } else {
        Ok(trimmed.to_string())
    }
}
