//! Task, host and fleet outcomes

use serde::Serialize;
use std::fmt;

use crate::error::TaskError;

/// What a reconciler did for one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Convergence {
    /// Remote state already matched
    Compliant,
    /// Remote state was changed by the listed actions
    Applied { actions: Vec<String> },
}

impl Convergence {
    pub fn applied(action: impl Into<String>) -> Self {
        Convergence::Applied {
            actions: vec![action.into()],
        }
    }

    pub fn is_change(&self) -> bool {
        matches!(self, Convergence::Applied { .. })
    }
}

/// Failure classification reported with a failed task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Command,
    PackageAction,
    FileAction,
    ServiceNotFound,
    ResourceState,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Command => "command",
            FailureKind::PackageAction => "package_action",
            FailureKind::FileAction => "file_action",
            FailureKind::ServiceNotFound => "service_not_found",
            FailureKind::ResourceState => "resource_state",
        };
        f.write_str(label)
    }
}

/// Outcome of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    NoOp,
    Applied { actions: Vec<String> },
    Failed { kind: FailureKind, message: String },
}

impl TaskOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, TaskOutcome::Failed { .. })
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, TaskOutcome::Applied { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskOutcome::NoOp => "no-op",
            TaskOutcome::Applied { .. } => "applied",
            TaskOutcome::Failed { .. } => "failed",
        }
    }
}

impl From<Result<Convergence, TaskError>> for TaskOutcome {
    fn from(result: Result<Convergence, TaskError>) -> Self {
        match result {
            Ok(Convergence::Compliant) => TaskOutcome::NoOp,
            Ok(Convergence::Applied { actions }) => TaskOutcome::Applied { actions },
            Err(e) => TaskOutcome::Failed {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}

/// Outcome of one task within a host report
#[derive(Debug, Clone, Serialize)]
pub struct TaskReport {
    /// Position in the task list
    pub index: usize,
    /// Human-readable task description
    pub task: String,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
}

/// Final state of one host run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HostStatus {
    /// Every task finished as no-op or applied
    Converged,
    /// A task failed; later tasks were not attempted
    Failed { task_index: usize },
    /// The session could not be opened
    Unreachable { message: String },
    /// The run was cancelled before this host finished
    Cancelled,
}

/// Per-host summary
#[derive(Debug, Clone, Serialize)]
pub struct HostReport {
    pub host: String,
    #[serde(flatten)]
    pub status: HostStatus,
    pub tasks: Vec<TaskReport>,
    /// Tasks never attempted because of fail-fast or cancellation
    pub skipped: usize,
}

impl HostReport {
    pub fn unreachable(host: impl Into<String>, message: impl Into<String>, skipped: usize) -> Self {
        Self {
            host: host.into(),
            status: HostStatus::Unreachable {
                message: message.into(),
            },
            tasks: Vec::new(),
            skipped,
        }
    }

    pub fn cancelled(host: impl Into<String>, skipped: usize) -> Self {
        Self {
            host: host.into(),
            status: HostStatus::Cancelled,
            tasks: Vec::new(),
            skipped,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == HostStatus::Converged
    }

    pub fn changed(&self) -> usize {
        self.tasks.iter().filter(|t| t.outcome.is_applied()).count()
    }

    pub fn unchanged(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.outcome == TaskOutcome::NoOp)
            .count()
    }
}

/// Aggregate result of a run across all hosts
#[derive(Debug, Clone, Default, Serialize)]
pub struct FleetReport {
    pub hosts: Vec<HostReport>,
}

impl FleetReport {
    /// True only if every host converged
    pub fn is_success(&self) -> bool {
        self.hosts.iter().all(HostReport::is_success)
    }

    pub fn failed_hosts(&self) -> impl Iterator<Item = &HostReport> {
        self.hosts.iter().filter(|h| !h.is_success())
    }
}
