//! Per-host change tracking

use crate::outcome::Convergence;
use crate::types::Task;

/// Changes made so far in one host run.
///
/// Created empty for each host and threaded through the task loop by value.
/// Only package and file changes are tracked; service actions never feed
/// back into the set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSet {
    package_changed: bool,
    file_changed: bool,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one task result into the set
    #[must_use]
    pub fn record(self, task: &Task, convergence: &Convergence) -> Self {
        if !convergence.is_change() {
            return self;
        }
        match task {
            Task::Package(_) => Self {
                package_changed: true,
                ..self
            },
            Task::File(_) => Self {
                file_changed: true,
                ..self
            },
            Task::Service(_) => self,
        }
    }

    pub fn package_changed(&self) -> bool {
        self.package_changed
    }

    pub fn file_changed(&self) -> bool {
        self.file_changed
    }

    /// Whether a running service must be restarted to pick up changes
    pub fn requires_restart(&self) -> bool {
        self.package_changed || self.file_changed
    }
}
