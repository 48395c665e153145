//! Structured logging of run events

use cv_core::outcome::HostReport;
use cv_core::traits::EventSink;
use cv_core::{Host, HostStatus, Task, TaskOutcome};

/// Event sink that emits one `tracing` event per task and per host
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn task_finished(&self, host: &Host, index: usize, task: &Task, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::NoOp => {
                tracing::info!(host = %host, index, task = %task, outcome = "no-op", "Task compliant");
            }
            TaskOutcome::Applied { actions } => {
                tracing::info!(
                    host = %host,
                    index,
                    task = %task,
                    outcome = "applied",
                    actions = %actions.join(", "),
                    "Task applied"
                );
            }
            TaskOutcome::Failed { kind, message } => {
                tracing::error!(
                    host = %host,
                    index,
                    task = %task,
                    outcome = "failed",
                    kind = %kind,
                    "Task failed: {}",
                    message
                );
            }
        }
    }

    fn host_finished(&self, report: &HostReport) {
        let changed = report.changed();
        let unchanged = report.unchanged();
        match &report.status {
            HostStatus::Converged => tracing::info!(
                host = %report.host,
                changed,
                unchanged,
                "Host converged"
            ),
            HostStatus::Failed { task_index } => tracing::error!(
                host = %report.host,
                changed,
                unchanged,
                failed_task = *task_index,
                skipped = report.skipped,
                "Host failed"
            ),
            HostStatus::Unreachable { message } => tracing::error!(
                host = %report.host,
                skipped = report.skipped,
                "Host unreachable: {}",
                message
            ),
            HostStatus::Cancelled => tracing::warn!(
                host = %report.host,
                changed,
                skipped = report.skipped,
                "Host run cancelled"
            ),
        }
    }
}
