//! Per-host task loop

use tokio_util::sync::CancellationToken;

use cv_core::outcome::{HostReport, TaskReport};
use cv_core::traits::{Connector, EventSink, RemoteSession};
use cv_core::{ChangeSet, Host, HostStatus, Task, TaskOutcome};

use crate::reconcile::reconcile;

/// Applies a task list to a single host
pub struct HostRunner<'a, C> {
    connector: &'a C,
    tasks: &'a [Task],
    sink: &'a dyn EventSink,
    cancel: CancellationToken,
}

impl<'a, C: Connector> HostRunner<'a, C> {
    pub fn new(connector: &'a C, tasks: &'a [Task], sink: &'a dyn EventSink) -> Self {
        Self {
            connector,
            tasks,
            sink,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop between tasks once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Connect, apply every task, close the session.
    ///
    /// Never fails: an unreachable host or a failed task is reported in the
    /// returned [`HostReport`], which is also handed to the event sink.
    pub async fn run(&self, host: &Host) -> HostReport {
        let report = self.connect_and_apply(host).await;
        self.sink.host_finished(&report);
        report
    }

    async fn connect_and_apply(&self, host: &Host) -> HostReport {
        let total = self.tasks.len();
        if self.cancel.is_cancelled() {
            return HostReport::cancelled(host.to_string(), total);
        }

        tracing::debug!(host = %host, "Opening session");
        let connected = tokio::select! {
            result = self.connector.connect(host) => result,
            _ = self.cancel.cancelled() => {
                return HostReport::cancelled(host.to_string(), total);
            }
        };
        let session = match connected {
            Ok(session) => session,
            Err(e) => return HostReport::unreachable(host.to_string(), e.to_string(), total),
        };

        let report = self.apply(&session, host).await;

        if let Err(e) = session.close().await {
            tracing::warn!(host = %host, "Failed to close session: {}", e);
        }
        report
    }

    /// Apply the task list over an open session.
    ///
    /// Tasks run in declared order. The first failed task ends the run for
    /// this host and the remaining tasks are counted as skipped.
    pub async fn apply<S>(&self, session: &S, host: &Host) -> HostReport
    where
        S: RemoteSession + ?Sized,
    {
        let total = self.tasks.len();
        let mut changes = ChangeSet::new();
        let mut reports = Vec::with_capacity(total);

        for (index, task) in self.tasks.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::debug!(host = %host, index, "Cancelled before task");
                return finish(host, HostStatus::Cancelled, reports, total - index);
            }

            let result = reconcile(session, task, &changes).await;
            if let Ok(convergence) = &result {
                changes = changes.record(task, convergence);
            }
            let outcome = TaskOutcome::from(result);
            self.sink.task_finished(host, index, task, &outcome);

            let failed = outcome.is_failed();
            reports.push(TaskReport {
                index,
                task: task.to_string(),
                outcome,
            });
            if failed {
                let status = HostStatus::Failed { task_index: index };
                return finish(host, status, reports, total - index - 1);
            }
        }

        finish(host, HostStatus::Converged, reports, 0)
    }
}

fn finish(host: &Host, status: HostStatus, tasks: Vec<TaskReport>, skipped: usize) -> HostReport {
    HostReport {
        host: host.to_string(),
        status,
        tasks,
        skipped,
    }
}
