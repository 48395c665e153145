//! Run event sink

use crate::outcome::{HostReport, TaskOutcome};
use crate::types::{Host, Task};

/// Receives one event per task outcome and one per finished host
pub trait EventSink: Send + Sync {
    /// A task finished on a host
    fn task_finished(&self, host: &Host, index: usize, task: &Task, outcome: &TaskOutcome);

    /// A host run finished (including unreachable and cancelled hosts)
    fn host_finished(&self, report: &HostReport);
}

/// Sink that discards all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn task_finished(&self, _host: &Host, _index: usize, _task: &Task, _outcome: &TaskOutcome) {}

    fn host_finished(&self, _report: &HostReport) {}
}
