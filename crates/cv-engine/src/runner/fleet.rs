//! Fleet driver

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use cv_core::outcome::HostReport;
use cv_core::traits::{Connector, EventSink};
use cv_core::{FleetReport, Host, Task};

use crate::events::TracingSink;
use crate::runner::HostRunner;

/// Hosts processed at once unless configured otherwise
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Runs one task list against many hosts.
///
/// Hosts are independent: an unreachable or failed host never stops the
/// others. At most `concurrency` hosts are in flight at any time.
pub struct FleetDriver<C> {
    connector: C,
    tasks: Vec<Task>,
    sink: Arc<dyn EventSink>,
    concurrency: usize,
    cancel: CancellationToken,
}

impl<C: Connector> FleetDriver<C> {
    pub fn new(connector: C, tasks: Vec<Task>) -> Self {
        Self {
            connector,
            tasks,
            sink: Arc::new(TracingSink),
            concurrency: DEFAULT_CONCURRENCY,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Clamped to at least one host
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run every host and return their reports in host-list order
    pub async fn run(&self, hosts: &[Host]) -> FleetReport {
        tracing::info!(
            hosts = hosts.len(),
            tasks = self.tasks.len(),
            concurrency = self.concurrency,
            "Starting run"
        );

        let reports: Vec<HostReport> = stream::iter(hosts)
            .map(|host| self.run_host(host))
            .buffered(self.concurrency)
            .collect()
            .await;

        let report = FleetReport { hosts: reports };
        let failed = report.failed_hosts().count();
        if failed == 0 {
            tracing::info!(hosts = hosts.len(), "Run complete, all hosts converged");
        } else {
            tracing::warn!(hosts = hosts.len(), failed, "Run complete with failures");
        }
        report
    }

    async fn run_host(&self, host: &Host) -> HostReport {
        let span = tracing::info_span!("host", host = %host);
        HostRunner::new(&self.connector, &self.tasks, self.sink.as_ref())
            .with_cancellation(self.cancel.clone())
            .run(host)
            .instrument(span)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryConnector, MemoryHost};
    use cv_core::{HostStatus, PackageState, PackageTask};

    fn install(name: &str) -> Task {
        Task::Package(PackageTask {
            name: name.into(),
            state: PackageState::Present,
        })
    }

    #[tokio::test]
    async fn test_reports_follow_host_order() {
        let connector = MemoryConnector::new()
            .with_host("a", MemoryHost::new())
            .with_host("c", MemoryHost::new());
        let hosts = [Host::new("a"), Host::new("b"), Host::new("c")];

        let report = FleetDriver::new(connector, vec![install("php")])
            .with_concurrency(2)
            .run(&hosts)
            .await;

        let names: Vec<_> = report.hosts.iter().map(|h| h.host.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert!(report.hosts[0].is_success());
        assert!(matches!(report.hosts[1].status, HostStatus::Unreachable { .. }));
        assert!(report.hosts[2].is_success());
        assert!(!report.is_success());
    }

    #[test]
    fn test_concurrency_is_clamped() {
        let driver = FleetDriver::new(MemoryConnector::new(), vec![]).with_concurrency(0);
        assert_eq!(driver.concurrency, 1);
    }
}
