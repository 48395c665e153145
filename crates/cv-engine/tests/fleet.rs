//! Fleet integration tests
//!
//! Runs full task lists against in-memory hosts through the fleet driver.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use cv_core::inventory::parse_tasks;
use cv_core::{FailureKind, FileMetadata, FileMode, Host, HostStatus, Task, TaskOutcome};
use cv_engine::memory::{MemoryConnector, MemoryHost, RecordingSink};
use cv_engine::FleetDriver;

const WEB_TASKS: &str = r#"
- type: package
  name: apache2
  state: present
- type: package
  name: php
  state: present
- type: file
  path: /var/www/html/index.php
  content: "<?php echo 'Hello, world!'; ?>"
  owner: www-data
  group: www-data
  mode: "0644"
  manage_file: true
- type: service
  name: apache2
  state: reload
"#;

const INDEX: &str = "/var/www/html/index.php";

fn bare_web_host() -> MemoryHost {
    MemoryHost::new().with_package_unit("apache2", "apache2")
}

fn web_metadata() -> FileMetadata {
    FileMetadata {
        owner: "www-data".into(),
        group: "www-data".into(),
        mode: FileMode::new(0o644).unwrap(),
    }
}

fn driver(connector: MemoryConnector, tasks: Vec<Task>) -> FleetDriver<MemoryConnector> {
    FleetDriver::new(connector, tasks).with_concurrency(2)
}

#[tokio::test]
async fn test_end_to_end_web_server() {
    let web = bare_web_host();
    let connector = MemoryConnector::new().with_host("web1", web.clone());
    let fleet = driver(connector, parse_tasks(WEB_TASKS).unwrap());
    let hosts = [Host::new("web1")];

    let first = fleet.run(&hosts).await;
    assert!(first.is_success());
    assert!(web.is_installed("apache2"));
    assert!(web.is_installed("php"));
    assert!(web.is_running("apache2"));
    let index = web.file(INDEX).expect("index.php written");
    assert_eq!(index.content, b"<?php echo 'Hello, world!'; ?>");
    assert_eq!(index.metadata, web_metadata());

    let before = web.mutations().len();
    let second = fleet.run(&hosts).await;
    assert!(second.is_success());

    let outcomes: Vec<_> = second.hosts[0]
        .tasks
        .iter()
        .map(|t| t.outcome.label())
        .collect();
    assert_eq!(outcomes, ["no-op", "no-op", "no-op", "applied"]);
    assert_eq!(
        web.mutations()[before..].to_vec(),
        vec!["systemctl reload apache2.service".to_string()]
    );
}

#[tokio::test]
async fn test_idempotent_without_explicit_service_actions() {
    let tasks = parse_tasks(
        r#"
- type: package
  name: nginx
  state: present
- type: package
  name: telnetd
  state: absent
- type: file
  path: /etc/motd
  content: "welcome\n"
  owner: root
  group: root
  mode: "0644"
  manage_file: true
- type: service
  name: nginx
  state: start
"#,
    )
    .unwrap();
    let remote = MemoryHost::new()
        .with_package("telnetd")
        .with_package_unit("nginx", "nginx");
    let connector = MemoryConnector::new().with_host("web1", remote.clone());
    let fleet = driver(connector, tasks);
    let hosts = [Host::new("web1")];

    assert!(fleet.run(&hosts).await.is_success());
    assert!(!remote.is_installed("telnetd"));
    let after_first = remote.mutations().len();

    let second = fleet.run(&hosts).await;
    assert!(second.is_success());
    assert_eq!(second.hosts[0].changed(), 0);
    assert_eq!(remote.mutations().len(), after_first);
}

#[tokio::test]
async fn test_file_change_restarts_running_service() {
    let tasks = parse_tasks(
        r#"
- type: file
  path: /etc/nginx/nginx.conf
  content: "worker_processes 2;\n"
  owner: root
  group: root
  manage_file: true
- type: service
  name: nginx
  state: start
"#,
    )
    .unwrap();
    let remote = MemoryHost::new().with_unit("nginx", true);
    let connector = MemoryConnector::new().with_host("web1", remote.clone());

    let report = driver(connector, tasks).run(&[Host::new("web1")]).await;

    assert!(report.is_success());
    assert_eq!(
        report.hosts[0].tasks[1].outcome,
        TaskOutcome::Applied {
            actions: vec!["restart (escalated from start)".into()]
        }
    );
    assert!(remote
        .mutations()
        .contains(&"systemctl restart nginx.service".to_string()));
}

#[tokio::test]
async fn test_failed_task_stops_only_its_host() {
    let broken = bare_web_host().fail_commands_containing("apt-get install -y php");
    let healthy = bare_web_host();
    let connector = MemoryConnector::new()
        .with_host("web1", broken.clone())
        .with_host("web2", healthy.clone());
    let sink = Arc::new(RecordingSink::new());

    let report = driver(connector, parse_tasks(WEB_TASKS).unwrap())
        .with_sink(sink.clone())
        .run(&[Host::new("web1"), Host::new("web2")])
        .await;

    assert!(!report.is_success());
    let failed = &report.hosts[0];
    assert_eq!(failed.status, HostStatus::Failed { task_index: 1 });
    assert_eq!(failed.skipped, 2);
    match &failed.tasks[1].outcome {
        TaskOutcome::Failed { kind, .. } => assert_eq!(*kind, FailureKind::PackageAction),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(broken.file(INDEX).is_none());
    assert!(!broken
        .history()
        .iter()
        .any(|op| op.contains("systemctl reload")));

    assert!(report.hosts[1].is_success());
    assert!(healthy.file(INDEX).is_some());

    let web1_events = sink
        .task_events()
        .into_iter()
        .filter(|e| e.host == "web1")
        .count();
    assert_eq!(web1_events, 2);
    assert_eq!(sink.host_reports().len(), 2);
}

#[tokio::test]
async fn test_unreachable_host_does_not_stop_fleet() {
    let remote = bare_web_host();
    let connector = MemoryConnector::new().with_host("web2", remote.clone());

    let report = driver(connector, parse_tasks(WEB_TASKS).unwrap())
        .run(&[Host::new("web1"), Host::new("web2")])
        .await;

    assert!(matches!(
        report.hosts[0].status,
        HostStatus::Unreachable { .. }
    ));
    assert_eq!(report.hosts[0].skipped, 4);
    assert!(report.hosts[1].is_success());
    assert_eq!(report.failed_hosts().count(), 1);
}

#[tokio::test]
async fn test_missing_service_fails_host() {
    let tasks = parse_tasks("- type: service\n  name: postfix\n  state: start\n").unwrap();
    let connector = MemoryConnector::new().with_host("mail", MemoryHost::new());

    let report = driver(connector, tasks).run(&[Host::new("mail")]).await;

    match &report.hosts[0].tasks[0].outcome {
        TaskOutcome::Failed { kind, message } => {
            assert_eq!(*kind, FailureKind::ServiceNotFound);
            assert!(message.contains("postfix"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancelled_run_reports_every_host_cancelled() {
    let remote = bare_web_host();
    let connector = MemoryConnector::new()
        .with_host("web1", remote.clone())
        .with_host("web2", bare_web_host());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = driver(connector, parse_tasks(WEB_TASKS).unwrap())
        .with_cancellation(cancel)
        .run(&[Host::new("web1"), Host::new("web2")])
        .await;

    assert!(report
        .hosts
        .iter()
        .all(|h| h.status == HostStatus::Cancelled && h.skipped == 4));
    assert!(remote.history().is_empty());
    assert!(!report.is_success());
}
