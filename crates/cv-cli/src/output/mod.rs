//! Terminal output for the CLI
//!
//! Tables for run reports, task lists and host lists, plus colored status
//! lines.

use std::io::Write;

use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use tabled::{
    settings::{Style, Width},
    Table, Tabled,
};

use cv_core::outcome::HostReport;
use cv_core::{FleetReport, Host, HostStatus, Task, TaskOutcome};

/// Per-host summary table for a finished run
pub fn format_report(report: &FleetReport) -> String {
    if report.hosts.is_empty() {
        return "No hosts in run".to_string();
    }

    #[derive(Tabled)]
    struct HostRow {
        #[tabled(rename = "HOST")]
        host: String,
        #[tabled(rename = "STATUS")]
        status: String,
        #[tabled(rename = "CHANGED")]
        changed: usize,
        #[tabled(rename = "OK")]
        unchanged: usize,
        #[tabled(rename = "SKIPPED")]
        skipped: usize,
        #[tabled(rename = "DETAIL")]
        detail: String,
    }

    let rows: Vec<HostRow> = report
        .hosts
        .iter()
        .map(|h| HostRow {
            host: h.host.clone(),
            status: status_label(&h.status).to_string(),
            changed: h.changed(),
            unchanged: h.unchanged(),
            skipped: h.skipped,
            detail: truncate(&host_detail(h), 60),
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Width::wrap(120))
        .to_string()
}

/// Task-by-task table for one host
pub fn format_host_tasks(report: &HostReport) -> String {
    #[derive(Tabled)]
    struct TaskRow {
        #[tabled(rename = "#")]
        index: usize,
        #[tabled(rename = "TASK")]
        task: String,
        #[tabled(rename = "OUTCOME")]
        outcome: String,
        #[tabled(rename = "DETAIL")]
        detail: String,
    }

    let rows: Vec<TaskRow> = report
        .tasks
        .iter()
        .map(|t| TaskRow {
            index: t.index,
            task: t.task.clone(),
            outcome: t.outcome.label().to_string(),
            detail: match &t.outcome {
                TaskOutcome::NoOp => "-".to_string(),
                TaskOutcome::Applied { actions } => actions.join(", "),
                TaskOutcome::Failed { kind, message } => format!("[{}] {}", kind, message),
            },
        })
        .collect();

    Table::new(rows)
        .with(Style::rounded())
        .with(Width::wrap(120))
        .to_string()
}

/// Parsed task list
pub fn format_tasks(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks".to_string();
    }

    #[derive(Tabled)]
    struct TaskRow {
        #[tabled(rename = "#")]
        index: usize,
        #[tabled(rename = "TYPE")]
        kind: &'static str,
        #[tabled(rename = "TARGET")]
        target: String,
        #[tabled(rename = "DESIRED")]
        desired: String,
    }

    let rows: Vec<TaskRow> = tasks
        .iter()
        .enumerate()
        .map(|(index, task)| {
            let (target, desired) = match task {
                Task::Package(p) => (p.name.clone(), p.state.to_string()),
                Task::Service(s) => (s.name.clone(), s.state.to_string()),
                Task::File(f) => {
                    let content = match &f.content {
                        Some(bytes) => format!("{} bytes", bytes.len()),
                        None => "metadata only".to_string(),
                    };
                    let managed = if f.manage_file { "" } else { ", unmanaged" };
                    (f.path.clone(), format!("{} ({}{})", f.metadata, content, managed))
                }
            };
            TaskRow {
                index,
                kind: task.kind(),
                target,
                desired,
            }
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

/// Parsed host list
pub fn format_hosts(hosts: &[Host]) -> String {
    if hosts.is_empty() {
        return "No hosts".to_string();
    }

    #[derive(Tabled)]
    struct HostRow {
        #[tabled(rename = "ADDRESS")]
        address: String,
        #[tabled(rename = "PORT")]
        port: u16,
        #[tabled(rename = "FINGERPRINT")]
        fingerprint: String,
    }

    let rows: Vec<HostRow> = hosts
        .iter()
        .map(|h| HostRow {
            address: h.address.clone(),
            port: h.port,
            fingerprint: h.fingerprint.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}

fn status_label(status: &HostStatus) -> &'static str {
    match status {
        HostStatus::Converged => "converged",
        HostStatus::Failed { .. } => "failed",
        HostStatus::Unreachable { .. } => "unreachable",
        HostStatus::Cancelled => "cancelled",
    }
}

fn host_detail(report: &HostReport) -> String {
    match &report.status {
        HostStatus::Converged => "-".to_string(),
        HostStatus::Unreachable { message } => message.clone(),
        HostStatus::Cancelled => "interrupted".to_string(),
        HostStatus::Failed { task_index } => report
            .tasks
            .iter()
            .find(|t| t.index == *task_index)
            .and_then(|t| match &t.outcome {
                TaskOutcome::Failed { message, .. } => Some(format!("{}: {}", t.task, message)),
                _ => None,
            })
            .unwrap_or_else(|| format!("task #{} failed", task_index)),
    }
}

/// Truncate on a character boundary, with ellipsis
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn print_marked(mut out: impl Write, color: Color, mark: &str, msg: &str) {
    let _ = crossterm::execute!(
        out,
        SetForegroundColor(color),
        Print(mark),
        ResetColor,
        Print(msg),
        Print("\n")
    );
}

/// Green check on stdout
pub fn print_success(msg: &str) {
    print_marked(std::io::stdout(), Color::Green, "✓ ", msg);
}

/// Red cross on stderr
pub fn print_error(msg: &str) {
    print_marked(std::io::stderr(), Color::Red, "✗ ", msg);
}

/// Yellow warning sign on stderr
pub fn print_warning(msg: &str) {
    print_marked(std::io::stderr(), Color::Yellow, "⚠ ", msg);
}

/// Cyan info sign on stdout
pub fn print_info(msg: &str) {
    print_marked(std::io::stdout(), Color::Cyan, "ℹ ", msg);
}
