//! Service reconciler
//!
//! `start` is the only state with a no-op: a running service stays as is
//! unless a package or file changed earlier in the run, in which case the
//! start is escalated to a restart. `stop`, `restart` and `reload` always
//! run.

use cv_core::traits::RemoteSession;
use cv_core::{ChangeSet, Convergence, ServiceState, ServiceTask, TaskError};

use crate::commands;

pub async fn reconcile_service<S>(
    session: &S,
    task: &ServiceTask,
    changes: &ChangeSet,
) -> Result<Convergence, TaskError>
where
    S: RemoteSession + ?Sized,
{
    let listed = session.execute(&commands::unit_exists(&task.name)).await?;
    if !commands::is_unit_listed(&listed) {
        return Err(TaskError::ServiceNotFound {
            name: task.name.clone(),
        });
    }

    let (verb, action) = match task.state {
        ServiceState::Start if changes.requires_restart() => {
            tracing::info!(
                service = %task.name,
                package_changed = changes.package_changed(),
                file_changed = changes.file_changed(),
                "Escalating start to restart"
            );
            ("restart", "restart (escalated from start)")
        }
        ServiceState::Start => {
            let active = session
                .execute(&commands::service_is_active(&task.name))
                .await?;
            if active.success() {
                tracing::debug!(service = %task.name, "Service already running");
                return Ok(Convergence::Compliant);
            }
            ("start", "start")
        }
        other => (other.verb(), other.verb()),
    };

    tracing::info!(service = %task.name, "Managing service: {}", verb);
    let output = session
        .execute(&commands::service_action(verb, &task.name))
        .await?;
    if !output.success() {
        return Err(TaskError::ResourceState {
            resource: format!("service {}", task.name),
            message: format!(
                "systemctl {} exited with status {}: {}",
                verb,
                output.exit_status,
                output.stderr_str()
            ),
        });
    }

    Ok(Convergence::applied(action))
}
