//! Package reconciler

use cv_core::traits::RemoteSession;
use cv_core::{Convergence, PackageState, PackageTask, TaskError};

use crate::commands;

/// Install or remove a package so its installed status matches the task
pub async fn reconcile_package<S>(
    session: &S,
    task: &PackageTask,
) -> Result<Convergence, TaskError>
where
    S: RemoteSession + ?Sized,
{
    let status = session
        .execute(&commands::package_status(&task.name))
        .await?;
    let installed = commands::is_installed(&status);

    let (command, action) = match (task.state, installed) {
        (PackageState::Present, true) | (PackageState::Absent, false) => {
            tracing::debug!(package = %task.name, state = %task.state, "Package already compliant");
            return Ok(Convergence::Compliant);
        }
        (PackageState::Present, false) => (commands::package_install(&task.name), "install"),
        (PackageState::Absent, true) => (commands::package_remove(&task.name), "remove"),
    };

    tracing::info!(package = %task.name, "Managing package: {}", action);
    let output = session.execute(&command).await?;
    if !output.success() {
        return Err(TaskError::PackageAction {
            name: task.name.clone(),
            action,
            exit_status: output.exit_status,
            stderr: output.stderr_str(),
        });
    }

    Ok(Convergence::applied(action))
}
