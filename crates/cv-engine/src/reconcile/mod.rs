//! Resource reconcilers
//!
//! Each reconciler inspects the current remote state for one task, performs
//! the minimal corrective action through the [`RemoteSession`] and reports a
//! [`Convergence`]. Nonzero exits from inspection commands are treated as
//! answers, never as failures.

mod file;
mod package;
mod service;

pub use file::reconcile_file;
pub use package::reconcile_package;
pub use service::reconcile_service;

use cv_core::traits::RemoteSession;
use cv_core::{ChangeSet, Convergence, Task, TaskError};

/// Dispatch one task to its reconciler.
///
/// `changes` holds what earlier tasks in the same host run changed; only
/// the service reconciler reads it.
pub async fn reconcile<S>(
    session: &S,
    task: &Task,
    changes: &ChangeSet,
) -> Result<Convergence, TaskError>
where
    S: RemoteSession + ?Sized,
{
    match task {
        Task::Package(package) => reconcile_package(session, package).await,
        Task::File(file) => reconcile_file(session, file).await,
        Task::Service(service) => reconcile_service(session, service, changes).await,
    }
}
