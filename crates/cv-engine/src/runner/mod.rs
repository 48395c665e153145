//! Host runner and fleet driver
//!
//! The [`HostRunner`] applies the task list to one host over one session,
//! threading a [`cv_core::ChangeSet`] through the tasks and stopping at the
//! first failure. The [`FleetDriver`] runs hosts through a bounded pool and
//! collects their reports in host-list order.

mod fleet;
mod host;

pub use fleet::{FleetDriver, DEFAULT_CONCURRENCY};
pub use host::HostRunner;
