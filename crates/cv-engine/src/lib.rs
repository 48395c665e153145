//! cv-engine: Reconciliation engine for converge
//!
//! Reconcilers inspect and converge one task at a time over a
//! [`cv_core::traits::RemoteSession`]. The runner layers apply a task list
//! to one host ([`HostRunner`]) or to a fleet ([`FleetDriver`]). The
//! [`memory`] module provides an in-memory host used by tests and dry
//! experiments.

pub mod commands;
pub mod events;
pub mod memory;
pub mod reconcile;
pub mod runner;

pub use events::TracingSink;
pub use reconcile::reconcile;
pub use runner::{FleetDriver, HostRunner, DEFAULT_CONCURRENCY};
