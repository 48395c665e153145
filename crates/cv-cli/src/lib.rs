//! converge CLI
//!
//! Provides the `converge` binary: applies a YAML task list to the hosts of
//! a YAML host list over SSH and reports per-host results.

pub mod commands;
pub mod logging;
pub mod output;
