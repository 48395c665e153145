//! Logging setup

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter directive for the verbosity flags; `RUST_LOG` overrides it
pub fn level_for(quiet: bool, verbose: u8) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    }
}

/// Install the global subscriber.
///
/// Console output goes to stderr so that `--json` reports stay clean on
/// stdout. With a log file, a second plain-text layer records events at
/// `info` or the console level, whichever is more verbose.
pub fn init_logging(quiet: bool, verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let level = level_for(quiet, verbose);
    let console_filter =
        EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| level.into()));

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {:?}", path))?;
            let file_level = if verbose >= 2 { level } else { "info" };
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(EnvFilter::new(file_level));
            Some(layer)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_flags() {
        assert_eq!(level_for(false, 0), "warn");
        assert_eq!(level_for(false, 1), "info");
        assert_eq!(level_for(false, 2), "debug");
        assert_eq!(level_for(false, 7), "trace");
        assert_eq!(level_for(true, 3), "error");
    }
}
