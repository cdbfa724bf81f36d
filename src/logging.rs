//! Process-wide tracing subscriber.
//!
//! Normal runs append to the configured log file; `--debug` writes to
//! stdout at DEBUG level instead. `RUST_LOG` overrides either filter.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::errors::{Result, StorDbError};

/// Install the global subscriber. Call once, before any command runs.
pub fn init(debug: bool, log_file: &Path) -> Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let installed = if debug {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stdout)
            .try_init()
    } else {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .map_err(|e| {
                StorDbError::Config(format!("cannot open log file {}: {e}", log_file.display()))
            })?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
    };

    installed.map_err(|e| StorDbError::Config(format!("logging already initialised: {e}")))
}
