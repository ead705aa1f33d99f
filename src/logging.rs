//! Log output to the console and `<exe_dir>/logs/scorecard_reader.log`.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing_subscriber::fmt::{self, time::ChronoLocal};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::paths;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "scorecard_reader=info";

const TIME_FORMAT: &str = "%H:%M:%S%.3f";

/// Installs the global subscriber. Call once, from the binary.
pub fn init_logging() -> Result<()> {
    paths::ensure_directories().context("Failed to create logs directory")?;

    let log_path = paths::get_log_file();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console = fmt::layer()
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_target(false);
    let logfile = fmt::layer()
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_ansi(false)
        .with_writer(Mutex::new(file));

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(logfile)
        .try_init()
        .context("Logging already initialized")?;

    Ok(())
}
