//! Tracing setup for the `starbench` binary and for tests.
//!
//! `RUST_LOG` always wins. Otherwise the level follows the command line:
//! `-q` shows errors only, no flag shows warnings, `-v` info, `-vv` debug and
//! `-vvv` trace. Human-readable logs go to stderr; `--log-file` adds a
//! JSON-lines copy.

use crate::error::{Result, ResultExt, StarbenchError};
use crate::util::ensure_parent_dir;
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Level used when `RUST_LOG` is not set.
#[must_use]
pub const fn default_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns an error if the log file cannot be created or a global subscriber
/// is already installed.
pub fn init_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level(verbosity, quiet).into())
        .from_env_lossy();

    let file_layer = match log_file {
        Some(path) => {
            ensure_parent_dir(path)
                .with_context(|| format!("Failed to create directory for {}", path.display()))?;
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .json()
                    .with_thread_names(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_thread_names(verbosity >= 2),
        )
        .with(file_layer)
        .try_init()
        .map_err(|e| StarbenchError::config(format!("failed to initialize logging: {e}")))
}

/// Route logs to the test harness output. Safe to call more than once.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_thread_names(true)
        .try_init();
}
