//! Error types and handling for `starbench`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Spawn failures of benchmarked commands are *not* errors: they are
//!   recorded as failed runs so a single failure path reports them
//! - Provides recovery hints for user-facing errors
//! - Provides structured JSON output for scripts driving the CLI

mod context;
mod structured;

pub use context::{OptionExt, ResultExt};
pub use structured::{ErrorCode, StructuredError};

use crate::model::WorkerId;
use std::path::PathBuf;
use thiserror::Error;

/// Primary error type for `starbench` operations.
#[derive(Error, Debug)]
pub enum StarbenchError {
    // === Estimator Errors ===
    /// The requested parallelism does not fit in the core budget.
    #[error(
        "Invalid parallelism: {cores_per_run} core(s) per run x {num_parallel_runs} parallel run(s) exceeds the maximum of {max_num_cores} core(s)"
    )]
    InvalidParallelism {
        cores_per_run: usize,
        num_parallel_runs: usize,
        max_num_cores: usize,
    },

    /// At least one run of the benchmarked command exited with a non-zero code.
    #[error("{failed_runs} of {total_runs} run(s) failed (failed workers: {failed_workers:?})")]
    RunFailed {
        failed_workers: Vec<WorkerId>,
        failed_runs: usize,
        total_runs: usize,
    },

    /// Statistics were requested before any run finished.
    #[error("No finished run to compute statistics from")]
    EmptySample,

    // === Source Errors ===
    /// No provider is registered under the requested discriminator.
    #[error("Unknown {kind} provider: {id}")]
    UnknownProvider { kind: &'static str, id: String },

    /// A provider parameter is missing or has the wrong type.
    #[error("Provider '{provider}' requires parameter '{parameter}'")]
    MissingParameter { provider: String, parameter: String },

    /// The password file does not contain exactly one line.
    #[error("{path} is expected to contain exactly one line, but it contains {num_lines} line(s)")]
    SecretFile { path: PathBuf, num_lines: usize },

    /// A helper command (git, cmake...) exited unsuccessfully.
    #[error("Command failed ({status}): {command}")]
    CommandFailed { command: String, status: String },

    // === Measurements Errors ===
    /// Failed to parse a line of a measurements file.
    #[error("Measurements parse error at line {line}: {reason}")]
    MeasurementsParse { line: usize, reason: String },

    // === Configuration Errors ===
    /// Configuration file or value error.
    #[error("Configuration error: {0}")]
    Config(String),

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Error with additional context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StarbenchError {
    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidParallelism { .. } => {
                Some("Lower --num-parallel-runs or --cores-per-run, or raise --max-cores")
            }
            Self::RunFailed { .. } => {
                Some("Inspect the per-worker stdout/stderr files of the failed workers")
            }
            Self::UnknownProvider { .. } => {
                Some("Known providers: existing-dir, git-cloner, password-file")
            }
            Self::SecretFile { .. } => Some("Store the password alone on a single line"),
            _ => None,
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a missing-parameter error for a provider.
    #[must_use]
    pub fn missing_parameter(provider: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::MissingParameter {
            provider: provider.into(),
            parameter: parameter.into(),
        }
    }
}

/// Result type using `StarbenchError`.
pub type Result<T> = std::result::Result<T, StarbenchError>;
