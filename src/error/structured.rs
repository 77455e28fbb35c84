//! Structured error output for scripts driving `starbench`.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging

use crate::error::StarbenchError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
/// Format: `SCREAMING_SNAKE_CASE` for easy parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Benchmark Errors (exit code 2) ===
    /// Parallelism exceeds the core budget
    InvalidParallelism,
    /// At least one run exited with a non-zero code
    RunFailed,
    /// No finished run to compute statistics from
    EmptySample,

    // === Source Errors (exit code 3) ===
    /// Unknown provider discriminator
    UnknownProvider,
    /// Missing provider parameter
    MissingParameter,
    /// Malformed password file
    SecretFile,
    /// A helper command failed
    CommandFailed,

    // === Measurements Errors (exit code 4) ===
    /// Measurements file parse error
    MeasurementsParseError,

    // === Config Errors (exit code 7) ===
    /// Configuration error
    ConfigError,

    // === I/O Errors (exit code 8) ===
    /// File I/O error
    IoError,
    /// JSON serialization error
    JsonError,
    /// YAML parsing error
    YamlError,

    // === Internal Errors (exit code 1) ===
    /// Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidParallelism => "INVALID_PARALLELISM",
            Self::RunFailed => "RUN_FAILED",
            Self::EmptySample => "EMPTY_SAMPLE",
            Self::UnknownProvider => "UNKNOWN_PROVIDER",
            Self::MissingParameter => "MISSING_PARAMETER",
            Self::SecretFile => "SECRET_FILE",
            Self::CommandFailed => "COMMAND_FAILED",
            Self::MeasurementsParseError => "MEASUREMENTS_PARSE_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::YamlError => "YAML_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether this error is potentially retryable.
    ///
    /// A failed run may succeed on a second attempt (flaky command, transient
    /// resource shortage); a failed git clone may succeed once the network is back.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RunFailed | Self::CommandFailed)
    }

    /// Get the exit code for this error category.
    ///
    /// - 1: Internal/unknown errors
    /// - 2: Benchmark errors
    /// - 3: Source errors
    /// - 4: Measurements errors
    /// - 7: Config errors
    /// - 8: I/O errors
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidParallelism | Self::RunFailed | Self::EmptySample => 2,
            Self::UnknownProvider
            | Self::MissingParameter
            | Self::SecretFile
            | Self::CommandFailed => 3,
            Self::MeasurementsParseError => 4,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::YamlError => 8,
            Self::InternalError => 1,
        }
    }
}

/// Structured error with everything a caller needs to react.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `StarbenchError`.
    #[must_use]
    pub fn from_error(err: &StarbenchError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);
        let hint = err.suggestion().map(str::to_string);

        Self {
            code,
            message: err.to_string(),
            hint,
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Serialize to JSON value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &StarbenchError) -> (ErrorCode, Option<Value>) {
        match err {
            StarbenchError::InvalidParallelism {
                cores_per_run,
                num_parallel_runs,
                max_num_cores,
            } => (
                ErrorCode::InvalidParallelism,
                Some(json!({
                    "cores_per_run": cores_per_run,
                    "num_parallel_runs": num_parallel_runs,
                    "max_num_cores": max_num_cores,
                })),
            ),
            StarbenchError::RunFailed {
                failed_workers,
                failed_runs,
                total_runs,
            } => (
                ErrorCode::RunFailed,
                Some(json!({
                    "failed_workers": failed_workers,
                    "failed_runs": failed_runs,
                    "total_runs": total_runs,
                })),
            ),
            StarbenchError::EmptySample => (ErrorCode::EmptySample, None),
            StarbenchError::UnknownProvider { kind, id } => (
                ErrorCode::UnknownProvider,
                Some(json!({"kind": kind, "id": id})),
            ),
            StarbenchError::MissingParameter {
                provider,
                parameter,
            } => (
                ErrorCode::MissingParameter,
                Some(json!({"provider": provider, "parameter": parameter})),
            ),
            StarbenchError::SecretFile { path, num_lines } => (
                ErrorCode::SecretFile,
                Some(json!({"path": path.display().to_string(), "num_lines": num_lines})),
            ),
            StarbenchError::CommandFailed { command, status } => (
                ErrorCode::CommandFailed,
                Some(json!({"command": command, "status": status})),
            ),
            StarbenchError::MeasurementsParse { line, .. } => (
                ErrorCode::MeasurementsParseError,
                Some(json!({"line": line})),
            ),
            StarbenchError::Config(_) => (ErrorCode::ConfigError, None),
            StarbenchError::Io(_) => (ErrorCode::IoError, None),
            StarbenchError::Json(_) => (ErrorCode::JsonError, None),
            StarbenchError::Yaml(_) => (ErrorCode::YamlError, None),
            StarbenchError::WithContext { context, source } => {
                let code = if source.is::<std::io::Error>() {
                    ErrorCode::IoError
                } else {
                    ErrorCode::InternalError
                };
                (code, Some(json!({"context": context})))
            }
        }
    }
}
