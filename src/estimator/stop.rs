//! Stop conditions: decide whether a worker launches another run.

use crate::error::{Result, StarbenchError};
use crate::model::RunStats;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Default convergence threshold, in seconds.
pub const DEFAULT_MAX_ERROR: f64 = 0.01;

/// Decides, after each finished run, whether its worker should stop.
///
/// `should_stop` is called once per finished run with the statistics of every
/// run finished so far. Calls may come from different workers, possibly
/// concurrently, so implementations keep any state behind their own
/// synchronization and never assume an order between workers.
pub trait StopCondition: Send + Sync + fmt::Debug {
    /// Return `true` to retire the worker whose run just finished.
    fn should_stop(&self, stats: &RunStats) -> bool;
}

/// Every worker runs the command exactly once.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopAfterSingleRun;

impl StopCondition for StopAfterSingleRun {
    fn should_stop(&self, _stats: &RunStats) -> bool {
        true
    }
}

/// Stops once a finished run barely moves the mean duration.
///
/// The last observed mean is shared by all workers: every finished run, on any
/// worker, both reads and updates it.
#[derive(Debug)]
pub struct StopWhenConverged {
    max_error: f64,
    last_mean: Mutex<Option<f64>>,
}

impl StopWhenConverged {
    /// `max_error` is the largest change of the mean (in seconds) still
    /// considered converged.
    #[must_use]
    pub const fn new(max_error: f64) -> Self {
        Self {
            max_error,
            last_mean: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn max_error(&self) -> f64 {
        self.max_error
    }
}

impl Default for StopWhenConverged {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ERROR)
    }
}

impl StopCondition for StopWhenConverged {
    fn should_stop(&self, stats: &RunStats) -> bool {
        let mean = stats.mean();
        let mut last_mean = self
            .last_mean
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let converged = last_mean.is_some_and(|last| {
            let diff = (mean - last).abs();
            debug!(mean, diff, max_error = self.max_error, "Convergence check");
            diff < self.max_error
        });
        *last_mean = Some(mean);
        converged
    }
}

/// The built-in stop conditions, selectable by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// [`StopAfterSingleRun`]
    #[default]
    Single,
    /// [`StopWhenConverged`]
    Converged,
}

impl StopPolicy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Converged => "converged",
        }
    }

    /// Instantiate the policy; `max_error` only matters for `Converged`.
    #[must_use]
    pub fn build(self, max_error: f64) -> Box<dyn StopCondition> {
        match self {
            Self::Single => Box::new(StopAfterSingleRun),
            Self::Converged => Box::new(StopWhenConverged::new(max_error)),
        }
    }
}

impl fmt::Display for StopPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StopPolicy {
    type Err = StarbenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "single" | "single-run" | "once" => Ok(Self::Single),
            "converged" | "convergence" => Ok(Self::Converged),
            other => Err(StarbenchError::config(format!(
                "unknown stop condition '{other}' (expected single or converged)"
            ))),
        }
    }
}
