//! Core data types for `starbench`.
//!
//! - `Run` - One execution attempt of the benchmarked command
//! - `RunStats` - Durations of finished runs and the statistics derived from them

mod stats;

pub use stats::{RunStats, StatsSummary};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identifies a run within its estimator. Assigned in launch order.
pub type RunId = u64;

/// Identifies a worker slot (`0..num_parallel_runs`). Constant across relaunches.
pub type WorkerId = usize;

/// OS-level process identifier.
pub type ProcessId = u32;

/// Process exit status.
pub type ReturnCode = i32;

/// Return code recorded for an attempt whose process could not be started.
pub const SPAWN_FAILURE_RETURN_CODE: ReturnCode = -1;

/// One execution attempt of the benchmarked command.
///
/// A run is created when its worker decides to launch, then completed exactly
/// once when its process exits (or fails to start). It is never mutated again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub worker_id: WorkerId,
    /// Set once the process has started; `None` if it never did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<ProcessId>,
    pub start_time: DateTime<Utc>,
    /// `None` while the attempt is in flight.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Meaningful only once the run has finished.
    pub return_code: ReturnCode,
}

impl Run {
    /// Create an in-flight run starting now.
    #[must_use]
    pub fn new(id: RunId, worker_id: WorkerId) -> Self {
        Self {
            id,
            worker_id,
            process_id: None,
            start_time: Utc::now(),
            end_time: None,
            return_code: 0,
        }
    }

    #[must_use]
    pub const fn has_finished(&self) -> bool {
        self.end_time.is_some()
    }

    /// True once finished with a zero exit code.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.has_finished() && self.return_code == 0
    }

    /// Record the outcome of the attempt.
    ///
    /// # Panics
    ///
    /// Panics if the run has already finished: a finished run is immutable.
    pub fn finish(
        &mut self,
        process_id: Option<ProcessId>,
        return_code: ReturnCode,
        end_time: DateTime<Utc>,
    ) {
        assert!(
            !self.has_finished(),
            "run {} of worker {} finished twice",
            self.id,
            self.worker_id
        );
        self.process_id = process_id;
        self.return_code = return_code;
        self.end_time = Some(end_time);
    }

    /// Wall-clock duration of the attempt.
    ///
    /// A clock stepping backwards during the run yields a zero duration.
    ///
    /// # Panics
    ///
    /// Panics if the run has not finished yet. Callers must check
    /// [`Run::has_finished`] first.
    #[must_use]
    pub fn duration(&self) -> Duration {
        let Some(end_time) = self.end_time else {
            panic!("duration of run {} requested before it finished", self.id);
        };
        (end_time - self.start_time).to_std().unwrap_or_default()
    }

    /// Duration in seconds, the unit used by statistics and measurement files.
    ///
    /// # Panics
    ///
    /// Panics if the run has not finished yet.
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        self.duration().as_secs_f64()
    }
}
