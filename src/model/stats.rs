//! Reduction of finished runs into summary statistics.

use super::{Run, RunId};
use crate::error::{Result, StarbenchError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Measured durations (in seconds) of finished runs, keyed by run id.
///
/// Never empty: the constructors refuse an empty sample.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStats {
    durations: BTreeMap<RunId, f64>,
}

/// Serializable snapshot of a [`RunStats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub num_runs: usize,
    pub mean: f64,
    pub median: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stddev: Option<f64>,
    pub min: f64,
    pub max: f64,
}

impl RunStats {
    /// Collect the durations of the finished runs, ignoring in-flight ones.
    ///
    /// # Errors
    ///
    /// Returns `StarbenchError::EmptySample` if no run has finished.
    pub fn from_runs<'a, I>(runs: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Run>,
    {
        Self::from_durations(
            runs.into_iter()
                .filter(|run| run.has_finished())
                .map(|run| (run.id, run.duration_secs())),
        )
    }

    /// Build from `(run id, seconds)` pairs.
    ///
    /// # Errors
    ///
    /// Returns `StarbenchError::EmptySample` if the iterator is empty.
    pub fn from_durations<I>(durations: I) -> Result<Self>
    where
        I: IntoIterator<Item = (RunId, f64)>,
    {
        let durations: BTreeMap<RunId, f64> = durations.into_iter().collect();
        if durations.is_empty() {
            return Err(StarbenchError::EmptySample);
        }
        Ok(Self { durations })
    }

    #[must_use]
    pub fn num_runs(&self) -> usize {
        self.durations.len()
    }

    #[must_use]
    pub const fn durations(&self) -> &BTreeMap<RunId, f64> {
        &self.durations
    }

    /// Arithmetic mean of the durations.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.durations.values().sum::<f64>() / self.num_runs() as f64
    }

    /// Median; the mean of the two middle values for an even count.
    #[must_use]
    pub fn median(&self) -> f64 {
        let sorted = self.sorted();
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }

    /// Sample standard deviation, `None` with fewer than two runs.
    #[must_use]
    pub fn stddev(&self) -> Option<f64> {
        let n = self.num_runs();
        if n < 2 {
            return None;
        }
        let mean = self.mean();
        let sum_sq: f64 = self
            .durations
            .values()
            .map(|duration| (duration - mean).powi(2))
            .sum();
        Some((sum_sq / (n - 1) as f64).sqrt())
    }

    /// `(min, max)` of the durations.
    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        self.durations
            .values()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &d| {
                (min.min(d), max.max(d))
            })
    }

    #[must_use]
    pub fn summary(&self) -> StatsSummary {
        let (min, max) = self.range();
        StatsSummary {
            num_runs: self.num_runs(),
            mean: self.mean(),
            median: self.median(),
            stddev: self.stddev(),
            min,
            max,
        }
    }

    fn sorted(&self) -> Vec<f64> {
        let mut values: Vec<f64> = self.durations.values().copied().collect();
        values.sort_by(f64::total_cmp);
        values
    }
}
