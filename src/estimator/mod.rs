//! Parallel benchmarking of an external command.
//!
//! [`CommandPerfEstimator`] runs a command template on `num_parallel_runs`
//! worker slots at once. Each slot runs attempts one after another until the
//! [`StopCondition`] (or a failure with `stop_on_error`) retires it; the
//! durations of all finished attempts are reduced into [`RunStats`].
//!
//! Every attempt runs on its own launcher thread and reports one completion
//! over a channel. [`CommandPerfEstimator::run`] is the single consumer of
//! that channel: it records completions, decides relaunches and returns once
//! no attempt is left in flight.

mod launch;
mod stop;

pub use launch::THREAD_LIMIT_VARS;
pub use stop::{
    DEFAULT_MAX_ERROR, StopAfterSingleRun, StopCondition, StopPolicy, StopWhenConverged,
};

use crate::error::{Result, StarbenchError};
use crate::model::{Run, RunId, RunStats, WorkerId};
use crate::util::{TagValues, ensure_parent_dir};
use launch::{Completion, LaunchSpec};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// What to run, where, and how wide.
///
/// Every path and every command argument may contain the `<worker_id>` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimatorConfig {
    pub command: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub stdout: Option<PathBuf>,
    pub stderr: Option<PathBuf>,
    /// Cores available to a single run (exported as `OMP_NUM_THREADS` and friends).
    pub cores_per_run: usize,
    pub num_parallel_runs: usize,
    pub max_num_cores: usize,
    /// Retire a worker as soon as one of its runs exits non-zero.
    pub stop_on_error: bool,
}

impl EstimatorConfig {
    /// A single-slot, single-core configuration for `command`.
    #[must_use]
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            cwd: None,
            stdout: None,
            stderr: None,
            cores_per_run: 1,
            num_parallel_runs: 1,
            max_num_cores: 1,
            stop_on_error: true,
        }
    }

    #[must_use]
    pub fn cwd(mut self, template: impl Into<PathBuf>) -> Self {
        self.cwd = Some(template.into());
        self
    }

    #[must_use]
    pub fn stdout(mut self, template: impl Into<PathBuf>) -> Self {
        self.stdout = Some(template.into());
        self
    }

    #[must_use]
    pub fn stderr(mut self, template: impl Into<PathBuf>) -> Self {
        self.stderr = Some(template.into());
        self
    }

    #[must_use]
    pub const fn parallelism(
        mut self,
        cores_per_run: usize,
        num_parallel_runs: usize,
        max_num_cores: usize,
    ) -> Self {
        self.cores_per_run = cores_per_run;
        self.num_parallel_runs = num_parallel_runs;
        self.max_num_cores = max_num_cores;
        self
    }

    #[must_use]
    pub const fn stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    /// Check the configuration before anything is spawned.
    ///
    /// # Errors
    ///
    /// Returns `StarbenchError::Config` for an empty command or a zero count,
    /// and `StarbenchError::InvalidParallelism` when
    /// `cores_per_run * num_parallel_runs > max_num_cores`.
    pub fn validate(&self) -> Result<()> {
        if self.command.first().is_none_or(String::is_empty) {
            return Err(StarbenchError::config("the command to benchmark is empty"));
        }
        if self.num_parallel_runs == 0 {
            return Err(StarbenchError::config(
                "at least one parallel run is required",
            ));
        }
        if self.cores_per_run == 0 {
            return Err(StarbenchError::config("at least one core per run is required"));
        }

        let fits = self
            .cores_per_run
            .checked_mul(self.num_parallel_runs)
            .is_some_and(|cores| cores <= self.max_num_cores);
        if !fits {
            return Err(StarbenchError::InvalidParallelism {
                cores_per_run: self.cores_per_run,
                num_parallel_runs: self.num_parallel_runs,
                max_num_cores: self.max_num_cores,
            });
        }
        Ok(())
    }
}

/// Every attempt launched so far, keyed by run id.
#[derive(Debug, Default)]
struct RunTable {
    runs: BTreeMap<RunId, Run>,
    next_run_id: RunId,
}

impl RunTable {
    fn allocate(&mut self, worker_id: WorkerId) -> RunId {
        let id = self.next_run_id;
        self.next_run_id += 1;
        self.runs.insert(id, Run::new(id, worker_id));
        id
    }

    fn complete(&mut self, completion: &Completion) {
        match self.runs.get_mut(&completion.run_id) {
            Some(run) => run.finish(
                completion.process_id,
                completion.return_code,
                completion.end_time,
            ),
            None => warn!(run_id = completion.run_id, "Completion for an unknown run"),
        }
    }

    fn stats(&self) -> Result<RunStats> {
        RunStats::from_runs(self.runs.values())
    }

    /// `RunFailed` if any finished run exited non-zero.
    fn check_success(&self) -> Result<()> {
        let failed: Vec<&Run> = self
            .runs
            .values()
            .filter(|run| run.has_finished() && run.return_code != 0)
            .collect();
        if failed.is_empty() {
            return Ok(());
        }

        let mut failed_workers: Vec<WorkerId> = failed.iter().map(|run| run.worker_id).collect();
        failed_workers.sort_unstable();
        failed_workers.dedup();
        Err(StarbenchError::RunFailed {
            failed_workers,
            failed_runs: failed.len(),
            total_runs: self.runs.len(),
        })
    }
}

/// Runs a command in parallel until the stop condition is met and reports
/// duration statistics.
#[derive(Debug)]
pub struct CommandPerfEstimator {
    config: EstimatorConfig,
    stop_condition: Box<dyn StopCondition>,
    table: Mutex<RunTable>,
}

impl CommandPerfEstimator {
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid; see
    /// [`EstimatorConfig::validate`]. Nothing is spawned in that case.
    pub fn new(config: EstimatorConfig, stop_condition: Box<dyn StopCondition>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stop_condition,
            table: Mutex::new(RunTable::default()),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Run the benchmark and block until every worker has retired.
    ///
    /// Calling `run` again on the same estimator launches a new round of
    /// attempts; their runs are added to the same table.
    ///
    /// # Errors
    ///
    /// Returns `StarbenchError::RunFailed` if any attempt, on any worker,
    /// exited non-zero or failed to start.
    pub fn run(&self) -> Result<RunStats> {
        info!(
            command = ?self.config.command,
            num_parallel_runs = self.config.num_parallel_runs,
            cores_per_run = self.config.cores_per_run,
            "Starting benchmark"
        );

        let (tx, rx) = mpsc::channel();
        for worker_id in 0..self.config.num_parallel_runs {
            self.start_run(worker_id, &tx);
        }

        let mut in_flight = self.config.num_parallel_runs;
        for completion in &rx {
            in_flight -= 1;
            if self.on_exit(&completion) {
                self.start_run(completion.worker_id, &tx);
                in_flight += 1;
            }
            if in_flight == 0 {
                break;
            }
        }

        let stats = {
            let table = self.table();
            table.check_success()?;
            table.stats()?
        };
        info!(
            num_runs = stats.num_runs(),
            mean = stats.mean(),
            "Benchmark finished"
        );
        Ok(stats)
    }

    /// Snapshot of every run launched so far, in launch order.
    #[must_use]
    pub fn runs(&self) -> Vec<Run> {
        self.table().runs.values().cloned().collect()
    }

    /// Statistics over the runs finished so far.
    ///
    /// # Errors
    ///
    /// Returns `StarbenchError::EmptySample` if no run has finished.
    pub fn runs_stats(&self) -> Result<RunStats> {
        self.table().stats()
    }

    fn table(&self) -> MutexGuard<'_, RunTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_run(&self, worker_id: WorkerId, tx: &Sender<Completion>) {
        let tags = TagValues::for_worker(worker_id);
        let resolve =
            |template: &Option<PathBuf>| template.as_deref().map(|path| tags.apply_path(path));
        let command = tags.apply_all(&self.config.command);
        let cwd = resolve(&self.config.cwd);
        let stdout = resolve(&self.config.stdout);
        let stderr = resolve(&self.config.stderr);

        for path in stdout.iter().chain(stderr.iter()) {
            if let Err(err) = ensure_parent_dir(path) {
                warn!(worker_id, path = %path.display(), error = %err, "Failed to create output directory");
            }
        }

        let run_id = self.table().allocate(worker_id);
        debug!(run_id, worker_id, ?command, ?cwd, "Launching run");

        launch::launch(
            LaunchSpec {
                run_id,
                worker_id,
                command,
                cwd,
                stdout,
                stderr,
                cores_per_run: self.config.cores_per_run,
            },
            tx.clone(),
        );
    }

    /// Record a completion and decide whether its worker relaunches.
    fn on_exit(&self, completion: &Completion) -> bool {
        let Completion {
            run_id,
            worker_id,
            return_code,
            ..
        } = *completion;

        let stats = {
            let mut table = self.table();
            table.complete(completion);

            if completion.spawn_failed() {
                warn!(run_id, worker_id, "Run could not be started; retiring worker");
                return false;
            }
            if self.config.stop_on_error && return_code != 0 {
                debug!(run_id, worker_id, return_code, "Run failed; retiring worker");
                return false;
            }
            table.stats()
        };

        debug!(run_id, worker_id, return_code, "Run finished");
        match stats {
            Ok(stats) => !self.stop_condition.should_stop(&stats),
            Err(err) => {
                warn!(run_id, error = %err, "No statistics after a finished run");
                false
            }
        }
    }
}
