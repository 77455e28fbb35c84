//! Parallel scheduling of the command estimator against real processes.

#![cfg(unix)]

mod common;

use common::test_log;
use starbench::StarbenchError;
use starbench::estimator::{
    CommandPerfEstimator, EstimatorConfig, StopAfterSingleRun, StopCondition, StopWhenConverged,
};
use starbench::model::RunStats;
use std::collections::BTreeSet;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

fn single() -> Box<dyn StopCondition> {
    Box::new(StopAfterSingleRun)
}

#[test]
fn single_run_per_worker() {
    let _log = test_log("single_run_per_worker");
    let config = EstimatorConfig::new(["true"]).parallelism(1, 4, 4);
    let estimator = CommandPerfEstimator::new(config, single()).expect("valid config");

    let stats = estimator.run().expect("all runs succeed");
    assert_eq!(stats.num_runs(), 4);

    let runs = estimator.runs();
    assert_eq!(runs.len(), 4);
    let workers: BTreeSet<usize> = runs.iter().map(|run| run.worker_id).collect();
    assert_eq!(workers, (0..4).collect());
    assert!(runs.iter().all(|run| run.succeeded() && run.process_id.is_some()));
}

#[test]
fn run_blocks_until_slow_runs_finish() {
    let _log = test_log("run_blocks_until_slow_runs_finish");
    let config = EstimatorConfig::new(["sleep", "0.2"]).parallelism(1, 3, 3);
    let estimator = CommandPerfEstimator::new(config, single()).expect("valid config");

    let stats = estimator.run().expect("sleep succeeds");
    assert_eq!(stats.num_runs(), 3);
    assert!(estimator.runs().iter().all(|run| run.has_finished()));
    assert!(stats.mean() >= 0.15, "mean was {}", stats.mean());
}

#[test]
fn failing_runs_retire_their_workers() {
    let _log = test_log("failing_runs_retire_their_workers");
    // Never stops on its own: only the failures end the benchmark.
    let forever: Box<dyn StopCondition> = Box::new(StopWhenConverged::new(0.0));
    let config = EstimatorConfig::new(["false"]).parallelism(1, 2, 2);
    let estimator = CommandPerfEstimator::new(config, forever).expect("valid config");

    let err = estimator.run().unwrap_err();
    match err {
        StarbenchError::RunFailed {
            failed_workers,
            failed_runs,
            total_runs,
        } => {
            assert_eq!(failed_workers, vec![0, 1]);
            assert_eq!(failed_runs, 2);
            assert_eq!(total_runs, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(estimator.runs().iter().all(|run| run.return_code == 1));
}

#[test]
fn failing_runs_relaunch_without_stop_on_error() {
    let _log = test_log("failing_runs_relaunch_without_stop_on_error");
    let stop: Box<dyn StopCondition> = Box::new(StopWhenConverged::new(1000.0));
    let config = EstimatorConfig::new(["false"]).stop_on_error(false);
    let estimator = CommandPerfEstimator::new(config, stop).expect("valid config");

    let err = estimator.run().unwrap_err();
    match err {
        StarbenchError::RunFailed {
            failed_workers,
            failed_runs,
            total_runs,
        } => {
            assert_eq!(failed_workers, vec![0]);
            assert_eq!(failed_runs, 2);
            assert_eq!(total_runs, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    let runs = estimator.runs();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|run| run.worker_id == 0 && run.return_code == 1));
}

#[test]
fn oversubscription_is_rejected_before_spawning() {
    let _log = test_log("oversubscription_is_rejected_before_spawning");
    let config = EstimatorConfig::new(["true"]).parallelism(4, 4, 8);
    let err = CommandPerfEstimator::new(config, single()).unwrap_err();
    assert!(matches!(err, StarbenchError::InvalidParallelism { .. }));
}

#[test]
fn converged_stops_after_two_close_runs() {
    let _log = test_log("converged_stops_after_two_close_runs");
    let stop: Box<dyn StopCondition> = Box::new(StopWhenConverged::new(1000.0));
    let config = EstimatorConfig::new(["true"]);
    let estimator = CommandPerfEstimator::new(config, stop).expect("valid config");

    let stats = estimator.run().expect("runs succeed");
    assert_eq!(stats.num_runs(), 2);
    let ids: Vec<u64> = estimator.runs().iter().map(|run| run.id).collect();
    assert_eq!(ids, vec![0, 1]);
}

#[derive(Debug)]
struct StopAfter {
    limit: usize,
    calls: Arc<AtomicUsize>,
}

impl StopCondition for StopAfter {
    fn should_stop(&self, stats: &RunStats) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        stats.num_runs() >= self.limit
    }
}

#[test]
fn custom_stop_condition_sees_every_finished_run() {
    let _log = test_log("custom_stop_condition_sees_every_finished_run");
    let calls = Arc::new(AtomicUsize::new(0));
    let stop = Box::new(StopAfter {
        limit: 5,
        calls: Arc::clone(&calls),
    });
    let config = EstimatorConfig::new(["true"]).parallelism(1, 2, 2);
    let estimator = CommandPerfEstimator::new(config, stop).expect("valid config");

    let stats = estimator.run().expect("runs succeed");
    // Once five runs are done, each worker retires after its next run.
    assert!(stats.num_runs() >= 5 && stats.num_runs() <= 6);
    assert_eq!(calls.load(Ordering::SeqCst), stats.num_runs());
}

#[test]
fn missing_executable_is_a_failed_run() {
    let _log = test_log("missing_executable_is_a_failed_run");
    let config = EstimatorConfig::new(["starbench-no-such-program-xyz"]);
    let estimator = CommandPerfEstimator::new(config, single()).expect("valid config");

    let err = estimator.run().unwrap_err();
    assert!(matches!(err, StarbenchError::RunFailed { .. }));

    let runs = estimator.runs();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].has_finished());
    assert_eq!(runs[0].process_id, None);
    assert_eq!(runs[0].return_code, -1);
}

#[test]
fn worker_tag_is_substituted_in_paths_and_arguments() {
    let _log = test_log("worker_tag_is_substituted_in_paths_and_arguments");
    let temp = TempDir::new().expect("temp dir");
    let stdout = temp.path().join("worker<worker_id>").join("out.txt");
    let config = EstimatorConfig::new(["echo", "hello from <worker_id>"])
        .stdout(stdout)
        .parallelism(1, 2, 2);
    let estimator = CommandPerfEstimator::new(config, single()).expect("valid config");
    estimator.run().expect("echo succeeds");

    for worker in ["000", "001"] {
        let out = fs::read_to_string(temp.path().join(format!("worker{worker}/out.txt")))
            .expect("redirected stdout");
        assert_eq!(out.trim(), format!("hello from {worker}"));
    }
}

#[test]
fn thread_limits_follow_cores_per_run() {
    let _log = test_log("thread_limits_follow_cores_per_run");
    let temp = TempDir::new().expect("temp dir");
    let config = EstimatorConfig::new([
        "sh",
        "-c",
        "echo $OMP_NUM_THREADS $MKL_NUM_THREADS $OPENBLAS_NUM_THREADS",
    ])
    .stdout(temp.path().join("env.txt"))
    .parallelism(3, 1, 4);
    let estimator = CommandPerfEstimator::new(config, single()).expect("valid config");
    estimator.run().expect("sh succeeds");

    let out = fs::read_to_string(temp.path().join("env.txt")).expect("env output");
    assert_eq!(out.trim(), "3 3 3");
}

#[test]
fn stats_before_any_run_are_empty() {
    let _log = test_log("stats_before_any_run_are_empty");
    let estimator =
        CommandPerfEstimator::new(EstimatorConfig::new(["true"]), single()).expect("valid");
    assert!(matches!(
        estimator.runs_stats().unwrap_err(),
        StarbenchError::EmptySample
    ));
    assert!(estimator.runs().is_empty());
}
