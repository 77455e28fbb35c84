//! `starbench run`: benchmark an arbitrary command.
//!
//! ```bash
//! # four single runs, one per core
//! starbench run -n 4 -- ./solver input.dat
//!
//! # keep going until the mean moves by less than 10 ms
//! starbench run --stop converged --max-error 0.01 \
//!     --cwd '/tmp/bench/worker<worker_id>' -- make -j1 check
//! ```

use super::{CommandContext, report_stats};
use crate::cli::RunArgs;
use crate::config::{BenchSettings, CliOverrides, load_config};
use crate::error::Result;
use crate::estimator::{CommandPerfEstimator, EstimatorConfig};
use crate::util::progress::ProgressTracker;
use tracing::info;

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, if any run fails, or if
/// the measurements file cannot be written.
pub fn execute(args: &RunArgs, ctx: &CommandContext) -> Result<()> {
    let overrides = CliOverrides {
        num_cores: args.max_cores,
        cores_per_run: args.cores_per_run,
        stop: args.stop.map(Into::into),
        max_error: args.max_error,
        stop_on_error: args.no_stop_on_error.then_some(false),
        ..CliOverrides::default()
    };
    let settings = BenchSettings::from_layer(&load_config(ctx.config.as_deref(), &overrides)?)?;
    let config = estimator_config(args, &settings);
    let num_parallel_runs = config.num_parallel_runs;

    let estimator = CommandPerfEstimator::new(config, settings.stop.build(settings.max_error))?;
    info!(
        num_parallel_runs,
        max_num_cores = settings.num_cores,
        stop = %settings.stop,
        "Running benchmark"
    );

    let progress = ProgressTracker::with_visibility(
        &format!("Running {} on {num_parallel_runs} worker(s)", args.command.join(" ")),
        ctx.show_progress(),
    );
    let result = estimator.run();
    progress.finish_and_clear();
    let stats = result?;

    report_stats(
        ctx,
        &args.command,
        num_parallel_runs,
        &stats,
        args.measurements.as_deref(),
    )
}

/// Fill in the estimator configuration; without `-n`, use every core.
fn estimator_config(args: &RunArgs, settings: &BenchSettings) -> EstimatorConfig {
    let num_parallel_runs = args
        .num_parallel_runs
        .unwrap_or_else(|| (settings.num_cores / settings.cores_per_run.max(1)).max(1));

    let mut config = EstimatorConfig::new(args.command.iter().cloned())
        .parallelism(settings.cores_per_run, num_parallel_runs, settings.num_cores)
        .stop_on_error(settings.stop_on_error);
    if let Some(cwd) = &args.cwd {
        config = config.cwd(cwd.clone());
    }
    if let Some(stdout) = &args.stdout {
        config = config.stdout(stdout.clone());
    }
    if let Some(stderr) = &args.stderr {
        config = config.stderr(stderr.clone());
    }
    config
}
