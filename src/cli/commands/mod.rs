//! Subcommand implementations.

pub mod cmake;
pub mod completions;
pub mod run;
pub mod show;
pub mod version;

use crate::cli::Cli;
use crate::error::Result;
use crate::format::{format_mean_line, format_summary, save_measurements};
use crate::model::{RunStats, StatsSummary};
use crate::util::progress::should_show_progress;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Global flags every subcommand needs.
#[derive(Debug, Clone, Default)]
pub struct CommandContext {
    pub json: bool,
    pub quiet: bool,
    pub config: Option<PathBuf>,
}

impl CommandContext {
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            json: cli.json,
            quiet: cli.quiet,
            config: cli.config.clone(),
        }
    }

    /// Spinners only for humans watching a terminal.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        !self.json && !self.quiet && should_show_progress()
    }
}

#[derive(Serialize)]
struct BenchReport<'a> {
    command: &'a [String],
    num_parallel_runs: usize,
    #[serde(flatten)]
    summary: StatsSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    measurements: Option<&'a Path>,
}

/// Save the measurements if requested, then print the result.
pub(crate) fn report_stats(
    ctx: &CommandContext,
    command: &[String],
    num_parallel_runs: usize,
    stats: &RunStats,
    measurements: Option<&Path>,
) -> Result<()> {
    if let Some(path) = measurements {
        save_measurements(path, stats)?;
        info!(path = %path.display(), "Wrote measurements");
    }

    let summary = stats.summary();
    if ctx.json {
        let report = BenchReport {
            command,
            num_parallel_runs,
            summary,
            measurements,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", format_mean_line(&summary));
        if !ctx.quiet && summary.num_runs > 1 {
            println!("{}", format_summary(&summary));
        }
    }
    Ok(())
}
