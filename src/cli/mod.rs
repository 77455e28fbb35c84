//! CLI definitions and entry point.

use crate::error::{Result, StarbenchError};
use crate::estimator::StopPolicy;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod commands;

/// Estimate the duration of a command by running it many times in parallel
#[derive(Parser, Debug)]
#[command(name = "starbench", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Project config file (default: ./starbench.yaml if present)
    #[arg(long, global = true, env = "STARBENCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Also write JSON-lines logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no logs except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Benchmark an arbitrary command
    Run(RunArgs),

    /// Configure, build and benchmark a CMake project
    Cmake(CmakeArgs),

    /// Summarize a measurements file
    Show(ShowArgs),

    /// Show version information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Stop condition selectable from the command line.
#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum StopArg {
    /// Every worker runs the command once
    Single,
    /// Workers keep running until the mean duration stabilizes
    Converged,
}

impl From<StopArg> for StopPolicy {
    fn from(arg: StopArg) -> Self {
        match arg {
            StopArg::Single => Self::Single,
            StopArg::Converged => Self::Converged,
        }
    }
}

/// Arguments for the run command.
///
/// Paths and command arguments may contain `<worker_id>`, replaced by the
/// zero-padded worker number (`000`, `001`, ...).
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Number of parallel runs (default: max cores / cores per run)
    #[arg(short = 'n', long)]
    pub num_parallel_runs: Option<usize>,

    /// Cores used by a single run (exported as OMP_NUM_THREADS)
    #[arg(long)]
    pub cores_per_run: Option<usize>,

    /// Maximum number of cores used by all runs together
    #[arg(long = "max-cores")]
    pub max_cores: Option<usize>,

    /// Working directory of each run
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// File receiving the stdout of each run
    #[arg(long)]
    pub stdout: Option<PathBuf>,

    /// File receiving the stderr of each run
    #[arg(long)]
    pub stderr: Option<PathBuf>,

    /// When a worker stops relaunching the command
    #[arg(long, value_enum)]
    pub stop: Option<StopArg>,

    /// Convergence threshold in seconds (with --stop converged)
    #[arg(long)]
    pub max_error: Option<f64>,

    /// Keep relaunching on a worker whose run failed
    #[arg(long)]
    pub no_stop_on_error: bool,

    /// Write the measured durations to this TSV file
    #[arg(long)]
    pub measurements: Option<PathBuf>,

    /// Command to benchmark
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Arguments for the cmake command.
#[derive(Args, Debug, Clone, Default)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["source_dir", "git_repos_url", "source_config"])
))]
pub struct CmakeArgs {
    /// Use an existing source tree
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Clone the code to benchmark from this URL
    #[arg(long)]
    pub git_repos_url: Option<String>,

    /// YAML description of the source provider
    #[arg(long)]
    pub source_config: Option<PathBuf>,

    /// Branch or commit id to check out
    #[arg(long)]
    pub code_version: Option<String>,

    /// Git user used to clone the repository
    #[arg(long)]
    pub git_user: Option<String>,

    /// File containing the git password (or personal access token)
    #[arg(long, conflicts_with = "git_pass")]
    pub git_pass_file: Option<PathBuf>,

    /// Git password (prefer --git-pass-file)
    #[arg(long)]
    pub git_pass: Option<String>,

    /// Number of cores, hence of parallel builds and runs
    #[arg(long)]
    pub num_cores: Option<usize>,

    /// Directory receiving the sources, builds and output files
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// cmake executable
    #[arg(long)]
    pub cmake_path: Option<PathBuf>,

    /// Option passed to cmake when configuring (repeatable)
    #[arg(long = "cmake-option", allow_hyphen_values = true)]
    pub cmake_options: Vec<String>,

    /// Command to benchmark, run in each build directory
    #[arg(long)]
    pub benchmark_command: String,

    /// When a worker stops relaunching the benchmark
    #[arg(long, value_enum)]
    pub stop: Option<StopArg>,

    /// Convergence threshold in seconds (with --stop converged)
    #[arg(long)]
    pub max_error: Option<f64>,

    /// Write the measured durations to this TSV file
    #[arg(long)]
    pub measurements: Option<PathBuf>,
}

impl CmakeArgs {
    /// Reject git options given without a repository to clone.
    ///
    /// # Errors
    ///
    /// Returns `StarbenchError::Config` naming the first offending option.
    pub fn check_git_options(&self) -> Result<()> {
        if self.git_repos_url.is_some() {
            return Ok(());
        }
        let given = [
            ("--code-version", self.code_version.is_some()),
            ("--git-user", self.git_user.is_some()),
            ("--git-pass-file", self.git_pass_file.is_some()),
            ("--git-pass", self.git_pass.is_some()),
        ];
        match given.iter().find(|(_, present)| *present) {
            Some((flag, _)) => Err(StarbenchError::config(format!(
                "{flag} requires --git-repos-url"
            ))),
            None => Ok(()),
        }
    }
}

/// Arguments for the show command.
#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Measurements file written by `run` or `cmake`
    pub path: PathBuf,
}

/// Arguments for the completions command.
#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: ShellType,

    /// Output file (default: stdout)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

/// Supported shells for completion generation.
#[derive(ValueEnum, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    #[value(alias = "pwsh")]
    /// `PowerShell`
    PowerShell,
    Elvish,
}
