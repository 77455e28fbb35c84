//! `starbench cmake`: benchmark a CMake project.
//!
//! ```bash
//! starbench cmake --git-repos-url https://github.com/hibridon/hibridon \
//!     --code-version a3bed1c3ccfbca572003020d3e3d3b1ff3934fad \
//!     --git-user g-raffy --git-pass-file "$HOME/.github/bench.pat" \
//!     --num-cores 2 --output-dir /tmp/hibench \
//!     --cmake-option=-DCMAKE_BUILD_TYPE=Release --cmake-option=-DBUILD_TESTING=ON \
//!     --benchmark-command 'ctest --output-on-failure -L ^arch4_quick$'
//! ```

use super::{CommandContext, report_stats};
use crate::cli::CmakeArgs;
use crate::config::{BenchSettings, CliOverrides, load_config};
use crate::error::{OptionExt, Result, ResultExt, StarbenchError};
use crate::pipeline::CmakeBench;
use crate::source::{
    ExistingDir, FileTreeProvider, GitCloner, LiteralPassword, PasswordFile, ProviderRegistry,
};
use crate::util::progress::ProgressTracker;
use std::fs;
use std::path::Path;
use tracing::info;

/// Directory, under the output directory, receiving a cloned repository.
const CLONE_DIR: &str = "source.git";

/// Execute the cmake command.
///
/// # Errors
///
/// Returns an error if the source cannot be fetched, if any phase fails, or
/// if the measurements file cannot be written.
pub fn execute(args: &CmakeArgs, ctx: &CommandContext) -> Result<()> {
    let overrides = CliOverrides {
        num_cores: args.num_cores,
        stop: args.stop.map(Into::into),
        max_error: args.max_error,
        cmake_path: args.cmake_path.clone(),
        output_dir: args.output_dir.clone(),
        ..CliOverrides::default()
    };
    let settings = BenchSettings::from_layer(&load_config(ctx.config.as_deref(), &overrides)?)?;
    let output_dir = settings
        .output_dir
        .clone()
        .ok_or_config("an output directory is required (--output-dir)")?;

    let benchmark_command = split_command(&args.benchmark_command)?;
    let source = source_provider(args, &output_dir)?;

    let bench = CmakeBench {
        tmp_dir: output_dir.clone(),
        num_cores: settings.num_cores,
        benchmark_command: benchmark_command.clone(),
        cmake_options: args.cmake_options.clone(),
        cmake_exe: settings.cmake_path.clone(),
        stop: settings.stop,
        max_error: settings.max_error,
    };
    info!(
        output_dir = %output_dir.display(),
        num_cores = bench.num_cores,
        source = ?source,
        "Benchmarking CMake project"
    );

    let progress = ProgressTracker::with_visibility(
        &format!("Configuring, building and benchmarking in {}", output_dir.display()),
        ctx.show_progress(),
    );
    let result = bench.run(source.as_ref());
    progress.finish_and_clear();
    let stats = result?;

    report_stats(
        ctx,
        &benchmark_command,
        bench.num_cores,
        &stats,
        args.measurements.as_deref(),
    )
}

fn split_command(command: &str) -> Result<Vec<String>> {
    let parts: Vec<String> = command.split_whitespace().map(str::to_string).collect();
    if parts.is_empty() {
        return Err(StarbenchError::config("the benchmark command is empty"));
    }
    Ok(parts)
}

/// Build the source provider selected by the flags.
fn source_provider(args: &CmakeArgs, output_dir: &Path) -> Result<Box<dyn FileTreeProvider>> {
    args.check_git_options()?;
    if let Some(dir) = &args.source_dir {
        return Ok(Box::new(ExistingDir::new(dir.clone())));
    }

    if let Some(url) = &args.git_repos_url {
        let mut cloner = GitCloner::new(url.clone(), output_dir.join(CLONE_DIR));
        if let Some(version) = &args.code_version {
            cloner = cloner.code_version(version.clone());
        }
        if let Some(user) = &args.git_user {
            cloner = cloner.git_user(user.clone());
        }
        if let Some(path) = &args.git_pass_file {
            cloner = cloner.password_provider(Box::new(PasswordFile::new(path.clone())));
        } else if let Some(password) = &args.git_pass {
            cloner = cloner.password_provider(Box::new(LiteralPassword::new(password.clone())));
        }
        return Ok(Box::new(cloner));
    }

    let path = args
        .source_config
        .as_deref()
        .ok_or_config("one of --source-dir, --git-repos-url or --source-config is required")?;
    let yaml = fs::read_to_string(path)
        .with_context(|| format!("Failed to read source description {}", path.display()))?;
    ProviderRegistry::with_builtins().tree_provider_from_yaml(&yaml)
}
