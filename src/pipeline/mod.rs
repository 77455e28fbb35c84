//! Benchmarking a CMake project.
//!
//! Each worker gets its own build directory so that parallel benchmark runs
//! never write to the same files. The project is configured and built once per
//! worker, then the benchmark command runs in every build directory.

use crate::error::{Result, ResultExt};
use crate::estimator::{CommandPerfEstimator, DEFAULT_MAX_ERROR, EstimatorConfig, StopPolicy};
use crate::model::RunStats;
use crate::source::FileTreeProvider;
use crate::util::WORKER_ID_TAG;
use std::env;
use std::path::{Path, PathBuf};
use tracing::info;

/// One step of the pipeline; names the per-worker output files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    CreateDir,
    Configure,
    Build,
    Bench,
}

impl Phase {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CreateDir => "createdir",
            Self::Configure => "configure",
            Self::Build => "build",
            Self::Bench => "bench",
        }
    }
}

/// Configure, build and benchmark a CMake project on `num_cores` workers.
#[derive(Debug, Clone)]
pub struct CmakeBench {
    pub tmp_dir: PathBuf,
    pub num_cores: usize,
    pub benchmark_command: Vec<String>,
    pub cmake_options: Vec<String>,
    pub cmake_exe: PathBuf,
    pub stop: StopPolicy,
    pub max_error: f64,
}

impl CmakeBench {
    #[must_use]
    pub fn new(tmp_dir: impl Into<PathBuf>, num_cores: usize, benchmark_command: Vec<String>) -> Self {
        Self {
            tmp_dir: tmp_dir.into(),
            num_cores,
            benchmark_command,
            cmake_options: Vec::new(),
            cmake_exe: PathBuf::from("cmake"),
            stop: StopPolicy::Single,
            max_error: DEFAULT_MAX_ERROR,
        }
    }

    /// `<tmp_dir>/worker<worker_id>`
    #[must_use]
    pub fn worker_dir(&self) -> PathBuf {
        self.tmp_dir.join(format!("worker{WORKER_ID_TAG}"))
    }

    /// `<tmp_dir>/worker<worker_id>/build`
    #[must_use]
    pub fn build_dir(&self) -> PathBuf {
        self.worker_dir().join("build")
    }

    /// Run every phase and return the statistics of the benchmark phase.
    ///
    /// Relative paths are resolved against the current directory first: the
    /// phases run inside the build directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the source tree is unavailable or if any phase has
    /// a failing run.
    pub fn run(&self, source: &dyn FileTreeProvider) -> Result<RunStats> {
        let src_dir = absolute_path(&source.source_tree_path()?)?;
        let cmake_exe = if self.cmake_exe.components().count() > 1 {
            absolute_path(&self.cmake_exe)?
        } else {
            self.cmake_exe.clone()
        };
        let resolved = Self {
            tmp_dir: absolute_path(&self.tmp_dir)?,
            cmake_exe,
            ..self.clone()
        };
        resolved.run_phases(&src_dir)
    }

    fn run_phases(&self, src_dir: &Path) -> Result<RunStats> {
        let worker_dir = self.worker_dir();
        let build_dir = self.build_dir();

        info!(dir = %worker_dir.display(), "Creating build directories");
        let mkdir = vec![
            "mkdir".to_string(),
            "-p".to_string(),
            build_dir.to_string_lossy().into_owned(),
        ];
        self.phase(Phase::CreateDir, mkdir, &env::temp_dir(), StopPolicy::Single)?;

        info!(src_dir = %src_dir.display(), build_dir = %build_dir.display(), "Configuring");
        let mut configure = vec![self.cmake_exe.to_string_lossy().into_owned()];
        configure.extend(self.cmake_options.iter().cloned());
        configure.push(src_dir.to_string_lossy().into_owned());
        self.phase(Phase::Configure, configure, &build_dir, StopPolicy::Single)?;

        info!(build_dir = %build_dir.display(), "Building");
        let build = vec![
            self.cmake_exe.to_string_lossy().into_owned(),
            "--build".to_string(),
            ".".to_string(),
        ];
        self.phase(Phase::Build, build, &build_dir, StopPolicy::Single)?;

        info!(build_dir = %build_dir.display(), "Benchmarking");
        let stats = self.phase(
            Phase::Bench,
            self.benchmark_command.clone(),
            &build_dir,
            self.stop,
        )?;
        info!(mean = stats.mean(), num_runs = stats.num_runs(), "Benchmark complete");
        Ok(stats)
    }

    fn phase(
        &self,
        phase: Phase,
        command: Vec<String>,
        cwd: &Path,
        stop: StopPolicy,
    ) -> Result<RunStats> {
        let worker_dir = self.worker_dir();
        let config = EstimatorConfig::new(command)
            .cwd(cwd)
            .stdout(worker_dir.join(format!("{}_stdout.txt", phase.as_str())))
            .stderr(worker_dir.join(format!("{}_stderr.txt", phase.as_str())))
            .parallelism(1, self.num_cores, self.num_cores);
        CommandPerfEstimator::new(config, stop.build(self.max_error))?.run()
    }
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Failed to resolve {}", path.display()))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::StarbenchError;
    use crate::source::ExistingDir;
    use std::fs;
    use tempfile::TempDir;

    /// A stand-in for cmake: records its arguments in the working directory.
    fn fake_cmake(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-cmake");
        fs::write(&path, "#!/bin/sh\necho \"$@\" >> cmake_calls.txt\n").expect("write");
        let mut perms = fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod");
        path
    }

    #[test]
    fn templates_use_worker_tag() {
        let bench = CmakeBench::new("/tmp/bench", 2, vec!["true".to_string()]);
        assert_eq!(bench.worker_dir(), PathBuf::from("/tmp/bench/worker<worker_id>"));
        assert_eq!(
            bench.build_dir(),
            PathBuf::from("/tmp/bench/worker<worker_id>/build")
        );
    }

    #[test]
    fn runs_every_phase_in_each_worker_dir() {
        let tmp = TempDir::new().expect("tmp");
        let src = TempDir::new().expect("src");
        let mut bench = CmakeBench::new(tmp.path(), 2, vec!["sh".into(), "-c".into(), "pwd".into()]);
        bench.cmake_exe = fake_cmake(tmp.path());
        bench.cmake_options = vec!["-DCMAKE_BUILD_TYPE=Release".to_string()];

        let stats = bench.run(&ExistingDir::new(src.path())).expect("pipeline");
        assert_eq!(stats.num_runs(), 2);

        for worker in ["worker000", "worker001"] {
            let worker_dir = tmp.path().join(worker);
            let calls = fs::read_to_string(worker_dir.join("build/cmake_calls.txt")).expect("calls");
            let calls: Vec<&str> = calls.lines().collect();
            assert_eq!(
                calls,
                vec![
                    format!("-DCMAKE_BUILD_TYPE=Release {}", src.path().display()),
                    "--build .".to_string(),
                ]
            );
            for phase in ["createdir", "configure", "build", "bench"] {
                assert!(worker_dir.join(format!("{phase}_stdout.txt")).is_file());
                assert!(worker_dir.join(format!("{phase}_stderr.txt")).is_file());
            }
            let pwd = fs::read_to_string(worker_dir.join("bench_stdout.txt")).expect("bench out");
            assert!(pwd.trim().ends_with(&format!("{worker}/build")));
        }
    }

    /// A stand-in for cmake that fails unless the source it configures exists.
    fn checking_cmake(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("checking-cmake");
        fs::write(
            &path,
            "#!/bin/sh\nif [ \"$1\" != \"--build\" ]; then\n  for last; do :; done\n  test -d \"$last\" || exit 9\nfi\n",
        )
        .expect("write");
        let mut perms = fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod");
        path
    }

    #[test]
    fn relative_paths_resolve_against_current_dir() {
        let here = env::current_dir().expect("cwd");
        let root = TempDir::new_in(&here).expect("tmp");
        fs::create_dir(root.path().join("src")).expect("src dir");
        let relative = root.path().strip_prefix(&here).expect("inside cwd");

        let mut bench = CmakeBench::new(relative.join("out"), 1, vec!["true".to_string()]);
        bench.cmake_exe = checking_cmake(root.path());

        let stats = bench
            .run(&ExistingDir::new(relative.join("src")))
            .expect("pipeline");
        assert_eq!(stats.num_runs(), 1);
        assert!(root.path().join("out/worker000/build").is_dir());
        assert!(root.path().join("out/worker000/configure_stdout.txt").is_file());
    }

    #[test]
    fn failing_benchmark_is_reported() {
        let tmp = TempDir::new().expect("tmp");
        let src = TempDir::new().expect("src");
        let mut bench = CmakeBench::new(tmp.path(), 1, vec!["false".to_string()]);
        bench.cmake_exe = fake_cmake(tmp.path());

        let err = bench.run(&ExistingDir::new(src.path())).unwrap_err();
        assert!(matches!(err, StarbenchError::RunFailed { .. }));
    }

    #[test]
    fn missing_source_stops_before_any_phase() {
        let tmp = TempDir::new().expect("tmp");
        let bench = CmakeBench::new(tmp.path(), 1, vec!["true".to_string()]);
        let source = ExistingDir::new(tmp.path().join("missing"));
        assert!(bench.run(&source).is_err());
        assert!(!tmp.path().join("worker000").exists());
    }
}
