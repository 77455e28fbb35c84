use assert_cmd::Command;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tempfile::TempDir;

#[derive(Debug)]
pub struct SbRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
    pub duration: Duration,
    pub log_path: PathBuf,
}

impl SbRun {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(self.stdout.trim()).expect("stdout is JSON")
    }

    /// The structured error printed after any log lines on stderr.
    pub fn error_json(&self) -> serde_json::Value {
        let start = if self.stderr.starts_with('{') {
            0
        } else {
            self.stderr.find("\n{").expect("JSON error on stderr") + 1
        };
        serde_json::from_str(self.stderr[start..].trim()).expect("stderr ends with JSON")
    }
}

/// A scratch directory used as both `HOME` and working directory, so that no
/// user or project config leaks into a test.
pub struct SbWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub log_dir: PathBuf,
}

impl SbWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().to_path_buf();
        let log_dir = root.join("logs");
        fs::create_dir_all(&log_dir).expect("log dir");
        Self {
            temp_dir,
            root,
            log_dir,
        }
    }
}

pub fn run_starbench<I, S>(workspace: &SbWorkspace, args: I, label: &str) -> SbRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_starbench_with_env(
        workspace,
        args,
        std::iter::empty::<(String, String)>(),
        label,
    )
}

pub fn run_starbench_with_env<I, S, E, K, V>(
    workspace: &SbWorkspace,
    args: I,
    env_vars: E,
    label: &str,
) -> SbRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("starbench"));
    cmd.current_dir(&workspace.root);
    cmd.args(args);
    for (name, _) in std::env::vars() {
        if name.starts_with("STARBENCH_") {
            cmd.env_remove(name);
        }
    }
    cmd.envs(env_vars);
    cmd.env("NO_COLOR", "1");
    cmd.env("RUST_LOG", "starbench=debug");
    cmd.env("RUST_BACKTRACE", "1");
    cmd.env("HOME", &workspace.root);

    let start = Instant::now();
    let output = cmd.output().expect("run starbench");
    let duration = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let log_path = workspace.log_dir.join(format!("{label}.log"));
    let log_body = format!(
        "label: {label}\nduration: {:?}\nstatus: {}\nargs: {:?}\ncwd: {}\n\nstdout:\n{}\n\nstderr:\n{}\n",
        duration,
        output.status,
        cmd.get_args().collect::<Vec<_>>(),
        workspace.root.display(),
        stdout,
        stderr
    );
    fs::write(&log_path, log_body).expect("write log");

    SbRun {
        stdout,
        stderr,
        status: output.status,
        duration,
        log_path,
    }
}
