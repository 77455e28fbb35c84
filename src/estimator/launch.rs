//! Launching one attempt of the benchmarked command on its own thread.
//!
//! Every launched attempt reports exactly one [`Completion`] to the
//! coordinator, including attempts whose process never started.

use crate::model::{ProcessId, ReturnCode, RunId, SPAWN_FAILURE_RETURN_CODE, WorkerId};
use crate::util::format_worker_id;
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::Sender;
use std::thread;
use tracing::{debug, warn};

/// Environment variables capping the thread pools of common numeric libraries.
pub const THREAD_LIMIT_VARS: &[&str] = &["OMP_NUM_THREADS", "MKL_NUM_THREADS", "OPENBLAS_NUM_THREADS"];

/// A fully resolved attempt, ready to spawn.
#[derive(Debug, Clone)]
pub(crate) struct LaunchSpec {
    pub run_id: RunId,
    pub worker_id: WorkerId,
    pub command: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub stdout: Option<PathBuf>,
    pub stderr: Option<PathBuf>,
    pub cores_per_run: usize,
}

/// Outcome of one attempt, sent from its launcher thread to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Completion {
    pub run_id: RunId,
    pub worker_id: WorkerId,
    /// `None` if the process could not be started or waited for.
    pub process_id: Option<ProcessId>,
    pub return_code: ReturnCode,
    pub end_time: DateTime<Utc>,
}

impl Completion {
    pub(crate) const fn spawn_failed(&self) -> bool {
        self.process_id.is_none()
    }
}

/// Sends the completion of one run, at most once.
///
/// Dropped without reporting (launcher thread not created, or panicked), it
/// reports a spawn failure so the coordinator never waits for a lost run.
struct CompletionReporter {
    tx: Sender<Completion>,
    run_id: RunId,
    worker_id: WorkerId,
    sent: bool,
}

impl CompletionReporter {
    const fn new(tx: Sender<Completion>, run_id: RunId, worker_id: WorkerId) -> Self {
        Self {
            tx,
            run_id,
            worker_id,
            sent: false,
        }
    }

    fn report(mut self, process_id: Option<ProcessId>, return_code: ReturnCode) {
        self.send(process_id, return_code);
    }

    fn send(&mut self, process_id: Option<ProcessId>, return_code: ReturnCode) {
        let completion = Completion {
            run_id: self.run_id,
            worker_id: self.worker_id,
            process_id,
            return_code,
            end_time: Utc::now(),
        };
        self.sent = true;
        // The coordinator outlives every launcher; a closed channel means it is gone.
        let _ = self.tx.send(completion);
    }
}

impl Drop for CompletionReporter {
    fn drop(&mut self) {
        if !self.sent {
            self.send(None, SPAWN_FAILURE_RETURN_CODE);
        }
    }
}

/// Run the attempt on a dedicated thread and report its completion on `tx`.
pub(crate) fn launch(spec: LaunchSpec, tx: Sender<Completion>) {
    let reporter = CompletionReporter::new(tx, spec.run_id, spec.worker_id);
    let run_id = spec.run_id;
    let worker_id = spec.worker_id;

    let spawned = thread::Builder::new()
        .name(format!("starbench-worker-{}", format_worker_id(worker_id)))
        .spawn(move || {
            let (process_id, return_code) = execute(&spec);
            reporter.report(process_id, return_code);
        });

    // On failure the closure, and with it the reporter, is dropped: the run
    // is reported as a spawn failure.
    if let Err(err) = spawned {
        warn!(run_id, worker_id, error = %err, "Failed to start launcher thread");
    }
}

/// Spawn the process and wait for it.
fn execute(spec: &LaunchSpec) -> (Option<ProcessId>, ReturnCode) {
    let mut command = match build_command(spec) {
        Ok(command) => command,
        Err(err) => {
            warn!(
                run_id = spec.run_id,
                stdout = ?spec.stdout,
                stderr = ?spec.stderr,
                error = %err,
                "Failed to prepare command"
            );
            return (None, SPAWN_FAILURE_RETURN_CODE);
        }
    };

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!(run_id = spec.run_id, command = ?spec.command, error = %err, "Command failed to start");
            return (None, SPAWN_FAILURE_RETURN_CODE);
        }
    };

    let process_id = child.id();
    debug!(run_id = spec.run_id, worker_id = spec.worker_id, process_id, "Process started");

    wait_outcome(spec.run_id, process_id, child.wait())
}

/// An attempt whose process cannot be waited for has no known outcome: it is
/// reported like one that never started, so its worker retires.
fn wait_outcome(
    run_id: RunId,
    process_id: ProcessId,
    waited: io::Result<ExitStatus>,
) -> (Option<ProcessId>, ReturnCode) {
    match waited {
        Ok(status) => (Some(process_id), exit_code(status)),
        Err(err) => {
            warn!(run_id, process_id, error = %err, "Failed to wait for process");
            (None, SPAWN_FAILURE_RETURN_CODE)
        }
    }
}

fn build_command(spec: &LaunchSpec) -> io::Result<Command> {
    let (program, args) = spec
        .command
        .split_first()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;

    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null());

    if let Some(cwd) = &spec.cwd {
        command.current_dir(cwd);
    }

    let cores = spec.cores_per_run.to_string();
    for var in THREAD_LIMIT_VARS {
        command.env(var, &cores);
    }

    if let Some(path) = &spec.stdout {
        command.stdout(File::create(path)?);
    }
    if let Some(path) = &spec.stderr {
        command.stderr(File::create(path)?);
    }

    Ok(command)
}

/// Exit code of a finished process; `-signal` when killed by a signal.
fn exit_code(status: ExitStatus) -> ReturnCode {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    SPAWN_FAILURE_RETURN_CODE
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn spec(command: &[&str]) -> LaunchSpec {
        LaunchSpec {
            run_id: 5,
            worker_id: 2,
            command: command.iter().map(ToString::to_string).collect(),
            cwd: None,
            stdout: None,
            stderr: None,
            cores_per_run: 3,
        }
    }

    fn launch_and_wait(spec: LaunchSpec) -> Completion {
        let (tx, rx) = mpsc::channel();
        launch(spec, tx);
        rx.recv_timeout(Duration::from_secs(30)).expect("completion")
    }

    #[test]
    fn reports_exit_code_and_pid() {
        let completion = launch_and_wait(spec(&["sh", "-c", "exit 3"]));
        assert_eq!(completion.run_id, 5);
        assert_eq!(completion.worker_id, 2);
        assert_eq!(completion.return_code, 3);
        assert!(completion.process_id.is_some());
        assert!(!completion.spawn_failed());
    }

    #[test]
    fn missing_executable_is_a_spawn_failure() {
        let completion = launch_and_wait(spec(&["/definitely/not/a/starbench/binary"]));
        assert!(completion.spawn_failed());
        assert_eq!(completion.return_code, SPAWN_FAILURE_RETURN_CODE);
    }

    #[test]
    fn unopenable_redirect_is_a_spawn_failure() {
        let temp = TempDir::new().expect("temp dir");
        let mut spec = spec(&["true"]);
        spec.stdout = Some(temp.path().join("missing-dir").join("stdout.txt"));
        let completion = launch_and_wait(spec);
        assert!(completion.spawn_failed());
    }

    #[test]
    fn redirects_output_and_limits_threads() {
        let temp = TempDir::new().expect("temp dir");
        let stdout = temp.path().join("stdout.txt");
        let mut spec = spec(&["sh", "-c", "echo $OMP_NUM_THREADS $MKL_NUM_THREADS; pwd"]);
        spec.stdout = Some(stdout.clone());
        spec.cwd = Some(temp.path().to_path_buf());

        let completion = launch_and_wait(spec);
        assert_eq!(completion.return_code, 0);

        let output = std::fs::read_to_string(&stdout).expect("stdout file");
        let mut lines = output.lines();
        assert_eq!(lines.next(), Some("3 3"));
        let cwd = PathBuf::from(lines.next().expect("pwd line"));
        assert_eq!(
            cwd.canonicalize().unwrap(),
            temp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn wait_failure_is_reported_as_spawn_failure() {
        let (process_id, return_code) =
            wait_outcome(3, 1234, Err(io::Error::other("interrupted wait")));
        assert_eq!(process_id, None);
        assert_eq!(return_code, SPAWN_FAILURE_RETURN_CODE);
    }

    #[test]
    fn successful_wait_keeps_process_id() {
        use std::os::unix::process::ExitStatusExt;
        let (process_id, return_code) = wait_outcome(3, 1234, Ok(ExitStatus::from_raw(2 << 8)));
        assert_eq!(process_id, Some(1234));
        assert_eq!(return_code, 2);
    }

    #[test]
    fn dropped_reporter_reports_spawn_failure() {
        let (tx, rx) = mpsc::channel();
        drop(CompletionReporter::new(tx, 9, 1));
        let completion = rx.recv().expect("completion");
        assert_eq!(completion.run_id, 9);
        assert!(completion.spawn_failed());
    }

    #[test]
    fn reporter_sends_once() {
        let (tx, rx) = mpsc::channel();
        CompletionReporter::new(tx, 1, 0).report(Some(42), 0);
        assert_eq!(rx.iter().count(), 1);
    }
}
