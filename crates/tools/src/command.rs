//! Command runner abstraction for the shell tool.
//!
//! Provides a trait-based interface for running shell command lines with a
//! hard wall-clock timeout, with a real implementation
//! (`SystemCommandRunner`) and a scripted one for unit tests.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

/// Captured output of a process that ran to completion.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Exit code (None if the process was killed by a signal)
    pub exit_code: Option<i32>,
    /// Whether the command succeeded (exit code 0)
    pub success: bool,
}

/// How an execution attempt ended.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// The process exited, successfully or not.
    Completed(CommandOutput),
    /// The timeout elapsed; the process was killed and its output discarded.
    TimedOut,
    /// The process could not be launched or awaited.
    Failed(String),
}

/// Trait for running command lines. Mockable for testing.
#[async_trait::async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command_line` through the shell, giving up after `timeout`.
    async fn run(&self, command_line: &str, timeout: Duration) -> ExecutionOutcome;
}

/// Real command runner that spawns `sh -c <command_line>`.
///
/// The shell leads its own process group, and a timeout kills the whole
/// group, so subshells and pipeline stages stop with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, command_line: &str, timeout: Duration) -> ExecutionOutcome {
        debug!(command = %command_line, timeout_ms = timeout.as_millis() as u64, "Running command");

        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(command = %command_line, error = %e, "Command failed to execute");
                return ExecutionOutcome::Failed(e.to_string());
            }
        };
        let pid = child.id();

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Err(_) => {
                warn!(command = %command_line, "Command timed out");
                kill_process_group(pid);
                ExecutionOutcome::TimedOut
            }
            Ok(Err(e)) => {
                warn!(command = %command_line, error = %e, "Command failed to execute");
                ExecutionOutcome::Failed(e.to_string())
            }
            Ok(Ok(output)) => ExecutionOutcome::Completed(CommandOutput {
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                exit_code: output.status.code(),
                success: output.status.success(),
            }),
        }
    }
}

/// SIGKILL every process in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    // SAFETY: killpg takes plain integers and touches no memory.
    let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
    if rc != 0 {
        // ESRCH: the group already exited.
        debug!(pid, error = %std::io::Error::last_os_error(), "Process group not signalled");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

/// Runner that replays canned outcomes and records what it was asked to run.
#[cfg(test)]
pub(crate) struct ScriptedCommandRunner {
    responses: std::sync::Mutex<Vec<ExecutionOutcome>>,
    seen: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl ScriptedCommandRunner {
    /// Create a runner that returns the given outcomes in order.
    pub(crate) fn new(responses: Vec<ExecutionOutcome>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses),
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Command lines received so far, in order.
    pub(crate) fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl CommandRunner for ScriptedCommandRunner {
    async fn run(&self, command_line: &str, _timeout: Duration) -> ExecutionOutcome {
        self.seen.lock().unwrap().push(command_line.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            ExecutionOutcome::Failed("No more scripted responses".to_string())
        } else {
            responses.remove(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn system_runner_captures_stdout_and_exit_code() {
        let outcome = SystemCommandRunner::new().run("echo hello", SHORT).await;
        match outcome {
            ExecutionOutcome::Completed(out) => {
                assert!(out.success);
                assert_eq!(out.exit_code, Some(0));
                assert_eq!(out.stdout.trim(), "hello");
                assert!(out.stderr.is_empty());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn system_runner_reports_non_zero_exit() {
        let outcome = SystemCommandRunner::new()
            .run("echo oops 1>&2; exit 3", SHORT)
            .await;
        match outcome {
            ExecutionOutcome::Completed(out) => {
                assert!(!out.success);
                assert_eq!(out.exit_code, Some(3));
                assert_eq!(out.stderr.trim(), "oops");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn system_runner_times_out() {
        let started = std::time::Instant::now();
        let outcome = SystemCommandRunner::new()
            .run("echo partial; sleep 5", Duration::from_millis(200))
            .await;
        assert!(matches!(outcome, ExecutionOutcome::TimedOut));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn system_runner_timeout_stops_forked_work() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("marker");
        let command = format!("echo start; (sleep 1; touch {})", marker.display());

        let outcome = SystemCommandRunner::new()
            .run(&command, Duration::from_millis(300))
            .await;
        assert!(matches!(outcome, ExecutionOutcome::TimedOut));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!marker.exists(), "subshell outlived the timeout");
    }

    #[tokio::test]
    async fn system_runner_waits_for_subshells_that_finish_in_time() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("marker");
        let command = format!("(sleep 0.2; touch {}); echo done", marker.display());

        let outcome = SystemCommandRunner::new().run(&command, SHORT).await;
        match outcome {
            ExecutionOutcome::Completed(out) => assert_eq!(out.stdout.trim(), "done"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn scripted_runner_replays_in_order_and_records() {
        let runner = ScriptedCommandRunner::new(vec![
            ExecutionOutcome::TimedOut,
            ExecutionOutcome::Failed("boom".into()),
        ]);
        assert!(matches!(runner.run("a", SHORT).await, ExecutionOutcome::TimedOut));
        assert!(matches!(runner.run("b", SHORT).await, ExecutionOutcome::Failed(_)));
        assert!(matches!(runner.run("c", SHORT).await, ExecutionOutcome::Failed(_)));
        assert_eq!(runner.seen(), vec!["a", "b", "c"]);
    }
}
