use std::process::{ExitStatus, Output};
use std::time::Duration;
use tokio::process::Command;

/// How a bounded child process ended
#[derive(Debug)]
pub enum ProcessOutcome {
    Exited {
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
    /// Wall-clock limit hit; the child was killed
    TimedOut,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited { status, .. } if status.success())
    }
}

/// Run `cmd` to completion, killing it once `timeout` elapses
///
/// The child is spawned with `kill_on_drop`, so dropping the returned future
/// early (for example when a capture wins a race) also kills it.
pub async fn run_with_timeout(
    cmd: &mut Command,
    timeout: Duration,
) -> std::io::Result<ProcessOutcome> {
    let child = cmd.kill_on_drop(true).spawn()?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => {
            let Output {
                status,
                stdout,
                stderr,
            } = output?;
            Ok(ProcessOutcome::Exited {
                status,
                stdout: String::from_utf8_lossy(&stdout).into_owned(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            })
        }
        Err(_) => Ok(ProcessOutcome::TimedOut),
    }
}

/// Run `cmd` without a time limit and return its output
pub async fn run_captured(cmd: &mut Command) -> std::io::Result<Output> {
    cmd.kill_on_drop(true).output().await
}

/// First `max` characters of `text`, for log lines
pub fn preview(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Human-readable failure text from a finished command
pub fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        format!("{} ({})", stdout.trim(), output.status)
    } else {
        format!("{stderr} ({})", output.status)
    }
}
