//! Build command execution with a wall-clock timeout (spec.md §4.2
//! "Command execution"). Grounded in the SIGTERM-on-timeout pattern from
//! other process-supervisor examples in the retrieval pack (`nix::sys::
//! signal::kill`).

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to spawn command: {0}")]
    SpawnFailed(String),

    #[error("Command timed out after 5 minutes")]
    TimedOut,

    #[error("command exited with a non-zero status")]
    NonZeroExit,
}

/// Runs `command` as `sh -c <command>` inside `cwd` with `env` layered
/// over the worker's own environment, streaming each stdout/stderr line
/// through `on_line`. Enforces the 5-minute wall-clock timeout, sending
/// SIGTERM to the child (and waiting briefly) before reporting a timeout.
pub async fn run_with_timeout<F>(
    command: &str,
    cwd: &Path,
    env: &HashMap<String, String>,
    mut on_line: F,
) -> Result<(), CommandError>
where
    F: FnMut(String) + Send,
{
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .envs(env)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| CommandError::SpawnFailed(e.to_string()))?;

    let stdout = child.stdout.take().expect("piped stdout");
    let stderr = child.stderr.take().expect("piped stderr");
    let mut stdout_lines = BufReader::new(stdout).lines();
    let mut stderr_lines = BufReader::new(stderr).lines();

    let pid = child.id();

    let drain = async {
        loop {
            tokio::select! {
                line = stdout_lines.next_line() => match line {
                    Ok(Some(line)) => on_line(line),
                    Ok(None) => break,
                    Err(_) => break,
                },
                line = stderr_lines.next_line() => match line {
                    Ok(Some(line)) => on_line(line),
                    Ok(None) => continue,
                    Err(_) => continue,
                },
            }
        }
        child.wait().await
    };

    match timeout(COMMAND_TIMEOUT, drain).await {
        Ok(Ok(status)) if status.success() => Ok(()),
        Ok(Ok(_)) => Err(CommandError::NonZeroExit),
        Ok(Err(e)) => Err(CommandError::SpawnFailed(e.to_string())),
        Err(_) => {
            if let Some(pid) = pid {
                send_sigterm(pid);
            }
            Err(CommandError::TimedOut)
        }
    }
}

#[cfg(unix)]
fn send_sigterm(pid: u32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
}

#[cfg(not(unix))]
fn send_sigterm(_pid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_a_successful_command_and_streams_lines() {
        let mut lines = Vec::new();
        let result = run_with_timeout(
            "echo hello",
            Path::new("."),
            &HashMap::new(),
            |line| lines.push(line),
        )
        .await;
        assert!(result.is_ok());
        assert_eq!(lines, vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn reports_non_zero_exit() {
        let result = run_with_timeout("exit 1", Path::new("."), &HashMap::new(), |_| {}).await;
        assert!(matches!(result, Err(CommandError::NonZeroExit)));
    }
}
