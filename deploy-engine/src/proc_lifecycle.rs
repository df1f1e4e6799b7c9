//! Stop-prior-process step (spec.md §4.3 step 4): "Read `server.pid` if
//! present; send SIGTERM, wait 300 ms, send SIGKILL if still alive; remove
//! the pid file; wait up to 5 s for the port to become free."
//!
//! Grounded in the workspace's own `nix`-based SIGTERM pattern (see
//! `build-worker::command::send_sigterm`), reused here for the same
//! "ask nicely, then insist" shutdown idiom.

use std::path::Path;
use std::time::Duration;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::{info, warn};

use crate::paths::ProjectPaths;
use crate::port_check::wait_until_free;

const SIGTERM_GRACE: Duration = Duration::from_millis(300);
const PORT_FREE_DEADLINE: Duration = Duration::from_secs(5);

async fn read_pid(pid_file: &Path) -> Option<i32> {
    let contents = tokio::fs::read_to_string(pid_file).await.ok()?;
    contents.trim().parse().ok()
}

fn process_alive(pid: i32) -> bool {
    signal::kill(Pid::from_raw(pid), None).is_ok()
}

/// Stops whatever process `server.pid` currently names, then waits for
/// `port` to free up. Best-effort: a stale or already-dead pid is not an
/// error, matching the spec's "if present" framing.
pub async fn stop_prior_process(paths: &ProjectPaths, port: u16) {
    let pid_file = paths.server_pid_file();

    if let Some(pid) = read_pid(&pid_file).await {
        info!(pid, "stopping prior process");
        let target = Pid::from_raw(pid);

        if signal::kill(target, Signal::SIGTERM).is_ok() {
            tokio::time::sleep(SIGTERM_GRACE).await;
            if process_alive(pid) {
                warn!(pid, "process survived SIGTERM, sending SIGKILL");
                let _ = signal::kill(target, Signal::SIGKILL);
            }
        }
    }

    let _ = tokio::fs::remove_file(&pid_file).await;

    if !wait_until_free(port, PORT_FREE_DEADLINE).await {
        warn!(port, "port did not free up within the deadline");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_pid_file_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let apps_dir = dir.path().join("apps");
        tokio::fs::create_dir_all(&apps_dir).await.unwrap();
        let project_id = uuid::Uuid::new_v4();
        let paths = ProjectPaths::new(&apps_dir, project_id);
        tokio::fs::create_dir_all(paths.root()).await.unwrap();

        stop_prior_process(&paths, 59991).await;
        assert!(!paths.server_pid_file().exists());
    }
}
