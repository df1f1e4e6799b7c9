//! Repository cloning (spec.md §4.2 step 3): shells out to the system
//! `git` binary rather than a library binding, grounded in
//! `temps-git/src/services/github_provider.rs`'s `clone_repository`.

use std::path::Path;

use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum CloneError {
    #[error("failed to remove existing workspace directory: {0}")]
    WorkspaceCleanup(String),

    #[error("failed to execute git clone: {0}")]
    SpawnFailed(String),

    #[error("git clone exited with an error")]
    CloneFailed,
}

/// Injects `token` into an HTTPS clone URL as userinfo (`https://TOKEN@host/...`).
/// Never logged — callers must keep the returned string out of tracing
/// fields and error messages.
fn authenticated_url(repo_url: &str, token: &str) -> String {
    match repo_url.strip_prefix("https://") {
        Some(rest) => format!("https://{token}@{rest}"),
        None => repo_url.to_string(),
    }
}

/// Clones `repo_url` into `target_dir`, removing any pre-existing
/// directory first (spec.md §4.2 step 3: "Remove any pre-existing
/// workspace directory first"). When `token` is present it is injected
/// into the clone URL and never otherwise surfaced.
pub async fn clone_repository(
    repo_url: &str,
    target_dir: &Path,
    token: Option<&str>,
) -> Result<(), CloneError> {
    if target_dir.exists() {
        tokio::fs::remove_dir_all(target_dir)
            .await
            .map_err(|e| CloneError::WorkspaceCleanup(e.to_string()))?;
    }

    let url = match token {
        Some(token) => authenticated_url(repo_url, token),
        None => repo_url.to_string(),
    };

    let status = Command::new("git")
        .arg("clone")
        .arg("--depth")
        .arg("1")
        .arg(&url)
        .arg(target_dir)
        .status()
        .await
        .map_err(|e| CloneError::SpawnFailed(e.to_string()))?;

    if !status.success() {
        return Err(CloneError::CloneFailed);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_token_as_https_userinfo() {
        let url = authenticated_url("https://github.com/acme/repo.git", "ghs_abc123");
        assert_eq!(url, "https://ghs_abc123@github.com/acme/repo.git");
    }

    #[test]
    fn leaves_non_https_urls_unchanged() {
        let url = authenticated_url("git@github.com:acme/repo.git", "ghs_abc123");
        assert_eq!(url, "git@github.com:acme/repo.git");
    }
}
