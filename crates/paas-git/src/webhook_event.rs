use serde::Deserialize;
use thiserror::Error;

/// Maximum length `Build.commit_message` may carry (spec.md §3).
const COMMIT_MESSAGE_MAX_LEN: usize = 255;

#[derive(Error, Debug)]
pub enum WebhookEventError {
    #[error("unrecognized X-Github-Event header: {0}")]
    UnknownEventType(String),

    #[error("failed to parse webhook payload: {0}")]
    MalformedPayload(String),
}

#[derive(Debug, Clone, Deserialize)]
struct RawHeadCommit {
    message: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RawInstallation {
    id: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRepository {
    id: i64,
}

#[derive(Debug, Clone, Deserialize)]
struct RawPushPayload {
    #[serde(rename = "ref")]
    git_ref: String,
    after: String,
    head_commit: Option<RawHeadCommit>,
    installation: Option<RawInstallation>,
    repository: RawRepository,
}

#[derive(Debug, Clone, Deserialize)]
struct RawInstallationAccount {
    login: String,
    id: i64,
    #[serde(rename = "type")]
    account_type: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RawInstallationDetail {
    id: i64,
    account: RawInstallationAccount,
}

#[derive(Debug, Clone, Deserialize)]
struct RawInstallationPayload {
    action: String,
    installation: RawInstallationDetail,
}

/// A parsed `push` webhook event (spec.md §4.4), with the commit message
/// already truncated to the column's 255-character limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    pub branch: String,
    pub commit_sha: String,
    pub commit_message: String,
    pub installation_id: Option<String>,
    pub repo_id: String,
}

/// A parsed `installation` webhook event (spec.md §4.4): `action` is
/// `"created"`, `"deleted"`, or one of GitHub's other installation actions
/// (e.g. `"suspend"`), which callers are free to ignore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationEvent {
    pub action: String,
    pub installation_id: String,
    pub account_login: String,
    pub account_id: String,
    pub account_type: String,
}

#[derive(Debug, Clone)]
pub enum WebhookEvent {
    Push(PushEvent),
    Installation(InstallationEvent),
    Other(String),
}

impl WebhookEvent {
    /// Parses a GitHub webhook delivery given its `X-Github-Event` header
    /// value and raw JSON body. Unknown event types are kept as
    /// `Other(event_type)` rather than rejected, matching spec.md §4.4's
    /// "never throw to the client" summary contract.
    pub fn parse(event_type: &str, body: &[u8]) -> Result<Self, WebhookEventError> {
        match event_type {
            "push" => {
                let raw: RawPushPayload = serde_json::from_slice(body)
                    .map_err(|e| WebhookEventError::MalformedPayload(e.to_string()))?;
                Ok(WebhookEvent::Push(PushEvent::from_raw(raw)))
            }
            "installation" => {
                let raw: RawInstallationPayload = serde_json::from_slice(body)
                    .map_err(|e| WebhookEventError::MalformedPayload(e.to_string()))?;
                Ok(WebhookEvent::Installation(InstallationEvent {
                    action: raw.action,
                    installation_id: raw.installation.id.to_string(),
                    account_login: raw.installation.account.login,
                    account_id: raw.installation.account.id.to_string(),
                    account_type: raw.installation.account.account_type,
                }))
            }
            other => Ok(WebhookEvent::Other(other.to_string())),
        }
    }
}

impl PushEvent {
    fn from_raw(raw: RawPushPayload) -> Self {
        let branch = raw
            .git_ref
            .strip_prefix("refs/heads/")
            .unwrap_or(&raw.git_ref)
            .to_string();

        let mut commit_message = raw
            .head_commit
            .map(|c| c.message)
            .unwrap_or_default();
        if let Some((byte_idx, _)) = commit_message.char_indices().nth(COMMIT_MESSAGE_MAX_LEN) {
            commit_message.truncate(byte_idx);
        }

        Self {
            branch,
            commit_sha: raw.after,
            commit_message,
            installation_id: raw.installation.map(|i| i.id.to_string()),
            repo_id: raw.repository.id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_branch_from_full_ref() {
        let body = serde_json::json!({
            "ref": "refs/heads/main",
            "after": "abc123",
            "head_commit": {"message": "fix bug"},
            "installation": {"id": 42},
            "repository": {"id": 7},
        })
        .to_string();

        let event = WebhookEvent::parse("push", body.as_bytes()).unwrap();
        match event {
            WebhookEvent::Push(push) => {
                assert_eq!(push.branch, "main");
                assert_eq!(push.commit_sha, "abc123");
                assert_eq!(push.commit_message, "fix bug");
                assert_eq!(push.installation_id.as_deref(), Some("42"));
                assert_eq!(push.repo_id, "7");
            }
            _ => panic!("expected a push event"),
        }
    }

    #[test]
    fn truncates_commit_message_to_255_chars() {
        let long_message = "x".repeat(400);
        let body = serde_json::json!({
            "ref": "refs/heads/main",
            "after": "abc123",
            "head_commit": {"message": long_message},
            "repository": {"id": 7},
        })
        .to_string();

        let event = WebhookEvent::parse("push", body.as_bytes()).unwrap();
        match event {
            WebhookEvent::Push(push) => assert_eq!(push.commit_message.len(), COMMIT_MESSAGE_MAX_LEN),
            _ => panic!("expected a push event"),
        }
    }

    #[test]
    fn unknown_event_types_are_kept_as_other_not_rejected() {
        let event = WebhookEvent::parse("star", b"{}").unwrap();
        assert!(matches!(event, WebhookEvent::Other(ref t) if t == "star"));
    }

    #[test]
    fn truncates_multibyte_commit_message_without_panicking() {
        let long_message = "é".repeat(300);
        let body = serde_json::json!({
            "ref": "refs/heads/main",
            "after": "abc123",
            "head_commit": {"message": long_message},
            "repository": {"id": 7},
        })
        .to_string();

        let event = WebhookEvent::parse("push", body.as_bytes()).unwrap();
        match event {
            WebhookEvent::Push(push) => {
                assert_eq!(push.commit_message.chars().count(), COMMIT_MESSAGE_MAX_LEN)
            }
            _ => panic!("expected a push event"),
        }
    }

    #[test]
    fn parses_installation_created_event() {
        let body = serde_json::json!({
            "action": "created",
            "installation": {
                "id": 99,
                "account": {"login": "acme", "id": 5, "type": "Organization"},
            },
        })
        .to_string();

        let event = WebhookEvent::parse("installation", body.as_bytes()).unwrap();
        match event {
            WebhookEvent::Installation(installation) => {
                assert_eq!(installation.action, "created");
                assert_eq!(installation.installation_id, "99");
                assert_eq!(installation.account_login, "acme");
                assert_eq!(installation.account_id, "5");
                assert_eq!(installation.account_type, "Organization");
            }
            _ => panic!("expected an installation event"),
        }
    }
}
