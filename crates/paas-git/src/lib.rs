//! Webhook Ingress support (spec.md §4.4): GitHub push-event signature
//! verification, payload parsing, and GitHub App installation-token
//! exchange. Grounded in `temps-git/src/services/github.rs`'s
//! `validate_webhook_signature` and installation-token flow.

pub mod app_api;
pub mod clone;
pub mod installation_token;
pub mod signature;
pub mod webhook_event;

pub use app_api::{list_installation_repositories, list_installations, Installation, Repository};
pub use clone::{clone_repository, CloneError};
pub use installation_token::{InstallationTokenError, InstallationTokenExchange};
pub use signature::{verify_signature, SignatureError};
pub use webhook_event::{PushEvent, WebhookEvent};
