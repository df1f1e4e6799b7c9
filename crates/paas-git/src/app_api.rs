//! Thin GitHub App REST client backing `GET /github/installations` and
//! `GET /github/installations/:id/repositories` (spec.md §6). Grounded in
//! `temps-git/src/services/github_provider.rs`'s installation listing
//! calls, expressed with `reqwest` directly rather than pulling in
//! `octocrab` for two read-only endpoints.

use serde::Deserialize;

use crate::installation_token::{InstallationTokenError, InstallationTokenExchange};

#[derive(Debug, Deserialize)]
pub struct Installation {
    pub id: i64,
    pub account: InstallationAccount,
}

#[derive(Debug, Deserialize)]
pub struct InstallationAccount {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub struct Repository {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub default_branch: String,
    pub private: bool,
}

#[derive(Debug, Deserialize)]
struct RepositoriesResponse {
    repositories: Vec<Repository>,
}

/// Lists installations of the configured GitHub App, authenticated with
/// the App-level JWT (not an installation token).
pub async fn list_installations(
    exchange: &InstallationTokenExchange,
    client: &reqwest::Client,
    now_unix: i64,
) -> Result<Vec<Installation>, InstallationTokenError> {
    let jwt = exchange.app_jwt(now_unix)?;

    let response = client
        .get("https://api.github.com/app/installations")
        .bearer_auth(jwt)
        .header("Accept", "application/vnd.github+json")
        .header("User-Agent", "paas-control-plane")
        .send()
        .await
        .map_err(|e| InstallationTokenError::ExchangeFailed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(InstallationTokenError::ExchangeFailed(format!(
            "GitHub returned {}",
            response.status()
        )));
    }

    response
        .json()
        .await
        .map_err(|e| InstallationTokenError::ExchangeFailed(e.to_string()))
}

/// Lists repositories a given installation can access, authenticated
/// with that installation's short-lived access token.
pub async fn list_installation_repositories(
    client: &reqwest::Client,
    installation_token: &str,
) -> Result<Vec<Repository>, InstallationTokenError> {
    let response = client
        .get("https://api.github.com/installation/repositories")
        .bearer_auth(installation_token)
        .header("Accept", "application/vnd.github+json")
        .header("User-Agent", "paas-control-plane")
        .send()
        .await
        .map_err(|e| InstallationTokenError::ExchangeFailed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(InstallationTokenError::ExchangeFailed(format!(
            "GitHub returned {}",
            response.status()
        )));
    }

    let body: RepositoriesResponse = response
        .json()
        .await
        .map_err(|e| InstallationTokenError::ExchangeFailed(e.to_string()))?;
    Ok(body.repositories)
}
