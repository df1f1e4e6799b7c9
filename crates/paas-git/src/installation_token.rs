use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// GitHub App JWTs must expire within 10 minutes of issuance; this spec
/// uses the full window (spec.md §4.4, GLOSSARY "Installation").
const JWT_TTL_SECONDS: i64 = 600;

#[derive(Error, Debug)]
pub enum InstallationTokenError {
    #[error("failed to load GitHub App private key: {0}")]
    InvalidPrivateKey(String),

    #[error("failed to sign the app JWT: {0}")]
    SigningFailed(String),

    #[error("installation token exchange failed: {0}")]
    ExchangeFailed(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct AppClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    token: String,
}

/// Exchanges a GitHub App's RS256-signed JWT for a short-lived
/// installation access token (grounded in `temps-git`'s GitHub App
/// installation-token flow).
pub struct InstallationTokenExchange {
    app_id: String,
    private_key_pem: String,
    client: reqwest::Client,
}

impl InstallationTokenExchange {
    pub fn new(app_id: impl Into<String>, private_key_pem: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            private_key_pem: private_key_pem.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Builds and signs the App-level JWT (`iss` = app id, 10-minute
    /// expiry, 60-second clock-skew backdate on `iat`).
    pub fn app_jwt(&self, now_unix: i64) -> Result<String, InstallationTokenError> {
        let claims = AppClaims {
            iat: now_unix - 60,
            exp: now_unix + JWT_TTL_SECONDS,
            iss: self.app_id.clone(),
        };

        let key = EncodingKey::from_rsa_pem(self.private_key_pem.as_bytes())
            .map_err(|e| InstallationTokenError::InvalidPrivateKey(e.to_string()))?;

        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| InstallationTokenError::SigningFailed(e.to_string()))
    }

    /// Exchanges the App JWT for an installation access token via
    /// `POST /app/installations/{id}/access_tokens`.
    pub async fn exchange(
        &self,
        installation_id: &str,
        now_unix: i64,
    ) -> Result<String, InstallationTokenError> {
        let jwt = self.app_jwt(now_unix)?;

        let response = self
            .client
            .post(format!(
                "https://api.github.com/app/installations/{installation_id}/access_tokens"
            ))
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

        let body: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| InstallationTokenError::ExchangeFailed(e.to_string()))?;
        Ok(body.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    // Throwaway 2048-bit RSA key generated for this test only; it signs no
    // real request and is not used anywhere outside this module.
    const TEST_PRIVATE_KEY: &str = include_str!("../tests/fixtures/test_app_key.pem");

    const TEST_PUBLIC_KEY: &str = include_str!("../tests/fixtures/test_app_key_public.pem");

    #[test]
    fn app_jwt_has_expected_claims_and_ttl() {
        let exchange = InstallationTokenExchange::new("12345", TEST_PRIVATE_KEY);
        let now = 1_700_000_000;
        let jwt = exchange.app_jwt(now).unwrap();

        let decoding_key = DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap();
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;

        let decoded = decode::<AppClaims>(&jwt, &decoding_key, &validation).unwrap();
        assert_eq!(decoded.claims.iss, "12345");
        assert_eq!(decoded.claims.exp - decoded.claims.iat, JWT_TTL_SECONDS + 60);
    }
}
