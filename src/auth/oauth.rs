//! OAuth2 client-credentials grant against the Microsoft identity platform.

use crate::auth::secure::SecureString;
use crate::config::Config;
use crate::error::AuthError;
use crate::graph::retry::{send_with_retry, RetryOn, RetryPolicy};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::time::Duration as StdDuration;
use tracing::{debug, error, info};

/// Client credentials used once per run to obtain a token.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecureString,
}

impl Credentials {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tenant_id: config.oauth.tenant_id.clone(),
            client_id: config.oauth.client_id.clone(),
            client_secret: config.oauth.client_secret.clone(),
        }
    }
}

/// Bearer token held in memory for the duration of one run.
#[derive(Debug)]
pub struct AccessToken {
    secret: SecureString,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn as_str(&self) -> &str {
        self.secret.as_str()
    }
}

/// Token response from Azure AD.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn default_expires_in() -> u64 {
    3600
}

/// Acquires app-only tokens with the client-credentials grant.
pub struct TokenClient {
    token_url_base: String,
    scope: String,
    retry: RetryPolicy,
    http_client: reqwest::Client,
}

impl TokenClient {
    /// Create a new token client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self::with_http_client(
            http_client,
            &config.api.login_base_url,
            &config.oauth.scope,
            config.retry_policy(),
        ))
    }

    pub fn with_http_client(
        http_client: reqwest::Client,
        login_base_url: &str,
        scope: &str,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            token_url_base: login_base_url.trim_end_matches('/').to_string(),
            scope: scope.to_string(),
            retry,
            http_client,
        }
    }

    fn token_url(&self, tenant_id: &str) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.token_url_base, tenant_id)
    }

    /// Exchange client credentials for an access token.
    pub async fn acquire_token(&self, credentials: &Credentials) -> Result<AccessToken, AuthError> {
        let token_endpoint = self.token_url(&credentials.tenant_id);

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];

        debug!(tenant = %credentials.tenant_id, "Requesting client-credentials token");

        let response = send_with_retry(&self.retry, RetryOn::Transient, "token", || {
            self.http_client.post(&token_endpoint).form(&params)
        })
        .await
        .map_err(|e| AuthError::TokenRequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Log error details for debugging (doesn't expose to user)
            let error_body = response.text().await.unwrap_or_default();
            error!("Token request failed: HTTP {} - {}", status, error_body);
            return Err(match status.as_u16() {
                400 | 401 => AuthError::InvalidCredentials,
                code => AuthError::TokenRequestFailed(format!("HTTP {}", code)),
            });
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidTokenResponse(e.to_string()))?;

        let secret = token_response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::InvalidTokenResponse("missing access_token".into()))?;

        let lifetime = StdDuration::from_secs(token_response.expires_in);
        let expires_at = Utc::now()
            + Duration::from_std(lifetime).unwrap_or_else(|_| Duration::seconds(3600));

        info!("Acquired access token, expires at {}", expires_at);

        Ok(AccessToken {
            secret: SecureString::new(secret),
            token_type: token_response.token_type,
            expires_at,
        })
    }
}
