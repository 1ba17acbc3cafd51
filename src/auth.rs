// src/auth.rs
//! OAuth2 refresh-token exchange shared by the Sheets and Ads clients.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{body_excerpt, AuthError};

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the token actually expires.
const EXPIRY_SLACK: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Exchanges a long-lived refresh token for short-lived bearer tokens and
/// caches the current one until shortly before it expires.
pub struct TokenProvider {
    http: reqwest::Client,
    token_url: String,
    creds: OAuthCredentials,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, creds: OAuthCredentials) -> Self {
        Self::with_token_url(http, creds, GOOGLE_TOKEN_URL)
    }

    pub fn with_token_url(
        http: reqwest::Client,
        creds: OAuthCredentials,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            creds,
            cached: Mutex::new(None),
        }
    }

    /// Current bearer token, refreshing it if missing or about to expire.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let mut guard = self.cached.lock().await;
        if let Some(tok) = guard.as_ref() {
            if Instant::now() + EXPIRY_SLACK < tok.expires_at {
                return Ok(tok.value.clone());
            }
        }

        let fresh = self.exchange().await?;
        let value = fresh.value.clone();
        *guard = Some(fresh);
        Ok(value)
    }

    async fn exchange(&self) -> Result<CachedToken, AuthError> {
        let form = [
            ("client_id", self.creds.client_id.as_str()),
            ("client_secret", self.creds.client_secret.as_str()),
            ("refresh_token", self.creds.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        let resp = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(AuthError::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body: body_excerpt(&body),
            });
        }

        let tok: TokenResponse = resp.json().await.map_err(AuthError::Decode)?;
        let ttl = Duration::from_secs(tok.expires_in.unwrap_or(3600));
        tracing::debug!(ttl_secs = ttl.as_secs(), "oauth access token refreshed");
        Ok(CachedToken {
            value: tok.access_token,
            expires_at: Instant::now() + ttl,
        })
    }
}
