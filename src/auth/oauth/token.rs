//! Access tokens and the token endpoint exchange shared by all refreshable
//! credentials.

use std::fmt;
use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::auth::oauth::OAuthError;

/// Google OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URI: &str = "https://accounts.google.com/o/oauth2/token";

/// Tokens are refreshed this many seconds before they expire.
pub const REFRESH_SAFETY_MARGIN_SECS: i64 = 5 * 60;

/// An OAuth2 bearer token and its expiry.
///
/// The `Debug` implementation masks the token value.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Creates a token. `expires_at` of `None` means the expiry is unknown.
    #[must_use]
    pub fn new(token: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Returns the raw token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the expiry, if known.
    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns `true` when the token expires within the safety margin of `now`.
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|expiry| expiry - now < Duration::seconds(REFRESH_SAFETY_MARGIN_SECS))
    }

    /// Returns the `Authorization` header value.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"*****")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// The current token of a refreshable credential.
///
/// The lock is held across the refresh, so concurrent callers wait for a
/// single exchange instead of issuing their own.
#[derive(Debug, Default)]
pub(crate) struct TokenCache {
    token: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    pub(crate) fn new(initial: Option<AccessToken>) -> Self {
        Self {
            token: Mutex::new(initial),
        }
    }

    /// Returns a fresh token, calling `fetch` first when the cached one is
    /// missing or about to expire.
    pub(crate) async fn fresh_token<F, Fut>(&self, fetch: F) -> Result<AccessToken, OAuthError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken, OAuthError>>,
    {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if !token.needs_refresh(Utc::now()) {
                return Ok(token.clone());
            }
        }

        let fresh = fetch().await?;
        *guard = Some(fresh.clone());
        Ok(fresh)
    }

    /// Unconditionally replaces the token with the result of `fetch`.
    pub(crate) async fn replace_with<F, Fut>(&self, fetch: F) -> Result<(), OAuthError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken, OAuthError>>,
    {
        let mut guard = self.token.lock().await;
        let fresh = fetch().await?;
        *guard = Some(fresh);
        Ok(())
    }

    pub(crate) async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.token.lock().await.as_ref().and_then(AccessToken::expires_at)
    }
}

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Error body of a token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Posts `form` to the token endpoint and parses the issued token.
pub(crate) async fn request_token(
    http: &reqwest::Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<AccessToken, OAuthError> {
    tracing::debug!(token_uri, "Requesting OAuth2 access token");

    let response = http
        .post(token_uri)
        .form(form)
        .send()
        .await
        .map_err(|e| OAuthError::RefreshFailed {
            status: 0,
            message: format!("Network error: {e}"),
        })?;

    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| OAuthError::RefreshFailed {
            status,
            message: format!("Failed to read token response: {e}"),
        })?;

    if !(200..300).contains(&status) {
        tracing::warn!(status, "OAuth2 token request failed");
        if let Ok(error) = serde_json::from_str::<TokenErrorResponse>(&body) {
            if error.error == "invalid_grant" {
                return Err(OAuthError::InvalidGrant {
                    description: error.error_description.unwrap_or(error.error),
                });
            }
        }
        return Err(OAuthError::RefreshFailed {
            status,
            message: body,
        });
    }

    let token: TokenResponse =
        serde_json::from_str(&body).map_err(|e| OAuthError::RefreshFailed {
            status,
            message: format!("Failed to parse token response: {e}"),
        })?;

    let expires_at = token
        .expires_in
        .map(|seconds| Utc::now() + Duration::seconds(seconds));

    Ok(AccessToken::new(token.access_token, expires_at))
}
