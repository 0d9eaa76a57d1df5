//! Installed-application credentials: a client id/secret pair and a long
//! lived refresh token.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::auth::oauth::token::{request_token, AccessToken, TokenCache, DEFAULT_TOKEN_URI};
use crate::auth::oauth::OAuthError;
use crate::config::ProxyConfig;
use crate::error::ConfigError;

/// Grant type for refresh token requests.
const REFRESH_TOKEN_GRANT_TYPE: &str = "refresh_token";

/// OAuth2 credentials that mint access tokens from a refresh token.
///
/// Without an initial access token the first call to
/// [`authorization_header`](Self::authorization_header) refreshes.
///
/// # Example
///
/// ```rust
/// use googleads::auth::oauth::RefreshTokenClient;
///
/// let credentials = RefreshTokenClient::new("client-id", "client-secret", "1/refresh-token");
/// ```
pub struct RefreshTokenClient {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    token_uri: String,
    http: reqwest::Client,
    cache: TokenCache,
}

impl RefreshTokenClient {
    /// Creates refresh-token credentials.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
            http: reqwest::Client::new(),
            cache: TokenCache::default(),
        }
    }

    /// Seeds the credentials with a previously issued access token.
    #[must_use]
    pub fn with_access_token(
        mut self,
        access_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        self.cache = TokenCache::new(Some(AccessToken::new(access_token, Some(expires_at))));
        self
    }

    /// Overrides the token endpoint.
    #[must_use]
    pub fn token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    /// Routes token requests through the given proxy and TLS settings.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the HTTP client cannot be built.
    pub fn with_proxy_config(
        mut self,
        proxy_config: &ProxyConfig,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        self.http = proxy_config.build_http_client(timeout)?;
        Ok(self)
    }

    /// Returns the OAuth2 client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns `Bearer <token>`, refreshing first if the token is missing or
    /// expires within the safety margin.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::InvalidGrant`] if the refresh token was revoked
    /// and [`OAuthError::RefreshFailed`] for any other refresh failure.
    pub async fn authorization_header(&self) -> Result<String, OAuthError> {
        let token = self.cache.fresh_token(|| self.fetch_token()).await?;
        Ok(token.bearer())
    }

    /// Exchanges the refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// See [`authorization_header`](Self::authorization_header).
    pub async fn refresh(&self) -> Result<(), OAuthError> {
        self.cache.replace_with(|| self.fetch_token()).await
    }

    /// Returns the expiry of the current access token, if any.
    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.cache.expires_at().await
    }

    async fn fetch_token(&self) -> Result<AccessToken, OAuthError> {
        let form = [
            ("grant_type", REFRESH_TOKEN_GRANT_TYPE),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", self.refresh_token.as_str()),
        ];
        let token = request_token(&self.http, &self.token_uri, &form).await?;
        tracing::debug!(expires_at = ?token.expires_at(), "Refreshed OAuth2 access token");
        Ok(token)
    }
}

impl fmt::Debug for RefreshTokenClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshTokenClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"*****")
            .field("refresh_token", &"*****")
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}
