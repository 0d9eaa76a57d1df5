//! Service account credentials using the JWT bearer grant.
//!
//! A signed RS256 assertion is exchanged at the token endpoint for an access
//! token. Setting a subject impersonates that user (domain-wide delegation).

use std::fmt;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::auth::oauth::token::{request_token, AccessToken, TokenCache, DEFAULT_TOKEN_URI};
use crate::auth::oauth::OAuthError;
use crate::config::ProxyConfig;
use crate::error::ConfigError;

/// Grant type for JWT bearer assertions (RFC 7523).
const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of a signed assertion in seconds.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The fields of a JSON service account key file used for signing.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// The service account e-mail, used as the assertion issuer.
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    /// Key id placed in the JWT header.
    #[serde(default)]
    pub private_key_id: Option<String>,
    /// Token endpoint named by the key file, used unless overridden.
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"*****")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<&'a str>,
}

/// OAuth2 credentials for a service account.
///
/// # Example
///
/// ```rust,ignore
/// use googleads::auth::oauth::ServiceAccountClient;
/// use googleads::auth::AD_MANAGER_SCOPE;
///
/// let credentials = ServiceAccountClient::from_key_file("key.json", AD_MANAGER_SCOPE)?
///     .subject("reports@example.com");
/// ```
pub struct ServiceAccountClient {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    subject: Option<String>,
    token_uri: String,
    http: reqwest::Client,
    cache: TokenCache,
}

impl ServiceAccountClient {
    /// Loads credentials from a JSON key file.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::InvalidKeyFile`] if the file cannot be read or
    /// parsed and [`OAuthError::InvalidKey`] if the private key is unusable.
    pub fn from_key_file(path: impl AsRef<Path>, scope: impl Into<String>) -> Result<Self, OAuthError> {
        let path = path.as_ref();
        let invalid = |reason: String| OAuthError::InvalidKeyFile {
            path: path.display().to_string(),
            reason,
        };
        let contents = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let key: ServiceAccountKey =
            serde_json::from_str(&contents).map_err(|e| invalid(e.to_string()))?;
        Self::from_key(key, scope)
    }

    /// Creates credentials from an already parsed key.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::InvalidKey`] if the private key is not a valid
    /// RSA PEM key.
    pub fn from_key(key: ServiceAccountKey, scope: impl Into<String>) -> Result<Self, OAuthError> {
        let encoding_key =
            EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
                OAuthError::InvalidKey {
                    reason: e.to_string(),
                }
            })?;

        let token_uri = key
            .token_uri
            .clone()
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        Ok(Self {
            key,
            encoding_key,
            scope: scope.into(),
            subject: None,
            token_uri,
            http: reqwest::Client::new(),
            cache: TokenCache::default(),
        })
    }

    /// Impersonates the given user.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Overrides the token endpoint, which is also the assertion audience.
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

    /// Returns the service account e-mail.
    #[must_use]
    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Returns the requested scope.
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Returns `Bearer <token>`, refreshing first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::InvalidGrant`] if the assertion is rejected and
    /// [`OAuthError::RefreshFailed`] for other endpoint failures.
    pub async fn authorization_header(&self) -> Result<String, OAuthError> {
        let token = self.cache.fresh_token(|| self.fetch_token()).await?;
        Ok(token.bearer())
    }

    /// Signs a new assertion and exchanges it for an access token.
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

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, OAuthError> {
        let iat = now.timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: &self.scope,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
            sub: self.subject.as_deref(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.key.private_key_id);

        jsonwebtoken::encode(&header, &claims, &self.encoding_key).map_err(|e| {
            OAuthError::InvalidKey {
                reason: e.to_string(),
            }
        })
    }

    async fn fetch_token(&self) -> Result<AccessToken, OAuthError> {
        let assertion = self.assertion(Utc::now())?;
        let form = [
            ("grant_type", JWT_BEARER_GRANT_TYPE),
            ("assertion", assertion.as_str()),
        ];
        let token = request_token(&self.http, &self.token_uri, &form).await?;
        tracing::debug!(
            client_email = %self.key.client_email,
            expires_at = ?token.expires_at(),
            "Refreshed service account access token"
        );
        Ok(token)
    }
}

impl fmt::Debug for ServiceAccountClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountClient")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("subject", &self.subject)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}
