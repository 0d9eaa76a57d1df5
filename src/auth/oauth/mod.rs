//! OAuth2 credential providers.
//!
//! Every SOAP call and report download carries an `Authorization: Bearer`
//! header produced by an [`OAuth2Client`]. Three credential shapes exist:
//!
//! - [`RefreshTokenClient`]: client id, client secret and refresh token
//! - [`ServiceAccountClient`]: a JSON service account key, optionally impersonating a user
//! - [`AccessTokenClient`]: a fixed access token that cannot be refreshed
//!
//! Refreshable credentials renew their token when it is missing or expires
//! within five minutes. A failed refresh leaves the stored token untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! use googleads::auth::oauth::{OAuth2Client, RefreshTokenClient};
//!
//! let credentials: OAuth2Client =
//!     RefreshTokenClient::new("client-id", "client-secret", "refresh-token").into();
//!
//! let headers = credentials.create_http_header().await?;
//! assert!(headers["Authorization"].starts_with("Bearer "));
//! ```

mod access_token;
mod error;
mod refresh_token;
mod service_account;
mod token;

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::ProxyConfig;
use crate::error::ConfigError;

pub use access_token::AccessTokenClient;
pub use error::OAuthError;
pub use refresh_token::RefreshTokenClient;
pub use service_account::{ServiceAccountClient, ServiceAccountKey};
pub use token::{AccessToken, DEFAULT_TOKEN_URI, REFRESH_SAFETY_MARGIN_SECS};

/// Name of the header produced by [`OAuth2Client::create_http_header`].
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// One of the supported OAuth2 credential shapes.
#[derive(Debug)]
pub enum OAuth2Client {
    /// Refresh-token (installed application) credentials.
    RefreshToken(RefreshTokenClient),
    /// Service account credentials.
    ServiceAccount(ServiceAccountClient),
    /// A fixed access token.
    AccessToken(AccessTokenClient),
}

impl OAuth2Client {
    /// Returns `{"Authorization": "Bearer <token>"}`, refreshing first when
    /// the token is missing or near expiry.
    ///
    /// # Errors
    ///
    /// Returns an [`OAuthError`] if refreshing fails or a fixed token has
    /// expired.
    pub async fn create_http_header(&self) -> Result<HashMap<String, String>, OAuthError> {
        let value = match self {
            Self::RefreshToken(client) => client.authorization_header().await?,
            Self::ServiceAccount(client) => client.authorization_header().await?,
            Self::AccessToken(client) => client.authorization_header()?,
        };
        Ok(HashMap::from([(AUTHORIZATION_HEADER.to_string(), value)]))
    }

    /// Forces a token refresh.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::RefreshUnsupported`] for fixed tokens, or the
    /// refresh failure.
    pub async fn refresh(&self) -> Result<(), OAuthError> {
        match self {
            Self::RefreshToken(client) => client.refresh().await,
            Self::ServiceAccount(client) => client.refresh().await,
            Self::AccessToken(_) => Err(OAuthError::RefreshUnsupported),
        }
    }

    /// Sends token requests through the given proxy and TLS settings with
    /// the given timeout. Fixed tokens make no requests and are unchanged.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the HTTP client cannot be built.
    pub fn with_proxy_config(
        self,
        proxy_config: &ProxyConfig,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(match self {
            Self::RefreshToken(client) => {
                Self::RefreshToken(client.with_proxy_config(proxy_config, timeout)?)
            }
            Self::ServiceAccount(client) => {
                Self::ServiceAccount(client.with_proxy_config(proxy_config, timeout)?)
            }
            Self::AccessToken(client) => Self::AccessToken(client),
        })
    }

    /// Returns the expiry of the current access token, if known.
    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::RefreshToken(client) => client.expires_at().await,
            Self::ServiceAccount(client) => client.expires_at().await,
            Self::AccessToken(client) => Some(client.expires_at()),
        }
    }
}

impl From<RefreshTokenClient> for OAuth2Client {
    fn from(client: RefreshTokenClient) -> Self {
        Self::RefreshToken(client)
    }
}

impl From<ServiceAccountClient> for OAuth2Client {
    fn from(client: ServiceAccountClient) -> Self {
        Self::ServiceAccount(client)
    }
}

impl From<AccessTokenClient> for OAuth2Client {
    fn from(client: AccessTokenClient) -> Self {
        Self::AccessToken(client)
    }
}

// Verify OAuth2Client is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<OAuth2Client>();
};
