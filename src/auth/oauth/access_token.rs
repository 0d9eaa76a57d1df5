//! Credentials wrapping an access token obtained elsewhere.

use chrono::{DateTime, Utc};

use crate::auth::oauth::token::AccessToken;
use crate::auth::oauth::OAuthError;

/// A fixed access token. It cannot be refreshed; once expired every request
/// fails with [`OAuthError::ExpiredAccessToken`].
#[derive(Debug, Clone)]
pub struct AccessTokenClient {
    token: AccessToken,
    expires_at: DateTime<Utc>,
}

impl AccessTokenClient {
    /// Wraps a token and its expiry.
    #[must_use]
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: AccessToken::new(access_token, Some(expires_at)),
            expires_at,
        }
    }

    /// Returns `Bearer <token>`.
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::ExpiredAccessToken`] once the expiry has passed.
    pub fn authorization_header(&self) -> Result<String, OAuthError> {
        if Utc::now() >= self.expires_at {
            return Err(OAuthError::ExpiredAccessToken {
                expired_at: self.expires_at,
            });
        }
        Ok(self.token.bearer())
    }

    /// Returns the token expiry.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}
