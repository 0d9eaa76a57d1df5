//! OAuth2-specific error types.
//!
//! # Error Types
//!
//! - [`OAuthError::InvalidGrant`]: the token endpoint rejected the grant (non-retryable)
//! - [`OAuthError::RefreshFailed`]: network failure or unexpected token endpoint response
//! - [`OAuthError::ExpiredAccessToken`]: a fixed access token is past its expiry
//! - [`OAuthError::RefreshUnsupported`]: the credential cannot mint new tokens
//! - [`OAuthError::InvalidKeyFile`] / [`OAuthError::InvalidKey`]: unusable service account key
//!
//! # Example
//!
//! ```rust
//! use googleads::auth::oauth::OAuthError;
//!
//! let error = OAuthError::InvalidGrant {
//!     description: "Token has been expired or revoked.".to_string(),
//! };
//! assert!(error.to_string().contains("invalid_grant"));
//! assert!(!error.is_retryable());
//! ```

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while producing or refreshing OAuth2 access tokens.
///
/// A failed refresh never updates the stored token.
#[derive(Debug, Error)]
pub enum OAuthError {
    /// The token endpoint answered `invalid_grant`.
    ///
    /// The refresh token was revoked or expired, or the service account
    /// assertion was rejected. Retrying will not help.
    #[error("Token endpoint returned invalid_grant: {description}")]
    InvalidGrant {
        /// The `error_description` returned by the endpoint.
        description: String,
    },

    /// Token refresh failed.
    ///
    /// `status` is `0` when no HTTP response was received.
    #[error("Token refresh failed with status {status}: {message}")]
    RefreshFailed {
        /// The HTTP status code returned, or `0` on network failure.
        status: u16,
        /// The error body or network error message.
        message: String,
    },

    /// A fixed access token has expired.
    #[error("Access token expired at {expired_at}. Supply a new token or use refreshable credentials.")]
    ExpiredAccessToken {
        /// When the token expired.
        expired_at: DateTime<Utc>,
    },

    /// The credential holds a fixed token and cannot be refreshed.
    #[error("This credential holds a fixed access token and cannot be refreshed")]
    RefreshUnsupported,

    /// The service account key file could not be read or parsed.
    #[error("Invalid service account key file '{path}': {reason}")]
    InvalidKeyFile {
        /// Path of the key file.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The private key could not be used to sign an assertion.
    #[error("Invalid service account private key: {reason}")]
    InvalidKey {
        /// Why the key was rejected.
        reason: String,
    },
}

impl OAuthError {
    /// Returns `true` if the caller may reasonably retry the operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RefreshFailed { .. })
    }
}

// Verify OAuthError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<OAuthError>();
};
