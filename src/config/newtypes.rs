//! Validated newtype wrappers for configuration values.
//!
//! This module provides type-safe wrappers around string values that validate
//! their contents on construction. Invalid values are rejected with clear error messages.

use crate::error::ConfigError;
use std::fmt;

/// Placeholder shipped in sample configuration files.
pub const DEFAULT_APPLICATION_NAME: &str = "INSERT_APPLICATION_NAME_HERE";

/// A validated application name (Ad Manager) or user agent (AdWords).
///
/// The name identifies the calling application to Google and is sent with
/// every request, followed by the library signature.
///
/// # Example
///
/// ```rust
/// use googleads::ApplicationName;
///
/// let name = ApplicationName::new("Quarterly report exporter").unwrap();
/// assert_eq!(name.as_ref(), "Quarterly report exporter");
///
/// assert!(ApplicationName::new("").is_err());
/// assert!(ApplicationName::new("INSERT_APPLICATION_NAME_HERE").is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplicationName(String);

impl ApplicationName {
    /// Creates a new validated application name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyApplicationName`] if the name is empty or
    /// whitespace, and [`ConfigError::DefaultApplicationName`] if it still
    /// contains the sample placeholder.
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ConfigError::EmptyApplicationName);
        }
        if name.contains(DEFAULT_APPLICATION_NAME) {
            return Err(ConfigError::DefaultApplicationName { name });
        }
        Ok(Self(name))
    }
}

impl AsRef<str> for ApplicationName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated Ad Manager network code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkCode(String);

impl NetworkCode {
    /// Creates a new validated network code.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyNetworkCode`] if the code is empty.
    pub fn new(code: impl Into<String>) -> Result<Self, ConfigError> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(ConfigError::EmptyNetworkCode);
        }
        Ok(Self(code))
    }
}

impl AsRef<str> for NetworkCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated AdWords developer token.
///
/// # Security
///
/// The `Debug` implementation masks the token, displaying only
/// `DeveloperToken(*****)`.
///
/// # Example
///
/// ```rust
/// use googleads::DeveloperToken;
///
/// let token = DeveloperToken::new("abcdef123").unwrap();
/// assert_eq!(format!("{:?}", token), "DeveloperToken(*****)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct DeveloperToken(String);

impl DeveloperToken {
    /// Creates a new validated developer token.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyDeveloperToken`] if the token is empty.
    pub fn new(token: impl Into<String>) -> Result<Self, ConfigError> {
        let token = token.into();
        if token.is_empty() {
            return Err(ConfigError::EmptyDeveloperToken);
        }
        Ok(Self(token))
    }
}

impl AsRef<str> for DeveloperToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DeveloperToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DeveloperToken(*****)")
    }
}

/// A validated AdWords client customer id, such as `123-456-7890`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientCustomerId(String);

impl ClientCustomerId {
    /// Creates a new validated client customer id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyClientCustomerId`] if the id is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ConfigError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ConfigError::EmptyClientCustomerId);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for ClientCustomerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated server base URL with any trailing slash removed.
///
/// # Example
///
/// ```rust
/// use googleads::ServerUrl;
///
/// let server = ServerUrl::new("https://ads.google.com/").unwrap();
/// assert_eq!(server.as_ref(), "https://ads.google.com");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ServerUrl(String);

impl ServerUrl {
    /// Creates a new validated server URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidServerUrl`] if the URL has no
    /// `http://` or `https://` scheme or no host.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        let trimmed = url.trim_end_matches('/');
        let rest = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"));
        match rest {
            Some(host) if !host.is_empty() => Ok(Self(trimmed.to_string())),
            _ => Err(ConfigError::InvalidServerUrl { url }),
        }
    }
}

impl AsRef<str> for ServerUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
