//! Proxy and TLS configuration.
//!
//! [`ProxyConfig`] is an immutable record of proxy servers and trust settings.
//! It produces the `reqwest::Client` used for every outbound request: WSDL
//! fetches, SOAP calls, OAuth2 token refreshes and report downloads.
//!
//! # Example
//!
//! ```rust
//! use googleads::config::{Proxy, ProxyConfig};
//! use std::time::Duration;
//!
//! let config = ProxyConfig::builder()
//!     .https_proxy(Proxy::new("proxy.example.com", 3128).with_credentials("user", "pass"))
//!     .build();
//!
//! let client = config.build_http_client(Duration::from_secs(3600)).unwrap();
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// An HTTP proxy server.
///
/// The `Display` implementation renders `user:pass@host:port` when
/// credentials are present and `host:port` otherwise. `Debug` masks the
/// password.
#[derive(Clone, PartialEq, Eq)]
pub struct Proxy {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<String>,
}

impl Proxy {
    /// Creates a proxy without credentials.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
        }
    }

    /// Adds basic-auth credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Returns the proxy host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the proxy port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    fn to_reqwest(&self, https: bool) -> Result<reqwest::Proxy, ConfigError> {
        let url = self.url();
        let proxy = if https {
            reqwest::Proxy::https(&url)
        } else {
            reqwest::Proxy::http(&url)
        }
        .map_err(|e| ConfigError::InvalidProxy {
            proxy: url.clone(),
            reason: e.to_string(),
        })?;

        Ok(match (&self.username, &self.password) {
            (Some(username), Some(password)) => proxy.basic_auth(username, password),
            _ => proxy,
        })
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => {
                write!(f, "{username}:{password}@{}:{}", self.host, self.port)
            }
            _ => write!(f, "{}:{}", self.host, self.port),
        }
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "*****"))
            .finish()
    }
}

/// Proxy and TLS settings for outbound HTTP.
///
/// # Security
///
/// Setting `disable_certificate_validation` makes every connection accept
/// any server certificate, including forged ones. Only use it against test
/// servers. When it is set, any configured `cafile` is ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    http_proxy: Option<Proxy>,
    https_proxy: Option<Proxy>,
    cafile: Option<PathBuf>,
    disable_certificate_validation: bool,
}

impl ProxyConfig {
    /// Creates a builder for a `ProxyConfig`.
    #[must_use]
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder::default()
    }

    /// Returns the proxy used for `http://` URLs.
    #[must_use]
    pub const fn http_proxy(&self) -> Option<&Proxy> {
        self.http_proxy.as_ref()
    }

    /// Returns the proxy used for `https://` URLs.
    #[must_use]
    pub const fn https_proxy(&self) -> Option<&Proxy> {
        self.https_proxy.as_ref()
    }

    /// Returns the CA bundle path. Always `None` when validation is disabled.
    #[must_use]
    pub fn cafile(&self) -> Option<&Path> {
        self.cafile.as_deref()
    }

    /// Returns whether certificate validation is disabled.
    #[must_use]
    pub const fn disable_certificate_validation(&self) -> bool {
        self.disable_certificate_validation
    }

    /// Builds a `reqwest::Client` honoring these settings.
    ///
    /// `timeout` bounds both connection establishment and the whole request.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidProxy`] for an unusable proxy,
    /// [`ConfigError::UnreadableCaFile`] if the CA file cannot be loaded and
    /// [`ConfigError::HttpClient`] if the TLS backend fails to initialize.
    pub fn build_http_client(&self, timeout: Duration) -> Result<reqwest::Client, ConfigError> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .connect_timeout(timeout);

        if let Some(proxy) = &self.http_proxy {
            builder = builder.proxy(proxy.to_reqwest(false)?);
        }
        if let Some(proxy) = &self.https_proxy {
            builder = builder.proxy(proxy.to_reqwest(true)?);
        }

        if self.disable_certificate_validation {
            builder = builder.danger_accept_invalid_certs(true);
        } else if let Some(path) = &self.cafile {
            let unreadable = |reason: String| ConfigError::UnreadableCaFile {
                path: path.display().to_string(),
                reason,
            };
            let pem = std::fs::read(path).map_err(|e| unreadable(e.to_string()))?;
            let certificate =
                reqwest::Certificate::from_pem(&pem).map_err(|e| unreadable(e.to_string()))?;
            builder = builder.add_root_certificate(certificate);
        }

        builder.build().map_err(|e| ConfigError::HttpClient {
            reason: e.to_string(),
        })
    }
}

/// Builder for [`ProxyConfig`].
#[derive(Debug, Default)]
pub struct ProxyConfigBuilder {
    http_proxy: Option<Proxy>,
    https_proxy: Option<Proxy>,
    cafile: Option<PathBuf>,
    disable_certificate_validation: bool,
}

impl ProxyConfigBuilder {
    /// Sets the proxy for plain HTTP requests.
    #[must_use]
    pub fn http_proxy(mut self, proxy: Proxy) -> Self {
        self.http_proxy = Some(proxy);
        self
    }

    /// Sets the proxy for HTTPS requests.
    #[must_use]
    pub fn https_proxy(mut self, proxy: Proxy) -> Self {
        self.https_proxy = Some(proxy);
        self
    }

    /// Adds a PEM CA bundle to the trust store.
    #[must_use]
    pub fn cafile(mut self, path: impl Into<PathBuf>) -> Self {
        self.cafile = Some(path.into());
        self
    }

    /// Disables TLS certificate validation. See the security note on
    /// [`ProxyConfig`].
    #[must_use]
    pub const fn disable_certificate_validation(mut self, disable: bool) -> Self {
        self.disable_certificate_validation = disable;
        self
    }

    /// Builds the immutable configuration.
    #[must_use]
    pub fn build(self) -> ProxyConfig {
        let cafile = if self.disable_certificate_validation {
            None
        } else {
            self.cafile
        };
        ProxyConfig {
            http_proxy: self.http_proxy,
            https_proxy: self.https_proxy,
            cafile,
            disable_certificate_validation: self.disable_certificate_validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_display_includes_credentials() {
        let proxy = Proxy::new("myproxy.com", 443).with_credentials("user", "pass");
        assert_eq!(proxy.to_string(), "user:pass@myproxy.com:443");

        let proxy = Proxy::new("myproxy.com", 8080);
        assert_eq!(proxy.to_string(), "myproxy.com:8080");
    }

    #[test]
    fn test_proxy_debug_masks_password() {
        let proxy = Proxy::new("myproxy.com", 443).with_credentials("user", "hunter2");
        let debug = format!("{proxy:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("*****"));
    }

    #[test]
    fn test_disabling_validation_drops_cafile() {
        let config = ProxyConfig::builder()
            .cafile("/etc/ssl/ca.pem")
            .disable_certificate_validation(true)
            .build();
        assert!(config.cafile().is_none());
        assert!(config.disable_certificate_validation());
    }

    #[test]
    fn test_cafile_kept_when_validating() {
        let config = ProxyConfig::builder().cafile("/etc/ssl/ca.pem").build();
        assert_eq!(config.cafile(), Some(Path::new("/etc/ssl/ca.pem")));
    }

    #[test]
    fn test_build_http_client_with_proxies() {
        let config = ProxyConfig::builder()
            .http_proxy(Proxy::new("localhost", 3128))
            .https_proxy(Proxy::new("localhost", 3129).with_credentials("u", "p"))
            .build();
        assert!(config.build_http_client(Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn test_build_http_client_rejects_missing_cafile() {
        let config = ProxyConfig::builder()
            .cafile("/nonexistent/googleads/ca.pem")
            .build();
        let result = config.build_http_client(Duration::from_secs(10));
        assert!(matches!(result, Err(ConfigError::UnreadableCaFile { .. })));
    }
}
