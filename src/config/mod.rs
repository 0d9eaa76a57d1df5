//! Configuration types for the Ad Manager and AdWords clients.
//!
//! # Overview
//!
//! - [`AdManagerConfig`] / [`AdManagerConfigBuilder`]: settings of an [`crate::AdManagerClient`]
//! - [`AdWordsConfig`] / [`AdWordsConfigBuilder`]: settings of an [`crate::AdWordsClient`]
//! - [`ProxyConfig`]: HTTP(S) proxies and TLS validation
//! - [`WsdlCache`]: where downloaded WSDL documents are kept
//! - Validated newtypes: [`ApplicationName`], [`NetworkCode`],
//!   [`DeveloperToken`], [`ClientCustomerId`], [`ServerUrl`]
//!
//! # Example
//!
//! ```rust,ignore
//! use googleads::auth::oauth::RefreshTokenClient;
//! use googleads::{AdManagerConfig, ApplicationName, NetworkCode};
//!
//! let config = AdManagerConfig::builder()
//!     .credentials(RefreshTokenClient::new("client-id", "client-secret", "refresh-token"))
//!     .application_name(ApplicationName::new("Report exporter").unwrap())
//!     .network_code(NetworkCode::new("1234567").unwrap())
//!     .build()
//!     .unwrap();
//! ```

mod newtypes;
mod proxy;
mod wsdl_cache;

pub use newtypes::{
    ApplicationName, ClientCustomerId, DeveloperToken, NetworkCode, ServerUrl,
    DEFAULT_APPLICATION_NAME,
};
pub use proxy::{Proxy, ProxyConfig, ProxyConfigBuilder};
pub use wsdl_cache::{WsdlCache, DEFAULT_WSDL_CACHE_MAX_AGE};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::oauth::OAuth2Client;
use crate::error::ConfigError;

/// Default HTTP timeout: one hour, long enough for large report downloads.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Settings shared by both products.
#[derive(Clone, Debug)]
struct TransportSettings {
    proxy_config: ProxyConfig,
    timeout: Duration,
    custom_http_headers: HashMap<String, String>,
    enable_compression: bool,
    include_utilities_in_user_agent: bool,
    wsdl_cache: WsdlCache,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            proxy_config: ProxyConfig::default(),
            timeout: DEFAULT_TIMEOUT,
            custom_http_headers: HashMap::new(),
            enable_compression: false,
            include_utilities_in_user_agent: true,
            wsdl_cache: WsdlCache::default(),
        }
    }
}

macro_rules! transport_getters {
    () => {
        /// Returns the proxy and TLS settings.
        #[must_use]
        pub const fn proxy_config(&self) -> &ProxyConfig {
            &self.transport.proxy_config
        }

        /// Returns the HTTP timeout.
        #[must_use]
        pub const fn timeout(&self) -> Duration {
            self.transport.timeout
        }

        /// Returns headers added to every HTTP request.
        #[must_use]
        pub const fn custom_http_headers(&self) -> &HashMap<String, String> {
            &self.transport.custom_http_headers
        }

        /// Returns whether gzip-compressed responses are requested.
        #[must_use]
        pub const fn enable_compression(&self) -> bool {
            self.transport.enable_compression
        }

        /// Returns whether utility names are reported in the user agent.
        #[must_use]
        pub const fn include_utilities_in_user_agent(&self) -> bool {
            self.transport.include_utilities_in_user_agent
        }

        /// Returns the WSDL cache setting.
        #[must_use]
        pub const fn wsdl_cache(&self) -> &WsdlCache {
            &self.transport.wsdl_cache
        }
    };
}

macro_rules! transport_setters {
    () => {
        /// Sets proxies and TLS validation.
        #[must_use]
        pub fn proxy_config(mut self, proxy_config: ProxyConfig) -> Self {
            self.transport.proxy_config = proxy_config;
            self
        }

        /// Sets the HTTP timeout (default one hour).
        #[must_use]
        pub const fn timeout(mut self, timeout: Duration) -> Self {
            self.transport.timeout = timeout;
            self
        }

        /// Replaces the headers added to every HTTP request.
        ///
        /// They override library defaults case-insensitively, except
        /// `Authorization`, which always comes from the credentials.
        #[must_use]
        pub fn custom_http_headers(mut self, headers: HashMap<String, String>) -> Self {
            self.transport.custom_http_headers = headers;
            self
        }

        /// Adds one header to every HTTP request.
        #[must_use]
        pub fn custom_http_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
            self.transport
                .custom_http_headers
                .insert(name.into(), value.into());
            self
        }

        /// Requests gzip-compressed responses (default off).
        #[must_use]
        pub const fn enable_compression(mut self, enable: bool) -> Self {
            self.transport.enable_compression = enable;
            self
        }

        /// Reports utilities such as `StatementBuilder` in the user agent
        /// (default on).
        #[must_use]
        pub const fn include_utilities_in_user_agent(mut self, include: bool) -> Self {
            self.transport.include_utilities_in_user_agent = include;
            self
        }

        /// Sets where WSDL documents are cached.
        #[must_use]
        pub fn wsdl_cache(mut self, cache: WsdlCache) -> Self {
            self.transport.wsdl_cache = cache;
            self
        }
    };
}

/// Configuration of an Ad Manager client.
///
/// # Example
///
/// ```rust
/// use chrono::{Duration, Utc};
/// use googleads::auth::oauth::AccessTokenClient;
/// use googleads::{AdManagerConfig, ApplicationName};
///
/// let config = AdManagerConfig::builder()
///     .credentials(AccessTokenClient::new("token", Utc::now() + Duration::hours(1)))
///     .application_name(ApplicationName::new("app").unwrap())
///     .build()
///     .unwrap();
///
/// assert!(config.network_code().is_none());
/// assert!(!config.enable_compression());
/// ```
#[derive(Clone, Debug)]
pub struct AdManagerConfig {
    credentials: Arc<OAuth2Client>,
    application_name: ApplicationName,
    network_code: Option<NetworkCode>,
    transport: TransportSettings,
}

impl AdManagerConfig {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> AdManagerConfigBuilder {
        AdManagerConfigBuilder::new()
    }

    /// Returns the credentials.
    #[must_use]
    pub fn credentials(&self) -> &Arc<OAuth2Client> {
        &self.credentials
    }

    /// Returns the application name.
    #[must_use]
    pub const fn application_name(&self) -> &ApplicationName {
        &self.application_name
    }

    /// Returns the network code, if configured.
    #[must_use]
    pub const fn network_code(&self) -> Option<&NetworkCode> {
        self.network_code.as_ref()
    }

    transport_getters!();
}

// Verify AdManagerConfig is Send + Sync at compile time
/// Credentials handed to a config builder.
#[derive(Debug)]
enum CredentialSource {
    /// Owned credentials; their token requests adopt the config's proxy
    /// and timeout.
    Owned(OAuth2Client),
    /// Shared credentials keep their own HTTP settings.
    Shared(Arc<OAuth2Client>),
}

impl CredentialSource {
    fn resolve(self, transport: &TransportSettings) -> Result<Arc<OAuth2Client>, ConfigError> {
        match self {
            Self::Owned(credentials) => Ok(Arc::new(
                credentials.with_proxy_config(&transport.proxy_config, transport.timeout)?,
            )),
            Self::Shared(credentials) => Ok(credentials),
        }
    }
}

const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AdManagerConfig>();
    assert_send_sync::<AdWordsConfig>();
};

/// Builder for [`AdManagerConfig`].
///
/// Required fields are `credentials` and `application_name`.
///
/// # Defaults
///
/// - `network_code`: `None`
/// - `timeout`: one hour
/// - `enable_compression`: `false`
/// - `include_utilities_in_user_agent`: `true`
/// - `wsdl_cache`: [`WsdlCache::default`]
#[derive(Debug, Default)]
pub struct AdManagerConfigBuilder {
    credentials: Option<CredentialSource>,
    application_name: Option<ApplicationName>,
    network_code: Option<NetworkCode>,
    transport: TransportSettings,
}

impl AdManagerConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the credentials (required).
    ///
    /// Token requests go through the configured proxy and timeout.
    #[must_use]
    pub fn credentials(mut self, credentials: impl Into<OAuth2Client>) -> Self {
        self.credentials = Some(CredentialSource::Owned(credentials.into()));
        self
    }

    /// Sets credentials shared with other clients.
    ///
    /// Shared credentials keep the HTTP settings they were created with;
    /// use [`OAuth2Client::with_proxy_config`] before sharing them.
    #[must_use]
    pub fn shared_credentials(mut self, credentials: Arc<OAuth2Client>) -> Self {
        self.credentials = Some(CredentialSource::Shared(credentials));
        self
    }

    /// Sets the application name (required).
    #[must_use]
    pub fn application_name(mut self, name: ApplicationName) -> Self {
        self.application_name = Some(name);
        self
    }

    /// Sets the network code.
    #[must_use]
    pub fn network_code(mut self, code: NetworkCode) -> Self {
        self.network_code = Some(code);
        self
    }

    transport_setters!();

    /// Builds the [`AdManagerConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `credentials` or
    /// `application_name` is not set, or a [`ConfigError`] if the token HTTP
    /// client cannot be built from the proxy settings.
    pub fn build(self) -> Result<AdManagerConfig, ConfigError> {
        let credentials = self
            .credentials
            .ok_or(ConfigError::MissingRequiredField {
                field: "credentials",
            })?
            .resolve(&self.transport)?;
        let application_name = self
            .application_name
            .ok_or(ConfigError::MissingRequiredField {
                field: "application_name",
            })?;

        Ok(AdManagerConfig {
            credentials,
            application_name,
            network_code: self.network_code,
            transport: self.transport,
        })
    }
}

/// Configuration of an AdWords client.
#[derive(Clone, Debug)]
pub struct AdWordsConfig {
    credentials: Arc<OAuth2Client>,
    developer_token: DeveloperToken,
    user_agent: ApplicationName,
    client_customer_id: Option<ClientCustomerId>,
    validate_only: bool,
    partial_failure: bool,
    transport: TransportSettings,
}

impl AdWordsConfig {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> AdWordsConfigBuilder {
        AdWordsConfigBuilder::new()
    }

    /// Returns the credentials.
    #[must_use]
    pub fn credentials(&self) -> &Arc<OAuth2Client> {
        &self.credentials
    }

    /// Returns the developer token.
    #[must_use]
    pub const fn developer_token(&self) -> &DeveloperToken {
        &self.developer_token
    }

    /// Returns the user agent.
    #[must_use]
    pub const fn user_agent(&self) -> &ApplicationName {
        &self.user_agent
    }

    /// Returns the client customer ID, if configured.
    #[must_use]
    pub const fn client_customer_id(&self) -> Option<&ClientCustomerId> {
        self.client_customer_id.as_ref()
    }

    /// Returns whether requests are only validated.
    #[must_use]
    pub const fn validate_only(&self) -> bool {
        self.validate_only
    }

    /// Returns whether partial failure is allowed.
    #[must_use]
    pub const fn partial_failure(&self) -> bool {
        self.partial_failure
    }

    transport_getters!();
}

/// Builder for [`AdWordsConfig`].
///
/// Required fields are `credentials`, `developer_token` and `user_agent`.
#[derive(Debug, Default)]
pub struct AdWordsConfigBuilder {
    credentials: Option<CredentialSource>,
    developer_token: Option<DeveloperToken>,
    user_agent: Option<ApplicationName>,
    client_customer_id: Option<ClientCustomerId>,
    validate_only: bool,
    partial_failure: bool,
    transport: TransportSettings,
}

impl AdWordsConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the credentials (required).
    ///
    /// Token requests go through the configured proxy and timeout.
    #[must_use]
    pub fn credentials(mut self, credentials: impl Into<OAuth2Client>) -> Self {
        self.credentials = Some(CredentialSource::Owned(credentials.into()));
        self
    }

    /// Sets credentials shared with other clients.
    ///
    /// Shared credentials keep the HTTP settings they were created with;
    /// use [`OAuth2Client::with_proxy_config`] before sharing them.
    #[must_use]
    pub fn shared_credentials(mut self, credentials: Arc<OAuth2Client>) -> Self {
        self.credentials = Some(CredentialSource::Shared(credentials));
        self
    }

    /// Sets the developer token (required).
    #[must_use]
    pub fn developer_token(mut self, token: DeveloperToken) -> Self {
        self.developer_token = Some(token);
        self
    }

    /// Sets the user agent (required).
    #[must_use]
    pub fn user_agent(mut self, user_agent: ApplicationName) -> Self {
        self.user_agent = Some(user_agent);
        self
    }

    /// Sets the client customer ID.
    #[must_use]
    pub fn client_customer_id(mut self, id: ClientCustomerId) -> Self {
        self.client_customer_id = Some(id);
        self
    }

    /// Only validate requests.
    #[must_use]
    pub const fn validate_only(mut self, validate_only: bool) -> Self {
        self.validate_only = validate_only;
        self
    }

    /// Allow partial failure of mutate operations.
    #[must_use]
    pub const fn partial_failure(mut self, partial_failure: bool) -> Self {
        self.partial_failure = partial_failure;
        self
    }

    transport_setters!();

    /// Builds the [`AdWordsConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if a required field is
    /// not set, or a [`ConfigError`] if the token HTTP client cannot be built
    /// from the proxy settings.
    pub fn build(self) -> Result<AdWordsConfig, ConfigError> {
        let credentials = self
            .credentials
            .ok_or(ConfigError::MissingRequiredField {
                field: "credentials",
            })?
            .resolve(&self.transport)?;
        let developer_token = self
            .developer_token
            .ok_or(ConfigError::MissingRequiredField {
                field: "developer_token",
            })?;
        let user_agent = self
            .user_agent
            .ok_or(ConfigError::MissingRequiredField { field: "user_agent" })?;

        Ok(AdWordsConfig {
            credentials,
            developer_token,
            user_agent,
            client_customer_id: self.client_customer_id,
            validate_only: self.validate_only,
            partial_failure: self.partial_failure,
            transport: self.transport,
        })
    }
}
