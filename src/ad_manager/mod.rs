//! Google Ad Manager client.
//!
//! [`AdManagerClient`] hands out [`SoapService`] proxies for the services of
//! each supported API version, and a [`DataDownloader`] for report jobs and
//! paged PQL queries.
//!
//! # Example
//!
//! ```rust,ignore
//! use googleads::{AdManagerClient, AdManagerConfig};
//! use googleads::pql::StatementBuilder;
//! use googleads::soap::RequestContext;
//!
//! let client = AdManagerClient::new(config)?;
//! let line_items = client.service("LineItemService", None, None).await?;
//!
//! let statement = StatementBuilder::new().where_clause("Status = 'READY'");
//! let page = line_items
//!     .call_with_context(
//!         RequestContext::new().with_utility(&statement),
//!         "getLineItemsByStatement",
//!         vec![statement.to_statement()?.into()],
//!     )
//!     .await?;
//! ```

mod convert;
mod downloader;
mod packer;
mod services;

pub use convert::{convert_value_for_csv, EMPTY_CELL};
pub use downloader::{DataDownloader, ReportDownloadOptions, ReportJobStatus, DEFAULT_POLL_INTERVAL};
pub use packer::AdManagerPacker;
pub use services::{
    is_supported_service, is_supported_version, service_url, services_for, DEFAULT_ENDPOINT,
    LATEST_VERSION, SUPPORTED_VERSIONS,
};

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{AdManagerConfig, ServerUrl};
use crate::error::{ConfigError, GoogleAdsError};
use crate::soap::{
    HeaderHandler, HttpTransport, ProductHeader, ServiceEndpoint, ServiceOptions, SoapService,
};

/// `(service, version, server)`
type ServiceKey = (String, String, String);

/// Client for the Ad Manager SOAP API.
///
/// Cloning is cheap: clones share credentials, the HTTP connection pool and
/// the cache of loaded services.
#[derive(Clone, Debug)]
pub struct AdManagerClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    config: AdManagerConfig,
    headers: Arc<HeaderHandler>,
    transport: HttpTransport,
    services: Mutex<HashMap<ServiceKey, Arc<SoapService>>>,
}

// Verify AdManagerClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AdManagerClient>();
};

impl AdManagerClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the HTTP client cannot be built from the
    /// proxy and TLS settings.
    pub fn new(config: AdManagerConfig) -> Result<Self, ConfigError> {
        let transport = HttpTransport::new(config.proxy_config(), config.timeout())?;
        let product = ProductHeader::AdManager {
            application_name: config.application_name().as_ref().to_string(),
            network_code: config.network_code().map(|code| code.as_ref().to_string()),
        };
        let headers = HeaderHandler::new(Arc::clone(config.credentials()), product)
            .with_custom_http_headers(config.custom_http_headers().clone())
            .with_compression(config.enable_compression())
            .with_utilities_in_user_agent(config.include_utilities_in_user_agent());

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                headers: Arc::new(headers),
                transport,
                services: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// The configuration this client was created with.
    #[must_use]
    pub fn config(&self) -> &AdManagerConfig {
        &self.inner.config
    }

    /// Returns a proxy for `service`.
    ///
    /// `version` defaults to [`LATEST_VERSION`] and `server` to
    /// [`DEFAULT_ENDPOINT`]; a trailing `/` on `server` is ignored. The
    /// service's WSDL is loaded on first use and the proxy is cached for
    /// later calls with the same arguments.
    ///
    /// # Errors
    ///
    /// - [`GoogleAdsError::UnknownVersion`] for versions this library does
    ///   not know
    /// - [`GoogleAdsError::UnknownService`] for services missing from the
    ///   version
    /// - [`GoogleAdsError::Config`] for an invalid server URL
    /// - [`GoogleAdsError::Soap`] if the WSDL cannot be loaded
    pub async fn service(
        &self,
        name: &str,
        version: Option<&str>,
        server: Option<&str>,
    ) -> Result<Arc<SoapService>, GoogleAdsError> {
        let version = resolve_version(version)?;
        if !is_supported_service(version, name) {
            return Err(GoogleAdsError::UnknownService {
                service: name.to_string(),
                version: version.to_string(),
                supported: services_for(version).join(", "),
            });
        }
        let server = resolve_server(server)?;

        let key = (name.to_string(), version.to_string(), server.clone());
        let cached = self.inner.services.lock().get(&key).cloned();
        if let Some(service) = cached {
            return Ok(service);
        }

        let endpoint = ServiceEndpoint {
            name: name.to_string(),
            version: version.to_string(),
            url: service_url(&server, version, name),
        };
        let service = SoapService::load(
            endpoint,
            Arc::clone(&self.inner.headers),
            self.inner.transport.clone(),
            self.inner.config.wsdl_cache(),
            ServiceOptions {
                packer: Arc::new(AdManagerPacker),
                populate_type_field: false,
            },
        )
        .await?;

        // A concurrent load of the same service may have finished first.
        let service = Arc::clone(
            self.inner
                .services
                .lock()
                .entry(key)
                .or_insert_with(|| Arc::new(service)),
        );
        Ok(service)
    }

    /// Returns a [`DataDownloader`] for `version` on `server`, with the same
    /// defaults as [`AdManagerClient::service`].
    ///
    /// # Errors
    ///
    /// Returns [`GoogleAdsError::UnknownVersion`] or
    /// [`GoogleAdsError::Config`] for an invalid version or server.
    pub fn data_downloader(
        &self,
        version: Option<&str>,
        server: Option<&str>,
    ) -> Result<DataDownloader, GoogleAdsError> {
        let version = resolve_version(version)?;
        let server = resolve_server(server)?;
        Ok(DataDownloader::new(
            self.clone(),
            version.to_string(),
            server,
        ))
    }
}

fn resolve_version(version: Option<&str>) -> Result<&str, GoogleAdsError> {
    let version = version.unwrap_or(LATEST_VERSION);
    if is_supported_version(version) {
        Ok(version)
    } else {
        Err(GoogleAdsError::UnknownVersion {
            version: version.to_string(),
            supported: SUPPORTED_VERSIONS.join(", "),
        })
    }
}

fn resolve_server(server: Option<&str>) -> Result<String, GoogleAdsError> {
    let server = ServerUrl::new(server.unwrap_or(DEFAULT_ENDPOINT))?;
    Ok(server.as_ref().to_string())
}
