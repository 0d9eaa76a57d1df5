//! AdWords client.
//!
//! [`AdWordsClient`] hands out [`SoapService`] proxies for the AdWords SOAP
//! services and a [`ReportDownloader`] for reports.
//!
//! Derived types are selected with [`crate::soap::SoapObject::of_type`]; the
//! matching `<Base>.Type` element is filled in automatically.

mod errors;
mod report;
mod services;

pub use errors::AdWordsReportError;
pub use report::ReportDownloader;
pub use services::{
    is_supported_version, report_download_url, service_namespace, service_url, services_for,
    DEFAULT_ENDPOINT, LATEST_VERSION, SUPPORTED_VERSIONS,
};

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{AdWordsConfig, ServerUrl};
use crate::error::{ConfigError, GoogleAdsError};
use crate::soap::{
    DefaultPacker, HeaderHandler, HttpTransport, ProductHeader, ServiceEndpoint, ServiceOptions,
    SoapService,
};

/// `(service, version, server)`
type ServiceKey = (String, String, String);

/// Client for the AdWords SOAP API.
///
/// Cloning is cheap: clones share credentials, the HTTP connection pool and
/// the cache of loaded services.
///
/// # Example
///
/// ```rust,ignore
/// use googleads::soap::{SoapObject, SoapValue};
///
/// let client = AdWordsClient::new(config)?;
/// let campaigns = client.service("CampaignService", None, None).await?;
/// let selector = SoapObject::new()
///     .with("fields", vec!["Id", "Name"])
///     .with("paging", SoapObject::new().with("startIndex", 0).with("numberResults", 100));
/// let page = campaigns.call("get", vec![selector.into()]).await?;
/// ```
#[derive(Clone, Debug)]
pub struct AdWordsClient {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    config: AdWordsConfig,
    headers: Arc<HeaderHandler>,
    transport: HttpTransport,
    services: Mutex<HashMap<ServiceKey, Arc<SoapService>>>,
}

// Verify AdWordsClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<AdWordsClient>();
};

impl AdWordsClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the HTTP client cannot be built from the
    /// proxy and TLS settings.
    pub fn new(config: AdWordsConfig) -> Result<Self, ConfigError> {
        let transport = HttpTransport::new(config.proxy_config(), config.timeout())?;
        let product = ProductHeader::AdWords {
            developer_token: config.developer_token().as_ref().to_string(),
            user_agent: config.user_agent().as_ref().to_string(),
            client_customer_id: config.client_customer_id().map(|id| id.as_ref().to_string()),
            validate_only: config.validate_only(),
            partial_failure: config.partial_failure(),
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
    pub fn config(&self) -> &AdWordsConfig {
        &self.inner.config
    }

    /// Returns a proxy for `service`.
    ///
    /// `version` defaults to [`LATEST_VERSION`] and `server` to
    /// [`DEFAULT_ENDPOINT`]. Proxies are cached like
    /// [`crate::AdManagerClient::service`].
    ///
    /// # Errors
    ///
    /// - [`GoogleAdsError::UnknownVersion`] or
    ///   [`GoogleAdsError::UnknownService`] for names this library does not
    ///   know
    /// - [`GoogleAdsError::Config`] for an invalid server URL
    /// - [`GoogleAdsError::Soap`] if the WSDL cannot be loaded
    pub async fn service(
        &self,
        name: &str,
        version: Option<&str>,
        server: Option<&str>,
    ) -> Result<Arc<SoapService>, GoogleAdsError> {
        let version = resolve_version(version)?;
        let namespace =
            service_namespace(version, name).ok_or_else(|| GoogleAdsError::UnknownService {
                service: name.to_string(),
                version: version.to_string(),
                supported: services_for(version).join(", "),
            })?;
        let server = resolve_server(server)?;

        let key = (name.to_string(), version.to_string(), server.clone());
        let cached = self.inner.services.lock().get(&key).cloned();
        if let Some(service) = cached {
            return Ok(service);
        }

        let endpoint = ServiceEndpoint {
            name: name.to_string(),
            version: version.to_string(),
            url: service_url(&server, namespace, version, name),
        };
        let service = SoapService::load(
            endpoint,
            Arc::clone(&self.inner.headers),
            self.inner.transport.clone(),
            self.inner.config.wsdl_cache(),
            ServiceOptions {
                packer: Arc::new(DefaultPacker),
                populate_type_field: true,
            },
        )
        .await?;

        let service = Arc::clone(
            self.inner
                .services
                .lock()
                .entry(key)
                .or_insert_with(|| Arc::new(service)),
        );
        Ok(service)
    }

    /// Returns a [`ReportDownloader`] for `version` on `server`.
    ///
    /// # Errors
    ///
    /// Returns [`GoogleAdsError::UnknownVersion`] or
    /// [`GoogleAdsError::Config`] for an invalid version or server.
    pub fn report_downloader(
        &self,
        version: Option<&str>,
        server: Option<&str>,
    ) -> Result<ReportDownloader, GoogleAdsError> {
        let version = resolve_version(version)?;
        let server = resolve_server(server)?;
        Ok(ReportDownloader::new(self.clone(), version, &server))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::oauth::AccessTokenClient;
    use crate::config::{ApplicationName, DeveloperToken};
    use chrono::{Duration, Utc};

    fn client() -> AdWordsClient {
        let config = AdWordsConfig::builder()
            .credentials(AccessTokenClient::new("token", Utc::now() + Duration::hours(1)))
            .developer_token(DeveloperToken::new("dev-token").unwrap())
            .user_agent(ApplicationName::new("unit tests").unwrap())
            .build()
            .unwrap();
        AdWordsClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_service_is_rejected() {
        let error = client()
            .service("LineItemService", None, Some("http://127.0.0.1:9"))
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            GoogleAdsError::UnknownService { service, supported, .. }
                if service == "LineItemService" && supported.contains("CampaignService")
        ));
    }

    #[tokio::test]
    async fn test_unknown_version_is_rejected() {
        let error = client()
            .service("CampaignService", Some("v201309"), None)
            .await
            .unwrap_err();
        assert!(matches!(error, GoogleAdsError::UnknownVersion { .. }));
    }

    #[test]
    fn test_report_downloader_endpoint() {
        let downloader = client()
            .report_downloader(None, Some("https://adwords.example.com/"))
            .unwrap();
        assert_eq!(
            downloader.endpoint(),
            "https://adwords.example.com/api/adwords/reportdownload/v201402"
        );
        assert_eq!(
            downloader.schema_url(),
            "https://adwords.example.com/api/adwords/reportdownload/v201402/reportDefinition.xsd"
        );
    }
}
