//! # Google Ads SOAP client library
//!
//! A Rust client for the Google Ad Manager and AdWords SOAP APIs, with
//! OAuth2 credentials, dynamic WSDL-driven service proxies, PQL statement
//! building and report downloads.
//!
//! ## Overview
//!
//! This library provides:
//! - Type-safe configuration via [`AdManagerConfig`] and [`AdWordsConfig`]
//! - Validated newtypes for application names, network codes and tokens
//! - OAuth2 refresh-token, service-account and fixed-token credentials via
//!   [`auth::oauth`]
//! - Service proxies that load a service's WSDL and invoke its operations by
//!   name via [`soap::SoapService`]
//! - PQL statement building with typed bind variables via [`pql`]
//! - Report job polling, report downloads and paged PQL exports via
//!   [`DataDownloader`]
//! - AdWords report downloads via [`adwords::ReportDownloader`]
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use googleads::auth::oauth::AccessTokenClient;
//! use googleads::{AdManagerClient, AdManagerConfig, ApplicationName, NetworkCode};
//!
//! let config = AdManagerConfig::builder()
//!     .credentials(AccessTokenClient::new("ya29.token", Utc::now() + Duration::hours(1)))
//!     .application_name(ApplicationName::new("Report exporter").unwrap())
//!     .network_code(NetworkCode::new("1234567").unwrap())
//!     .build()
//!     .unwrap();
//!
//! let client = AdManagerClient::new(config).unwrap();
//! assert_eq!(client.config().application_name().as_ref(), "Report exporter");
//! ```
//!
//! ## Calling a Service
//!
//! ```rust,ignore
//! use googleads::pql::StatementBuilder;
//! use googleads::soap::RequestContext;
//!
//! let line_items = client.service("LineItemService", None, None).await?;
//! let statement = StatementBuilder::new()
//!     .where_clause("LineItemType = :type")
//!     .with_bind_variable("type", "STANDARD")?;
//!
//! let page = line_items
//!     .call_with_context(
//!         RequestContext::new().with_utility(&statement),
//!         "getLineItemsByStatement",
//!         vec![statement.to_statement()?.into()],
//!     )
//!     .await?;
//! ```
//!
//! ## Running a Report
//!
//! ```rust,ignore
//! use googleads::ad_manager::{ReportDownloadOptions, DEFAULT_POLL_INTERVAL};
//! use googleads::soap::SoapObject;
//!
//! let downloader = client.data_downloader(None, None)?;
//! let job = SoapObject::new().with(
//!     "reportQuery",
//!     SoapObject::new()
//!         .with("dimensions", vec!["DATE"])
//!         .with("columns", vec!["AD_SERVER_IMPRESSIONS"])
//!         .with("dateRangeType", "YESTERDAY"),
//! );
//! let report_job_id = downloader.wait_for_report(job, DEFAULT_POLL_INTERVAL).await?;
//!
//! let mut file = tokio::fs::File::create("report.csv.gz").await?;
//! downloader
//!     .download_report_to_file(report_job_id, "CSV_DUMP", &mut file, ReportDownloadOptions::default())
//!     .await?;
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: Configuration is instance-based and passed explicitly
//! - **Fail-fast validation**: All newtypes validate on construction
//! - **Thread-safe**: All types are `Send + Sync`
//! - **Async-first**: Designed for use with Tokio, with blocking variants for
//!   the long-running report operations

pub mod ad_manager;
pub mod adwords;
pub mod auth;
pub mod config;
pub mod error;
pub mod pql;
pub mod soap;

// Re-export public types at crate root for convenience
pub use ad_manager::{AdManagerClient, DataDownloader};
pub use adwords::{AdWordsClient, AdWordsReportError};
pub use config::{
    AdManagerConfig, AdManagerConfigBuilder, AdWordsConfig, AdWordsConfigBuilder, ApplicationName,
    ClientCustomerId, DeveloperToken, NetworkCode, ProxyConfig, ServerUrl, WsdlCache,
};
pub use error::{ConfigError, GoogleAdsError};

// Re-export OAuth types for convenience
pub use auth::oauth::{OAuth2Client, OAuthError};
