//! Error types for the Google Ads client library.
//!
//! This module contains the configuration error raised by constructors and
//! builders, and [`GoogleAdsError`], the error returned by the top-level
//! clients and the data downloader.
//!
//! # Error Handling
//!
//! All configuration constructors return `Result<T, ConfigError>` to enable
//! fail-fast validation. Lower layers (OAuth, SOAP, PQL) have their own error
//! enums which convert into [`GoogleAdsError`] with `?`.
//!
//! # Example
//!
//! ```rust
//! use googleads::{ApplicationName, ConfigError};
//!
//! let result = ApplicationName::new("INSERT_APPLICATION_NAME_HERE");
//! assert!(matches!(result, Err(ConfigError::DefaultApplicationName { .. })));
//! ```

use thiserror::Error;

use crate::adwords::AdWordsReportError;
use crate::auth::oauth::OAuthError;
use crate::pql::StatementError;
use crate::soap::SoapError;

/// Errors that can occur while configuring a client.
///
/// Each variant provides a clear, actionable error message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Application name cannot be empty.
    #[error("Application name cannot be empty. Please provide a name that identifies your application.")]
    EmptyApplicationName,

    /// The placeholder application name was left in place.
    #[error("Application name '{name}' is the default placeholder. Please set it to a name that identifies your application.")]
    DefaultApplicationName {
        /// The rejected name.
        name: String,
    },

    /// Network code cannot be empty.
    #[error("Network code cannot be empty.")]
    EmptyNetworkCode,

    /// Developer token cannot be empty.
    #[error("Developer token cannot be empty. Please provide your AdWords API developer token.")]
    EmptyDeveloperToken,

    /// Client customer id cannot be empty.
    #[error("Client customer id cannot be empty.")]
    EmptyClientCustomerId,

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// Server URL is invalid.
    #[error("Invalid server URL '{url}'. Please provide a URL with an http or https scheme (e.g., 'https://ads.google.com').")]
    InvalidServerUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// A proxy could not be configured.
    #[error("Invalid proxy '{proxy}': {reason}")]
    InvalidProxy {
        /// The proxy URL, without credentials.
        proxy: String,
        /// Why the proxy was rejected.
        reason: String,
    },

    /// The CA certificate file could not be read or parsed.
    #[error("Unable to load CA file '{path}': {reason}")]
    UnreadableCaFile {
        /// Path to the CA file.
        path: String,
        /// Why loading failed.
        reason: String,
    },

    /// The HTTP client could not be created.
    #[error("Failed to create HTTP client: {reason}")]
    HttpClient {
        /// The underlying failure.
        reason: String,
    },
}

/// Error returned by the Ad Manager and AdWords clients and the data downloader.
///
/// Lower-level errors are wrapped unmodified so callers can match on the
/// precise failure. SOAP faults arrive as [`SoapError::Fault`].
#[derive(Debug, Error)]
pub enum GoogleAdsError {
    /// Client or argument configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The service is not available in the requested version.
    #[error("Unrecognized service '{service}' for version '{version}'. Supported services: {supported}")]
    UnknownService {
        /// The requested service name.
        service: String,
        /// The requested version.
        version: String,
        /// Comma-separated list of supported services.
        supported: String,
    },

    /// The requested version is not known to this library.
    #[error("Unrecognized version '{version}'. Supported versions: {supported}")]
    UnknownVersion {
        /// The requested version.
        version: String,
        /// Comma-separated list of supported versions.
        supported: String,
    },

    /// SOAP pipeline failure: transport, fault, unknown operation or marshalling.
    #[error(transparent)]
    Soap(#[from] SoapError),

    /// Credential failure outside of a SOAP call.
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    /// Invalid PQL statement or bind variable.
    #[error(transparent)]
    Statement(#[from] StatementError),

    /// A report job reached the `FAILED` state.
    #[error("Ad Manager report job failed. The ID of the failed report is: {report_job_id}")]
    ReportJobFailed {
        /// The id of the failed job.
        report_job_id: i64,
    },

    /// An AdWords report download was rejected.
    #[error(transparent)]
    AdWordsReport(#[from] AdWordsReportError),

    /// A returned `SetValue` mixed element types.
    #[error("The set value returned contains unsupported mix value types: {first} and {other}")]
    MixedSetVariants {
        /// Type of the first element.
        first: String,
        /// The first differing type.
        other: String,
    },

    /// A returned `DateTimeValue` named a zone missing from the zone database.
    #[error("Unknown time zone '{time_zone_id}'")]
    UnknownTimeZone {
        /// The zone id returned by the server.
        time_zone_id: String,
    },

    /// The server answered with a shape the library cannot interpret.
    #[error("Unexpected response from {operation}: {reason}")]
    UnexpectedResponse {
        /// The operation whose response was malformed.
        operation: String,
        /// What was wrong.
        reason: String,
    },

    /// Writing to a sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing CSV output failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

// Verify error types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ConfigError>();
    assert_send_sync::<GoogleAdsError>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_application_name_error_message() {
        let error = ConfigError::DefaultApplicationName {
            name: "INSERT_APPLICATION_NAME_HERE".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("INSERT_APPLICATION_NAME_HERE"));
        assert!(message.contains("default placeholder"));
    }

    #[test]
    fn test_missing_required_field_error_message() {
        let error = ConfigError::MissingRequiredField {
            field: "credentials",
        };
        let message = error.to_string();
        assert!(message.contains("credentials"));
        assert!(message.contains("must be set"));
    }

    #[test]
    fn test_report_job_failed_carries_id() {
        let error = GoogleAdsError::ReportJobFailed {
            report_job_id: 1234,
        };
        assert_eq!(
            error.to_string(),
            "Ad Manager report job failed. The ID of the failed report is: 1234"
        );
    }

    #[test]
    fn test_unknown_service_lists_supported() {
        let error = GoogleAdsError::UnknownService {
            service: "FooService".to_string(),
            version: "v202408".to_string(),
            supported: "ReportService, UserService".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("FooService"));
        assert!(message.contains("v202408"));
        assert!(message.contains("ReportService, UserService"));
    }

    #[test]
    fn test_config_error_converts_into_google_ads_error() {
        let error: GoogleAdsError = ConfigError::EmptyNetworkCode.into();
        assert!(matches!(
            error,
            GoogleAdsError::Config(ConfigError::EmptyNetworkCode)
        ));
    }

    #[test]
    fn test_error_implements_std_error() {
        let error = ConfigError::EmptyApplicationName;
        let _: &dyn std::error::Error = &error;
    }
}
