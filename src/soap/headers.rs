//! SOAP and HTTP headers for each request.
//!
//! The SOAP `RequestHeader` carries the application name with a library
//! signature appended, e.g.
//! `my-app (DfpApi-Rust, googleads/0.1.0, Rust/1.70, StatementBuilder)`.
//! Utilities such as [`crate::pql::StatementBuilder`] register themselves
//! in a [`RequestContext`]; the names recorded there are listed in the
//! signature of that one request only.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::auth::oauth::{OAuth2Client, OAuthError, AUTHORIZATION_HEADER};
use crate::soap::value::SoapObject;

/// Library version reported in the signature.
pub const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Signature prefix for Ad Manager requests.
pub const AD_MANAGER_SIGNATURE: &str = "DfpApi-Rust";

/// Signature prefix for AdWords requests.
pub const ADWORDS_SIGNATURE: &str = "AwApi-Rust";

const COMPRESSION_SUFFIX: &str = " (gzip)";

/// A helper whose use is reported in the user agent.
pub trait Utility {
    /// Name listed in the library signature.
    fn utility_name(&self) -> &'static str;
}

/// Per-request state: the utilities used to build this request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    utilities: BTreeSet<&'static str>,
}

impl RequestContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a utility and returns the context.
    #[must_use]
    pub fn with_utility(mut self, utility: &impl Utility) -> Self {
        self.record(utility);
        self
    }

    /// Records a utility.
    pub fn record(&mut self, utility: &impl Utility) {
        self.utilities.insert(utility.utility_name());
    }

    /// Recorded utility names in sorted order.
    pub fn utilities(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.utilities.iter().copied()
    }
}

/// Builds ` (<prefix>, googleads/<version>, Rust/<rust version>[, utilities])`.
#[must_use]
pub fn library_signature<'a>(prefix: &str, utilities: impl IntoIterator<Item = &'a str>) -> String {
    let rust_version = env!("CARGO_PKG_RUST_VERSION");
    let mut parts = vec![
        prefix.to_string(),
        format!("googleads/{LIBRARY_VERSION}"),
        format!("Rust/{rust_version}"),
    ];
    parts.extend(utilities.into_iter().map(str::to_string));
    format!(" ({})", parts.join(", "))
}

/// Product-specific header values.
#[derive(Clone, Debug)]
pub enum ProductHeader {
    /// Ad Manager `SoapRequestHeader`.
    AdManager {
        /// Application name without signature.
        application_name: String,
        /// Network code, if configured.
        network_code: Option<String>,
    },
    /// AdWords `SoapHeader`.
    AdWords {
        /// Developer token.
        developer_token: String,
        /// User agent without signature.
        user_agent: String,
        /// Client customer ID, if configured.
        client_customer_id: Option<String>,
        /// Validate requests without executing them.
        validate_only: bool,
        /// Allow partial failure of mutate operations.
        partial_failure: bool,
    },
}

/// Produces the SOAP and HTTP headers of every request.
#[derive(Debug)]
pub struct HeaderHandler {
    credentials: Arc<OAuth2Client>,
    product: ProductHeader,
    custom_http_headers: HashMap<String, String>,
    enable_compression: bool,
    include_utilities: bool,
}

impl HeaderHandler {
    /// Creates a handler with no custom headers, compression off and
    /// utility reporting on.
    #[must_use]
    pub fn new(credentials: Arc<OAuth2Client>, product: ProductHeader) -> Self {
        Self {
            credentials,
            product,
            custom_http_headers: HashMap::new(),
            enable_compression: false,
            include_utilities: true,
        }
    }

    /// Adds headers to every HTTP request.
    #[must_use]
    pub fn with_custom_http_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.custom_http_headers = headers;
        self
    }

    /// Requests gzip-compressed responses.
    #[must_use]
    pub const fn with_compression(mut self, enable: bool) -> Self {
        self.enable_compression = enable;
        self
    }

    /// Controls whether utility names appear in the signature.
    #[must_use]
    pub const fn with_utilities_in_user_agent(mut self, include: bool) -> Self {
        self.include_utilities = include;
        self
    }

    /// The credentials.
    #[must_use]
    pub fn credentials(&self) -> &OAuth2Client {
        &self.credentials
    }

    /// The product header values.
    #[must_use]
    pub const fn product(&self) -> &ProductHeader {
        &self.product
    }

    /// The custom HTTP headers.
    #[must_use]
    pub const fn custom_http_headers(&self) -> &HashMap<String, String> {
        &self.custom_http_headers
    }

    /// Returns `true` if compression is enabled.
    #[must_use]
    pub const fn compression_enabled(&self) -> bool {
        self.enable_compression
    }

    /// The library signature for a request.
    #[must_use]
    pub fn signature(&self, context: &RequestContext) -> String {
        let prefix = match self.product {
            ProductHeader::AdManager { .. } => AD_MANAGER_SIGNATURE,
            ProductHeader::AdWords { .. } => ADWORDS_SIGNATURE,
        };
        if self.include_utilities {
            library_signature(prefix, context.utilities())
        } else {
            library_signature(prefix, std::iter::empty())
        }
    }

    /// The SOAP `RequestHeader` value for a request.
    #[must_use]
    pub fn soap_header(&self, context: &RequestContext) -> SoapObject {
        let signature = self.signature(context);
        match &self.product {
            ProductHeader::AdManager {
                application_name,
                network_code,
            } => {
                let suffix = if self.enable_compression {
                    COMPRESSION_SUFFIX
                } else {
                    ""
                };
                let mut header = SoapObject::new();
                if let Some(network_code) = network_code {
                    header.set("networkCode", network_code.as_str());
                }
                header.set(
                    "applicationName",
                    format!("{application_name}{suffix}{signature}"),
                );
                header
            }
            ProductHeader::AdWords {
                developer_token,
                user_agent,
                client_customer_id,
                validate_only,
                partial_failure,
            } => {
                let mut header = SoapObject::new();
                if let Some(client_customer_id) = client_customer_id {
                    header.set("clientCustomerId", client_customer_id.as_str());
                }
                header.set("developerToken", developer_token.as_str());
                header.set("userAgent", format!("{user_agent}{signature}"));
                header.set("validateOnly", *validate_only);
                header.set("partialFailure", *partial_failure);
                header
            }
        }
    }

    /// HTTP headers for a SOAP call: Authorization, `Accept-Encoding` when
    /// compression is on, then the custom headers.
    ///
    /// # Errors
    ///
    /// Returns an [`OAuthError`] if the Authorization header cannot be
    /// produced.
    pub async fn http_headers(&self) -> Result<HashMap<String, String>, OAuthError> {
        let mut headers = self.credentials.create_http_header().await?;
        if self.enable_compression {
            insert_header(&mut headers, "Accept-Encoding", "gzip");
        }
        self.apply_custom_headers(&mut headers);
        Ok(headers)
    }

    /// Authorization plus custom headers, for plain downloads.
    ///
    /// # Errors
    ///
    /// Returns an [`OAuthError`] if the Authorization header cannot be
    /// produced.
    pub async fn download_headers(&self) -> Result<HashMap<String, String>, OAuthError> {
        let mut headers = self.credentials.create_http_header().await?;
        self.apply_custom_headers(&mut headers);
        Ok(headers)
    }

    /// Merges the custom headers into `headers`. A custom `Authorization`
    /// header is ignored.
    pub fn apply_custom_headers(&self, headers: &mut HashMap<String, String>) {
        for (key, value) in &self.custom_http_headers {
            if key.eq_ignore_ascii_case(AUTHORIZATION_HEADER) {
                tracing::warn!("Ignoring custom Authorization header; credentials always supply it");
                continue;
            }
            insert_header(headers, key, value);
        }
    }
}

/// Inserts a header, replacing any existing one with the same name
/// regardless of case.
pub fn insert_header(headers: &mut HashMap<String, String>, key: &str, value: &str) {
    headers.retain(|existing, _| !existing.eq_ignore_ascii_case(key));
    headers.insert(key.to_string(), value.to_string());
}

// Verify HeaderHandler is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HeaderHandler>();
};
