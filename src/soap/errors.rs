//! Error types for the SOAP layer.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::auth::oauth::OAuthError;
use crate::soap::schema::SchemaError;
use crate::soap::xml::{XmlElement, XmlError};

/// HTTP-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or the response not read.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with a non-success status and no SOAP fault.
    #[error("HTTP {code} from {url}: {body}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Requested URL.
        url: String,
        /// Response body.
        body: String,
    },

    /// A gzip-encoded response could not be inflated.
    #[error("Failed to decompress response: {0}")]
    Decompress(std::io::Error),
}

/// Failures while turning values into XML.
#[derive(Debug, Error)]
pub enum MarshalError {
    /// An `xsi_type` names a type the schema does not define.
    #[error("Unknown type '{type_name}'")]
    UnknownType {
        /// The requested type.
        type_name: String,
    },

    /// An object carries a field its type does not declare.
    #[error("Type '{type_name}' has no field '{field}'")]
    UnknownField {
        /// The object's resolved type.
        type_name: String,
        /// The offending field.
        field: String,
    },

    /// An object was given for an element whose type is not complex.
    #[error("Element '{element}' is not of a complex type")]
    NotComplex {
        /// The element name.
        element: String,
    },

    /// More positional arguments than the operation declares.
    #[error("Operation '{operation}' takes {expected} argument(s) but {given} were given")]
    TooManyArguments {
        /// The operation name.
        operation: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        given: usize,
    },

    /// A date-time without a time zone was given to Ad Manager.
    #[error("Datetime {value} is not timezone aware")]
    NaiveDateTime {
        /// The rejected value.
        value: String,
    },

    /// No global element or complex type has this name.
    #[error("Schema has no element or type named '{name}'")]
    UnknownElement {
        /// The requested name.
        name: String,
    },

    /// Writing the document failed.
    #[error("Failed to write XML: {0}")]
    Io(#[from] std::io::Error),
}

/// One entry of an `ApiException` fault's `errors` list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiError {
    /// The error's `xsi:type`, e.g. `AuthenticationError`.
    pub error_type: Option<String>,
    /// Path of the offending field.
    pub field_path: Option<String>,
    /// The value that triggered the error.
    pub trigger: Option<String>,
    /// Summary such as `AuthenticationError.NOT_WHITELISTED_FOR_API_ACCESS`.
    pub error_string: Option<String>,
    /// Enumerated reason, when present.
    pub reason: Option<String>,
    /// Every leaf child of the error element by name.
    pub fields: BTreeMap<String, String>,
}

/// A SOAP fault returned by the server.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ServerFault {
    /// `faultcode`.
    pub code: Option<String>,
    /// `faultstring`.
    pub message: String,
    /// The raw `detail` element, or the whole `Fault` when there is none.
    pub detail: XmlElement,
    /// API errors found under the detail.
    pub errors: Vec<ApiError>,
}

/// Errors from SOAP service construction and calls.
#[derive(Debug, Error)]
pub enum SoapError {
    /// The request or WSDL download failed at the HTTP level.
    #[error("SOAP transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server returned a SOAP fault.
    #[error("SOAP fault: {0}")]
    Fault(Box<ServerFault>),

    /// The service has no such operation.
    #[error("Service {service} has no operation '{operation}'")]
    UnknownOperation {
        /// Service name.
        service: String,
        /// Requested operation.
        operation: String,
    },

    /// The WSDL or schema could not be used.
    #[error("Invalid WSDL: {0}")]
    Schema(#[from] SchemaError),

    /// A response was not well-formed XML.
    #[error("Malformed XML response: {0}")]
    Xml(#[from] XmlError),

    /// The request could not be serialized.
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    /// Producing the Authorization header failed.
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    /// The response envelope lacks an expected part.
    #[error("Unexpected SOAP response: {reason}")]
    UnexpectedResponse {
        /// What was missing.
        reason: String,
    },
}

impl SoapError {
    /// The server fault, if this error is one.
    #[must_use]
    pub fn fault(&self) -> Option<&ServerFault> {
        match self {
            Self::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

impl From<ServerFault> for SoapError {
    fn from(fault: ServerFault) -> Self {
        Self::Fault(Box::new(fault))
    }
}

// Verify error types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SoapError>();
    assert_send_sync::<MarshalError>();
};
