//! A WSDL-described SOAP service.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use regex::Regex;

use crate::auth::oauth::AUTHORIZATION_HEADER;
use crate::config::WsdlCache;
use crate::soap::errors::{MarshalError, SoapError, TransportError};
use crate::soap::headers::{insert_header, HeaderHandler, RequestContext};
use crate::soap::marshal::{xml_for_complex_type, Marshaller};
use crate::soap::packer::Packer;
use crate::soap::schema::{ElementDecl, Schema, SchemaError};
use crate::soap::unmarshal::decode_response;
use crate::soap::value::{SoapObject, SoapValue};
use crate::soap::wsdl::{Operation, Wsdl};
use crate::soap::HttpTransport;

/// Longest fault message logged in an error summary.
const MAX_FAULT_LOG_LENGTH: usize = 16_000;

const REDACTED: &str = "REDACTED";

/// Where a service lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceEndpoint {
    /// Service name, e.g. `ReportService`.
    pub name: String,
    /// API version, e.g. `v202408`.
    pub version: String,
    /// Endpoint URL; the WSDL is fetched from `<url>?wsdl`.
    pub url: String,
}

/// Product-specific serialization behavior.
#[derive(Clone)]
pub struct ServiceOptions {
    /// Rewrites values before serialization.
    pub packer: Arc<dyn Packer>,
    /// Fill `<Base>.Type` elements for derived-type overrides.
    pub populate_type_field: bool,
}

impl fmt::Debug for ServiceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceOptions")
            .field("packer", &self.packer)
            .field("populate_type_field", &self.populate_type_field)
            .finish()
    }
}

/// A SOAP service whose operations are invoked by name.
///
/// Calls are stateless and may run concurrently from any number of tasks.
///
/// # Example
///
/// ```rust,ignore
/// use googleads::soap::SoapValue;
///
/// let service = client.service("ReportService", None, None).await?;
/// let status = service
///     .call("getReportJobStatus", vec![SoapValue::Int(1234)])
///     .await?;
/// ```
#[derive(Debug)]
pub struct SoapService {
    endpoint: ServiceEndpoint,
    wsdl: Wsdl,
    headers: Arc<HeaderHandler>,
    transport: HttpTransport,
    options: ServiceOptions,
}

// Verify SoapService is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<SoapService>();
};

impl SoapService {
    /// Fetches and parses the service's WSDL, going through `cache`.
    ///
    /// # Errors
    ///
    /// Returns [`SoapError::Transport`] if the WSDL cannot be downloaded and
    /// [`SoapError::Schema`] if it cannot be parsed.
    pub async fn load(
        endpoint: ServiceEndpoint,
        headers: Arc<HeaderHandler>,
        transport: HttpTransport,
        cache: &WsdlCache,
        options: ServiceOptions,
    ) -> Result<Self, SoapError> {
        let wsdl_url = format!("{}?wsdl", endpoint.url);
        tracing::debug!(service = %endpoint.name, url = %wsdl_url, "Loading WSDL");
        let document = cache.fetch(&transport, &wsdl_url).await?;
        let wsdl = Wsdl::parse(&document)?;
        Ok(Self::from_wsdl(endpoint, wsdl, headers, transport, options))
    }

    /// Creates a service from an already parsed WSDL.
    #[must_use]
    pub fn from_wsdl(
        endpoint: ServiceEndpoint,
        wsdl: Wsdl,
        headers: Arc<HeaderHandler>,
        transport: HttpTransport,
        options: ServiceOptions,
    ) -> Self {
        Self {
            endpoint,
            wsdl,
            headers,
            transport,
            options,
        }
    }

    /// Service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.endpoint.name
    }

    /// API version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.endpoint.version
    }

    /// Endpoint URL requests are posted to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.endpoint.url
    }

    /// The service's schema.
    #[must_use]
    pub const fn schema(&self) -> &Schema {
        self.wsdl.schema()
    }

    /// Operation names in sorted order.
    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.wsdl.operation_names()
    }

    /// Returns `true` if the service has the operation.
    #[must_use]
    pub fn has_operation(&self, name: &str) -> bool {
        self.wsdl.operation(name).is_some()
    }

    /// Invokes an operation with positional arguments.
    ///
    /// # Errors
    ///
    /// See [`SoapService::call_with_context`].
    pub async fn call(&self, operation: &str, args: Vec<SoapValue>) -> Result<SoapValue, SoapError> {
        self.call_with_context(RequestContext::new(), operation, args)
            .await
    }

    /// Invokes an operation, reporting the utilities recorded in `context`
    /// in this request's header.
    ///
    /// Arguments bind to the operation's parameters in declaration order;
    /// missing trailing arguments are omitted. Returns the decoded return
    /// value: a list for repeated returns, [`SoapValue::Null`] for none.
    ///
    /// # Errors
    ///
    /// - [`SoapError::UnknownOperation`] if the WSDL lacks the operation
    /// - [`SoapError::Marshal`] if the arguments do not fit the schema
    /// - [`SoapError::OAuth`] if no Authorization header can be produced
    /// - [`SoapError::Fault`] if the server returns a SOAP fault
    /// - [`SoapError::Transport`] for network failures and non-2xx
    ///   responses without a fault
    pub async fn call_with_context(
        &self,
        context: RequestContext,
        operation: &str,
        args: Vec<SoapValue>,
    ) -> Result<SoapValue, SoapError> {
        let op = self
            .wsdl
            .operation(operation)
            .ok_or_else(|| SoapError::UnknownOperation {
                service: self.endpoint.name.clone(),
                operation: operation.to_string(),
            })?;
        let envelope = self.build_envelope(op, &context, args)?;

        let mut http_headers = self.headers.http_headers().await?;
        insert_header(&mut http_headers, "Content-Type", "text/xml; charset=utf-8");
        insert_header(
            &mut http_headers,
            "SOAPAction",
            &format!("\"{}\"", op.soap_action.as_deref().unwrap_or_default()),
        );

        tracing::info!(
            "Request made: Service: \"{}\" Method: \"{}\" URL: \"{}\"",
            self.endpoint.name,
            operation,
            self.endpoint.url
        );
        tracing::debug!(
            headers = ?redact_headers(&http_headers),
            body = %redact_xml(&String::from_utf8_lossy(&envelope)),
            "Outgoing request"
        );

        let response = self
            .transport
            .post(&self.endpoint.url, &http_headers, envelope)
            .await?;
        tracing::debug!(
            status = response.code,
            body = %redact_xml(&response.body),
            "Incoming response"
        );

        match decode_response(self.schema(), op, &response.body) {
            Err(SoapError::Fault(fault)) => {
                let summary: String = fault.message.chars().take(MAX_FAULT_LOG_LENGTH).collect();
                tracing::warn!(
                    service = %self.endpoint.name,
                    operation,
                    "Error summary: {summary}"
                );
                Err(SoapError::Fault(fault))
            }
            Ok(value) if response.is_ok() => Ok(value),
            Ok(_) | Err(_) if !response.is_ok() => Err(TransportError::Status {
                code: response.code,
                url: self.endpoint.url.clone(),
                body: response.body,
            }
            .into()),
            other => other,
        }
    }

    fn build_envelope(
        &self,
        op: &Operation,
        context: &RequestContext,
        args: Vec<SoapValue>,
    ) -> Result<Vec<u8>, SoapError> {
        let schema = self.schema();
        let body_decl = op
            .input
            .as_ref()
            .and_then(|name| schema.element(name))
            .ok_or_else(|| SchemaError::UnknownElement {
                name: format!("input of {}", op.name),
            })?;
        let params: Vec<&ElementDecl> = body_decl
            .type_ref
            .as_ref()
            .and_then(|type_ref| schema.resolve_type(type_ref))
            .map(|wrapper| schema.all_elements(wrapper))
            .unwrap_or_default();

        if args.len() > params.len() {
            return Err(MarshalError::TooManyArguments {
                operation: op.name.clone(),
                expected: params.len(),
                given: args.len(),
            }
            .into());
        }
        let mut wrapper = SoapObject::new();
        for (param, arg) in params.iter().zip(args) {
            wrapper.set(param.name.clone(), arg);
        }

        let header = op
            .header
            .as_ref()
            .and_then(|name| schema.element(name))
            .map(|decl| (decl, SoapValue::Object(self.headers.soap_header(context))));

        let marshaller = Marshaller::new(
            schema,
            self.options.packer.as_ref(),
            self.options.populate_type_field,
        );
        Ok(marshaller.envelope(header, body_decl, SoapValue::Object(wrapper))?)
    }

    /// Serializes a value as the named element or complex type of this
    /// service's schema, with namespace declarations on the root.
    ///
    /// # Errors
    ///
    /// Returns [`SoapError::Marshal`] if the name is unknown or the value
    /// does not fit the type.
    pub fn soap_xml_for_complex_type(&self, type_name: &str, value: SoapValue) -> Result<String, SoapError> {
        let bytes = xml_for_complex_type(self.schema(), self.options.packer.as_ref(), type_name, value)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn redact_headers(headers: &HashMap<String, String>) -> HashMap<&str, &str> {
    headers
        .iter()
        .map(|(key, value)| {
            let redact = key.eq_ignore_ascii_case(AUTHORIZATION_HEADER)
                || key.eq_ignore_ascii_case("developerToken");
            (key.as_str(), if redact { REDACTED } else { value.as_str() })
        })
        .collect()
}

fn redact_xml(xml: &str) -> std::borrow::Cow<'_, str> {
    static SECRET_ELEMENT: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = SECRET_ELEMENT.get_or_init(|| {
        Regex::new(r"(<(?:[\w-]+:)?developerToken>)[^<]*(</(?:[\w-]+:)?developerToken>)").ok()
    });
    match pattern {
        Some(pattern) => pattern.replace_all(xml, format!("${{1}}{REDACTED}${{2}}")),
        None => std::borrow::Cow::Borrowed(xml),
    }
}
