//! The SOAP layer shared by the Ad Manager and AdWords clients.
//!
//! A [`SoapService`] is built from a WSDL document. Its operations are
//! invoked by name with [`SoapValue`] arguments, which are serialized in
//! schema order and may carry an `xsi_type` to select a derived type.
//! Responses are decoded back into [`SoapValue`] trees and SOAP faults are
//! surfaced as [`SoapError::Fault`].

mod errors;
mod headers;
mod marshal;
mod packer;
mod schema;
mod service;
mod transport;
mod unmarshal;
mod value;
mod wsdl;
mod xml;

pub use errors::{ApiError, MarshalError, ServerFault, SoapError, TransportError};
pub use headers::{
    insert_header, library_signature, HeaderHandler, ProductHeader, RequestContext, Utility,
    ADWORDS_SIGNATURE, AD_MANAGER_SIGNATURE, LIBRARY_VERSION,
};
pub use marshal::xml_for_complex_type;
pub use packer::{DefaultPacker, Packer};
pub use schema::{ComplexType, ElementDecl, MaxOccurs, Schema, SchemaError, SimpleType, TypeRef};
pub use service::{ServiceEndpoint, ServiceOptions, SoapService};
pub use transport::{ChunkedBody, HttpResponse, HttpTransport, DOWNLOAD_CHUNK_SIZE};
pub use value::{SoapObject, SoapValue};
pub use wsdl::{Operation, Wsdl};
pub use xml::{QName, XmlAttribute, XmlElement, XmlError};
