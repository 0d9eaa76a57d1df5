//! WSDL 1.1 document model: operations, messages and the embedded schema.

use std::collections::{BTreeMap, HashMap};

use crate::soap::schema::{Schema, SchemaError};
use crate::soap::xml::{QName, XmlElement, WSDL_NAMESPACE};

/// Name of the SOAP header element both APIs declare.
const REQUEST_HEADER: &str = "RequestHeader";

/// A document/literal operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Operation name, e.g. `getReportJobStatus`.
    pub name: String,
    /// Request wrapper element.
    pub input: Option<QName>,
    /// Response wrapper element.
    pub output: Option<QName>,
    /// `soapAction` from the binding.
    pub soap_action: Option<String>,
    /// SOAP header element from the binding.
    pub header: Option<QName>,
}

/// A parsed WSDL document.
#[derive(Debug, Clone)]
pub struct Wsdl {
    target_namespace: String,
    schema: Schema,
    operations: BTreeMap<String, Operation>,
    address: Option<String>,
}

type Messages = HashMap<String, Vec<(String, Option<QName>)>>;

impl Wsdl {
    /// Parses a WSDL document.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if the document is not a WSDL definition
    /// or its schema is malformed.
    pub fn parse(document: &str) -> Result<Self, SchemaError> {
        let root = XmlElement::parse(document)?;
        if !root.is(WSDL_NAMESPACE, "definitions") {
            return Err(SchemaError::UnexpectedRoot {
                expected: "wsdl:definitions",
                found: root.name().to_string(),
            });
        }

        let mut schema = Schema::default();
        for types in root.children_named("types") {
            for xsd in types.children_named("schema") {
                schema.add_schema(xsd)?;
            }
        }

        let messages = parse_messages(&root);
        let mut operations = BTreeMap::new();

        for port_type in root.children_named("portType") {
            for operation in port_type.children_named("operation") {
                let Some(name) = operation.attribute("name") else {
                    continue;
                };
                operations.insert(
                    name.to_string(),
                    Operation {
                        name: name.to_string(),
                        input: message_element(operation, "input", &messages),
                        output: message_element(operation, "output", &messages),
                        soap_action: None,
                        header: None,
                    },
                );
            }
        }

        for binding in root.children_named("binding") {
            for bound in binding.children_named("operation") {
                let Some(operation) = bound
                    .attribute("name")
                    .and_then(|name| operations.get_mut(name))
                else {
                    continue;
                };
                operation.soap_action = bound
                    .child("operation")
                    .and_then(|soap| soap.attribute("soapAction"))
                    .map(str::to_string);
                operation.header = bound
                    .child("input")
                    .and_then(|input| input.child("header"))
                    .and_then(|header| header_element(header, &messages));
            }
        }

        let fallback_header = schema
            .find_element_by_local_name(REQUEST_HEADER)
            .and_then(|decl| {
                decl.namespace
                    .as_ref()
                    .map(|ns| QName::new(ns.clone(), decl.name.clone()))
            });
        for operation in operations.values_mut() {
            if operation.header.is_none() {
                operation.header.clone_from(&fallback_header);
            }
        }

        let address = root
            .child("service")
            .and_then(|service| service.child("port"))
            .and_then(|port| port.child("address"))
            .and_then(|address| address.attribute("location"))
            .map(str::to_string);

        Ok(Self {
            target_namespace: root.attribute("targetNamespace").unwrap_or_default().to_string(),
            schema,
            operations,
            address,
        })
    }

    /// The definitions' target namespace.
    #[must_use]
    pub fn target_namespace(&self) -> &str {
        &self.target_namespace
    }

    /// The embedded schema.
    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Looks up an operation.
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    /// Operation names in sorted order.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    /// The `soap:address` location declared by the service.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}

fn parse_messages(root: &XmlElement) -> Messages {
    root.children_named("message")
        .filter_map(|message| {
            let name = message.attribute("name")?;
            let parts = message
                .children_named("part")
                .map(|part| {
                    (
                        part.attribute("name").unwrap_or_default().to_string(),
                        part.attribute("element").map(|e| part.resolve_qname(e)),
                    )
                })
                .collect();
            Some((name.to_string(), parts))
        })
        .collect()
}

fn message_element(operation: &XmlElement, direction: &str, messages: &Messages) -> Option<QName> {
    let child = operation.child(direction)?;
    let message = child.resolve_qname(child.attribute("message")?);
    messages
        .get(&message.local)?
        .iter()
        .find_map(|(_, element)| element.clone())
}

fn header_element(header: &XmlElement, messages: &Messages) -> Option<QName> {
    let message = header.resolve_qname(header.attribute("message")?);
    let parts = messages.get(&message.local)?;
    match header.attribute("part") {
        Some(part) => parts
            .iter()
            .find(|(name, _)| name == part)
            .and_then(|(_, element)| element.clone()),
        None => parts.iter().find_map(|(_, element)| element.clone()),
    }
}
