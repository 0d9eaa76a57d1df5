//! Decodes SOAP responses and faults into [`SoapValue`] trees.

use std::collections::BTreeMap;

use crate::soap::errors::{ApiError, ServerFault, SoapError};
use crate::soap::schema::{ComplexType, ElementDecl, Schema, TypeRef};
use crate::soap::value::{SoapObject, SoapValue};
use crate::soap::wsdl::Operation;
use crate::soap::xml::{XmlElement, XSD_NAMESPACE};

const RETURN_ELEMENT: &str = "rval";

/// Parses a response envelope and returns the operation's return value.
///
/// A repeated return element always yields a list; an absent one yields
/// [`SoapValue::Null`].
pub(crate) fn decode_response(
    schema: &Schema,
    operation: &Operation,
    body: &str,
) -> Result<SoapValue, SoapError> {
    let envelope = XmlElement::parse(body)?;
    let soap_body = envelope
        .child("Body")
        .ok_or_else(|| SoapError::UnexpectedResponse {
            reason: "response has no SOAP Body".to_string(),
        })?;
    let Some(payload) = soap_body.children().first() else {
        return Ok(SoapValue::Null);
    };
    if payload.name() == "Fault" {
        return Err(decode_fault(payload).into());
    }

    let return_decl = operation
        .output
        .as_ref()
        .and_then(|name| schema.element(name))
        .and_then(|decl| decl.type_ref.as_ref())
        .and_then(|type_ref| schema.resolve_type(type_ref))
        .and_then(|wrapper| schema.all_elements(wrapper).into_iter().next());
    let return_name = return_decl.map_or(RETURN_ELEMENT, |decl| decl.name.as_str());

    let mut values: Vec<SoapValue> = payload
        .children_named(return_name)
        .map(|element| decode_element(schema, element, return_decl))
        .collect();

    if return_decl.is_some_and(ElementDecl::is_repeated) || values.len() > 1 {
        return Ok(SoapValue::List(values));
    }
    Ok(values.pop().unwrap_or(SoapValue::Null))
}

/// Decodes one element, typing it by `xsi:type` or its declaration.
pub(crate) fn decode_element(
    schema: &Schema,
    element: &XmlElement,
    decl: Option<&ElementDecl>,
) -> SoapValue {
    if element.is_nil() {
        return SoapValue::Null;
    }

    let xsi_type = element.xsi_type();
    let declared = decl.and_then(|d| d.type_ref.as_ref());
    let complex: Option<&ComplexType> = xsi_type
        .as_ref()
        .and_then(|name| {
            schema
                .complex_type(name)
                .or_else(|| schema.find_complex_type_by_local_name(&name.local))
        })
        .or_else(|| declared.and_then(|type_ref| schema.resolve_type(type_ref)));

    if element.children().is_empty() && (complex.is_none() || !element.text().is_empty()) {
        let builtin = match (&xsi_type, declared) {
            (Some(name), _) if name.namespace == XSD_NAMESPACE => Some(name.local.as_str()),
            (_, Some(TypeRef::Named(name))) => schema.builtin_type(name),
            _ => None,
        };
        return typed_leaf(builtin, element.text());
    }

    let mut object = SoapObject::new();
    if let Some(name) = &xsi_type {
        object.set_xsi_type(name.local.clone());
    }
    let elements = complex.map(|c| schema.all_elements(c)).unwrap_or_default();

    for child in element.children() {
        let child_decl = elements.iter().find(|e| e.name == child.name()).copied();
        let value = decode_element(schema, child, child_decl);
        match object.get_mut(child.name()) {
            Some(SoapValue::List(items)) => items.push(value),
            Some(existing) => {
                let first = std::mem::replace(existing, SoapValue::Null);
                *existing = SoapValue::List(vec![first, value]);
            }
            None => {
                let value = if child_decl.is_some_and(ElementDecl::is_repeated) {
                    SoapValue::List(vec![value])
                } else {
                    value
                };
                object.push(child.name().to_string(), value);
            }
        }
    }
    SoapValue::Object(object)
}

fn typed_leaf(builtin: Option<&str>, text: &str) -> SoapValue {
    match builtin {
        Some("boolean") => match text {
            "true" | "1" => SoapValue::Bool(true),
            "false" | "0" => SoapValue::Bool(false),
            _ => SoapValue::Text(text.to_string()),
        },
        Some(
            "int" | "long" | "short" | "byte" | "integer" | "unsignedInt" | "unsignedShort"
            | "unsignedByte",
        ) => text
            .parse()
            .map_or_else(|_| SoapValue::Text(text.to_string()), SoapValue::Int),
        Some("double" | "float") => text
            .parse()
            .map_or_else(|_| SoapValue::Text(text.to_string()), SoapValue::Float),
        _ => SoapValue::Text(text.to_string()),
    }
}

/// Extracts the message, raw detail and API errors of a `Fault`.
pub(crate) fn decode_fault(fault: &XmlElement) -> ServerFault {
    let message = fault
        .child_text("faultstring")
        .or_else(|| fault.child("Reason").and_then(|reason| reason.child_text("Text")))
        .unwrap_or("Unknown SOAP fault")
        .to_string();
    let detail = fault.child("detail").or_else(|| fault.child("Detail"));
    let errors = detail.map(decode_api_errors).unwrap_or_default();

    ServerFault {
        code: fault.child_text("faultcode").map(str::to_string),
        message,
        detail: detail.unwrap_or(fault).clone(),
        errors,
    }
}

fn decode_api_errors(detail: &XmlElement) -> Vec<ApiError> {
    detail
        .children()
        .iter()
        .flat_map(|exception| exception.children_named("errors"))
        .map(|error| {
            let fields: BTreeMap<String, String> = error
                .children()
                .iter()
                .filter(|c| c.children().is_empty())
                .map(|c| (c.name().to_string(), c.text().to_string()))
                .collect();
            let error_type = error.xsi_type().map(|name| name.local).or_else(|| {
                fields
                    .iter()
                    .find(|(name, _)| name.ends_with(".Type"))
                    .map(|(_, value)| value.clone())
            });
            ApiError {
                error_type,
                field_path: fields.get("fieldPath").cloned(),
                trigger: fields.get("trigger").cloned(),
                error_string: fields.get("errorString").cloned(),
                reason: fields.get("reason").cloned(),
                fields,
            }
        })
        .collect()
}
