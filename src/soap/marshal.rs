//! Serializes [`SoapValue`] trees into document/literal XML.

use std::collections::BTreeMap;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::soap::errors::MarshalError;
use crate::soap::packer::Packer;
use crate::soap::schema::{ComplexType, ElementDecl, MaxOccurs, Schema, TypeRef};
use crate::soap::value::{SoapObject, SoapValue};
use crate::soap::xml::{QName, SOAP_ENVELOPE_NAMESPACE, XSI_NAMESPACE};

const TYPE_FIELD_SUFFIX: &str = ".Type";

/// Writes values against a schema, assigning `ns0..nsN` prefixes to the
/// schema's namespaces in sorted order.
pub(crate) struct Marshaller<'a> {
    schema: &'a Schema,
    packer: &'a dyn Packer,
    populate_type_field: bool,
    prefixes: BTreeMap<String, String>,
}

impl<'a> Marshaller<'a> {
    /// `populate_type_field` fills an unset `<Base>.Type` element with the
    /// derived type's name whenever an `xsi_type` override is serialized.
    pub(crate) fn new(schema: &'a Schema, packer: &'a dyn Packer, populate_type_field: bool) -> Self {
        let prefixes = schema
            .namespaces()
            .enumerate()
            .map(|(i, namespace)| (namespace.to_string(), format!("ns{i}")))
            .collect();
        Self {
            schema,
            packer,
            populate_type_field,
            prefixes,
        }
    }

    fn namespace_declarations(&self) -> Vec<(String, String)> {
        let mut declarations = vec![("xmlns:xsi".to_string(), XSI_NAMESPACE.to_string())];
        declarations.extend(
            self.prefixes
                .iter()
                .map(|(namespace, prefix)| (format!("xmlns:{prefix}"), namespace.clone())),
        );
        declarations
    }

    fn element_name(&self, decl: &ElementDecl) -> String {
        match decl.namespace.as_ref().and_then(|ns| self.prefixes.get(ns)) {
            Some(prefix) => format!("{prefix}:{}", decl.name),
            None => decl.name.clone(),
        }
    }

    fn type_reference(&self, name: &QName) -> String {
        match self.prefixes.get(&name.namespace) {
            Some(prefix) => format!("{prefix}:{}", name.local),
            None => name.local.clone(),
        }
    }

    /// Builds a complete SOAP 1.1 envelope.
    pub(crate) fn envelope(
        &self,
        header: Option<(&ElementDecl, SoapValue)>,
        body: &ElementDecl,
        value: SoapValue,
    ) -> Result<Vec<u8>, MarshalError> {
        let mut writer = Writer::new(Vec::new());

        let mut envelope = BytesStart::new("soapenv:Envelope");
        envelope.push_attribute(("xmlns:soapenv", SOAP_ENVELOPE_NAMESPACE));
        for (key, namespace) in self.namespace_declarations() {
            envelope.push_attribute((key.as_str(), namespace.as_str()));
        }
        writer.write_event(Event::Start(envelope))?;

        if let Some((decl, header_value)) = header {
            writer.write_event(Event::Start(BytesStart::new("soapenv:Header")))?;
            self.write_element(&mut writer, decl, header_value, &[])?;
            writer.write_event(Event::End(BytesEnd::new("soapenv:Header")))?;
        }

        writer.write_event(Event::Start(BytesStart::new("soapenv:Body")))?;
        self.write_element(&mut writer, body, value, &[])?;
        writer.write_event(Event::End(BytesEnd::new("soapenv:Body")))?;

        writer.write_event(Event::End(BytesEnd::new("soapenv:Envelope")))?;
        Ok(writer.into_inner())
    }

    /// Serializes one element as a standalone fragment, declaring the
    /// namespaces on its root.
    pub(crate) fn fragment(&self, decl: &ElementDecl, value: SoapValue) -> Result<Vec<u8>, MarshalError> {
        let mut writer = Writer::new(Vec::new());
        let declarations = self.namespace_declarations();
        self.write_element(&mut writer, decl, value, &declarations)?;
        Ok(writer.into_inner())
    }

    fn write_element(
        &self,
        writer: &mut Writer<Vec<u8>>,
        decl: &ElementDecl,
        value: SoapValue,
        root_attributes: &[(String, String)],
    ) -> Result<(), MarshalError> {
        let value = self.packer.pack(value)?;
        let name = self.element_name(decl);

        match value {
            SoapValue::List(items) => {
                if items.is_empty() {
                    let start = start_tag(&name, root_attributes);
                    writer.write_event(Event::Empty(start))?;
                }
                for item in items {
                    self.write_element(writer, decl, item, root_attributes)?;
                }
                Ok(())
            }
            SoapValue::Null => {
                let mut start = start_tag(&name, root_attributes);
                start.push_attribute(("xsi:nil", "true"));
                writer.write_event(Event::Empty(start))?;
                Ok(())
            }
            SoapValue::Object(object) => self.write_object(writer, decl, &name, object, root_attributes),
            leaf => {
                let text = leaf.to_text().unwrap_or_default();
                writer.write_event(Event::Start(start_tag(&name, root_attributes)))?;
                writer.write_event(Event::Text(BytesText::new(&text)))?;
                writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
                Ok(())
            }
        }
    }

    fn write_object(
        &self,
        writer: &mut Writer<Vec<u8>>,
        decl: &ElementDecl,
        name: &str,
        object: SoapObject,
        root_attributes: &[(String, String)],
    ) -> Result<(), MarshalError> {
        let declared = decl
            .type_ref
            .as_ref()
            .and_then(|type_ref| self.schema.resolve_type(type_ref));

        let (complex, tagged) = match object.xsi_type() {
            Some(type_name) => {
                let complex = self
                    .schema
                    .find_complex_type_by_local_name(type_name)
                    .ok_or_else(|| MarshalError::UnknownType {
                        type_name: type_name.to_string(),
                    })?;
                (complex, complex.name.as_ref())
            }
            None => (
                declared.ok_or_else(|| MarshalError::NotComplex {
                    element: decl.name.clone(),
                })?,
                None,
            ),
        };
        let overridden = tagged.filter(|t| declared.and_then(|d| d.name.as_ref()) != Some(*t));

        let elements = self.schema.all_elements(complex);
        let type_name = type_label(complex);
        for (field, _) in object.fields() {
            if !elements.iter().any(|e| e.name == field) {
                return Err(MarshalError::UnknownField {
                    type_name,
                    field: field.to_string(),
                });
            }
        }

        let mut fields = object.into_fields();
        if self.populate_type_field {
            if let Some(derived) = overridden {
                for element in elements.iter().filter(|e| e.name.ends_with(TYPE_FIELD_SUFFIX)) {
                    if !fields.iter().any(|(field, _)| *field == element.name) {
                        fields.push((element.name.clone(), SoapValue::Text(derived.local.clone())));
                    }
                }
            }
        }

        let mut start = start_tag(name, root_attributes);
        if let Some(tagged) = tagged {
            let reference = self.type_reference(tagged);
            start.push_attribute(("xsi:type", reference.as_str()));
        }
        if fields.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for element in elements {
            if let Some(index) = fields.iter().position(|(field, _)| *field == element.name) {
                let (_, value) = fields.swap_remove(index);
                self.write_element(writer, element, value, &[])?;
            }
        }
        writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }
}

fn start_tag<'n>(name: &'n str, attributes: &[(String, String)]) -> BytesStart<'n> {
    let mut start = BytesStart::new(name);
    for (key, value) in attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    start
}

fn type_label(complex: &ComplexType) -> String {
    complex
        .name
        .as_ref()
        .map_or_else(|| "<anonymous>".to_string(), |name| name.local.clone())
}

/// Serializes a value as the named global element or complex type.
///
/// # Errors
///
/// Returns [`MarshalError::UnknownElement`] if the schema has neither, or
/// any error from serializing the value.
pub fn xml_for_complex_type(
    schema: &Schema,
    packer: &dyn Packer,
    name: &str,
    value: SoapValue,
) -> Result<Vec<u8>, MarshalError> {
    let decl = match schema.find_element_by_local_name(name) {
        Some(decl) => decl.clone(),
        None => {
            let complex_name = schema
                .find_complex_type_by_local_name(name)
                .and_then(|complex| complex.name.clone())
                .ok_or_else(|| MarshalError::UnknownElement {
                    name: name.to_string(),
                })?;
            ElementDecl {
                name: name.to_string(),
                namespace: Some(complex_name.namespace.clone()),
                type_ref: Some(TypeRef::Named(complex_name)),
                min_occurs: 1,
                max_occurs: MaxOccurs::Bounded(1),
                nillable: false,
            }
        }
    };
    Marshaller::new(schema, packer, false).fragment(&decl, value)
}
