//! A small namespace-resolved XML tree.
//!
//! WSDL documents, XSD schemas, SOAP responses and faults are all read into
//! [`XmlElement`] trees. Prefixes are resolved against the in-scope
//! `xmlns` declarations while parsing, and each element keeps its scope so
//! QName-valued attributes (`type="tns:Statement"`, `xsi:type="ns2:TextValue"`)
//! can be resolved later.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

/// XML Schema namespace.
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
/// XML Schema instance namespace (`xsi:type`, `xsi:nil`).
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
/// SOAP 1.1 envelope namespace.
pub const SOAP_ENVELOPE_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";
/// WSDL 1.1 namespace.
pub const WSDL_NAMESPACE: &str = "http://schemas.xmlsoap.org/wsdl/";

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Errors raised while reading XML.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The document is not well-formed.
    #[error("XML syntax error: {0}")]
    Syntax(#[from] quick_xml::Error),

    /// An attribute is malformed.
    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// The document ended before the root element was closed.
    #[error("Unexpected end of XML document")]
    UnexpectedEof,

    /// A closing tag appeared without a matching opening tag.
    #[error("Unbalanced closing tag in XML document")]
    UnbalancedEnd,
}

/// A namespace-qualified name. An empty namespace means "no namespace".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// Namespace URI.
    pub namespace: String,
    /// Local part.
    pub local: String,
}

impl QName {
    /// Creates a qualified name.
    #[must_use]
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

/// An attribute with its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    key: String,
    namespace: Option<String>,
    local: String,
    value: String,
}

impl XmlAttribute {
    /// The attribute name as written, including any prefix.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The resolved namespace of a prefixed attribute.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The local name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// The unescaped value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

type Scope = Arc<BTreeMap<String, String>>;

/// An element of a parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    prefix: Option<String>,
    name: String,
    namespace: Option<String>,
    attributes: Vec<XmlAttribute>,
    children: Vec<XmlElement>,
    text: String,
    scope: Scope,
}

fn split_qname(raw: &str) -> (Option<&str>, &str) {
    match raw.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, raw),
    }
}

impl XmlElement {
    /// Parses a document and returns its root element.
    ///
    /// Whitespace around text content is trimmed.
    ///
    /// # Errors
    ///
    /// Returns an [`XmlError`] if the document is not well-formed.
    pub fn parse(xml: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let root_scope: Scope = Arc::new(BTreeMap::from([(
            "xml".to_string(),
            XML_NAMESPACE.to_string(),
        )]));
        let mut stack: Vec<Self> = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let scope = stack.last().map_or_else(|| root_scope.clone(), |p| p.scope.clone());
                    stack.push(Self::open(&start, scope)?);
                }
                Event::Empty(start) => {
                    let scope = stack.last().map_or_else(|| root_scope.clone(), |p| p.scope.clone());
                    let element = Self::open(&start, scope)?;
                    if let Some(root) = Self::close(&mut stack, element) {
                        return Ok(root);
                    }
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or(XmlError::UnbalancedEnd)?;
                    if let Some(root) = Self::close(&mut stack, element) {
                        return Ok(root);
                    }
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&data));
                    }
                }
                Event::Eof => return Err(XmlError::UnexpectedEof),
                _ => {}
            }
        }
    }

    fn open(start: &BytesStart<'_>, inherited: Scope) -> Result<Self, XmlError> {
        let mut declarations = Vec::new();
        let mut raw_attributes = Vec::new();

        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute.unescape_value()?.into_owned();
            if key == "xmlns" {
                declarations.push((String::new(), value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declarations.push((prefix.to_string(), value));
            } else {
                raw_attributes.push((key, value));
            }
        }

        let scope = if declarations.is_empty() {
            inherited
        } else {
            let mut map = (*inherited).clone();
            map.extend(declarations);
            Arc::new(map)
        };

        let raw_name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let (prefix, local) = split_qname(&raw_name);
        let namespace = scope.get(prefix.unwrap_or("")).cloned();

        let attributes = raw_attributes
            .into_iter()
            .map(|(key, value)| {
                let (attr_prefix, attr_local) = split_qname(&key);
                XmlAttribute {
                    namespace: attr_prefix.and_then(|p| scope.get(p).cloned()),
                    local: attr_local.to_string(),
                    key: key.clone(),
                    value,
                }
            })
            .collect();

        Ok(Self {
            prefix: prefix.map(str::to_string),
            name: local.to_string(),
            namespace,
            attributes,
            children: Vec::new(),
            text: String::new(),
            scope,
        })
    }

    fn close(stack: &mut [Self], element: Self) -> Option<Self> {
        match stack.last_mut() {
            Some(parent) => {
                parent.children.push(element);
                None
            }
            None => Some(element),
        }
    }

    /// The local name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The resolved namespace, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns `true` if the element has the given namespace and local name.
    #[must_use]
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    /// The concatenated text content.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The child elements in document order.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// The attributes other than namespace declarations.
    #[must_use]
    pub fn attributes(&self) -> &[XmlAttribute] {
        &self.attributes
    }

    /// The first child with the given local name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Text of the first child with the given local name.
    #[must_use]
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(Self::text)
    }

    /// All children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Value of an unprefixed attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.local == name)
            .map(XmlAttribute::value)
    }

    /// Value of a namespaced attribute.
    #[must_use]
    pub fn attribute_ns(&self, namespace: &str, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.local == name)
            .map(XmlAttribute::value)
    }

    /// Resolves a QName-valued attribute against this element's scope.
    ///
    /// An unprefixed value takes the default namespace; an unbound prefix
    /// yields an empty namespace.
    #[must_use]
    pub fn resolve_qname(&self, value: &str) -> QName {
        let (prefix, local) = split_qname(value.trim());
        let namespace = self
            .scope
            .get(prefix.unwrap_or(""))
            .cloned()
            .unwrap_or_default();
        QName::new(namespace, local)
    }

    /// The resolved `xsi:type`, if present.
    #[must_use]
    pub fn xsi_type(&self) -> Option<QName> {
        self.attribute_ns(XSI_NAMESPACE, "type")
            .map(|value| self.resolve_qname(value))
    }

    /// Returns `true` for `xsi:nil="true"`.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self.attribute_ns(XSI_NAMESPACE, "nil"), Some("true" | "1"))
    }

    fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Serializes the element as a standalone fragment, declaring every
    /// in-scope namespace on the root.
    #[must_use]
    pub fn to_xml_string(&self) -> String {
        let mut writer = Writer::new(Vec::new());
        match self.write_to(&mut writer, None) {
            Ok(()) => String::from_utf8_lossy(&writer.into_inner()).into_owned(),
            Err(_) => String::new(),
        }
    }

    fn write_to(
        &self,
        writer: &mut Writer<Vec<u8>>,
        parent_scope: Option<&BTreeMap<String, String>>,
    ) -> std::io::Result<()> {
        let name = self.qualified_name();
        let mut start = BytesStart::new(name.as_str());

        for (prefix, namespace) in self.scope.iter() {
            if prefix == "xml" || parent_scope.and_then(|p| p.get(prefix)) == Some(namespace) {
                continue;
            }
            let key = if prefix.is_empty() {
                "xmlns".to_string()
            } else {
                format!("xmlns:{prefix}")
            };
            start.push_attribute((key.as_str(), namespace.as_str()));
        }
        for attribute in &self.attributes {
            start.push_attribute((attribute.key.as_str(), attribute.value.as_str()));
        }

        if self.children.is_empty() && self.text.is_empty() {
            return writer.write_event(Event::Empty(start));
        }

        writer.write_event(Event::Start(start))?;
        if !self.text.is_empty() {
            writer.write_event(Event::Text(BytesText::new(&self.text)))?;
        }
        for child in &self.children {
            child.write_to(writer, Some(&self.scope))?;
        }
        writer.write_event(Event::End(BytesEnd::new(name.as_str())))
    }
}

impl fmt::Display for XmlElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
          <soap:Body>
            <ns2:value xmlns:ns2="https://example.com/api"
                       xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
                       xsi:type="ns2:TextValue">
              <ns2:value>a &amp; b</ns2:value>
            </ns2:value>
          </soap:Body>
        </soap:Envelope>"#;

    #[test]
    fn test_parse_resolves_namespaces() {
        let root = XmlElement::parse(DOCUMENT).unwrap();
        assert!(root.is(SOAP_ENVELOPE_NAMESPACE, "Envelope"));

        let body = root.child("Body").unwrap();
        let value = &body.children()[0];
        assert_eq!(value.namespace(), Some("https://example.com/api"));
        assert_eq!(
            value.xsi_type(),
            Some(QName::new("https://example.com/api", "TextValue"))
        );
        assert_eq!(value.child_text("value"), Some("a & b"));
    }

    #[test]
    fn test_resolve_unprefixed_uses_default_namespace() {
        let root = XmlElement::parse(r#"<a xmlns="urn:x"><b/></a>"#).unwrap();
        assert_eq!(root.resolve_qname("Foo"), QName::new("urn:x", "Foo"));
        assert_eq!(root.children()[0].namespace(), Some("urn:x"));
    }

    #[test]
    fn test_nil_detection() {
        let root = XmlElement::parse(
            r#"<a xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:nil="true"/>"#,
        )
        .unwrap();
        assert!(root.is_nil());
    }

    #[test]
    fn test_fragment_round_trip_declares_scope() {
        let root = XmlElement::parse(DOCUMENT).unwrap();
        let value = &root.child("Body").unwrap().children()[0];
        let fragment = value.to_xml_string();

        assert!(fragment.contains(r#"xmlns:ns2="https://example.com/api""#));
        assert!(fragment.contains(r#"xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/""#));
        assert!(fragment.contains("a &amp; b"));

        let reparsed = XmlElement::parse(&fragment).unwrap();
        assert_eq!(reparsed.child_text("value"), Some("a & b"));
    }

    #[test]
    fn test_unclosed_document_fails() {
        assert!(XmlElement::parse("<a><b></b>").is_err());
    }
}
