//! XML Schema model used to marshal requests and type responses.
//!
//! Only the subset of XSD that the advertising APIs use is understood:
//! named and anonymous complex types with `sequence`/`choice`/`all`
//! groups, `complexContent` extension, simple types restricted from a
//! builtin, and global element declarations.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::soap::xml::{QName, XmlElement, XmlError, XSD_NAMESPACE};

const MAX_INHERITANCE_DEPTH: usize = 32;

/// Errors raised while reading a WSDL or XSD document.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The document could not be parsed.
    #[error(transparent)]
    Xml(#[from] XmlError),

    /// A declaration is missing a required attribute.
    #[error("<{element}> is missing the '{attribute}' attribute")]
    MissingAttribute {
        /// The declaration's local name.
        element: String,
        /// The missing attribute.
        attribute: &'static str,
    },

    /// The document root is not what was expected.
    #[error("Expected a {expected} document, found <{found}>")]
    UnexpectedRoot {
        /// `wsdl:definitions` or `xsd:schema`.
        expected: &'static str,
        /// The actual root element.
        found: String,
    },

    /// An operation or type references an element the schema lacks.
    #[error("Schema has no element named '{name}'")]
    UnknownElement {
        /// The element name.
        name: String,
    },
}

/// Upper bound of an element's occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    /// At most this many.
    Bounded(u32),
    /// `maxOccurs="unbounded"`.
    Unbounded,
}

/// The type of an element declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    /// A named type: builtin, simple or complex.
    Named(QName),
    /// An inline anonymous complex type.
    Anonymous(Box<ComplexType>),
}

/// An element declaration, global or local.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDecl {
    /// Local name.
    pub name: String,
    /// Namespace when the element is qualified.
    pub namespace: Option<String>,
    /// Declared type; `None` means `xsd:anyType`.
    pub type_ref: Option<TypeRef>,
    /// `minOccurs`.
    pub min_occurs: u32,
    /// `maxOccurs`.
    pub max_occurs: MaxOccurs,
    /// `nillable`.
    pub nillable: bool,
}

impl ElementDecl {
    /// Returns `true` when more than one occurrence is allowed.
    #[must_use]
    pub const fn is_repeated(&self) -> bool {
        match self.max_occurs {
            MaxOccurs::Unbounded => true,
            MaxOccurs::Bounded(n) => n > 1,
        }
    }

    /// The named type, if the element is not anonymous.
    #[must_use]
    pub const fn type_name(&self) -> Option<&QName> {
        match &self.type_ref {
            Some(TypeRef::Named(name)) => Some(name),
            _ => None,
        }
    }
}

/// A complex type with its own (not inherited) elements.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexType {
    /// Name; `None` for anonymous types.
    pub name: Option<QName>,
    /// Base type of a `complexContent` extension.
    pub base: Option<QName>,
    /// Elements declared directly on this type, in order.
    pub elements: Vec<ElementDecl>,
    /// `abstract="true"`.
    pub is_abstract: bool,
}

/// A simple type restricted from another type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleType {
    /// Name.
    pub name: QName,
    /// Restriction base.
    pub base: Option<QName>,
    /// Allowed values, for enumerations.
    pub enumeration: Vec<String>,
}

/// All types and global elements of one or more schemas.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    complex_types: BTreeMap<QName, ComplexType>,
    simple_types: BTreeMap<QName, SimpleType>,
    elements: BTreeMap<QName, ElementDecl>,
    namespaces: BTreeSet<String>,
}

struct SchemaContext<'a> {
    target_namespace: &'a str,
    qualified: bool,
}

impl Schema {
    /// Parses a standalone XSD document.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] if the document is not an `xsd:schema`.
    pub fn parse_xsd(xsd: &str) -> Result<Self, SchemaError> {
        let root = XmlElement::parse(xsd)?;
        if !root.is(XSD_NAMESPACE, "schema") {
            return Err(SchemaError::UnexpectedRoot {
                expected: "xsd:schema",
                found: root.name().to_string(),
            });
        }
        let mut schema = Self::default();
        schema.add_schema(&root)?;
        Ok(schema)
    }

    /// Adds the declarations of an `xsd:schema` element.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] for declarations without a name.
    pub fn add_schema(&mut self, root: &XmlElement) -> Result<(), SchemaError> {
        let target_namespace = root.attribute("targetNamespace").unwrap_or_default();
        let context = SchemaContext {
            target_namespace,
            qualified: root.attribute("elementFormDefault") == Some("qualified"),
        };
        if !target_namespace.is_empty() {
            self.namespaces.insert(target_namespace.to_string());
        }

        for child in root.children() {
            if child.namespace() != Some(XSD_NAMESPACE) {
                continue;
            }
            match child.name() {
                "complexType" => {
                    let name = QName::new(target_namespace, required(child, "name")?);
                    let complex = parse_complex_type(child, &context, Some(name.clone()))?;
                    self.complex_types.insert(name, complex);
                }
                "simpleType" => {
                    let name = QName::new(target_namespace, required(child, "name")?);
                    let simple = parse_simple_type(child, name.clone());
                    self.simple_types.insert(name, simple);
                }
                "element" => {
                    let global = SchemaContext {
                        target_namespace,
                        qualified: true,
                    };
                    let element = parse_element(child, &global)?;
                    self.elements
                        .insert(QName::new(target_namespace, element.name.clone()), element);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Merges another schema into this one.
    pub fn merge(&mut self, other: Self) {
        self.complex_types.extend(other.complex_types);
        self.simple_types.extend(other.simple_types);
        self.elements.extend(other.elements);
        self.namespaces.extend(other.namespaces);
    }

    /// Target namespaces, in sorted order.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(String::as_str)
    }

    /// Looks up a global element.
    #[must_use]
    pub fn element(&self, name: &QName) -> Option<&ElementDecl> {
        self.elements.get(name)
    }

    /// Looks up a global element by local name in any namespace.
    #[must_use]
    pub fn find_element_by_local_name(&self, local: &str) -> Option<&ElementDecl> {
        self.elements
            .iter()
            .find(|(name, _)| name.local == local)
            .map(|(_, decl)| decl)
    }

    /// Looks up a complex type.
    #[must_use]
    pub fn complex_type(&self, name: &QName) -> Option<&ComplexType> {
        self.complex_types.get(name)
    }

    /// Looks up a complex type by local name in any namespace.
    #[must_use]
    pub fn find_complex_type_by_local_name(&self, local: &str) -> Option<&ComplexType> {
        self.complex_types
            .iter()
            .find(|(name, _)| name.local == local)
            .map(|(_, complex)| complex)
    }

    /// Looks up a simple type.
    #[must_use]
    pub fn simple_type(&self, name: &QName) -> Option<&SimpleType> {
        self.simple_types.get(name)
    }

    /// Resolves an element's type to a complex type, if it is one.
    #[must_use]
    pub fn resolve_type<'a>(&'a self, type_ref: &'a TypeRef) -> Option<&'a ComplexType> {
        match type_ref {
            TypeRef::Named(name) => self.complex_type(name),
            TypeRef::Anonymous(complex) => Some(complex),
        }
    }

    /// All elements of a complex type, inherited ones first.
    #[must_use]
    pub fn all_elements<'a>(&'a self, complex: &'a ComplexType) -> Vec<&'a ElementDecl> {
        let mut chain = vec![complex];
        let mut current = complex;
        while let Some(base) = current.base.as_ref().and_then(|b| self.complex_type(b)) {
            if chain.len() >= MAX_INHERITANCE_DEPTH {
                break;
            }
            chain.push(base);
            current = base;
        }
        chain
            .into_iter()
            .rev()
            .flat_map(|c| c.elements.iter())
            .collect()
    }

    /// Returns `true` if `derived` is `base` or extends it.
    #[must_use]
    pub fn is_derived_from(&self, derived: &QName, base: &QName) -> bool {
        let mut current = Some(derived);
        for _ in 0..MAX_INHERITANCE_DEPTH {
            match current {
                Some(name) if name == base => return true,
                Some(name) => current = self.complex_type(name).and_then(|c| c.base.as_ref()),
                None => return false,
            }
        }
        false
    }

    /// The builtin XSD type a named type ultimately restricts, such as
    /// `long` or `boolean`.
    #[must_use]
    pub fn builtin_type<'a>(&'a self, name: &'a QName) -> Option<&'a str> {
        let mut current = name;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if current.namespace == XSD_NAMESPACE {
                return Some(&current.local);
            }
            current = self.simple_type(current)?.base.as_ref()?;
        }
        None
    }
}

fn required<'a>(element: &'a XmlElement, attribute: &'static str) -> Result<&'a str, SchemaError> {
    element
        .attribute(attribute)
        .ok_or_else(|| SchemaError::MissingAttribute {
            element: element.name().to_string(),
            attribute,
        })
}

fn parse_complex_type(
    element: &XmlElement,
    context: &SchemaContext<'_>,
    name: Option<QName>,
) -> Result<ComplexType, SchemaError> {
    let mut complex = ComplexType {
        name,
        base: None,
        elements: Vec::new(),
        is_abstract: element.attribute("abstract") == Some("true"),
    };

    for child in element.children() {
        match child.name() {
            "sequence" | "choice" | "all" => {
                collect_particles(child, context, &mut complex.elements)?;
            }
            "complexContent" | "simpleContent" => {
                for derivation in child.children() {
                    if !matches!(derivation.name(), "extension" | "restriction") {
                        continue;
                    }
                    complex.base = derivation
                        .attribute("base")
                        .map(|base| derivation.resolve_qname(base));
                    for group in derivation.children() {
                        if matches!(group.name(), "sequence" | "choice" | "all") {
                            collect_particles(group, context, &mut complex.elements)?;
                        }
                    }
                }
            }
            _ => {}
        }
    }
    Ok(complex)
}

fn collect_particles(
    group: &XmlElement,
    context: &SchemaContext<'_>,
    out: &mut Vec<ElementDecl>,
) -> Result<(), SchemaError> {
    for child in group.children() {
        match child.name() {
            "element" => out.push(parse_element(child, context)?),
            "sequence" | "choice" | "all" => collect_particles(child, context, out)?,
            _ => {}
        }
    }
    Ok(())
}

fn parse_element(element: &XmlElement, context: &SchemaContext<'_>) -> Result<ElementDecl, SchemaError> {
    let (name, reference) = match element.attribute("ref") {
        Some(reference) => {
            let reference = element.resolve_qname(reference);
            (reference.local.clone(), Some(reference))
        }
        None => (required(element, "name")?.to_string(), None),
    };

    let type_ref = if let Some(type_name) = element.attribute("type") {
        Some(TypeRef::Named(element.resolve_qname(type_name)))
    } else if let Some(inline) = element.child("complexType") {
        Some(TypeRef::Anonymous(Box::new(parse_complex_type(inline, context, None)?)))
    } else {
        element
            .child("simpleType")
            .and_then(|simple| simple.child("restriction"))
            .and_then(|restriction| {
                restriction
                    .attribute("base")
                    .map(|base| TypeRef::Named(restriction.resolve_qname(base)))
            })
    };

    let qualified = match element.attribute("form") {
        Some(form) => form == "qualified",
        None => context.qualified,
    };
    let namespace = match reference {
        Some(reference) => Some(reference.namespace),
        None if qualified => Some(context.target_namespace.to_string()),
        None => None,
    };

    let min_occurs = element
        .attribute("minOccurs")
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);
    let max_occurs = match element.attribute("maxOccurs") {
        Some("unbounded") => MaxOccurs::Unbounded,
        Some(value) => MaxOccurs::Bounded(value.parse().unwrap_or(1)),
        None => MaxOccurs::Bounded(1),
    };

    Ok(ElementDecl {
        name,
        namespace,
        type_ref,
        min_occurs,
        max_occurs,
        nillable: element.attribute("nillable") == Some("true"),
    })
}

fn parse_simple_type(element: &XmlElement, name: QName) -> SimpleType {
    let restriction = element.child("restriction");
    SimpleType {
        name,
        base: restriction
            .and_then(|r| r.attribute("base").map(|base| r.resolve_qname(base))),
        enumeration: restriction
            .map(|r| {
                r.children_named("enumeration")
                    .filter_map(|e| e.attribute("value"))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    }
}
