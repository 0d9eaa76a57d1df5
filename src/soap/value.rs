//! Dynamic values exchanged with SOAP services.
//!
//! Requests are built from [`SoapValue`] trees and responses are decoded
//! into them. Objects keep their fields in insertion order and may carry an
//! `xsi_type` naming a derived type to serialize instead of the declared one.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;

/// A value in a SOAP request or response.
#[derive(Debug, Clone, PartialEq)]
pub enum SoapValue {
    /// Absent value, serialized as `xsi:nil="true"`.
    Null,
    /// `xsd:boolean`.
    Bool(bool),
    /// Any integral XSD type.
    Int(i64),
    /// `xsd:double` / `xsd:float`.
    Float(f64),
    /// Strings, enumerations and anything not otherwise typed.
    Text(String),
    /// `xsd:base64Binary`.
    Bytes(Vec<u8>),
    /// A calendar date.
    Date(NaiveDate),
    /// A time-zone-aware date-time.
    DateTime(DateTime<Tz>),
    /// A date-time without a time zone. Ad Manager rejects these.
    NaiveDateTime(NaiveDateTime),
    /// Repeated elements.
    List(Vec<SoapValue>),
    /// A complex-typed element.
    Object(SoapObject),
}

/// A complex value: ordered named fields plus an optional type override.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SoapObject {
    xsi_type: Option<String>,
    fields: Vec<(String, SoapValue)>,
}

impl SoapObject {
    /// Creates an object of the declared type.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an object serialized as the named (usually derived) type.
    #[must_use]
    pub fn of_type(xsi_type: impl Into<String>) -> Self {
        Self {
            xsi_type: Some(xsi_type.into()),
            fields: Vec::new(),
        }
    }

    /// Sets a field and returns the object.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SoapValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Sets a field, replacing an existing value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<SoapValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    pub(crate) fn push(&mut self, name: String, value: SoapValue) {
        self.fields.push((name, value));
    }

    /// Returns a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SoapValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Returns a field mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut SoapValue> {
        self.fields
            .iter_mut()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Removes a field.
    pub fn remove(&mut self, name: &str) -> Option<SoapValue> {
        let index = self.fields.iter().position(|(field, _)| field == name)?;
        Some(self.fields.remove(index).1)
    }

    /// The `xsi_type` override.
    #[must_use]
    pub fn xsi_type(&self) -> Option<&str> {
        self.xsi_type.as_deref()
    }

    /// Sets the `xsi_type` override.
    pub fn set_xsi_type(&mut self, xsi_type: impl Into<String>) {
        self.xsi_type = Some(xsi_type.into());
    }

    /// Fields in order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &SoapValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Consumes the object, returning its fields.
    #[must_use]
    pub fn into_fields(self) -> Vec<(String, SoapValue)> {
        self.fields
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl SoapValue {
    /// A short name of the variant, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::NaiveDateTime(_) => "naive datetime",
            Self::List(_) => "list",
            Self::Object(_) => "object",
        }
    }

    /// Returns `true` for [`SoapValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The text of a [`SoapValue::Text`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// An integer, parsing text if needed.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// A float, parsing text if needed.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(value) => Some(*value as f64),
            Self::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// A boolean, parsing text if needed.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Text(text) => match text.trim() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// The object of a [`SoapValue::Object`].
    #[must_use]
    pub const fn as_object(&self) -> Option<&SoapObject> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The items of a [`SoapValue::List`].
    #[must_use]
    pub fn as_list(&self) -> Option<&[SoapValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// A field of an object value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&SoapValue> {
        self.as_object().and_then(|object| object.get(name))
    }

    /// The `xsi_type` of an object value.
    #[must_use]
    pub fn xsi_type(&self) -> Option<&str> {
        self.as_object().and_then(SoapObject::xsi_type)
    }

    /// Converts to a list: lists are returned as-is, `Null` becomes empty
    /// and any other value becomes a single item.
    #[must_use]
    pub fn into_list(self) -> Vec<SoapValue> {
        match self {
            Self::List(items) => items,
            Self::Null => Vec::new(),
            other => vec![other],
        }
    }

    /// Renders a leaf as XSD lexical text. Lists and objects have none.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null | Self::List(_) | Self::Object(_) => None,
            Self::Bool(value) => Some(value.to_string()),
            Self::Int(value) => Some(value.to_string()),
            Self::Float(value) => Some(value.to_string()),
            Self::Text(text) => Some(text.clone()),
            Self::Bytes(bytes) => Some(STANDARD.encode(bytes)),
            Self::Date(date) => Some(date.format("%Y-%m-%d").to_string()),
            Self::DateTime(value) => Some(value.to_rfc3339()),
            Self::NaiveDateTime(value) => Some(value.format("%Y-%m-%dT%H:%M:%S").to_string()),
        }
    }
}

impl fmt::Display for SoapValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Object(object) => {
                if let Some(xsi_type) = object.xsi_type() {
                    f.write_str(xsi_type)?;
                }
                f.write_str("{")?;
                for (i, (name, value)) in object.fields().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                f.write_str("}")
            }
            leaf => f.write_str(&leaf.to_text().unwrap_or_default()),
        }
    }
}

impl From<SoapObject> for SoapValue {
    fn from(object: SoapObject) -> Self {
        Self::Object(object)
    }
}

impl From<bool> for SoapValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for SoapValue {
                fn from(value: $t) -> Self {
                    Self::Int(i64::from(value))
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for SoapValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for SoapValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SoapValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDate> for SoapValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<DateTime<Tz>> for SoapValue {
    fn from(value: DateTime<Tz>) -> Self {
        Self::DateTime(value)
    }
}

impl From<NaiveDateTime> for SoapValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::NaiveDateTime(value)
    }
}

impl<T: Into<SoapValue>> From<Vec<T>> for SoapValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<SoapValue>> From<Option<T>> for SoapValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_replaces_in_place() {
        let mut object = SoapObject::new().with("a", 1).with("b", "x");
        object.set("a", 2);
        let names: Vec<&str> = object.fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(object.get("a"), Some(&SoapValue::Int(2)));
    }

    #[test]
    fn test_accessors_parse_text() {
        assert_eq!(SoapValue::from("42").as_i64(), Some(42));
        assert_eq!(SoapValue::from("true").as_bool(), Some(true));
        assert_eq!(SoapValue::from("x").as_i64(), None);
    }

    #[test]
    fn test_into_list() {
        assert!(SoapValue::Null.into_list().is_empty());
        assert_eq!(SoapValue::Int(1).into_list(), vec![SoapValue::Int(1)]);
        assert_eq!(
            SoapValue::from(vec![1, 2]).into_list(),
            vec![SoapValue::Int(1), SoapValue::Int(2)]
        );
    }

    #[test]
    fn test_leaf_text() {
        let date = NaiveDate::from_ymd_opt(2012, 12, 2).unwrap();
        assert_eq!(SoapValue::from(date).to_text().as_deref(), Some("2012-12-02"));
        assert_eq!(SoapValue::Bytes(b"hi".to_vec()).to_text().as_deref(), Some("aGk="));
        assert_eq!(SoapValue::Null.to_text(), None);
    }

    #[test]
    fn test_display_object() {
        let value = SoapValue::from(SoapObject::of_type("TextValue").with("value", "x"));
        assert_eq!(value.to_string(), "TextValue{value: x}");
    }
}
