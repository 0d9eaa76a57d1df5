//! PQL bind values and their typed `Value` representation.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::pql::errors::StatementError;
use crate::soap::{SoapObject, SoapValue};

/// A PQL number.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    /// Integral value.
    Integer(i64),
    /// Fractional value.
    Decimal(f64),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            // `{:?}` keeps the `.0` of integral decimals.
            Self::Decimal(value) => write!(f, "{value:?}"),
        }
    }
}

/// A bind variable value in the shape Ad Manager expects.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedValue {
    /// `TextValue`.
    Text(String),
    /// `NumberValue`.
    Number(Number),
    /// `BooleanValue`.
    Boolean(bool),
    /// `DateValue`.
    Date(NaiveDate),
    /// `DateTimeValue`.
    DateTime(DateTime<Tz>),
    /// `SetValue`; all elements share one variant.
    Set(Vec<TypedValue>),
}

impl TypedValue {
    /// The Ad Manager type name, e.g. `TextValue`.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "TextValue",
            Self::Number(_) => "NumberValue",
            Self::Boolean(_) => "BooleanValue",
            Self::Date(_) => "DateValue",
            Self::DateTime(_) => "DateTimeValue",
            Self::Set(_) => "SetValue",
        }
    }

    /// Converts to the `xsi_type`-tagged object sent on the wire.
    #[must_use]
    pub fn to_soap(&self) -> SoapValue {
        let object = SoapObject::of_type(self.type_name());
        let object = match self {
            Self::Text(text) => object.with("value", text.as_str()),
            Self::Number(number) => object.with("value", number.to_string()),
            Self::Boolean(value) => object.with("value", *value),
            Self::Date(date) => object.with("value", date_object(*date)),
            Self::DateTime(value) => object.with("value", date_time_object(value)),
            Self::Set(values) => object.with(
                "values",
                SoapValue::List(values.iter().map(Self::to_soap).collect()),
            ),
        };
        SoapValue::Object(object)
    }
}

impl From<TypedValue> for SoapValue {
    fn from(value: TypedValue) -> Self {
        value.to_soap()
    }
}

/// An Ad Manager `Date`: `{year, month, day}`.
#[must_use]
pub fn date_object(date: NaiveDate) -> SoapObject {
    SoapObject::new()
        .with("year", date.year())
        .with("month", date.month())
        .with("day", date.day())
}

/// An Ad Manager `DateTime`: `{date, hour, minute, second, timeZoneId}`.
#[must_use]
pub fn date_time_object(value: &DateTime<Tz>) -> SoapObject {
    SoapObject::new()
        .with("date", date_object(value.date_naive()))
        .with("hour", value.hour())
        .with("minute", value.minute())
        .with("second", value.second())
        .with("timeZoneId", value.timezone().name())
}

/// A native value accepted as a bind variable.
///
/// Conversion into a [`TypedValue`] validates the value: naive date-times,
/// mixed sets and unsupported shapes are rejected.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    /// A string.
    Text(String),
    /// A boolean.
    Boolean(bool),
    /// An integer.
    Integer(i64),
    /// A float.
    Decimal(f64),
    /// A date.
    Date(NaiveDate),
    /// A date-time with a named zone.
    DateTime(DateTime<Tz>),
    /// A date-time with only an offset; it has no zone name to send.
    FixedOffsetDateTime(DateTime<FixedOffset>),
    /// A date-time without a zone.
    NaiveDateTime(NaiveDateTime),
    /// A list, bound as a set.
    List(Vec<BindValue>),
    /// Anything else, described for the error message.
    Unsupported(String),
}

impl TryFrom<BindValue> for TypedValue {
    type Error = StatementError;

    fn try_from(value: BindValue) -> Result<Self, Self::Error> {
        match value {
            BindValue::Text(text) => Ok(Self::Text(text)),
            BindValue::Boolean(value) => Ok(Self::Boolean(value)),
            BindValue::Integer(value) => Ok(Self::Number(Number::Integer(value))),
            BindValue::Decimal(value) if value.is_finite() => {
                Ok(Self::Number(Number::Decimal(value)))
            }
            BindValue::Decimal(value) => Err(StatementError::UnsupportedBindType {
                type_name: format!("non-finite number {value}"),
            }),
            BindValue::Date(date) => Ok(Self::Date(date)),
            BindValue::DateTime(value) => Ok(Self::DateTime(value)),
            BindValue::FixedOffsetDateTime(value) => Err(StatementError::UnsupportedBindType {
                type_name: format!("datetime with offset {} but no time zone id", value.offset()),
            }),
            BindValue::NaiveDateTime(value) => Err(StatementError::NaiveDateTime {
                value: value.to_string(),
            }),
            BindValue::List(items) => {
                let values = items
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                if let Some(first) = values.first() {
                    if let Some(other) = values.iter().find(|v| v.type_name() != first.type_name()) {
                        return Err(StatementError::MixedSetVariants {
                            first: first.type_name(),
                            other: other.type_name(),
                        });
                    }
                }
                Ok(Self::Set(values))
            }
            BindValue::Unsupported(type_name) => {
                Err(StatementError::UnsupportedBindType { type_name })
            }
        }
    }
}

impl From<&str> for BindValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for BindValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for BindValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

macro_rules! bind_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for BindValue {
                fn from(value: $t) -> Self {
                    Self::Integer(i64::from(value))
                }
            }
        )*
    };
}

bind_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for BindValue {
    fn from(value: f32) -> Self {
        Self::Decimal(f64::from(value))
    }
}

impl From<f64> for BindValue {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<NaiveDate> for BindValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<DateTime<Tz>> for BindValue {
    fn from(value: DateTime<Tz>) -> Self {
        Self::DateTime(value)
    }
}

impl From<DateTime<Utc>> for BindValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::DateTime(value.with_timezone(&Tz::UTC))
    }
}

impl From<DateTime<FixedOffset>> for BindValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::FixedOffsetDateTime(value)
    }
}

impl From<NaiveDateTime> for BindValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::NaiveDateTime(value)
    }
}

impl<T: Into<BindValue>> From<Vec<T>> for BindValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<SoapValue> for BindValue {
    fn from(value: SoapValue) -> Self {
        match value {
            SoapValue::Text(text) => Self::Text(text),
            SoapValue::Bool(value) => Self::Boolean(value),
            SoapValue::Int(value) => Self::Integer(value),
            SoapValue::Float(value) => Self::Decimal(value),
            SoapValue::Date(date) => Self::Date(date),
            SoapValue::DateTime(value) => Self::DateTime(value),
            SoapValue::NaiveDateTime(value) => Self::NaiveDateTime(value),
            SoapValue::List(items) => Self::List(items.into_iter().map(Self::from).collect()),
            other => Self::Unsupported(other.kind().to_string()),
        }
    }
}

/// Bind values for a PQL download: native values keyed by name, or raw
/// `String_ValueMapEntry` objects passed through as-is.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PqlValues {
    /// No bind variables.
    #[default]
    None,
    /// Named native values.
    Bind(BTreeMap<String, BindValue>),
    /// Pre-built `String_ValueMapEntry` objects.
    Raw(Vec<SoapValue>),
}

impl PqlValues {
    /// Converts to the `values` list of a `Statement`.
    ///
    /// # Errors
    ///
    /// Returns a [`StatementError`] for values that cannot be bound.
    pub fn into_entries(self) -> Result<Vec<SoapValue>, StatementError> {
        match self {
            Self::None => Ok(Vec::new()),
            Self::Raw(entries) => Ok(entries),
            Self::Bind(values) => values
                .into_iter()
                .map(|(key, value)| Ok(value_map_entry(&key, &TypedValue::try_from(value)?)))
                .collect(),
        }
    }
}

impl From<BTreeMap<String, BindValue>> for PqlValues {
    fn from(values: BTreeMap<String, BindValue>) -> Self {
        Self::Bind(values)
    }
}

impl<K: Into<String>, V: Into<BindValue>, const N: usize> From<[(K, V); N]> for PqlValues {
    fn from(values: [(K, V); N]) -> Self {
        Self::Bind(
            values
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl From<Vec<SoapValue>> for PqlValues {
    fn from(entries: Vec<SoapValue>) -> Self {
        Self::Raw(entries)
    }
}

/// A `String_ValueMapEntry`: `{key, value}`.
#[must_use]
pub fn value_map_entry(key: &str, value: &TypedValue) -> SoapValue {
    SoapValue::Object(SoapObject::new().with("key", key).with("value", value.to_soap()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_text_value_shape() {
        let value = TypedValue::Text("a".to_string()).to_soap();
        assert_eq!(value.xsi_type(), Some("TextValue"));
        assert_eq!(value.field("value"), Some(&SoapValue::Text("a".to_string())));
    }

    #[test]
    fn test_date_time_value_shape() {
        let value = chrono_tz::America::New_York
            .with_ymd_and_hms(2012, 12, 2, 12, 45, 0)
            .unwrap();
        let soap = TypedValue::DateTime(value).to_soap();
        let inner = soap.field("value").unwrap();
        assert_eq!(inner.field("hour"), Some(&SoapValue::Int(12)));
        assert_eq!(inner.field("minute"), Some(&SoapValue::Int(45)));
        assert_eq!(
            inner.field("timeZoneId"),
            Some(&SoapValue::Text("America/New_York".to_string()))
        );
        let date = inner.field("date").unwrap();
        assert_eq!(date.field("year"), Some(&SoapValue::Int(2012)));
        assert_eq!(date.field("month"), Some(&SoapValue::Int(12)));
        assert_eq!(date.field("day"), Some(&SoapValue::Int(2)));
    }

    #[test]
    fn test_set_of_numbers() {
        let typed = TypedValue::try_from(BindValue::from(vec![1, 2])).unwrap();
        let soap = typed.to_soap();
        assert_eq!(soap.xsi_type(), Some("SetValue"));
        let values = soap.field("values").and_then(SoapValue::as_list).unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].xsi_type(), Some("NumberValue"));
        assert_eq!(values[1].field("value"), Some(&SoapValue::Text("2".to_string())));
    }

    #[test]
    fn test_integral_decimal_keeps_fraction() {
        let typed = TypedValue::try_from(BindValue::from(2.0_f64)).unwrap();
        assert_eq!(
            typed.to_soap().field("value"),
            Some(&SoapValue::Text("2.0".to_string()))
        );
    }

    #[test]
    fn test_non_finite_decimals_rejected() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                TypedValue::try_from(BindValue::from(value)),
                Err(StatementError::UnsupportedBindType { .. })
            ));
        }
    }

    #[test]
    fn test_mixed_set_rejected() {
        let mixed = BindValue::List(vec![BindValue::from(1), BindValue::from("a")]);
        assert_eq!(
            TypedValue::try_from(mixed),
            Err(StatementError::MixedSetVariants {
                first: "NumberValue",
                other: "TextValue"
            })
        );
    }

    #[test]
    fn test_naive_datetime_rejected() {
        let naive = NaiveDate::from_ymd_opt(2012, 12, 2)
            .unwrap()
            .and_hms_opt(12, 45, 0)
            .unwrap();
        assert!(matches!(
            TypedValue::try_from(BindValue::from(naive)),
            Err(StatementError::NaiveDateTime { .. })
        ));
    }

    #[test]
    fn test_utc_datetime_binds_with_utc_zone() {
        let value = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let typed = TypedValue::try_from(BindValue::from(value)).unwrap();
        match typed {
            TypedValue::DateTime(dt) => assert_eq!(dt.timezone(), Tz::UTC),
            other => panic!("Expected DateTime, got {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_soap_value() {
        let object = SoapValue::Object(SoapObject::new());
        assert!(matches!(
            TypedValue::try_from(BindValue::from(object)),
            Err(StatementError::UnsupportedBindType { .. })
        ));
    }

    #[test]
    fn test_pql_values_entries() {
        let entries = PqlValues::from([("id", 5)]).into_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].field("key"), Some(&SoapValue::Text("id".to_string())));
        assert_eq!(entries[0].field("value").and_then(SoapValue::xsi_type), Some("NumberValue"));
    }
}
