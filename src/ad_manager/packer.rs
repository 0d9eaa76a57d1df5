//! Conversion of native dates into Ad Manager `Date` and `DateTime` objects.

use crate::pql::{date_object, date_time_object};
use crate::soap::{MarshalError, Packer, SoapValue};

/// Packs [`SoapValue::Date`] into `{year, month, day}` and
/// [`SoapValue::DateTime`] into `{date, hour, minute, second, timeZoneId}`.
///
/// Date-times without a zone are rejected, since the server would have to
/// guess one.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdManagerPacker;

impl Packer for AdManagerPacker {
    fn pack(&self, value: SoapValue) -> Result<SoapValue, MarshalError> {
        match value {
            SoapValue::Date(date) => Ok(SoapValue::Object(date_object(date))),
            SoapValue::DateTime(date_time) => Ok(SoapValue::Object(date_time_object(&date_time))),
            SoapValue::NaiveDateTime(value) => Err(MarshalError::NaiveDateTime {
                value: value.to_string(),
            }),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use chrono_tz::Tz;

    #[test]
    fn test_packs_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let packed = AdManagerPacker.pack(SoapValue::Date(date)).unwrap();
        assert_eq!(packed.field("year").and_then(SoapValue::as_i64), Some(2024));
        assert_eq!(packed.field("month").and_then(SoapValue::as_i64), Some(3));
        assert_eq!(packed.field("day").and_then(SoapValue::as_i64), Some(9));
    }

    #[test]
    fn test_packs_zoned_date_time() {
        let zone: Tz = "America/New_York".parse().unwrap();
        let value = zone.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let packed = AdManagerPacker.pack(SoapValue::DateTime(value)).unwrap();
        assert_eq!(
            packed.field("timeZoneId").and_then(SoapValue::as_str),
            Some("America/New_York")
        );
        assert_eq!(packed.field("hour").and_then(SoapValue::as_i64), Some(3));
        assert!(packed.field("date").and_then(|d| d.field("day")).is_some());
    }

    #[test]
    fn test_rejects_naive_date_time() {
        let value = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let result = AdManagerPacker.pack(SoapValue::NaiveDateTime(value));
        assert!(matches!(result, Err(MarshalError::NaiveDateTime { .. })));
    }

    #[test]
    fn test_packing_is_idempotent() {
        let zone: Tz = "America/New_York".parse().unwrap();
        let values = [
            SoapValue::Date(NaiveDate::from_ymd_opt(2017, 1, 2).unwrap()),
            SoapValue::DateTime(zone.with_ymd_and_hms(2017, 1, 2, 3, 4, 5).unwrap()),
            SoapValue::from("text"),
        ];
        for value in values {
            let once = AdManagerPacker.pack(value).unwrap();
            let twice = AdManagerPacker.pack(once.clone()).unwrap();
            assert_eq!(twice, once);
        }
    }

    #[test]
    fn test_passes_other_values_through() {
        let packed = AdManagerPacker.pack(SoapValue::from("text")).unwrap();
        assert_eq!(packed, SoapValue::from("text"));
    }
}
