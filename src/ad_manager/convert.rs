//! Rendering of PQL result cells as CSV-ready strings.

use chrono::{
    DateTime, Duration, FixedOffset, LocalResult, NaiveDate, Offset, SecondsFormat, TimeZone,
};
use chrono_tz::Tz;

use crate::error::GoogleAdsError;
use crate::soap::{SoapObject, SoapValue};

/// Placeholder written for cells without a value.
pub const EMPTY_CELL: &str = "-";

/// Renders one `Value` cell of a PQL `ResultSet` row.
///
/// - `TextValue`: the text with `"` doubled
/// - `NumberValue`: an integer, or a decimal when the text has a `.`
/// - `DateValue`: `YYYY-MM-DD`
/// - `DateTimeValue`: RFC 3339 in the value's zone, `Z` for a zero offset
/// - `SetValue`: each element rendered and quoted, joined by `,`
/// - missing or empty values: `-`
///
/// Other cells are rendered as returned.
///
/// # Errors
///
/// - [`GoogleAdsError::MixedSetVariants`] if a set mixes value types
/// - [`GoogleAdsError::UnknownTimeZone`] for a zone missing from the zone
///   database
/// - [`GoogleAdsError::UnexpectedResponse`] for malformed dates
///
/// # Example
///
/// ```rust
/// use googleads::ad_manager::convert_value_for_csv;
/// use googleads::soap::{SoapObject, SoapValue};
///
/// let cell = SoapValue::from(SoapObject::of_type("TextValue").with("value", "say \"hi\""));
/// assert_eq!(convert_value_for_csv(&cell).unwrap(), "say \"\"hi\"\"");
/// ```
pub fn convert_value_for_csv(value: &SoapValue) -> Result<String, GoogleAdsError> {
    let Some(object) = value.as_object() else {
        return Ok(if is_empty(value) {
            EMPTY_CELL.to_string()
        } else {
            value.to_string()
        });
    };

    if let (None, Some(values)) = (object.get("value"), object.get("values")) {
        return convert_set(values);
    }
    let field = match object.get("value") {
        Some(field) if !is_empty(field) => field,
        _ => return Ok(EMPTY_CELL.to_string()),
    };
    if let SoapValue::List(_) = field {
        return convert_set(field);
    }

    match object.xsi_type() {
        Some("TextValue") => Ok(field.to_string().replace('"', "\"\"")),
        Some("NumberValue") => Ok(convert_number(&field.to_string())),
        Some("DateValue") => Ok(date_from_object(field)?.format("%Y-%m-%d").to_string()),
        Some("DateTimeValue") => convert_date_time(field),
        _ => Ok(field.to_string()),
    }
}

fn is_empty(value: &SoapValue) -> bool {
    match value {
        SoapValue::Null => true,
        SoapValue::Text(text) => text.is_empty(),
        SoapValue::List(items) => items.is_empty(),
        _ => false,
    }
}

fn convert_set(values: &SoapValue) -> Result<String, GoogleAdsError> {
    let items = values.clone().into_list();
    if items.is_empty() {
        return Ok(EMPTY_CELL.to_string());
    }
    let first = items[0].xsi_type();
    if let Some(other) = items.iter().map(SoapValue::xsi_type).find(|kind| *kind != first) {
        return Err(GoogleAdsError::MixedSetVariants {
            first: first.unwrap_or("untyped").to_string(),
            other: other.unwrap_or("untyped").to_string(),
        });
    }
    let rendered = items
        .iter()
        .map(|item| convert_value_for_csv(item).map(|text| format!("\"{text}\"")))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rendered.join(","))
}

fn convert_number(text: &str) -> String {
    if text.contains('.') {
        match text.parse::<f64>() {
            Ok(number) if number.is_finite() && number.fract() == 0.0 => format!("{number:.1}"),
            Ok(number) => number.to_string(),
            Err(_) => text.to_string(),
        }
    } else {
        text.parse::<i64>()
            .map_or_else(|_| text.to_string(), |number| number.to_string())
    }
}

fn int_field(object: &SoapObject, name: &str) -> Result<i64, GoogleAdsError> {
    object
        .get(name)
        .and_then(SoapValue::as_i64)
        .ok_or_else(|| malformed(format!("missing or invalid '{name}'")))
}

fn malformed(reason: String) -> GoogleAdsError {
    GoogleAdsError::UnexpectedResponse {
        operation: "select".to_string(),
        reason,
    }
}

fn date_from_object(value: &SoapValue) -> Result<NaiveDate, GoogleAdsError> {
    let object = value
        .as_object()
        .ok_or_else(|| malformed(format!("date value is not an object: {value}")))?;
    let year = int_field(object, "year")?;
    let month = int_field(object, "month")?;
    let day = int_field(object, "day")?;
    i32::try_from(year)
        .ok()
        .zip(u32::try_from(month).ok())
        .zip(u32::try_from(day).ok())
        .and_then(|((year, month), day)| NaiveDate::from_ymd_opt(year, month, day))
        .ok_or_else(|| malformed(format!("invalid date {year}-{month}-{day}")))
}

fn convert_date_time(value: &SoapValue) -> Result<String, GoogleAdsError> {
    let object = value
        .as_object()
        .ok_or_else(|| malformed(format!("date-time value is not an object: {value}")))?;
    let date = date_from_object(
        object
            .get("date")
            .ok_or_else(|| malformed("date-time value has no date".to_string()))?,
    )?;
    let hour = int_field(object, "hour")?;
    let minute = int_field(object, "minute")?;
    let second = int_field(object, "second")?;
    let naive = u32::try_from(hour)
        .ok()
        .zip(u32::try_from(minute).ok())
        .zip(u32::try_from(second).ok())
        .and_then(|((hour, minute), second)| date.and_hms_opt(hour, minute, second))
        .ok_or_else(|| malformed(format!("invalid time {hour}:{minute}:{second}")))?;

    let time_zone_id = object
        .get("timeZoneId")
        .and_then(SoapValue::as_str)
        .unwrap_or("UTC");
    let zone: Tz = time_zone_id
        .parse()
        .map_err(|_| GoogleAdsError::UnknownTimeZone {
            time_zone_id: time_zone_id.to_string(),
        })?;

    let localized: DateTime<FixedOffset> = match zone.from_local_datetime(&naive) {
        LocalResult::Single(value) => value.with_timezone(&value.offset().fix()),
        // A repeated wall-clock hour resolves to standard time.
        LocalResult::Ambiguous(_, later) => later.with_timezone(&later.offset().fix()),
        // A skipped wall-clock hour keeps the offset in effect before the gap.
        LocalResult::None => {
            let before = zone.offset_from_utc_datetime(&(naive - Duration::days(1))).fix();
            before
                .from_local_datetime(&naive)
                .single()
                .ok_or_else(|| malformed(format!("{naive} does not exist in {time_zone_id}")))?
        }
    };
    Ok(localized.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(xsi_type: &str, value: impl Into<SoapValue>) -> SoapValue {
        SoapValue::from(SoapObject::of_type(xsi_type).with("value", value))
    }

    fn date(year: i32, month: u32, day: u32) -> SoapObject {
        SoapObject::new()
            .with("year", year)
            .with("month", month)
            .with("day", day)
    }

    fn date_time(zone: &str, hour: u32) -> SoapObject {
        SoapObject::new()
            .with("date", date(2017, 1, 2))
            .with("hour", hour)
            .with("minute", 4)
            .with("second", 5)
            .with("timeZoneId", zone)
    }

    #[test]
    fn test_text_value_doubles_quotes() {
        let value = cell("TextValue", "a \"quoted\" word");
        assert_eq!(convert_value_for_csv(&value).unwrap(), "a \"\"quoted\"\" word");
    }

    #[test]
    fn test_number_values() {
        assert_eq!(convert_value_for_csv(&cell("NumberValue", "123")).unwrap(), "123");
        assert_eq!(convert_value_for_csv(&cell("NumberValue", "1.50")).unwrap(), "1.5");
        assert_eq!(convert_value_for_csv(&cell("NumberValue", "2.0")).unwrap(), "2.0");
    }

    #[test]
    fn test_date_value() {
        let value = cell("DateValue", date(2017, 3, 9));
        assert_eq!(convert_value_for_csv(&value).unwrap(), "2017-03-09");
    }

    #[test]
    fn test_date_time_value_with_offset() {
        let value = cell("DateTimeValue", date_time("America/New_York", 3));
        assert_eq!(
            convert_value_for_csv(&value).unwrap(),
            "2017-01-02T03:04:05-05:00"
        );
    }

    #[test]
    fn test_date_time_value_in_utc_uses_z() {
        let value = cell("DateTimeValue", date_time("Etc/GMT", 3));
        assert_eq!(convert_value_for_csv(&value).unwrap(), "2017-01-02T03:04:05Z");
    }

    #[test]
    fn test_date_time_value_in_gmt_and_pst8pdt() {
        let gmt = SoapObject::new()
            .with("date", date(2013, 1, 3))
            .with("hour", 2)
            .with("minute", 2)
            .with("second", 2)
            .with("timeZoneId", "GMT");
        assert_eq!(
            convert_value_for_csv(&cell("DateTimeValue", gmt)).unwrap(),
            "2013-01-03T02:02:02Z"
        );

        let pacific = SoapObject::new()
            .with("date", date(2012, 11, 5))
            .with("hour", 12)
            .with("minute", 12)
            .with("second", 12)
            .with("timeZoneId", "PST8PDT");
        assert_eq!(
            convert_value_for_csv(&cell("DateTimeValue", pacific)).unwrap(),
            "2012-11-05T12:12:12-08:00"
        );
    }

    #[test]
    fn test_date_time_value_in_skipped_hour_uses_standard_offset() {
        let skipped = SoapObject::new()
            .with("date", date(2017, 3, 12))
            .with("hour", 2)
            .with("minute", 30)
            .with("second", 0)
            .with("timeZoneId", "America/New_York");
        assert_eq!(
            convert_value_for_csv(&cell("DateTimeValue", skipped)).unwrap(),
            "2017-03-12T02:30:00-05:00"
        );
    }

    #[test]
    fn test_date_time_value_with_unknown_zone() {
        let value = cell("DateTimeValue", date_time("Mars/Olympus_Mons", 3));
        assert!(matches!(
            convert_value_for_csv(&value),
            Err(GoogleAdsError::UnknownTimeZone { time_zone_id }) if time_zone_id == "Mars/Olympus_Mons"
        ));
    }

    #[test]
    fn test_set_value_quotes_each_element() {
        let set = SoapObject::of_type("SetValue").with(
            "values",
            vec![cell("TextValue", "a"), cell("TextValue", "b")],
        );
        assert_eq!(
            convert_value_for_csv(&SoapValue::from(set)).unwrap(),
            "\"a\",\"b\""
        );
    }

    #[test]
    fn test_set_value_with_commas_and_quotes() {
        let set = SoapObject::of_type("SetValue").with(
            "values",
            vec![
                cell("TextValue", "Look at how many commas and \"s there are"),
                cell("TextValue", "this,is...how,Christopher Walken, talks"),
            ],
        );
        assert_eq!(
            convert_value_for_csv(&SoapValue::from(set)).unwrap(),
            "\"Look at how many commas and \"\"s there are\",\"this,is...how,Christopher Walken, talks\""
        );
    }

    #[test]
    fn test_set_value_with_mixed_types_fails() {
        let set = SoapObject::of_type("SetValue").with(
            "values",
            vec![cell("TextValue", "a"), cell("NumberValue", "1")],
        );
        assert!(matches!(
            convert_value_for_csv(&SoapValue::from(set)),
            Err(GoogleAdsError::MixedSetVariants { first, other })
                if first == "TextValue" && other == "NumberValue"
        ));
    }

    #[test]
    fn test_empty_values_render_as_dash() {
        assert_eq!(convert_value_for_csv(&cell("TextValue", "")).unwrap(), "-");
        let missing = SoapValue::from(SoapObject::of_type("NumberValue"));
        assert_eq!(convert_value_for_csv(&missing).unwrap(), "-");
        assert_eq!(convert_value_for_csv(&SoapValue::Null).unwrap(), "-");
    }

    #[test]
    fn test_other_types_pass_through() {
        assert_eq!(
            convert_value_for_csv(&cell("BooleanValue", true)).unwrap(),
            "true"
        );
    }
}
