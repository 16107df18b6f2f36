//! Property value formatting
//!
//! The version-control engine stores revision dates and date-valued properties
//! in one canonical wire format, `YYYY-MM-DDTHH:MM:SS.ffffffZ`. Everything that
//! ends up as a property value passes through this module so the format is
//! produced in exactly one place.
//!
//! ## Examples
//!
//! ```rust
//! use svn_fixture::format::{format_property, format_timestamp, PropValue};
//!
//! let date = PropValue::from("2009-06-18 14:00:00");
//! assert_eq!(
//!     format_timestamp(Some(&date))?.as_deref(),
//!     Some("2009-06-18T14:00:00.000000Z")
//! );
//!
//! // Plain text is passed through untouched, even when it looks like a date.
//! assert_eq!(format_property(&PropValue::from("2009-06-18")), "2009-06-18");
//! # Ok::<(), svn_fixture::FixtureError>(())
//! ```

use crate::error::{FixtureError, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

/// Wire format for timestamps, as understood by `chrono::format`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Layouts accepted for naive (zone-less) timestamps, interpreted as UTC
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// A property value before normalization
///
/// Text is stored verbatim; time values are rendered in [`TIMESTAMP_FORMAT`]
/// when they are handed to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropValue {
    /// Arbitrary text
    Text(String),
    /// A point in time
    Time(DateTime<Utc>),
}

impl PropValue {
    /// Returns `true` for empty text
    pub fn is_empty(&self) -> bool {
        matches!(self, PropValue::Text(s) if s.is_empty())
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Text(text) => f.write_str(text),
            PropValue::Time(time) => write!(f, "{}", render(time)),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Text(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Text(value)
    }
}

impl From<&String> for PropValue {
    fn from(value: &String) -> Self {
        PropValue::Text(value.clone())
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Text(value.to_string())
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Text(value.to_string())
    }
}

impl From<u64> for PropValue {
    fn from(value: u64) -> Self {
        PropValue::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for PropValue {
    fn from(value: DateTime<Utc>) -> Self {
        PropValue::Time(value)
    }
}

impl From<DateTime<FixedOffset>> for PropValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        PropValue::Time(value.with_timezone(&Utc))
    }
}

impl From<NaiveDateTime> for PropValue {
    fn from(value: NaiveDateTime) -> Self {
        PropValue::Time(value.and_utc())
    }
}

/// A calendar date is midnight UTC of that day
impl From<NaiveDate> for PropValue {
    fn from(value: NaiveDate) -> Self {
        PropValue::Time(value.and_time(NaiveTime::MIN).and_utc())
    }
}

impl From<SystemTime> for PropValue {
    fn from(value: SystemTime) -> Self {
        PropValue::Time(DateTime::<Utc>::from(value))
    }
}

/// Normalize a timestamp-like value into the wire format
///
/// Time values are rendered directly. Text is parsed first (see
/// [`parse_timestamp`]) and then rendered. Absent input and empty text both
/// yield `None`.
///
/// # Errors
///
/// [`FixtureError::Format`] if non-empty text is not a recognizable timestamp.
pub fn format_timestamp(value: Option<&PropValue>) -> Result<Option<String>> {
    match value {
        None => Ok(None),
        Some(PropValue::Time(time)) => Ok(Some(render(time))),
        Some(PropValue::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(PropValue::Text(text)) => parse_timestamp(text).map(|time| Some(render(&time))),
    }
}

/// Normalize an arbitrary property value
///
/// Only time values are reformatted; text is returned unchanged.
pub fn format_property(value: &PropValue) -> String {
    match value {
        PropValue::Time(time) => render(time),
        PropValue::Text(text) => text.clone(),
    }
}

/// Parse the timestamp spellings fixtures commonly use
///
/// Accepts RFC 3339 with any offset, `YYYY-MM-DD HH:MM[:SS[.frac]]` (space or
/// `T`, optional trailing `Z` or ` UTC`), `YYYY-MM-DD HH:MM:SS ±hhmm` and a
/// bare `YYYY-MM-DD`. Zone-less values are taken as UTC.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(time) = DateTime::parse_from_rfc3339(text) {
        return Ok(time.with_timezone(&Utc));
    }
    if let Ok(time) = humantime::parse_rfc3339_weak(text) {
        return Ok(DateTime::<Utc>::from(time));
    }
    if let Ok(time) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S %z") {
        return Ok(time.with_timezone(&Utc));
    }

    let naive = text
        .strip_suffix(" UTC")
        .or_else(|| text.strip_suffix('Z'))
        .unwrap_or(text)
        .trim_end();
    for layout in NAIVE_LAYOUTS {
        if let Ok(time) = NaiveDateTime::parse_from_str(naive, layout) {
            return Ok(time.and_utc());
        }
    }
    if let Some(midnight) = NaiveDate::parse_from_str(naive, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(midnight.and_utc());
    }

    Err(FixtureError::Format(text.to_string()))
}

fn render(time: &DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    const EXPECTED: &str = "2009-06-18T14:00:00.000000Z";

    #[test]
    fn test_time_value_renders_wire_format() {
        let time = Utc.with_ymd_and_hms(2009, 6, 18, 14, 0, 0).unwrap();
        let value = PropValue::from(time);
        assert_eq!(format_timestamp(Some(&value)).unwrap().as_deref(), Some(EXPECTED));
        assert_eq!(format_property(&value), EXPECTED);
    }

    #[test]
    fn test_text_spellings_of_the_same_instant() {
        for text in [
            "2009-06-18T14:00:00",
            "2009-06-18 14:00:00",
            "2009-06-18 14:00",
            "2009-06-18 14:00 UTC",
            "2009-06-18T14:00:00Z",
            "2009-06-18T16:00:00+02:00",
            "2009-06-18 14:00:00 +0000",
        ] {
            let formatted = format_timestamp(Some(&PropValue::from(text))).unwrap();
            assert_eq!(formatted.as_deref(), Some(EXPECTED), "input {text:?}");
        }
    }

    #[test]
    fn test_fractional_seconds_keep_six_digits() {
        let value = PropValue::from("2009-01-01 12:00:00.5Z");
        assert_eq!(
            format_timestamp(Some(&value)).unwrap().as_deref(),
            Some("2009-01-01T12:00:00.500000Z")
        );
    }

    #[test]
    fn test_bare_date_is_midnight() {
        let value = PropValue::from("2009-01-01");
        assert_eq!(
            format_timestamp(Some(&value)).unwrap().as_deref(),
            Some("2009-01-01T00:00:00.000000Z")
        );
    }

    #[test]
    fn test_date_value_is_midnight() {
        let value = PropValue::from(NaiveDate::from_ymd_opt(2009, 6, 18).unwrap());
        assert_eq!(format_property(&value), "2009-06-18T00:00:00.000000Z");
        assert_eq!(
            format_timestamp(Some(&value)).unwrap().as_deref(),
            Some("2009-06-18T00:00:00.000000Z")
        );
    }

    #[test]
    fn test_absent_and_empty_are_no_value() {
        assert_eq!(format_timestamp(None).unwrap(), None);
        assert_eq!(format_timestamp(Some(&PropValue::from(""))).unwrap(), None);
        assert_eq!(format_timestamp(Some(&PropValue::from("  "))).unwrap(), None);
    }

    #[test]
    fn test_unparseable_text_is_format_error() {
        let err = format_timestamp(Some(&PropValue::from("not a date"))).unwrap_err();
        assert!(matches!(err, FixtureError::Format(ref s) if s == "not a date"));
    }

    #[test]
    fn test_text_property_passes_through() {
        assert_eq!(format_property(&PropValue::from("Yes")), "Yes");
        assert_eq!(format_property(&PropValue::from("2009-06-18")), "2009-06-18");
        assert_eq!(format_property(&PropValue::from(42i64)), "42");
    }

    proptest! {
        #[test]
        fn prop_rendered_timestamps_parse_back(secs in 0i64..4_000_000_000, micros in 0u32..1_000_000) {
            let time = Utc.timestamp_opt(secs, micros * 1_000).unwrap();
            let rendered = format_property(&PropValue::Time(time));
            prop_assert_eq!(rendered.len(), 27);
            prop_assert!(rendered.ends_with('Z'));
            prop_assert_eq!(parse_timestamp(&rendered).unwrap(), time);
        }
    }
}
