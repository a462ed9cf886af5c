//! Parsing and wire formatting for date and datetime fields.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::error::TesseraError;
use crate::models::DATE_FORMAT;

static DATE_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date shape pattern is valid")
});

/// Time-of-day wire format, fractional seconds only when present.
const TIME_FORMAT: &str = "%H:%M:%S%.f%:z";

/// Parses a date string, truncating any time portion after `T`.
pub(crate) fn parse_date(field: &str, input: &str) -> Result<NaiveDate, TesseraError> {
    let date_part = input.split('T').next().unwrap_or(input);

    if !DATE_SHAPE.is_match(date_part) {
        return Err(TesseraError::invalid_format(
            field,
            input,
            "expected a YYYY-MM-DD date",
        ));
    }

    NaiveDate::parse_from_str(date_part, DATE_FORMAT)
        .map_err(|e| TesseraError::invalid_format(field, input, format!("not a calendar date: {}", e)))
}

/// Parses an RFC 3339 instant. Strings without an offset are read as UTC.
pub(crate) fn parse_datetime(field: &str, input: &str) -> Result<DateTime<FixedOffset>, TesseraError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt);
    }

    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc().fixed_offset())
        .map_err(|_| {
            TesseraError::invalid_format(field, input, "expected an RFC 3339 date and time")
        })
}

/// Joins the wire date and time-of-day into one instant.
///
/// A missing time means midnight UTC.
pub(crate) fn join_datetime(
    field: &str,
    date: &str,
    time: Option<&str>,
) -> Result<DateTime<FixedOffset>, TesseraError> {
    let date = parse_date(field, date)?;
    let time = time.unwrap_or("00:00:00+00:00");
    parse_datetime(field, &format!("{}T{}", date.format(DATE_FORMAT), time))
}

/// Splits an instant into the wire date and time-of-day.
pub(crate) fn split_datetime(dt: &DateTime<FixedOffset>) -> (String, String) {
    (
        dt.format(DATE_FORMAT).to_string(),
        dt.format(TIME_FORMAT).to_string(),
    )
}
