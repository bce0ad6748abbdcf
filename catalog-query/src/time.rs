//! Modified Julian Date ↔ civil UTC conversion.
//!
//! Requests express time bounds as MJD; the catalog stores civil UTC
//! timestamps and compares them as `YYYY-MM-DD HH:MM:SS.sss` strings.
//! Leap seconds are not modelled: every day is 86400 s long.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Deserializer};

/// Civil-time format bound into backend queries and emitted in results.
pub const CIVIL_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// 1858-11-17 00:00:00 UTC, MJD 0.
fn mjd_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1858, 11, 17)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Convert an MJD to a civil UTC timestamp, rounded to the millisecond.
///
/// Returns `None` for non-finite values or dates chrono cannot represent.
pub fn mjd_to_datetime(mjd: f64) -> Option<NaiveDateTime> {
    if !mjd.is_finite() {
        return None;
    }
    let millis = (mjd * MILLIS_PER_DAY).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    let offset = TimeDelta::try_milliseconds(millis as i64)?;
    mjd_epoch().checked_add_signed(offset)
}

/// MJD of a civil UTC timestamp.
pub fn datetime_to_mjd(datetime: &NaiveDateTime) -> f64 {
    let elapsed = datetime.signed_duration_since(mjd_epoch());
    elapsed.num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// Render a timestamp in the backend civil-time format.
pub fn format_civil(datetime: &NaiveDateTime) -> String {
    datetime.format(CIVIL_FORMAT).to_string()
}

/// Parse a civil timestamp as stored by the catalog.
///
/// Accepts `YYYY-MM-DD HH:MM:SS` with optional fractional seconds, and the
/// ISO-8601 `T` separator.
pub fn parse_civil(text: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
}

/// Serde adapter for civil timestamps in catalog dumps.
pub fn deserialize_civil<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_civil(&text).map_err(serde::de::Error::custom)
}
