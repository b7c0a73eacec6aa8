use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::types::TimestampMs;

/// Naive layouts accepted after RFC 3339, all interpreted as UTC.
const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d"];

/// Parse an ISO-8601 timestamp into UTC milliseconds.
///
/// Accepts RFC 3339 (`2020-12-18T21:25:00.373Z`, `+02:00` offsets) or a naive
/// `YYYY-MM-DD HH:MM:SS[.fff]` layout, which is taken as UTC. A bare date maps
/// to midnight. Returns `None` when no layout matches.
pub fn parse_timestamp_ms(raw: &str) -> Option<TimestampMs> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.timestamp_millis());
    }
    for format in &NAIVE_FORMATS[..2] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(trimmed, NAIVE_FORMATS[2])
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp_millis())
}
