//! Domain models for the health log.

mod measurement;
mod patient;

pub use measurement::*;
pub use patient::*;

/// Id carried by records that have not been persisted yet.
pub const UNSAVED_ID: i64 = -1;

/// Calendar dates are exchanged as `YYYY-MM-DD`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Timestamps are exchanged as ISO-8601 date-times with milliseconds.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Parse an ISO-8601 calendar date. A full date-time is truncated to its date.
pub fn parse_date(s: &str) -> Option<chrono::NaiveDate> {
    let s = s.trim();
    chrono::NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .or_else(|| parse_timestamp(s).map(|ts| ts.date()))
}

/// Parse an ISO-8601 date-time, with either `T` or a space as separator.
pub fn parse_timestamp(s: &str) -> Option<chrono::NaiveDateTime> {
    let s = s.trim();
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}
