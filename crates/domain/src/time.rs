//! Time and timestamp helpers.
//!
//! Timestamps are UTC. Their canonical text form is fixed-width RFC 3339
//! with microsecond precision and a `Z` suffix, so that lexical order matches
//! time order wherever they are stored as text.

use chrono::{DateTime, ParseError, SecondsFormat, Utc};

/// UTC timestamp used for record creation, execution and step start/completion times.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Canonical text form, e.g. `2026-03-01T08:15:00.250000Z`.
#[must_use]
pub fn format_canonical(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse any RFC 3339 timestamp, normalizing its offset to UTC.
///
/// # Errors
///
/// Returns the chrono [`ParseError`] for malformed input.
pub fn parse_rfc3339(value: &str) -> Result<Timestamp, ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.to_utc())
}
