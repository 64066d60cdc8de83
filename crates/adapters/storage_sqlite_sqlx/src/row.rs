//! Column codecs shared by the repositories.

use std::str::FromStr;

use serde::de::DeserializeOwned;

use hookflow_domain::time::{Timestamp, format_canonical, parse_rfc3339};

/// Timestamps are `TEXT` in canonical form, so `ORDER BY` on them is chronological.
pub(crate) fn timestamp(ts: Timestamp) -> String {
    format_canonical(ts)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<Timestamp, sqlx::Error> {
    parse_rfc3339(value).map_err(decode)
}

pub(crate) fn parse_json<T: DeserializeOwned>(value: &str) -> Result<T, sqlx::Error> {
    serde_json::from_str(value).map_err(decode)
}

pub(crate) fn parse_enum<T>(value: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(value).map_err(decode)
}

/// `u64` columns are stored as `INTEGER` (i64).
pub(crate) fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub(crate) fn from_i64(value: i64) -> Result<u64, sqlx::Error> {
    u64::try_from(value).map_err(decode)
}

fn decode(err: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}
