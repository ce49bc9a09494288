//! Miscellaneous utils
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::ServerError;

pub(crate) mod pass;

/// Parse a `YYYY-MM-DD` path segment.
pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, ServerError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ServerError::InvalidInput(format!("Invalid date: {}", raw)))
}

/// Half-open range `[from 00:00, day after until 00:00)` covering both days.
pub(crate) fn day_bounds(from: NaiveDate, until: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let lower = from.and_time(NaiveTime::MIN);
    let upper = (until + Duration::days(1)).and_time(NaiveTime::MIN);
    (lower, upper)
}
