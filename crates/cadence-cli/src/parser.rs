use anyhow::{anyhow, Result};
use cadence_core::time::parse_timestamp;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use chrono_english::{parse_date_string, Dialect};

/// Parses an ISO 8601 timestamp, falling back to natural language
/// ("tomorrow 9am", "next friday") relative to now. Results are naive UTC.
pub fn parse_datetime(input: &str) -> Result<NaiveDateTime> {
    if let Ok(at) = parse_timestamp(input) {
        return Ok(at);
    }
    parse_date_string(input.trim(), Utc::now(), Dialect::Us)
        .map(|at| at.naive_utc())
        .map_err(|e| anyhow!("Failed to parse date '{}': {}", input, e))
}

pub fn parse_optional_datetime(input: Option<&str>) -> Result<Option<NaiveDateTime>> {
    input.map(parse_datetime).transpose()
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d") {
        return Ok(date);
    }
    Ok(parse_datetime(input)?.date())
}
