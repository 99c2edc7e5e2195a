//! Timestamp normalization.
//!
//! Every timestamp inside the engine is a zone-naive [`NaiveDateTime`] holding
//! a UTC wall-clock value. Zone-aware inputs are converted to UTC before the
//! zone is stripped; zone-naive inputs are taken as-is.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::error::CoreError;

/// Naive layouts accepted after RFC 3339 parsing fails, most specific first.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Zone-aware layouts that RFC 3339 rejects (space separator, compact offset).
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

/// Conversion into the engine's single timestamp representation.
pub trait IntoNaiveUtc {
    fn into_naive_utc(self) -> Result<NaiveDateTime, CoreError>;
}

impl IntoNaiveUtc for NaiveDateTime {
    fn into_naive_utc(self) -> Result<NaiveDateTime, CoreError> {
        Ok(self)
    }
}

impl<Tz: TimeZone> IntoNaiveUtc for DateTime<Tz> {
    fn into_naive_utc(self) -> Result<NaiveDateTime, CoreError> {
        Ok(self.naive_utc())
    }
}

impl IntoNaiveUtc for &str {
    fn into_naive_utc(self) -> Result<NaiveDateTime, CoreError> {
        parse_timestamp(self)
    }
}

impl IntoNaiveUtc for String {
    fn into_naive_utc(self) -> Result<NaiveDateTime, CoreError> {
        parse_timestamp(&self)
    }
}

impl IntoNaiveUtc for &String {
    fn into_naive_utc(self) -> Result<NaiveDateTime, CoreError> {
        parse_timestamp(self)
    }
}

/// Normalizes an optional timestamp. `None` stays `None`.
pub fn normalize<T: IntoNaiveUtc>(value: Option<T>) -> Result<Option<NaiveDateTime>, CoreError> {
    value.map(IntoNaiveUtc::into_naive_utc).transpose()
}

/// Parses ISO 8601 text into a naive UTC timestamp.
///
/// Offsets (including `Z`) are applied and then discarded. A bare date is
/// read as midnight of that day.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime, CoreError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CoreError::Parse("empty timestamp".to_string()));
    }

    if let Ok(aware) = DateTime::parse_from_rfc3339(text) {
        return Ok(aware.naive_utc());
    }
    for format in OFFSET_FORMATS {
        if let Ok(aware) = DateTime::<FixedOffset>::parse_from_str(text, format) {
            return Ok(aware.naive_utc());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(start_of_day(date));
    }

    Err(CoreError::Parse(format!(
        "'{}' is not an ISO 8601 timestamp",
        text
    )))
}

/// Midnight at the start of `date`.
#[inline]
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Source of "now" for the repository. Injected so windows are deterministic in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The UTC wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[rstest]
    #[case("2026-02-01T08:00:00", at(2026, 2, 1, 8, 0, 0))]
    #[case("2026-02-01 08:00:00", at(2026, 2, 1, 8, 0, 0))]
    #[case("2026-02-01T08:00", at(2026, 2, 1, 8, 0, 0))]
    #[case("2026-02-01T08:00:00.250", at(2026, 2, 1, 8, 0, 0) + chrono::Duration::milliseconds(250))]
    #[case("2026-02-01T08:00:00Z", at(2026, 2, 1, 8, 0, 0))]
    #[case("2026-02-01T16:00:00+08:00", at(2026, 2, 1, 8, 0, 0))]
    #[case("2026-02-01T03:00:00-0500", at(2026, 2, 1, 8, 0, 0))]
    #[case("2026-02-01", at(2026, 2, 1, 0, 0, 0))]
    #[case("  2026-02-01T08:00:00  ", at(2026, 2, 1, 8, 0, 0))]
    fn test_parse_timestamp_accepts(#[case] input: &str, #[case] expected: NaiveDateTime) {
        assert_eq!(parse_timestamp(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("tomorrow")]
    #[case("2026-13-01T00:00:00")]
    #[case("2026-02-30")]
    #[case("08:00")]
    fn test_parse_timestamp_rejects(#[case] input: &str) {
        assert!(matches!(parse_timestamp(input), Err(CoreError::Parse(_))));
    }

    #[test]
    fn test_normalize_none_is_none() {
        assert_eq!(normalize::<&str>(None).unwrap(), None);
    }

    #[test]
    fn test_normalize_zone_aware_converts_to_utc() {
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();
        let aware = offset.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        assert_eq!(normalize(Some(aware)).unwrap(), Some(at(2026, 1, 5, 0, 0, 0)));
    }

    #[test]
    fn test_normalize_naive_is_identity() {
        let value = at(2026, 1, 5, 9, 0, 0);
        assert_eq!(normalize(Some(value)).unwrap(), Some(value));
    }

    #[test]
    fn test_serialized_form_parses_back() {
        let value = at(2026, 1, 5, 9, 30, 15);
        let text = serde_json::to_value(value).unwrap();
        assert_eq!(parse_timestamp(text.as_str().unwrap()).unwrap(), value);
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock(at(2026, 1, 5, 9, 0, 0));
        assert_eq!(clock.now(), at(2026, 1, 5, 9, 0, 0));
    }
}
