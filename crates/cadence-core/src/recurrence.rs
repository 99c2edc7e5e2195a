use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;

use crate::models::{Frequency, MaterializationConfig, RecurrenceRule, Task};
use crate::time::start_of_day;

/// How far `preview_occurrences` looks ahead.
const PREVIEW_LOOKAHEAD_DAYS: i64 = 365;

/// An inclusive `[start, end]` range of timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// `[start of today, start of today + horizon_days]`, where today is `now`'s date.
    pub fn rolling(now: NaiveDateTime, horizon_days: i64) -> Self {
        let start = start_of_day(now.date());
        Self {
            start,
            end: start + Duration::days(horizon_days),
        }
    }

    /// From midnight of `first` through the last instant of `last`.
    pub fn from_dates(first: NaiveDate, last: NaiveDate) -> Self {
        let end = start_of_day(last) + Duration::days(1) - Duration::nanoseconds(1);
        Self {
            start: start_of_day(first),
            end,
        }
    }

    #[inline]
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Occurrence starts of `rule` seeded at `seed`, inside `[window_start, window_end]`.
///
/// The result never precedes the seed, never passes `rule.until`, and is
/// strictly increasing. Pure: the same inputs always give the same sequence.
pub fn occurrences(
    seed: NaiveDateTime,
    rule: &RecurrenceRule,
    window_start: NaiveDateTime,
    window_end: NaiveDateTime,
) -> Vec<NaiveDateTime> {
    if window_end < window_start {
        return Vec::new();
    }
    let bounds = Bounds {
        start: window_start.max(seed),
        end: match rule.until {
            Some(until) => window_end.min(until),
            None => window_end,
        },
    };
    if bounds.end < bounds.start {
        return Vec::new();
    }

    let interval = rule.effective_interval();
    match rule.freq {
        Frequency::Daily => daily(seed, interval, bounds),
        Frequency::Weekly => weekly(seed, interval, rule, bounds),
        Frequency::Monthly => monthly(seed, interval, bounds),
        Frequency::Yearly => yearly(seed, interval, bounds),
    }
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

fn daily(seed: NaiveDateTime, interval: i64, bounds: Bounds) -> Vec<NaiveDateTime> {
    let step = interval.saturating_mul(86_400);
    // Jump straight to the first step at or after the window instead of walking there.
    let behind = (bounds.start - seed).num_seconds();
    let mut k = behind.saturating_add(step - 1).div_euclid(step).max(0);

    let mut starts = Vec::new();
    // Stops once the offset leaves chrono's range.
    while let Some(current) = step
        .checked_mul(k)
        .and_then(Duration::try_seconds)
        .and_then(|offset| seed.checked_add_signed(offset))
    {
        if current > bounds.end {
            break;
        }
        if current >= bounds.start {
            starts.push(current);
        }
        k += 1;
    }
    starts
}

fn weekly(
    seed: NaiveDateTime,
    interval: i64,
    rule: &RecurrenceRule,
    bounds: Bounds,
) -> Vec<NaiveDateTime> {
    let weekdays: BTreeSet<u32> = match &rule.weekdays {
        Some(days) if !days.is_empty() => days.iter().map(|d| d.num_days_from_monday()).collect(),
        _ => BTreeSet::from([seed.weekday().num_days_from_monday()]),
    };
    let seed_day = seed.date();
    let seed_time = seed.time();

    let mut starts = Vec::new();
    let mut day = bounds.start.date();
    let last_day = bounds.end.date();
    while day <= last_day {
        if weekdays.contains(&day.weekday().num_days_from_monday()) {
            // Phase is anchored to the seed's date, not to the window.
            let week_delta = (day - seed_day).num_days().div_euclid(7);
            if week_delta % interval == 0 {
                let current = day.and_time(seed_time);
                if current >= bounds.start && current <= bounds.end {
                    starts.push(current);
                }
            }
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    starts
}

fn monthly(seed: NaiveDateTime, interval: i64, bounds: Bounds) -> Vec<NaiveDateTime> {
    let months_behind = months_between(seed.date(), bounds.start.date());
    let mut k = (months_behind / interval - 1).max(0);

    let mut starts = Vec::new();
    while let Some(day) = k
        .checked_mul(interval)
        .and_then(|months| add_months_clamped(seed.date(), months))
    {
        let current = day.and_time(seed.time());
        if current > bounds.end {
            break;
        }
        if current >= bounds.start {
            starts.push(current);
        }
        k += 1;
    }
    starts
}

fn yearly(seed: NaiveDateTime, interval: i64, bounds: Bounds) -> Vec<NaiveDateTime> {
    let years_behind = i64::from(bounds.start.year() - seed.year());
    let mut k = (years_behind / interval - 1).max(0);
    let last_year = i64::from(bounds.end.year());

    let mut starts = Vec::new();
    loop {
        let Some(year) = k
            .checked_mul(interval)
            .and_then(|years| years.checked_add(i64::from(seed.year())))
        else {
            break;
        };
        if year > last_year {
            break;
        }
        let Ok(year) = i32::try_from(year) else {
            break;
        };
        // February 29 only exists in leap years; other years have no occurrence.
        if let Some(day) = NaiveDate::from_ymd_opt(year, seed.month(), seed.day()) {
            let current = day.and_time(seed.time());
            if current > bounds.end {
                break;
            }
            if current >= bounds.start {
                starts.push(current);
            }
        }
        k += 1;
    }
    starts
}

fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    i64::from(to.year() - from.year()) * 12 + i64::from(to.month()) - i64::from(from.month())
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// `date` moved by `months`, keeping its day of month but clamping it to the
/// target month's length. `None` if the result leaves chrono's range.
pub fn add_months_clamped(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let total = (i64::from(date.year()) * 12 + i64::from(date.month0())).checked_add(months)?;
    let year = i32::try_from(total.div_euclid(12)).ok()?;
    let month = total.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Occurrence generation for one seed/rule pair.
#[derive(Debug, Clone)]
pub struct RecurrenceManager {
    seed: NaiveDateTime,
    rule: RecurrenceRule,
}

impl RecurrenceManager {
    pub fn new(seed: NaiveDateTime, rule: RecurrenceRule) -> Self {
        Self { seed, rule }
    }

    /// `None` unless `task` is a template with a seed and a rule.
    pub fn for_template(task: &Task) -> Option<Self> {
        let (seed, rule) = task.schedule()?;
        Some(Self::new(seed, rule.clone()))
    }

    pub fn generate_occurrences_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Vec<NaiveDateTime> {
        occurrences(self.seed, &self.rule, start, end)
    }

    pub fn generate_occurrences_in(&self, window: Window) -> Vec<NaiveDateTime> {
        self.generate_occurrences_between(window.start, window.end)
    }

    /// The first `count` occurrences at or after `from`, within a year.
    pub fn preview_occurrences(&self, from: NaiveDateTime, count: usize) -> Vec<NaiveDateTime> {
        let end = from + Duration::days(PREVIEW_LOOKAHEAD_DAYS);
        let mut starts = self.generate_occurrences_between(from, end);
        starts.truncate(count);
        starts
    }

    pub fn seed(&self) -> NaiveDateTime {
        self.seed
    }

    pub fn rule(&self) -> &RecurrenceRule {
        &self.rule
    }
}

/// Owns the materialization policy and turns "now" into a window.
#[derive(Debug, Clone, Default)]
pub struct MaterializationManager {
    config: MaterializationConfig,
}

impl MaterializationManager {
    pub fn new(config: MaterializationConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(MaterializationConfig::default())
    }

    /// The rolling window as of `now`.
    #[inline]
    pub fn window_at(&self, now: NaiveDateTime) -> Window {
        Window::rolling(now, self.config.horizon_days)
    }

    pub fn config(&self) -> &MaterializationConfig {
        &self.config
    }

    pub fn update_config(&mut self, config: MaterializationConfig) {
        self.config = config;
    }
}
