//! Common types used across the platform

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a stored status string does not match any known variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Activation status shared by resellers and products
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    #[default]
    Active,
    Inactive,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Active => "active",
            RecordStatus::Inactive => "inactive",
        }
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RecordStatus::Active),
            "inactive" => Ok(RecordStatus::Inactive),
            other => Err(ParseEnumError::new("record status", other)),
        }
    }
}

/// Half-open time range `[start, end)` used for ledger sums
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The UTC calendar day containing `now`
    pub fn day_of(now: DateTime<Utc>) -> Self {
        let start = midnight(now.date_naive());
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    /// The UTC calendar month containing `now`
    pub fn month_of(now: DateTime<Utc>) -> Self {
        let first = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
            .unwrap_or_else(|| now.date_naive());
        let next = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
        }
        .unwrap_or(first + Duration::days(31));

        Self {
            start: midnight(first),
            end: midnight(next),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_day_window_is_half_open() {
        let window = TimeWindow::day_of(at(2024, 3, 15, 13));
        assert_eq!(window.start, at(2024, 3, 15, 0));
        assert_eq!(window.end, at(2024, 3, 16, 0));
        assert!(window.contains(at(2024, 3, 15, 0)));
        assert!(!window.contains(at(2024, 3, 16, 0)));
    }

    #[test]
    fn test_month_window_rolls_over_year() {
        let window = TimeWindow::month_of(at(2024, 12, 31, 23));
        assert_eq!(window.start, at(2024, 12, 1, 0));
        assert_eq!(window.end, at(2025, 1, 1, 0));
    }

    #[test]
    fn test_month_window_february_leap_year() {
        let window = TimeWindow::month_of(at(2024, 2, 10, 8));
        assert_eq!(window.end, at(2024, 3, 1, 0));
        assert!(window.contains(at(2024, 2, 29, 23)));
    }

    #[test]
    fn test_record_status_round_trip() {
        assert_eq!("active".parse::<RecordStatus>(), Ok(RecordStatus::Active));
        assert_eq!(RecordStatus::Inactive.as_str(), "inactive");
        assert!("archived".parse::<RecordStatus>().is_err());
    }
}
