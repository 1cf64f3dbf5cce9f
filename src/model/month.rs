//! Year-month keys.
//!
//! Planning records are keyed by calendar month. Months are stored as
//! `YYYY-MM-01` text so they sort lexically and compare with plain SQL.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    /// Build a month key, rejecting months outside 1..=12.
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Parse a stored date and truncate it to its month.
    ///
    /// Accepts `YYYY-MM-DD`, `YYYY-MM`, `YYYY-MM-DD HH:MM:SS` and RFC 3339
    /// date-times. Returns `None` for anything else.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();

        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(Self::from(date));
        }
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d") {
            return Some(Self::from(date));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
            return Some(Self::from(dt.date()));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self::from(dt.date_naive()));
        }

        None
    }

    /// Inclusive number of months from `self` to `end`.
    ///
    /// Zero or negative when `end` precedes `self`.
    #[must_use]
    pub fn months_through(self, end: Self) -> i64 {
        let years = i64::from(end.year) - i64::from(self.year);
        let months = i64::from(end.month) - i64::from(self.month);
        years * 12 + months + 1
    }
}

impl From<NaiveDate> for MonthKey {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-01", self.year, self.month)
    }
}
