use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_LOOKBACK_DAYS: u64 = 730;

/// Fixed historical window re-scanned on every sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookbackWindow {
    pub days: u64,
}

impl Default for LookbackWindow {
    fn default() -> Self {
        LookbackWindow { days: DEFAULT_LOOKBACK_DAYS }
    }
}

impl fmt::Display for LookbackWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} days", self.days)
    }
}

impl LookbackWindow {
    pub fn new(days: u64) -> Self {
        LookbackWindow { days }
    }

    /// First date included in the window ending on `today`.
    pub fn since(self, today: NaiveDate) -> NaiveDate {
        today.checked_sub_days(Days::new(self.days)).unwrap_or(NaiveDate::MIN)
    }

    pub fn range(self, today: NaiveDate) -> DateRange {
        DateRange::new(self.since(today), today)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }
}
