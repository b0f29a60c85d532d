use time::{Date, OffsetDateTime};

use crate::ValidationError;

/// Inclusive calendar-day interval requested from the provider for one
/// `(instrument, granularity)` pair. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRange {
    start: Date,
    end: Date,
}

impl FetchRange {
    pub fn new(start: Date, end: Date) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range from `start` through the most recent completed UTC day.
    pub fn through_yesterday(start: Date) -> Result<Self, ValidationError> {
        Self::new(start, yesterday_utc())
    }

    pub fn start(&self) -> Date {
        self.start
    }

    pub fn end(&self) -> Date {
        self.end
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    /// Inclusive lower bound in warehouse SQL layout.
    pub fn start_sql(&self) -> String {
        format!("{} 00:00:00", self.start)
    }

    /// Inclusive upper bound in warehouse SQL layout.
    pub fn end_sql(&self) -> String {
        format!("{} 23:59:59", self.end)
    }
}

/// The most recent completed UTC trading day. Today is never fetched: its
/// bars may still be forming.
pub fn yesterday_utc() -> Date {
    OffsetDateTime::now_utc()
        .date()
        .previous_day()
        .unwrap_or(Date::MIN)
}
