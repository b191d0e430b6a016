// Calendar-month windows used to pre-filter rows before comparison.
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, NaiveTime};

use crate::types::{OrderRecord, Signup, TimedTotal};

/// Anything that carries the moment it happened.
pub trait Timestamped {
    fn timestamp(&self) -> NaiveDateTime;
}

impl Timestamped for TimedTotal {
    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

impl Timestamped for OrderRecord {
    fn timestamp(&self) -> NaiveDateTime {
        self.created_at
    }
}

impl Timestamped for Signup {
    fn timestamp(&self) -> NaiveDateTime {
        self.created_at
    }
}

/// Half-open `[start, end)` span covering one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl MonthWindow {
    /// The month containing `today`.
    pub fn current(today: NaiveDate) -> Self {
        let first = first_of_month(today);
        let next = first
            .checked_add_months(Months::new(1))
            .unwrap_or(NaiveDate::MAX);
        Self {
            start: first.and_time(NaiveTime::MIN),
            end: next.and_time(NaiveTime::MIN),
        }
    }

    /// The month before the one containing `today`; January rolls back to December.
    pub fn previous(today: NaiveDate) -> Self {
        let first = first_of_month(today);
        let prev = first
            .checked_sub_months(Months::new(1))
            .unwrap_or(NaiveDate::MIN);
        Self {
            start: prev.and_time(NaiveTime::MIN),
            end: first.and_time(NaiveTime::MIN),
        }
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts < self.end
    }
}

fn first_of_month(d: NaiveDate) -> NaiveDate {
    d.with_day(1).unwrap_or(d)
}

pub fn filter_window<T: Timestamped + Clone>(rows: &[T], window: &MonthWindow) -> Vec<T> {
    rows.iter()
        .filter(|r| window.contains(r.timestamp()))
        .cloned()
        .collect()
}
