//! Time-scoped lookups: which meal window is open and which weekly table is
//! current.

use chrono::{Days, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// A named `[start, end)` window measured in whole hours of the local day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    pub name: String,
    pub start: u32,
    pub end: u32,
}

impl EventWindow {
    pub fn new(name: impl Into<String>, start: u32, end: u32) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    fn contains(&self, hour: u32) -> bool {
        hour >= self.start && hour < self.end
    }
}

/// First day covered by a weekly table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekStart {
    pub table: String,
    pub starts: NaiveDate,
}

impl WeekStart {
    pub fn new(table: impl Into<String>, starts: NaiveDate) -> Self {
        Self {
            table: table.into(),
            starts,
        }
    }
}

/// Ordered event windows and week thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub events: Vec<EventWindow>,
    /// Week tables ordered from earliest to latest.
    pub weeks: Vec<WeekStart>,
}

impl Default for Schedule {
    fn default() -> Self {
        let first = NaiveDate::from_ymd_opt(2025, 6, 22).unwrap_or_default();
        let weeks = (0..6u64)
            .map(|week| {
                let starts = first
                    .checked_add_days(Days::new(week * 7))
                    .unwrap_or(first);
                WeekStart::new(format!("Week{}", week + 1), starts)
            })
            .collect();

        Self {
            events: vec![
                EventWindow::new("Breakfast", 7, 9),
                EventWindow::new("Lunch", 12, 14),
                EventWindow::new("Dinner", 18, 20),
            ],
            weeks,
        }
    }
}

impl Schedule {
    /// Name of the first window containing the hour of `now`, if any.
    pub fn resolve_event(&self, now: NaiveDateTime) -> Option<&str> {
        let hour = now.hour();
        self.events
            .iter()
            .find(|window| window.contains(hour))
            .map(|window| window.name.as_str())
    }

    /// Table whose start date is the latest one not after `now`.
    ///
    /// Dates before every threshold fall back to the earliest table. Returns
    /// `None` only when no weeks are configured.
    pub fn resolve_week_table(&self, now: NaiveDateTime) -> Option<&str> {
        let today = now.date();
        self.weeks
            .iter()
            .rev()
            .find(|week| week.starts <= today)
            .or_else(|| self.weeks.first())
            .map(|week| week.table.as_str())
    }

    /// Every weekly table in configured order.
    pub fn week_tables(&self) -> Vec<String> {
        self.weeks.iter().map(|week| week.table.clone()).collect()
    }
}
