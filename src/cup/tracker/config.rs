use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cup::tracker::clock::FixedOffsetClock;
use crate::cup::tracker::error::{Result, TrackerError};
use crate::cup::tracker::model::RangeSpec;
use crate::cup::tracker::schedule::Schedule;

/// Positions of the header rows and key columns inside a weekly table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeekLayout {
    pub category_row: usize,
    pub date_row: usize,
    pub first_data_row: usize,
    pub id_column: usize,
    pub name_column: usize,
    pub group_column: usize,
    /// Number of columns fetched by check-ins and transfers (`A:AZ`).
    pub read_columns: usize,
}

impl Default for WeekLayout {
    fn default() -> Self {
        Self {
            category_row: 0,
            date_row: 1,
            first_data_row: 2,
            id_column: 0,
            name_column: 1,
            group_column: 2,
            read_columns: 52,
        }
    }
}

impl WeekLayout {
    /// Range used when a single row/column has to be located.
    pub fn lookup_range(&self) -> RangeSpec {
        RangeSpec::Columns {
            first: 0,
            last: self.read_columns.saturating_sub(1),
        }
    }
}

/// Location of the actor balance table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceLayout {
    pub table: String,
    pub first_data_row: usize,
    pub id_column: usize,
    pub name_column: usize,
    pub balance_column: usize,
}

impl Default for BalanceLayout {
    fn default() -> Self {
        Self {
            table: "Balances".to_string(),
            first_data_row: 1,
            id_column: 0,
            name_column: 1,
            balance_column: 2,
        }
    }
}

/// Full runtime configuration. Every field has a built-in default, so an
/// empty or partial TOML file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Offset of the program's timezone, in minutes east of UTC.
    pub utc_offset_minutes: i32,
    pub schedule: Schedule,
    pub layout: WeekLayout,
    pub balances: BalanceLayout,
    /// Table receiving one row per completed transfer.
    pub audit_table: String,
    /// Category header of the per-day points columns.
    pub points_label: String,
    /// Role prefix written in front of the actor name in the audit log.
    pub actor_role: String,
    /// Numerator of the per-week group normalization.
    pub group_scale: i64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 180,
            schedule: Schedule::default(),
            layout: WeekLayout::default(),
            balances: BalanceLayout::default(),
            audit_table: "Points".to_string(),
            points_label: "Daily Points".to_string(),
            actor_role: "EXCOR".to_string(),
            group_scale: 6,
        }
    }
}

impl TrackerConfig {
    /// Loads a TOML configuration file, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            debug!("no configuration file given, using defaults");
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        debug!(path = %path.display(), weeks = config.schedule.weeks.len(), "configuration loaded");
        Ok(config)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Clock matching the configured offset.
    pub fn clock(&self) -> Result<FixedOffsetClock> {
        FixedOffsetClock::from_minutes(self.utc_offset_minutes)
    }

    fn validate(&self) -> Result<()> {
        for window in &self.schedule.events {
            if window.start >= window.end || window.end > 24 {
                return Err(TrackerError::Validation(format!(
                    "event window '{}' must satisfy start < end <= 24",
                    window.name
                )));
            }
        }
        if self
            .schedule
            .weeks
            .windows(2)
            .any(|pair| pair[0].starts > pair[1].starts)
        {
            return Err(TrackerError::Validation(
                "week start dates must be listed in ascending order".to_string(),
            ));
        }
        if self.layout.category_row == self.layout.date_row {
            return Err(TrackerError::Validation(
                "category and date header rows must differ".to_string(),
            ));
        }
        if self.layout.read_columns == 0 {
            return Err(TrackerError::Validation(
                "read_columns must be at least 1".to_string(),
            ));
        }
        self.clock().map(|_| ())
    }
}
