use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use tracing::{info, instrument};

use crate::cup::tracker::config::TrackerConfig;
use crate::cup::tracker::error::Result;
use crate::cup::tracker::index::{ColumnIndex, RowIndex};
use crate::cup::tracker::io::TabularStore;
use crate::cup::tracker::model::{CellAddress, cell};

/// Result of a check-in attempt. Every variant other than `Success` is a
/// business outcome, not a fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckInOutcome {
    Success { name: String, category: String },
    NoActiveEvent { hour: u32 },
    ColumnNotFound { category: String, date: NaiveDate },
    EntityNotFound { entity_id: String },
    AlreadyCheckedIn { name: String, category: String },
}

impl CheckInOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CheckInOutcome::Success { .. })
    }

    /// Stable discriminator used in responses.
    pub fn kind(&self) -> &'static str {
        match self {
            CheckInOutcome::Success { .. } => "success",
            CheckInOutcome::NoActiveEvent { .. } => "no_active_event",
            CheckInOutcome::ColumnNotFound { .. } => "column_not_found",
            CheckInOutcome::EntityNotFound { .. } => "entity_not_found",
            CheckInOutcome::AlreadyCheckedIn { .. } => "already_checked_in",
        }
    }

    pub fn message(&self) -> String {
        match self {
            CheckInOutcome::Success { name, category } => {
                format!("Checked in {name} for {category}!")
            }
            CheckInOutcome::NoActiveEvent { hour } => {
                format!("No event is currently active. Current time: {hour}:00.")
            }
            CheckInOutcome::ColumnNotFound { category, date } => {
                format!("Could not find a column for {category} on {date}.")
            }
            CheckInOutcome::EntityNotFound { entity_id } => {
                format!("ID {entity_id} not found in the sheet.")
            }
            CheckInOutcome::AlreadyCheckedIn { name, category } => {
                format!("{name} is already checked in for {category}.")
            }
        }
    }
}

/// Attendance ledger over the weekly tables.
pub struct Ledger<'a, T: TabularStore> {
    store: &'a T,
    config: &'a TrackerConfig,
}

impl<'a, T: TabularStore> Ledger<'a, T> {
    pub fn new(store: &'a T, config: &'a TrackerConfig) -> Self {
        Self { store, config }
    }

    /// Marks `entity_id` present for the event open at `now`.
    ///
    /// Writes at most one cell, and only when the target cell is empty; a
    /// repeated call returns [`CheckInOutcome::AlreadyCheckedIn`] without
    /// writing.
    #[instrument(level = "info", skip(self, now), fields(%now))]
    pub fn check_in(&self, entity_id: &str, now: NaiveDateTime) -> Result<CheckInOutcome> {
        let Some(category) = self.config.schedule.resolve_event(now) else {
            return Ok(CheckInOutcome::NoActiveEvent { hour: now.hour() });
        };
        let today = now.date();
        let column_missing = || CheckInOutcome::ColumnNotFound {
            category: category.to_string(),
            date: today,
        };

        let Some(table) = self.config.schedule.resolve_week_table(now) else {
            return Ok(column_missing());
        };

        let layout = &self.config.layout;
        let rows = self.store.get_range(table, layout.lookup_range())?;

        let columns = ColumnIndex::build(&rows, layout.category_row, layout.date_row);
        let Some(column) = columns.find(category, today) else {
            return Ok(column_missing());
        };

        let entities = RowIndex::build(&rows, layout.id_column, layout.first_data_row);
        let Some(row_offset) = entities.find(entity_id) else {
            return Ok(CheckInOutcome::EntityNotFound {
                entity_id: entity_id.to_string(),
            });
        };

        let row = &rows[row_offset];
        let name = cell(row, layout.name_column).trim().to_string();
        if !cell(row, column).trim().is_empty() {
            info!(table, %name, category, "already checked in");
            return Ok(CheckInOutcome::AlreadyCheckedIn {
                name,
                category: category.to_string(),
            });
        }

        let address = CellAddress::from_offsets(row_offset, column);
        self.store
            .update_cell(table, address, &now.minute().to_string())?;
        info!(table, %address, %name, category, "checked in");

        Ok(CheckInOutcome::Success {
            name,
            category: category.to_string(),
        })
    }
}
