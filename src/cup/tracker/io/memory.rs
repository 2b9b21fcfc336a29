use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, instrument};

use crate::cup::tracker::error::{Result, TrackerError};
use crate::cup::tracker::io::{TabularStore, set_cell};
use crate::cup::tracker::model::{CellAddress, RangeSpec, Snapshot};

/// A mutation applied to a [`MemoryStore`], kept for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    Update {
        table: String,
        address: CellAddress,
        value: String,
    },
    Append {
        table: String,
        values: Vec<String>,
    },
}

/// In-process store holding every table as a snapshot.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<String, Snapshot>>,
    writes: Mutex<Vec<StoreWrite>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a table.
    pub fn with_table(self, name: impl Into<String>, rows: Snapshot) -> Self {
        if let Ok(mut tables) = self.tables.lock() {
            tables.insert(name.into(), rows);
        }
        self
    }

    /// Current contents of a table.
    pub fn table(&self, name: &str) -> Option<Snapshot> {
        self.tables.lock().ok()?.get(name).cloned()
    }

    /// Every write applied so far, in order.
    pub fn writes(&self) -> Vec<StoreWrite> {
        self.writes
            .lock()
            .map(|writes| writes.clone())
            .unwrap_or_default()
    }

    fn lock_tables(&self) -> Result<MutexGuard<'_, BTreeMap<String, Snapshot>>> {
        self.tables
            .lock()
            .map_err(|_| TrackerError::Store("memory store lock poisoned".to_string()))
    }

    fn record(&self, write: StoreWrite) -> Result<()> {
        self.writes
            .lock()
            .map_err(|_| TrackerError::Store("memory store lock poisoned".to_string()))?
            .push(write);
        Ok(())
    }
}

impl TabularStore for MemoryStore {
    #[instrument(level = "debug", skip(self, range), fields(%range))]
    fn get_range(&self, table: &str, range: RangeSpec) -> Result<Snapshot> {
        let tables = self.lock_tables()?;
        let rows = tables
            .get(table)
            .ok_or_else(|| TrackerError::UnknownTable(table.to_string()))?;
        Ok(range.apply(rows))
    }

    #[instrument(level = "debug", skip(self, address, value), fields(%address))]
    fn update_cell(&self, table: &str, address: CellAddress, value: &str) -> Result<()> {
        {
            let mut tables = self.lock_tables()?;
            let rows = tables
                .get_mut(table)
                .ok_or_else(|| TrackerError::UnknownTable(table.to_string()))?;
            set_cell(rows, address, value);
        }
        debug!("cell updated");
        self.record(StoreWrite::Update {
            table: table.to_string(),
            address,
            value: value.to_string(),
        })
    }

    #[instrument(level = "debug", skip(self, values), fields(width = values.len()))]
    fn append_row(&self, table: &str, values: &[String]) -> Result<()> {
        {
            let mut tables = self.lock_tables()?;
            let rows = tables
                .get_mut(table)
                .ok_or_else(|| TrackerError::UnknownTable(table.to_string()))?;
            rows.push(values.to_vec());
        }
        debug!("row appended");
        self.record(StoreWrite::Append {
            table: table.to_string(),
            values: values.to_vec(),
        })
    }
}
