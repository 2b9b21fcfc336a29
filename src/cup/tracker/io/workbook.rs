use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, instrument};

use crate::cup::tracker::error::{Result, TrackerError};
use crate::cup::tracker::io::excel_read::{read_table, read_tables};
use crate::cup::tracker::io::excel_write::{SheetTable, write_tables};
use crate::cup::tracker::io::{TabularStore, set_cell};
use crate::cup::tracker::model::{CellAddress, RangeSpec, Snapshot};

/// Store backed by a single `.xlsx` workbook, one sheet per table.
///
/// Reads open the file afresh on every call. Writes read the whole workbook,
/// apply the change and rewrite every sheet; cell values are stored as text.
#[derive(Debug)]
pub struct WorkbookStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl WorkbookStore {
    /// Opens an existing workbook.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(TrackerError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("workbook not found: {}", path.display()),
            )));
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Creates (or replaces) a workbook holding the given tables.
    pub fn create(path: impl Into<PathBuf>, tables: &[SheetTable]) -> Result<Self> {
        let path = path.into();
        write_tables(&path, tables)?;
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| TrackerError::Store("workbook lock poisoned".to_string()))
    }

    fn modify(&self, table: &str, change: impl FnOnce(&mut Snapshot)) -> Result<()> {
        let _guard = self.lock()?;
        let mut tables = read_tables(&self.path)?;
        let target = tables
            .iter_mut()
            .find(|sheet| sheet.name == table)
            .ok_or_else(|| TrackerError::UnknownTable(table.to_string()))?;
        change(&mut target.rows);
        write_tables(&self.path, &tables)
    }
}

impl TabularStore for WorkbookStore {
    #[instrument(level = "debug", skip(self, range), fields(path = %self.path.display(), %range))]
    fn get_range(&self, table: &str, range: RangeSpec) -> Result<Snapshot> {
        let rows = read_table(&self.path, table)?;
        debug!(row_count = rows.len(), "sheet read");
        Ok(range.apply(&rows))
    }

    #[instrument(
        level = "debug",
        skip(self, address, value),
        fields(path = %self.path.display(), %address)
    )]
    fn update_cell(&self, table: &str, address: CellAddress, value: &str) -> Result<()> {
        self.modify(table, |rows| set_cell(rows, address, value))
    }

    #[instrument(
        level = "debug",
        skip(self, values),
        fields(path = %self.path.display(), width = values.len())
    )]
    fn append_row(&self, table: &str, values: &[String]) -> Result<()> {
        self.modify(table, |rows| rows.push(values.to_vec()))
    }
}
