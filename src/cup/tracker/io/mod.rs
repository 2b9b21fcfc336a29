//! The tabular store seam and its implementations.

pub mod excel_read;
pub mod excel_write;
pub mod memory;
pub mod workbook;

use crate::cup::tracker::error::Result;
use crate::cup::tracker::model::{CellAddress, RangeSpec, Snapshot};

pub use memory::{MemoryStore, StoreWrite};
pub use workbook::WorkbookStore;

/// External table storage addressed by table id and cell range.
///
/// Every call is an independent round trip; implementations must not cache
/// snapshots between calls.
pub trait TabularStore {
    /// Reads the requested band of a table. Rows and cells may be short; an
    /// empty table yields no rows.
    fn get_range(&self, table: &str, range: RangeSpec) -> Result<Snapshot>;

    /// Overwrites a single cell, growing the table when needed.
    fn update_cell(&self, table: &str, address: CellAddress, value: &str) -> Result<()>;

    /// Appends a row after the last existing row.
    fn append_row(&self, table: &str, values: &[String]) -> Result<()>;
}

impl<T: TabularStore + ?Sized> TabularStore for &T {
    fn get_range(&self, table: &str, range: RangeSpec) -> Result<Snapshot> {
        (**self).get_range(table, range)
    }

    fn update_cell(&self, table: &str, address: CellAddress, value: &str) -> Result<()> {
        (**self).update_cell(table, address, value)
    }

    fn append_row(&self, table: &str, values: &[String]) -> Result<()> {
        (**self).append_row(table, values)
    }
}

/// Writes `value` into `rows`, padding rows and cells as needed.
pub(crate) fn set_cell(rows: &mut Snapshot, address: CellAddress, value: &str) {
    let row_offset = address.row_offset();
    if rows.len() <= row_offset {
        rows.resize_with(row_offset + 1, Vec::new);
    }
    let row = &mut rows[row_offset];
    if row.len() <= address.column {
        row.resize(address.column + 1, String::new());
    }
    row[address.column] = value.to_string();
}
