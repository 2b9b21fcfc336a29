use std::fs;
use std::path::Path;

use rust_xlsxwriter::Workbook;

use crate::cup::tracker::error::{Result, TrackerError};
use crate::cup::tracker::model::Snapshot;

/// A table materialised as an Excel sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub name: String,
    pub rows: Snapshot,
}

/// Writes the provided sheets to the given path, replacing any existing file.
///
/// The workbook is saved next to the target first and then renamed over it so
/// readers never observe a half-written file.
pub fn write_tables(path: &Path, tables: &[SheetTable]) -> Result<()> {
    let mut workbook_writer = Workbook::new();

    for table in tables {
        let worksheet = workbook_writer.add_worksheet();
        worksheet.set_name(&table.name)?;

        for (row_idx, row) in table.rows.iter().enumerate() {
            let row_num = u32::try_from(row_idx)
                .map_err(|_| TrackerError::Store(format!("row {row_idx} out of range")))?;
            for (col_idx, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                let col_num = u16::try_from(col_idx)
                    .map_err(|_| TrackerError::Store(format!("column {col_idx} out of range")))?;
                worksheet.write_string(row_num, col_num, cell)?;
            }
        }
    }

    let staging = path.with_extension("xlsx.tmp");
    workbook_writer.save(&staging)?;
    fs::rename(&staging, path)?;
    Ok(())
}
