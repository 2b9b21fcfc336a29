use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};

use crate::cup::tracker::error::{Result, TrackerError};
use crate::cup::tracker::io::excel_write::SheetTable;
use crate::cup::tracker::model::Snapshot;

/// Reads every sheet of a workbook, in workbook order.
pub fn read_tables(path: &Path) -> Result<Vec<SheetTable>> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let names = workbook.sheet_names().to_vec();

    names
        .into_iter()
        .map(|name| {
            let rows = read_required_sheet(&mut workbook, &name)?;
            Ok(SheetTable { name, rows })
        })
        .collect()
}

/// Reads a single sheet as cell strings.
pub fn read_table(path: &Path, name: &str) -> Result<Snapshot> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    read_required_sheet(&mut workbook, name)
}

fn read_required_sheet<R: std::io::Read + std::io::Seek>(
    workbook: &mut Xlsx<R>,
    name: &str,
) -> Result<Snapshot> {
    let range_result = workbook
        .worksheet_range(name)
        .ok_or_else(|| TrackerError::UnknownTable(name.to_string()))?;
    let range = range_result.map_err(TrackerError::from)?;
    Ok(range_to_rows(&range))
}

/// Converts a calamine range into rows anchored at `A1`. Calamine ranges start
/// at the first populated cell, so leading empty rows and columns are padded
/// back in to keep offsets aligned with cell addresses.
fn range_to_rows(range: &calamine::Range<DataType>) -> Snapshot {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };

    let mut rows: Snapshot = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![String::new(); start_col as usize];
        cells.extend(row.iter().map(|cell| cell_to_string(Some(cell))));
        while cells.last().is_some_and(String::is_empty) {
            cells.pop();
        }
        rows.push(cells);
    }

    while rows.last().is_some_and(Vec::is_empty) {
        rows.pop();
    }
    rows
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
