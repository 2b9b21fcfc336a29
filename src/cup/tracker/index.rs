//! Lookup tables rebuilt from a single snapshot on every call.
//!
//! Offsets are only meaningful for the snapshot they were built from, so the
//! indexes borrow nothing and are never cached.

use chrono::{Days, NaiveDate};

use crate::cup::tracker::model::cell;

/// Date formats accepted in header rows, tried in order. Any time of day
/// following the date is ignored.
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d", "%d %b %Y", "%b %d, %Y", "%b %d %Y",
];

/// Largest serial day number accepted (9999-12-31).
const MAX_SERIAL_DAY: f64 = 2_958_465.0;

/// Normalizes a header cell to a calendar date.
///
/// Accepts the textual formats in [`DATE_FORMATS`] and spreadsheet serial day
/// numbers in the 1900 date system. Returns `None` for anything else.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(serial) = trimmed.parse::<f64>() {
        return serial_to_date(serial);
    }

    DATE_FORMATS.iter().find_map(|format| {
        let (date, remainder) = NaiveDate::parse_and_remainder(trimmed, format).ok()?;
        let boundary = remainder.is_empty()
            || remainder.starts_with(|ch: char| ch.is_whitespace() || ch == 'T' || ch == ',');
        boundary.then_some(date)
    })
}

fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_SERIAL_DAY {
        return None;
    }
    // Day zero of the 1900 system, shifted to absorb the phantom 1900-02-29.
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.floor() as u64))
}

fn normalize_label(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A single header column: its category label, its date and its offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnEntry {
    pub category: String,
    pub date: Option<NaiveDate>,
    pub offset: usize,
}

/// Columns of a snapshot keyed by (category, date).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnIndex {
    entries: Vec<ColumnEntry>,
}

impl ColumnIndex {
    /// Reads the category and date header rows. Missing rows and sparse cells
    /// are tolerated; such columns carry an empty label or no date.
    pub fn build(snapshot: &[Vec<String>], category_row: usize, date_row: usize) -> Self {
        let empty = Vec::new();
        let categories = snapshot.get(category_row).unwrap_or(&empty);
        let dates = snapshot.get(date_row).unwrap_or(&empty);
        let width = categories.len().max(dates.len());

        let entries = (0..width)
            .map(|offset| ColumnEntry {
                category: cell(categories, offset).trim().to_string(),
                date: normalize_date(cell(dates, offset)),
                offset,
            })
            .collect();

        Self { entries }
    }

    /// Offset of the first column whose category matches case-insensitively
    /// (after trimming) and whose header date falls on `date`.
    pub fn find(&self, category: &str, date: NaiveDate) -> Option<usize> {
        let wanted = normalize_label(category);
        if wanted.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|entry| normalize_label(&entry.category) == wanted && entry.date == Some(date))
            .map(|entry| entry.offset)
    }

    /// Offsets of every column labelled `category`, regardless of date.
    pub fn offsets_for(&self, category: &str) -> Vec<usize> {
        let wanted = normalize_label(category);
        self.entries
            .iter()
            .filter(|entry| !wanted.is_empty() && normalize_label(&entry.category) == wanted)
            .map(|entry| entry.offset)
            .collect()
    }

    pub fn entries(&self) -> &[ColumnEntry] {
        &self.entries
    }
}

/// A single keyed row: its identifier and its snapshot offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowEntry {
    pub identifier: String,
    pub offset: usize,
}

/// Data rows of a snapshot keyed by the value in one column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowIndex {
    entries: Vec<RowEntry>,
}

impl RowIndex {
    /// Indexes every row from `start_row` on whose key cell is not blank.
    /// Keys are stored as written.
    pub fn build(snapshot: &[Vec<String>], id_column: usize, start_row: usize) -> Self {
        let entries = snapshot
            .iter()
            .enumerate()
            .skip(start_row)
            .filter_map(|(offset, row)| {
                let identifier = cell(row, id_column);
                (!identifier.trim().is_empty()).then(|| RowEntry {
                    identifier: identifier.to_string(),
                    offset,
                })
            })
            .collect();

        Self { entries }
    }

    /// Offset of the first row whose key equals `identifier` exactly. Later
    /// duplicates are shadowed.
    pub fn find(&self, identifier: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|entry| entry.identifier == identifier)
            .map(|entry| entry.offset)
    }

    pub fn entries(&self) -> &[RowEntry] {
        &self.entries
    }
}
