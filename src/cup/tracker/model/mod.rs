use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::cup::tracker::error::{Result, TrackerError};

/// Rows of cell strings returned by a single store read. Rows and cells may be
/// shorter than their neighbours; absent cells read as empty.
pub type Snapshot = Vec<Vec<String>>;

/// Returns the cell at `offset`, or an empty string for short rows.
pub fn cell(row: &[String], offset: usize) -> &str {
    row.get(offset).map(String::as_str).unwrap_or("")
}

/// Encodes a 0-based column offset as bijective base-26 letters
/// (`0 → A`, `25 → Z`, `26 → AA`, `701 → ZZ`).
pub fn column_letters(offset: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = offset + 1;
    while remaining > 0 {
        let digit = (remaining - 1) % 26;
        letters.push(b'A' + digit as u8);
        remaining = (remaining - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Decodes column letters back into a 0-based offset. Lower-case letters are
/// accepted; anything else yields `None`.
pub fn column_offset(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut value: usize = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        value = value.checked_mul(26)?.checked_add(digit)?;
    }
    Some(value - 1)
}

/// A single cell in A1 notation: 1-based row, lettered column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    /// 1-based row number.
    pub row: usize,
    /// 0-based column offset.
    pub column: usize,
}

impl CellAddress {
    /// Builds an address from the 0-based row and column offsets of a snapshot.
    pub fn from_offsets(row_offset: usize, column_offset: usize) -> Self {
        Self {
            row: row_offset + 1,
            column: column_offset,
        }
    }

    /// 0-based row offset into a snapshot.
    pub fn row_offset(&self) -> usize {
        self.row - 1
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.column), self.row)
    }
}

impl FromStr for CellAddress {
    type Err = TrackerError;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let split = trimmed
            .find(|ch: char| ch.is_ascii_digit())
            .ok_or_else(|| TrackerError::InvalidAddress(raw.to_string()))?;
        let (letters, digits) = trimmed.split_at(split);
        let column =
            column_offset(letters).ok_or_else(|| TrackerError::InvalidAddress(raw.to_string()))?;
        let row: usize = digits
            .parse()
            .map_err(|_| TrackerError::InvalidAddress(raw.to_string()))?;
        if row == 0 {
            return Err(TrackerError::InvalidAddress(raw.to_string()));
        }
        Ok(Self { row, column })
    }
}

/// Portion of a table requested from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// Every populated row and column.
    All,
    /// Every row, restricted to an inclusive band of column offsets. Cells
    /// left of `first` come back blank so offsets still match addresses.
    Columns { first: usize, last: usize },
}

impl RangeSpec {
    /// Clips a full snapshot down to the requested band.
    pub fn apply(&self, rows: &[Vec<String>]) -> Snapshot {
        match *self {
            RangeSpec::All => rows.to_vec(),
            RangeSpec::Columns { first, last } => rows
                .iter()
                .map(|row| {
                    row.iter()
                        .take(last.saturating_add(1))
                        .enumerate()
                        .map(|(offset, value)| {
                            if offset < first {
                                String::new()
                            } else {
                                value.clone()
                            }
                        })
                        .collect()
                })
                .collect(),
        }
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeSpec::All => write!(f, "*"),
            RangeSpec::Columns { first, last } => {
                write!(f, "{}:{}", column_letters(*first), column_letters(*last))
            }
        }
    }
}

/// Direction of a point transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Add,
    Remove,
}

impl ActionKind {
    /// Signed delta applied to the recipient's score.
    pub fn signed(self, amount: i64) -> i64 {
        match self {
            ActionKind::Add => amount,
            ActionKind::Remove => -amount,
        }
    }
}

impl FromStr for ActionKind {
    type Err = TrackerError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(ActionKind::Add),
            "remove" => Ok(ActionKind::Remove),
            other => Err(TrackerError::Validation(format!(
                "unknown action '{other}', expected 'add' or 'remove'"
            ))),
        }
    }
}

/// Which ranking to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingMode {
    /// One line per participant, keyed by display name.
    #[serde(alias = "student")]
    Entity,
    /// One line per group, normalized by distinct member count per week.
    Group,
}

impl FromStr for RankingMode {
    type Err = TrackerError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "entity" | "student" => Ok(RankingMode::Entity),
            "group" => Ok(RankingMode::Group),
            other => Err(TrackerError::Validation(format!(
                "unknown ranking mode '{other}', expected 'entity' or 'group'"
            ))),
        }
    }
}

/// One line of a ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub name: String,
    pub score: i64,
}

/// Format used for audit timestamps.
pub const AUDIT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One row of the append-only audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub recipient: String,
    pub actor: String,
    pub delta: String,
    pub reason: String,
    pub group: String,
}

impl AuditEntry {
    /// Builds the entry for a completed transfer.
    pub fn for_transfer(
        now: NaiveDateTime,
        recipient: &str,
        role: &str,
        actor_name: &str,
        delta: i64,
        reason: &str,
        group: &str,
    ) -> Self {
        Self {
            timestamp: now.format(AUDIT_TIMESTAMP_FORMAT).to_string(),
            recipient: recipient.to_string(),
            actor: format!("{role} {actor_name}").trim().to_string(),
            delta: format!("{delta:+}"),
            reason: reason.to_string(),
            group: group.to_string(),
        }
    }

    /// Cell values in log column order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.timestamp.clone(),
            self.recipient.clone(),
            self.actor.clone(),
            self.delta.clone(),
            self.reason.clone(),
            self.group.clone(),
        ]
    }

    /// Reads an entry back from a log row; short rows yield empty fields.
    pub fn from_row(row: &[String]) -> Self {
        Self {
            timestamp: cell(row, 0).trim().to_string(),
            recipient: cell(row, 1).trim().to_string(),
            actor: cell(row, 2).trim().to_string(),
            delta: cell(row, 3).trim().to_string(),
            reason: cell(row, 4).trim().to_string(),
            group: cell(row, 5).trim().to_string(),
        }
    }
}

/// Parses the leading signed integer of a cell. Empty or non-numeric content
/// yields 0; trailing content is ignored (`"12.5"` → 12).
pub fn parse_points(raw: &str) -> i64 {
    let trimmed = raw.trim();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<i64>()
        .map(|value| sign * value)
        .unwrap_or(0)
}
