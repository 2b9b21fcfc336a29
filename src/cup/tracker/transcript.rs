use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::cup::tracker::config::TrackerConfig;
use crate::cup::tracker::error::Result;
use crate::cup::tracker::index::normalize_date;
use crate::cup::tracker::io::TabularStore;
use crate::cup::tracker::model::{AuditEntry, RangeSpec};

const MISSING: &str = "N/A";

fn or_missing(value: &str) -> &str {
    if value.is_empty() { MISSING } else { value }
}

/// Renders an audit entry as a single human-readable line.
pub fn render_entry(entry: &AuditEntry) -> String {
    let target = match (entry.recipient.as_str(), entry.group.as_str()) {
        (recipient, "") => or_missing(recipient).to_string(),
        (recipient, group) => format!("{} ({group})", or_missing(recipient)),
    };
    format!(
        "{} gave {target} {} points for: {}",
        or_missing(&entry.actor),
        or_missing(&entry.delta),
        or_missing(&entry.reason)
    )
}

/// Daily read-back of the audit log.
pub struct Transcript<'a, T: TabularStore> {
    store: &'a T,
    config: &'a TrackerConfig,
}

impl<'a, T: TabularStore> Transcript<'a, T> {
    pub fn new(store: &'a T, config: &'a TrackerConfig) -> Self {
        Self { store, config }
    }

    /// Entries logged on `date`, most recent first.
    #[instrument(level = "info", skip(self))]
    pub fn entries_for(&self, date: NaiveDate) -> Result<Vec<AuditEntry>> {
        let rows = self.store.get_range(&self.config.audit_table, RangeSpec::All)?;
        let mut entries: Vec<AuditEntry> = rows
            .iter()
            .map(|row| AuditEntry::from_row(row))
            .filter(|entry| normalize_date(&entry.timestamp) == Some(date))
            .collect();
        entries.reverse();
        debug!(scanned = rows.len(), matched = entries.len(), "transcript filtered");
        Ok(entries)
    }

    /// Rendered lines for `date`, most recent first.
    pub fn lines_for(&self, date: NaiveDate) -> Result<Vec<String>> {
        Ok(self.entries_for(date)?.iter().map(render_entry).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cup::tracker::io::MemoryStore;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn renders_group_and_missing_fields() {
        let full = AuditEntry::from_row(&row(&[
            "2025-06-24 09:00:00",
            "Alice",
            "EXCOR Sam",
            "+5",
            "helping",
            "Red",
        ]));
        assert_eq!(render_entry(&full), "EXCOR Sam gave Alice (Red) +5 points for: helping");

        let sparse = AuditEntry::from_row(&row(&["2025-06-24 09:00:00", "Bob"]));
        assert_eq!(render_entry(&sparse), "N/A gave Bob N/A points for: N/A");
    }

    #[test]
    fn filters_by_date_and_lists_newest_first() {
        let store = MemoryStore::new().with_table(
            "Points",
            vec![
                row(&["Timestamp", "Recipient", "Actor", "Delta", "Reason", "Group"]),
                row(&["2025-06-24 08:00:00", "Alice", "EXCOR Sam", "+5", "early", "Red"]),
                row(&["2025-06-23 20:00:00", "Bob", "EXCOR Sam", "-2", "noise", "Blue"]),
                row(&["6/24/2025 19:00:00", "Bob", "EXCOR Kim", "+1", "cleanup", ""]),
                row(&["garbage", "Eve", "EXCOR Kim", "+9", "?", ""]),
            ],
        );
        let config = TrackerConfig::default();
        let lines = Transcript::new(&store, &config)
            .lines_for(NaiveDate::from_ymd_opt(2025, 6, 24).unwrap())
            .unwrap();

        assert_eq!(
            lines,
            vec![
                "EXCOR Kim gave Bob +1 points for: cleanup",
                "EXCOR Sam gave Alice (Red) +5 points for: early",
            ]
        );
    }
}
