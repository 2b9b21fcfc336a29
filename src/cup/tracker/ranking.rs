//! Read-only rankings over one or more weekly tables.
//!
//! Group scores are normalized once per table, as
//! `round(scale / distinct_members * raw_points)`, and the per-week results
//! are summed. Normalizing the combined totals instead would change the
//! ranking whenever group sizes vary between weeks.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, instrument};

use crate::cup::tracker::config::TrackerConfig;
use crate::cup::tracker::error::Result;
use crate::cup::tracker::index::ColumnIndex;
use crate::cup::tracker::io::TabularStore;
use crate::cup::tracker::model::{
    RangeSpec, RankingEntry, RankingMode, Snapshot, cell, parse_points,
};

/// Table selector expanding to every configured week.
pub const TOTAL_SELECTOR: &str = "total";

/// Scores keyed by name, remembering first-seen order.
#[derive(Debug, Default)]
struct Tally {
    entries: Vec<RankingEntry>,
    positions: HashMap<String, usize>,
}

impl Tally {
    fn add(&mut self, name: &str, score: i64) {
        match self.positions.get(name) {
            Some(&position) => {
                let entry = &mut self.entries[position];
                entry.score = entry.score.saturating_add(score);
            }
            None => {
                self.positions.insert(name.to_string(), self.entries.len());
                self.entries.push(RankingEntry {
                    name: name.to_string(),
                    score,
                });
            }
        }
    }

    /// Descending by score; ties keep first-seen order.
    fn into_ranking(self) -> Vec<RankingEntry> {
        let mut entries = self.entries;
        entries.sort_by(|lhs, rhs| rhs.score.cmp(&lhs.score));
        entries
    }
}

#[derive(Debug, Default)]
struct GroupWeek {
    raw_points: i64,
    members: HashSet<String>,
}

/// A participant row reduced to what the rankings need.
struct ScoredRow<'r> {
    name: &'r str,
    group: &'r str,
    points: i64,
}

/// Builds rankings by scanning weekly tables afresh on every call.
pub struct RankingAggregator<'a, T: TabularStore> {
    store: &'a T,
    config: &'a TrackerConfig,
}

impl<'a, T: TabularStore> RankingAggregator<'a, T> {
    pub fn new(store: &'a T, config: &'a TrackerConfig) -> Self {
        Self { store, config }
    }

    /// Expands `total` (case-insensitive) into every configured week table;
    /// any other id is kept as given.
    pub fn expand_tables(&self, table_ids: &[String]) -> Vec<String> {
        table_ids
            .iter()
            .flat_map(|id| {
                if id.trim().eq_ignore_ascii_case(TOTAL_SELECTOR) {
                    self.config.schedule.week_tables()
                } else {
                    vec![id.trim().to_string()]
                }
            })
            .collect()
    }

    /// Ranks participants or groups across the selected tables.
    #[instrument(level = "info", skip(self))]
    pub fn aggregate(&self, table_ids: &[String], mode: RankingMode) -> Result<Vec<RankingEntry>> {
        let tables = self.expand_tables(table_ids);
        let mut tally = Tally::default();

        for table in &tables {
            let rows = self.store.get_range(table, RangeSpec::All)?;
            match mode {
                RankingMode::Entity => self.tally_entities(&rows, &mut tally),
                RankingMode::Group => self.tally_groups(table, &rows, &mut tally),
            }
        }

        let ranking = tally.into_ranking();
        info!(tables = tables.len(), entries = ranking.len(), "ranking computed");
        Ok(ranking)
    }

    fn tally_entities(&self, rows: &Snapshot, tally: &mut Tally) {
        for row in self.scored_rows(rows) {
            tally.add(row.name, row.points);
        }
    }

    fn tally_groups(&self, table: &str, rows: &Snapshot, tally: &mut Tally) {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, GroupWeek> = HashMap::new();

        for row in self.scored_rows(rows) {
            if row.group.is_empty() {
                continue;
            }
            let week = groups.entry(row.group.to_string()).or_insert_with(|| {
                order.push(row.group.to_string());
                GroupWeek::default()
            });
            week.raw_points = week.raw_points.saturating_add(row.points);
            week.members.insert(row.name.to_string());
        }

        for group in order {
            let Some(week) = groups.get(&group) else {
                continue;
            };
            let normalized =
                normalize_group_score(self.config.group_scale, week.raw_points, week.members.len());
            debug!(
                table,
                group = %group,
                raw = week.raw_points,
                members = week.members.len(),
                normalized,
                "group week scored"
            );
            tally.add(&group, normalized);
        }
    }

    fn scored_rows<'r>(&self, rows: &'r Snapshot) -> impl Iterator<Item = ScoredRow<'r>> {
        let layout = self.config.layout.clone();
        let point_columns = ColumnIndex::build(rows, layout.category_row, layout.date_row)
            .offsets_for(&self.config.points_label);

        rows.iter().skip(layout.first_data_row).filter_map(move |row| {
            let id = cell(row, layout.id_column).trim();
            let name = cell(row, layout.name_column).trim();
            if id.is_empty() || name.is_empty() {
                return None;
            }
            let points = point_columns
                .iter()
                .map(|&offset| parse_points(cell(row, offset)))
                .fold(0_i64, i64::saturating_add);
            Some(ScoredRow {
                name,
                group: cell(row, layout.group_column).trim(),
                points,
            })
        })
    }
}

/// `round(scale / members * raw)`, or 0 for a group without members. Results
/// beyond the `i64` range clamp to its bounds.
pub fn normalize_group_score(scale: i64, raw_points: i64, members: usize) -> i64 {
    if members == 0 {
        return 0;
    }
    (scale as f64 / members as f64 * raw_points as f64).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_by_member_count() {
        assert_eq!(normalize_group_score(6, 30, 3), 60);
        assert_eq!(normalize_group_score(6, 10, 2), 30);
        assert_eq!(normalize_group_score(6, 10, 4), 15);
        assert_eq!(normalize_group_score(6, 7, 4), 11);
        assert_eq!(normalize_group_score(6, 5, 0), 0);
        assert_eq!(normalize_group_score(6, i64::MAX, 1), i64::MAX);
    }

    #[test]
    fn tally_sorts_descending_and_keeps_ties_stable() {
        let mut tally = Tally::default();
        tally.add("b", 5);
        tally.add("a", 9);
        tally.add("c", 5);
        tally.add("b", 0);
        let names: Vec<String> = tally.into_ranking().into_iter().map(|entry| entry.name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn tally_saturates_instead_of_wrapping() {
        let mut tally = Tally::default();
        tally.add("a", i64::MAX);
        tally.add("a", 1);
        tally.add("b", i64::MIN);
        tally.add("b", -1);
        let ranking = tally.into_ranking();
        assert_eq!(ranking[0].score, i64::MAX);
        assert_eq!(ranking[1].score, i64::MIN);
    }
}
