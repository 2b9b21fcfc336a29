use chrono::NaiveDate;
use cup_tracker::TrackerError;
use cup_tracker::config::TrackerConfig;
use cup_tracker::io::MemoryStore;
use cup_tracker::model::{RankingEntry, RankingMode, Snapshot};
use cup_tracker::ranking::RankingAggregator;
use cup_tracker::schedule::{Schedule, WeekStart};

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|value| value.to_string()).collect()
}

/// A weekly table with two "Daily Points" columns and one unrelated column.
fn week(members: &[(&str, &str, &str, &str, &str)]) -> Snapshot {
    let mut rows = vec![
        row(&["ID", "Name", "Group", "Daily Points", "Lunch", "daily points "]),
        row(&["", "", "", "6/24/2025", "6/24/2025", "6/25/2025"]),
    ];
    for (id, name, group, first, second) in members {
        rows.push(row(&[id, name, group, first, "99", second]));
    }
    rows
}

fn config() -> TrackerConfig {
    TrackerConfig {
        schedule: Schedule {
            events: Vec::new(),
            weeks: vec![
                WeekStart::new("Week1", NaiveDate::from_ymd_opt(2025, 6, 22).unwrap()),
                WeekStart::new("Week2", NaiveDate::from_ymd_opt(2025, 6, 29).unwrap()),
            ],
        },
        ..TrackerConfig::default()
    }
}

fn entry(name: &str, score: i64) -> RankingEntry {
    RankingEntry {
        name: name.to_string(),
        score,
    }
}

fn tables(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[test]
fn entity_ranking_sums_points_columns_only() {
    let store = MemoryStore::new().with_table(
        "Week1",
        week(&[
            ("S1", "Alice", "Red", "3", "4"),
            ("S2", "Bob", "Blue", "abc", "5"),
            ("", "Nobody", "Red", "50", "50"),
            ("S3", "", "Red", "50", "50"),
            ("S4", "Cara", "Blue", "", ""),
        ]),
    );
    let config = config();
    let ranking = RankingAggregator::new(&store, &config)
        .aggregate(&tables(&["Week1"]), RankingMode::Entity)
        .unwrap();

    assert_eq!(ranking, vec![entry("Alice", 7), entry("Bob", 5), entry("Cara", 0)]);
}

#[test]
fn entity_ranking_accumulates_by_name_across_weeks() {
    let store = MemoryStore::new()
        .with_table(
            "Week1",
            week(&[("S1", "Alice", "Red", "1", "0"), ("S2", "Bob", "Red", "4", "0")]),
        )
        .with_table(
            "Week2",
            week(&[("S1", "Alice", "Red", "6", "0"), ("S2", "Bob", "Red", "1", "0")]),
        );
    let config = config();
    let ranking = RankingAggregator::new(&store, &config)
        .aggregate(&tables(&["total"]), RankingMode::Entity)
        .unwrap();

    assert_eq!(ranking, vec![entry("Alice", 7), entry("Bob", 5)]);
}

#[test]
fn group_score_is_scaled_by_distinct_members() {
    let store = MemoryStore::new().with_table(
        "Week1",
        week(&[
            ("S1", "Alice", "G", "10", ""),
            ("S2", "Bob", "G", "5", "5"),
            ("S3", "Cara", "G", "", "10"),
            ("S4", "Dan", "H", "4", ""),
        ]),
    );
    let config = config();
    let ranking = RankingAggregator::new(&store, &config)
        .aggregate(&tables(&["Week1"]), RankingMode::Group)
        .unwrap();

    assert_eq!(ranking, vec![entry("G", 60), entry("H", 24)]);
}

#[test]
fn repeated_member_names_count_once() {
    let store = MemoryStore::new().with_table(
        "Week1",
        week(&[
            ("S1", "Alice", "G", "10", ""),
            ("S1b", "Alice", "G", "10", ""),
            ("S2", "Bob", "G", "10", ""),
        ]),
    );
    let config = config();
    let ranking = RankingAggregator::new(&store, &config)
        .aggregate(&tables(&["Week1"]), RankingMode::Group)
        .unwrap();

    assert_eq!(ranking, vec![entry("G", 90)]);
}

#[test]
fn total_sums_weekly_normalized_scores() {
    let store = MemoryStore::new()
        .with_table(
            "Week1",
            week(&[("S1", "Alice", "G", "10", ""), ("S2", "Bob", "G", "10", "")]),
        )
        .with_table(
            "Week2",
            week(&[("S1", "Alice", "G", "5", "5"), ("S2", "Bob", "G", "10", "")]),
        );
    let config = config();
    let ranking = RankingAggregator::new(&store, &config)
        .aggregate(&tables(&["TOTAL"]), RankingMode::Group)
        .unwrap();

    assert_eq!(ranking, vec![entry("G", 120)]);
}

#[test]
fn total_normalizes_each_week_before_summing() {
    // Week1: 10 raw points over 2 members -> 30.
    // Week2: 12 raw points over 4 members -> 18.
    // Normalizing the combined 22 points over 4 members would give 33.
    let store = MemoryStore::new()
        .with_table(
            "Week1",
            week(&[("S1", "Alice", "G", "10", ""), ("S2", "Bob", "G", "0", "")]),
        )
        .with_table(
            "Week2",
            week(&[
                ("S1", "Alice", "G", "4", ""),
                ("S2", "Bob", "G", "4", ""),
                ("S3", "Cara", "G", "4", ""),
                ("S4", "Dan", "G", "0", ""),
            ]),
        );
    let config = config();
    let ranking = RankingAggregator::new(&store, &config)
        .aggregate(&tables(&["total"]), RankingMode::Group)
        .unwrap();

    assert_eq!(ranking, vec![entry("G", 48)]);
}

#[test]
fn ties_keep_first_seen_order() {
    let store = MemoryStore::new().with_table(
        "Week1",
        week(&[
            ("S1", "Zed", "B", "2", ""),
            ("S2", "Amy", "A", "2", ""),
            ("S3", "Max", "C", "3", ""),
        ]),
    );
    let config = config();
    let aggregator = RankingAggregator::new(&store, &config);

    let entities = aggregator
        .aggregate(&tables(&["Week1"]), RankingMode::Entity)
        .unwrap();
    assert_eq!(entities, vec![entry("Max", 3), entry("Zed", 2), entry("Amy", 2)]);

    let groups = aggregator
        .aggregate(&tables(&["Week1"]), RankingMode::Group)
        .unwrap();
    assert_eq!(groups, vec![entry("C", 18), entry("B", 12), entry("A", 12)]);
}

#[test]
fn rows_without_group_are_left_out_of_group_ranking() {
    let store = MemoryStore::new().with_table(
        "Week1",
        week(&[("S1", "Alice", "", "10", ""), ("S2", "Bob", "G", "1", "")]),
    );
    let config = config();
    let ranking = RankingAggregator::new(&store, &config)
        .aggregate(&tables(&["Week1"]), RankingMode::Group)
        .unwrap();

    assert_eq!(ranking, vec![entry("G", 6)]);
}

#[test]
fn unknown_table_is_a_store_fault() {
    let store = MemoryStore::new();
    let config = config();
    let result = RankingAggregator::new(&store, &config)
        .aggregate(&tables(&["Week9"]), RankingMode::Entity);
    assert!(matches!(result, Err(TrackerError::UnknownTable(name)) if name == "Week9"));
}

#[test]
fn total_expands_to_configured_weeks_in_order() {
    let store = MemoryStore::new();
    let config = config();
    let aggregator = RankingAggregator::new(&store, &config);
    assert_eq!(
        aggregator.expand_tables(&tables(&["Total"])),
        tables(&["Week1", "Week2"])
    );
    assert_eq!(aggregator.expand_tables(&tables(&["Week2"])), tables(&["Week2"]));
}

#[test]
fn oversized_point_cells_saturate_instead_of_overflowing() {
    let store = MemoryStore::new()
        .with_table(
            "Week1",
            week(&[
                ("S1", "Alice", "G", "9223372036854775807", "1"),
                ("S2", "Bob", "G", "9223372036854775807", ""),
            ]),
        )
        .with_table("Week2", week(&[("S1", "Alice", "G", "5", "")]));
    let config = config();
    let aggregator = RankingAggregator::new(&store, &config);

    let entities = aggregator
        .aggregate(&tables(&["total"]), RankingMode::Entity)
        .unwrap();
    assert_eq!(entities, vec![entry("Alice", i64::MAX), entry("Bob", i64::MAX)]);

    let groups = aggregator
        .aggregate(&tables(&["total"]), RankingMode::Group)
        .unwrap();
    assert_eq!(groups, vec![entry("G", i64::MAX)]);
}
