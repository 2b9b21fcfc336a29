use chrono::NaiveDate;
use cup_tracker::TrackerError;
use cup_tracker::checkin::Ledger;
use cup_tracker::config::TrackerConfig;
use cup_tracker::io::excel_write::{SheetTable, write_tables};
use cup_tracker::io::{TabularStore, WorkbookStore};
use cup_tracker::model::RangeSpec;
use tempfile::tempdir;

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|value| value.to_string()).collect()
}

fn sheet(name: &str, rows: Vec<Vec<String>>) -> SheetTable {
    SheetTable {
        name: name.to_string(),
        rows,
    }
}

fn week_one() -> SheetTable {
    sheet(
        "Week1",
        vec![
            row(&["ID", "Name", "Group", "Lunch"]),
            row(&["", "", "", "6/24/2025"]),
            row(&["S1", "Alice", "Red"]),
        ],
    )
}

#[test]
fn created_workbook_reads_back_every_sheet() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = temp_dir.path().join("cup.xlsx");
    let points = sheet("Points", vec![row(&["Timestamp", "Recipient"])]);
    let store =
        WorkbookStore::create(&path, &[week_one(), points.clone()]).expect("workbook created");

    assert_eq!(store.get_range("Week1", RangeSpec::All).unwrap(), week_one().rows);
    assert_eq!(store.get_range("Points", RangeSpec::All).unwrap(), points.rows);
    assert!(!path.with_extension("xlsx.tmp").exists());
}

#[test]
fn writes_persist_across_reopen() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = temp_dir.path().join("cup.xlsx");
    let store = WorkbookStore::create(&path, &[week_one()]).expect("workbook created");

    store
        .update_cell("Week1", "E3".parse().unwrap(), "42")
        .expect("cell updated");
    store
        .append_row("Week1", &row(&["S2", "Bob", "Blue"]))
        .expect("row appended");

    let reopened = WorkbookStore::open(&path).expect("workbook reopened");
    let rows = reopened.get_range("Week1", RangeSpec::All).unwrap();
    assert_eq!(rows[2], row(&["S1", "Alice", "Red", "", "42"]));
    assert_eq!(rows[3], row(&["S2", "Bob", "Blue"]));
}

#[test]
fn leading_blank_rows_and_columns_keep_their_offsets() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = temp_dir.path().join("sparse.xlsx");
    write_tables(
        &path,
        &[sheet("Sparse", vec![Vec::new(), row(&["", "", "x", "", "y"])])],
    )
    .expect("workbook written");

    let store = WorkbookStore::open(&path).expect("workbook opened");
    let rows = store.get_range("Sparse", RangeSpec::All).unwrap();
    assert_eq!(rows, vec![Vec::new(), row(&["", "", "x", "", "y"])]);

    let narrowed = store
        .get_range("Sparse", RangeSpec::Columns { first: 0, last: 2 })
        .unwrap();
    assert_eq!(narrowed[1], row(&["", "", "x"]));
}

#[test]
fn missing_sheet_and_missing_file_are_faults() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = temp_dir.path().join("cup.xlsx");
    let store = WorkbookStore::create(&path, &[week_one()]).expect("workbook created");

    assert!(matches!(
        store.get_range("Week7", RangeSpec::All),
        Err(TrackerError::UnknownTable(name)) if name == "Week7"
    ));
    assert!(matches!(
        store.append_row("Week7", &row(&["x"])),
        Err(TrackerError::UnknownTable(_))
    ));
    assert!(matches!(
        WorkbookStore::open(temp_dir.path().join("absent.xlsx")),
        Err(TrackerError::Io(_))
    ));
}

#[test]
fn check_in_marks_the_workbook_cell() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = temp_dir.path().join("cup.xlsx");
    let store = WorkbookStore::create(&path, &[week_one()]).expect("workbook created");
    let config = TrackerConfig::default();
    let now = NaiveDate::from_ymd_opt(2025, 6, 24)
        .unwrap()
        .and_hms_opt(12, 9, 0)
        .unwrap();

    let ledger = Ledger::new(&store, &config);
    assert!(ledger.check_in("S1", now).unwrap().is_success());
    assert_eq!(ledger.check_in("S1", now).unwrap().kind(), "already_checked_in");

    let rows = WorkbookStore::open(&path)
        .unwrap()
        .get_range("Week1", RangeSpec::All)
        .unwrap();
    assert_eq!(rows[2], row(&["S1", "Alice", "Red", "9"]));
}
