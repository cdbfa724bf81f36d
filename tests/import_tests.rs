//! Integration tests for bulk CSV / JSON import into a file-backed store.

use std::fs;

use stordb::errors::StorDbError;
use stordb::import::{import_csv, import_json};
use stordb::record::{Redact, MASK};
use stordb::store::RecordStore;
use tempfile::TempDir;

const EXAMPLE_CSV: &str = "\
owner,device_name,mac_address,description
Alice,Router,AA:BB:CC:DD:EE:01,Main office router
Bob,Switch,AA:BB:CC:DD:EE:02,Core switch
Carol,Printer,AA:BB:CC:DD:EE:03,Second floor
";

fn store() -> (TempDir, RecordStore) {
    let dir = TempDir::new().expect("create temp dir");
    let store = RecordStore::open(&dir.path().join("stordb.sqlite3")).expect("open store");
    (dir, store)
}

// ---------------------------------------------------------------------------
// The documented three-row example
// ---------------------------------------------------------------------------

#[test]
fn example_file_imports_three_records() {
    let (_dir, store) = store();
    let report = import_csv(&store, EXAMPLE_CSV.as_bytes()).unwrap();

    assert_eq!(report.accepted, 3);
    assert!(report.rejected.is_empty());

    let alice = store.find_by_mac("AA:BB:CC:DD:EE:01").unwrap();
    assert_eq!(alice.owner, "Alice");
    assert_eq!(alice.device_name, "Router");
    assert_eq!(alice.description.as_deref(), Some("Main office router"));
}

#[test]
fn fourth_row_with_bad_mac_is_rejected_alone() {
    let (_dir, store) = store();
    let csv = format!("{EXAMPLE_CSV}Dave,Laptop,not-a-mac,Spare\n");
    let report = import_csv(&store, csv.as_bytes()).unwrap();

    assert_eq!(report.accepted, 3);
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].row, 4);
    assert!(report.rejected[0].reason.contains("invalid MAC format"));
    assert_eq!(store.count().unwrap(), 3);

    match report.into_result() {
        Err(StorDbError::PartialImport { accepted, rejected }) => {
            assert_eq!((accepted, rejected), (3, 1));
        }
        other => panic!("expected PartialImport, got {other:?}"),
    }
}

#[test]
fn header_order_and_case_do_not_matter() {
    let (_dir, store) = store();
    let csv = "MAC ADDRESS,Owner,DEVICE NAME\naa-bb-cc-dd-ee-09,Erin,Camera\n";
    let report = import_csv(&store, csv.as_bytes()).unwrap();
    assert_eq!(report.accepted, 1);
    assert_eq!(store.find_by_mac("AA:BB:CC:DD:EE:09").unwrap().owner, "Erin");
}

#[test]
fn missing_column_commits_nothing() {
    let (_dir, store) = store();
    let csv = "owner,mac_address\nAlice,AA:BB:CC:DD:EE:01\n";
    let err = import_csv(&store, csv.as_bytes()).unwrap_err();
    assert!(matches!(err, StorDbError::StructuralImport(_)));
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn reimporting_the_same_file_rejects_every_row_as_duplicate() {
    let (_dir, store) = store();
    import_csv(&store, EXAMPLE_CSV.as_bytes()).unwrap();
    let again = import_csv(&store, EXAMPLE_CSV.as_bytes()).unwrap();
    assert_eq!(again.accepted, 0);
    assert_eq!(again.rejected.len(), 3);
    assert!(again.rejected.iter().all(|r| r.reason.contains("already exists")));
    assert!(again.rejected.iter().all(|r| !r.reason.contains("AA:BB")));
}

#[test]
fn accepted_rows_survive_reopening_the_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stordb.sqlite3");
    {
        let store = RecordStore::open(&path).unwrap();
        let csv = format!("{EXAMPLE_CSV}Dave,Laptop,not-a-mac,Spare\n");
        import_csv(&store, csv.as_bytes()).unwrap();
    }
    let store = RecordStore::open(&path).unwrap();
    assert_eq!(store.count().unwrap(), 3);
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

#[test]
fn json_file_imports_and_lists_redacted() {
    let (dir, store) = store();
    let path = dir.path().join("records.json");
    fs::write(
        &path,
        r#"[
            {"owner": "Alice", "device_name": "Router", "mac_address": "AA:BB:CC:DD:EE:01",
             "secret_value": "hunter2"},
            {"owner": "Bob", "device_name": "Switch", "mac_address": "AA:BB:CC:DD:EE:02"}
        ]"#,
    )
    .unwrap();

    let report = import_json(&store, fs::File::open(&path).unwrap()).unwrap();
    assert_eq!(report.accepted, 2);

    for record in store.list_all().unwrap() {
        let view = record.redacted();
        assert_eq!(view.mac_address, MASK);
        assert!(!view.to_string().contains("hunter2"));
    }
}

#[test]
fn json_object_instead_of_array_is_structural() {
    let (_dir, store) = store();
    let err = import_json(&store, r#"{"owner": "Alice"}"#.as_bytes()).unwrap_err();
    assert!(matches!(err, StorDbError::StructuralImport(_)));
}
