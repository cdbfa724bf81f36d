//! Integration tests for the stordb CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`. Each
//! test runs in its own temp dir with a `.stordb.toml` selecting the
//! native cipher (cheap Argon2 settings), so no ansible install is needed.
//! Passwords come from `VAULT_PASSWORD`.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

const CONFIG: &str = r#"
cipher = "native"
argon2_memory_kib = 8192
argon2_iterations = 1
argon2_parallelism = 1
scratch_dir = "scratch"
"#;

const EXAMPLE_CSV: &str = "\
owner,device_name,mac_address,description
Alice,Router,AA:BB:CC:DD:EE:01,Main office router
Bob,Switch,AA:BB:CC:DD:EE:02,Core switch
Carol,Printer,AA:BB:CC:DD:EE:03,Second floor
";

/// Helper: a temp project dir with config and an empty scratch dir.
fn project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    tmp.child(".stordb.toml").write_str(CONFIG).unwrap();
    tmp.child("scratch").create_dir_all().unwrap();
    tmp
}

/// Helper: a `stordb` command running inside `dir`.
fn stordb(dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("stordb").expect("binary should exist");
    cmd.current_dir(dir.path())
        .env_remove("STORDB_DB_PATH")
        .env_remove("STORDB_VAULT_PATH")
        .env_remove("VAULT_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn add(dir: &TempDir, mac: &str, name: &str, owner: &str) {
    stordb(dir)
        .args(["--add", mac, name, owner, "test device"])
        .assert()
        .success();
}

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

#[test]
fn help_flag_shows_usage() {
    let tmp = project();
    stordb(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("secrets catalog"))
        .stdout(predicate::str::contains("--add"))
        .stdout(predicate::str::contains("--lookup"))
        .stdout(predicate::str::contains("--export-vault"))
        .stdout(predicate::str::contains("--import-vault"));
}

#[test]
fn no_action_is_a_usage_error() {
    let tmp = project();
    stordb(&tmp).assert().code(2).stderr(predicate::str::contains("Usage"));
}

#[test]
fn init_creates_database() {
    let tmp = project();
    stordb(&tmp)
        .arg("--init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Database created"));
    tmp.child("stordb.sqlite3").assert(predicate::path::exists());

    stordb(&tmp)
        .arg("--init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already initialised"));
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[test]
fn lookup_output_is_redacted() {
    let tmp = project();
    add(&tmp, "aa-bb-cc-dd-ee-01", "Router", "Alice");

    stordb(&tmp)
        .args(["--lookup", "AA:BB:CC:DD:EE:01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Router"))
        .stdout(predicate::str::contains("Alice"))
        .stdout(predicate::str::contains("[REDACTED]"))
        .stdout(predicate::str::contains("AA:BB:CC:DD:EE:01").not());
}

#[test]
fn lookup_miss_exits_not_found() {
    let tmp = project();
    stordb(&tmp).arg("--init").assert().success();
    stordb(&tmp)
        .args(["--lookup", "AA:BB:CC:DD:EE:99"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("No record found"));
}

#[test]
fn invalid_mac_exits_validation() {
    let tmp = project();
    stordb(&tmp)
        .args(["--add", "not-a-mac", "Router", "Alice", "desc"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("invalid MAC format"));
}

#[test]
fn duplicate_mac_exits_validation() {
    let tmp = project();
    add(&tmp, "AA:BB:CC:DD:EE:01", "Router", "Alice");
    stordb(&tmp)
        .args(["--add", "aa:bb:cc:dd:ee:01", "Other", "Bob", "desc"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn secret_from_stdin_never_reaches_output_or_log() {
    let tmp = project();
    stordb(&tmp)
        .args(["--add", "AA:BB:CC:DD:EE:01", "Router", "Alice", "desc", "--secret"])
        .write_stdin("hunter2\n")
        .assert()
        .success();

    stordb(&tmp)
        .args(["--list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"secret_value\": \"[REDACTED]\""))
        .stdout(predicate::str::contains("hunter2").not());

    tmp.child("stordb.log")
        .assert(predicate::str::contains("DB TRANSACTION: add_secret"))
        .assert(predicate::str::contains("hunter2").not())
        .assert(predicate::str::contains("AA:BB:CC:DD:EE:01").not());
}

#[test]
fn owner_and_device_filters() {
    let tmp = project();
    add(&tmp, "AA:BB:CC:DD:EE:01", "Router", "Alice");
    add(&tmp, "AA:BB:CC:DD:EE:02", "Laptop", "Alice");
    add(&tmp, "AA:BB:CC:DD:EE:03", "Router", "Bob");

    stordb(&tmp)
        .args(["--owner", "Alice"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Laptop"))
        .stdout(predicate::str::contains("Bob").not());

    stordb(&tmp)
        .args(["--device", "Router", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bob"));

    stordb(&tmp).args(["--owner", "Zed"]).assert().code(4);
}

#[test]
fn update_changes_fields_and_rejects_unknown_ones() {
    let tmp = project();
    add(&tmp, "AA:BB:CC:DD:EE:01", "Router", "Alice");

    stordb(&tmp)
        .args(["--update", "1", "owner=Carol"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Carol"));

    stordb(&tmp)
        .args(["--update", "1", "colour=red"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("unknown field 'colour'"));

    stordb(&tmp)
        .args(["--update", "42", "owner=Nobody"])
        .assert()
        .code(4);
}

#[test]
fn delete_with_force_removes_record() {
    let tmp = project();
    add(&tmp, "AA:BB:CC:DD:EE:01", "Router", "Alice");

    stordb(&tmp).args(["--delete", "1", "--force"]).assert().success();
    stordb(&tmp)
        .args(["--lookup", "AA:BB:CC:DD:EE:01"])
        .assert()
        .code(4);
    stordb(&tmp).args(["--delete", "1", "--force"]).assert().code(4);
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

#[test]
fn csv_import_with_bad_row_is_partial() {
    let tmp = project();
    tmp.child("devices.csv")
        .write_str(&format!("{EXAMPLE_CSV}Dave,Laptop,not-a-mac,Spare\n"))
        .unwrap();

    stordb(&tmp)
        .args(["--import-csv", "devices.csv"])
        .assert()
        .code(6)
        .stdout(predicate::str::contains("Imported 3 record(s)"))
        .stderr(predicate::str::contains("Row 4"))
        .stderr(predicate::str::contains("invalid MAC format"));

    stordb(&tmp)
        .args(["--list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Carol"));
}

#[test]
fn csv_missing_column_is_structural() {
    let tmp = project();
    tmp.child("devices.csv")
        .write_str("owner,device_name\nAlice,Router\n")
        .unwrap();

    stordb(&tmp)
        .args(["--import-csv", "devices.csv"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("mac_address"));
}

#[test]
fn json_import_succeeds() {
    let tmp = project();
    tmp.child("devices.json")
        .write_str(r#"[{"owner": "Alice", "device_name": "Router", "mac_address": "AA:BB:CC:DD:EE:01"}]"#)
        .unwrap();

    stordb(&tmp)
        .args(["--import-json", "devices.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 1 record(s)"));
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

#[test]
fn vault_round_trip_into_another_database() {
    let tmp = project();
    tmp.child("devices.csv").write_str(EXAMPLE_CSV).unwrap();
    stordb(&tmp).args(["--import-csv", "devices.csv"]).assert().success();

    stordb(&tmp)
        .args(["--export-vault", "backup.vault"])
        .env("VAULT_PASSWORD", "correct horse")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 3 record(s)"));
    tmp.child("backup.vault")
        .assert(predicate::str::contains("Main office router").not());

    stordb(&tmp)
        .args(["--db", "restored.sqlite3", "--import-vault", "backup.vault"])
        .env("VAULT_PASSWORD", "correct horse")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 inserted"));

    stordb(&tmp)
        .args(["--db", "restored.sqlite3", "--lookup", "AA:BB:CC:DD:EE:03"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Printer"));

    tmp.child("stordb.log")
        .assert(predicate::str::contains("Vault encryption complete"))
        .assert(predicate::str::contains("Vault decryption complete"))
        .assert(predicate::str::contains("correct horse").not());
    assert!(std::fs::read_dir(tmp.child("scratch").path()).unwrap().next().is_none());
}

#[test]
fn vault_wrong_password_exits_vault_error() {
    let tmp = project();
    add(&tmp, "AA:BB:CC:DD:EE:01", "Router", "Alice");
    stordb(&tmp)
        .arg("--export-vault")
        .env("VAULT_PASSWORD", "right")
        .assert()
        .success();
    tmp.child("vault.ansible").assert(predicate::path::exists());

    stordb(&tmp)
        .args(["--db", "other.sqlite3", "--import-vault"])
        .env("VAULT_PASSWORD", "wrong")
        .assert()
        .code(7)
        .stderr(predicate::str::contains("decryption failed"));

    assert!(std::fs::read_dir(tmp.child("scratch").path()).unwrap().next().is_none());
}

#[test]
fn vault_import_collision_policy_flag() {
    let tmp = project();
    add(&tmp, "AA:BB:CC:DD:EE:01", "Router", "Alice");
    stordb(&tmp)
        .arg("--export-vault")
        .env("VAULT_PASSWORD", "pw")
        .assert()
        .success();
    stordb(&tmp).args(["--update", "1", "owner=Mallory"]).assert().success();

    stordb(&tmp)
        .arg("--import-vault")
        .env("VAULT_PASSWORD", "pw")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 skipped"));

    stordb(&tmp)
        .args(["--import-vault", "--on-collision", "overwrite"])
        .env("VAULT_PASSWORD", "pw")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 overwritten"));

    stordb(&tmp)
        .args(["--lookup", "AA:BB:CC:DD:EE:01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Alice"));
}

// ---------------------------------------------------------------------------
// Backup / restore
// ---------------------------------------------------------------------------

#[test]
fn backup_then_restore() {
    let tmp = project();
    add(&tmp, "AA:BB:CC:DD:EE:01", "Router", "Alice");

    stordb(&tmp).args(["--backup-db", "snap.sqlite3"]).assert().success();
    add(&tmp, "AA:BB:CC:DD:EE:02", "Switch", "Bob");

    stordb(&tmp).args(["--restore-db", "snap.sqlite3"]).assert().success();
    stordb(&tmp)
        .args(["--lookup", "AA:BB:CC:DD:EE:02"])
        .assert()
        .code(4);
}

#[test]
fn restore_of_missing_backup_fails() {
    let tmp = project();
    stordb(&tmp)
        .args(["--restore-db", "nope.sqlite3"])
        .assert()
        .failure();
}
