//! Record store: the durable `secrets` table.
//!
//! `RecordStore` wraps a single SQLite connection. Every mutating call
//! commits before it returns; multi-row changes (updates, vault merges)
//! run inside one transaction. Concurrent writers from other processes
//! are left to SQLite's own locking.

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, StorDbError};
use crate::record::redact::redact_value;
use crate::record::validate::{parse_mac, validate, FieldIssue, ValidatedRecord, ValidationError};
use crate::record::{Field, MacAddress, SecretRecord};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS secrets (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        owner        TEXT NOT NULL,
        device_name  TEXT NOT NULL,
        mac_address  TEXT NOT NULL,
        secret_value TEXT,
        description  TEXT,
        created_at   TEXT NOT NULL,
        updated_at   TEXT NOT NULL
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_secrets_mac_address
        ON secrets(mac_address);
";

const COLUMNS: &str =
    "id, owner, device_name, mac_address, secret_value, description, created_at, updated_at";

/// How long to wait on a lock held by another process.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// What to do when an incoming record's MAC address is already stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Keep the stored record and drop the incoming one.
    #[default]
    Skip,
    /// Replace the stored record's fields, keeping its id.
    Overwrite,
}

/// Outcome of `RecordStore::merge`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    pub inserted: usize,
    pub skipped: usize,
    pub overwritten: usize,
}

/// Columns that can be searched with `find_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupField {
    Owner,
    DeviceName,
}

impl LookupField {
    fn column(self) -> &'static str {
        match self {
            LookupField::Owner => "owner",
            LookupField::DeviceName => "device_name",
        }
    }
}

/// SQLite-backed record store.
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open (or create) the store at `path` and make sure the schema exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;

        // Owner-only: the table holds secrets in the clear.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            if let Err(e) = fs::set_permissions(path, perms) {
                tracing::warn!("could not restrict {} to owner-only: {e}", path.display());
            }
        }

        conn.busy_timeout(BUSY_TIMEOUT).map_err(db_err)?;

        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Open a throwaway in-memory store.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        let store = Self { conn };
        store.initialize()?;
        Ok(store)
    }

    /// Create the schema if absent. Safe to call any number of times.
    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA).map_err(db_err)?;
        tracing::debug!("DB TRANSACTION: schema initialized");
        Ok(())
    }


    // ------------------------------------------------------------------
    // Create / read
    // ------------------------------------------------------------------

    /// Insert a validated record and return its new id.
    ///
    /// Fails with `DuplicateKey` if the MAC address is already stored.
    pub fn create(&self, record: &ValidatedRecord) -> Result<i64> {
        let id = insert_row(&self.conn, record, Utc::now())?;
        tracing::info!(
            "DB TRANSACTION: add_secret id={id} device_name='{}' owner='{}' mac_address='{}' secret_value='{}'",
            record.device_name(),
            record.owner(),
            redact_value(Field::MacAddress, record.mac_address().as_str()),
            redact_value(Field::SecretValue, record.secret_value().unwrap_or_default()),
        );
        Ok(id)
    }

    pub fn get(&self, id: i64) -> Result<SecretRecord> {
        self.conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM secrets WHERE id = ?1"),
                [id],
                row_to_record,
            )
            .optional()
            .map_err(db_err)?
            .ok_or_else(|| StorDbError::NotFound(format!("with id {id}")))
    }

    /// Look a record up by MAC address, in any accepted spelling.
    pub fn find_by_mac(&self, mac: &str) -> Result<SecretRecord> {
        let mac = parse_mac(mac).ok_or_else(|| ValidationError::new(vec![FieldIssue::InvalidMac]))?;
        self.find_by_canonical_mac(&mac)?
            .ok_or_else(|| StorDbError::NotFound("for the given MAC address".into()))
    }

    fn find_by_canonical_mac(&self, mac: &MacAddress) -> Result<Option<SecretRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM secrets WHERE mac_address = ?1"),
                [mac.as_str()],
                row_to_record,
            )
            .optional()
            .map_err(db_err)
    }

    /// All records whose owner or device name equals `value`, by id.
    pub fn find_by(&self, field: LookupField, value: &str) -> Result<Vec<SecretRecord>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM secrets WHERE {} = ?1 ORDER BY id ASC",
            field.column()
        );
        self.query_records(&sql, [value])
    }

    /// Every record, by id ascending.
    pub fn list_all(&self) -> Result<Vec<SecretRecord>> {
        self.query_records(&format!("SELECT {COLUMNS} FROM secrets ORDER BY id ASC"), rusqlite::params![])
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM secrets", [], |row| row.get(0))
            .map_err(db_err)?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    fn query_records<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<SecretRecord>> {
        let mut stmt = self.conn.prepare(sql).map_err(db_err)?;
        let rows = stmt.query_map(params, row_to_record).map_err(db_err)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(db_err)?);
        }
        Ok(records)
    }

    // ------------------------------------------------------------------
    // Update / delete
    // ------------------------------------------------------------------

    /// Apply `field=value` changes to one record.
    ///
    /// Field names go through the same loose matching as import headers;
    /// an unknown name fails the whole update. The merged record is
    /// re-validated, so blanking a required field or supplying a bad MAC
    /// is rejected. An empty value clears an optional field.
    pub fn update(&self, id: i64, changes: &[(String, String)]) -> Result<SecretRecord> {
        let mut parsed = Vec::with_capacity(changes.len());
        let mut unknown = Vec::new();
        for (name, value) in changes {
            match Field::from_name(name) {
                Some(field) => parsed.push((field, value.as_str())),
                None => unknown.push(FieldIssue::Unknown(name.clone())),
            }
        }
        if !unknown.is_empty() {
            return Err(ValidationError::new(unknown).into());
        }

        let tx = self.conn.unchecked_transaction().map_err(db_err)?;

        let current = tx
            .query_row(
                &format!("SELECT {COLUMNS} FROM secrets WHERE id = ?1"),
                [id],
                row_to_record,
            )
            .optional()
            .map_err(db_err)?
            .ok_or_else(|| StorDbError::NotFound(format!("with id {id}")))?;

        let mut fields = current.to_fields();
        for (field, value) in &parsed {
            fields.set(*field, Some((*value).to_string()));
        }
        let merged = validate(&fields)?;

        write_row(&tx, id, &merged, Utc::now())?;
        tx.commit().map_err(db_err)?;

        let safe: Vec<String> = parsed
            .iter()
            .map(|(field, value)| format!("{field}='{}'", redact_value(*field, value)))
            .collect();
        tracing::info!("DB TRANSACTION: update_secret id={id} updates=[{}]", safe.join(", "));

        self.get(id)
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM secrets WHERE id = ?1", [id])
            .map_err(db_err)?;
        if removed == 0 {
            return Err(StorDbError::NotFound(format!("with id {id}")));
        }
        tracing::info!("DB TRANSACTION: delete_secret id={id}");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Bulk
    // ------------------------------------------------------------------

    /// Insert many records in one transaction, resolving MAC collisions
    /// with `policy`. Either every record is applied or none is.
    pub fn merge(&self, records: &[ValidatedRecord], policy: CollisionPolicy) -> Result<MergeReport> {
        let tx = self.conn.unchecked_transaction().map_err(db_err)?;
        let now = Utc::now();
        let mut report = MergeReport::default();

        for record in records {
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT id FROM secrets WHERE mac_address = ?1",
                    [record.mac_address().as_str()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(db_err)?;

            match (existing, policy) {
                (None, _) => {
                    insert_row(&tx, record, now)?;
                    report.inserted += 1;
                }
                (Some(_), CollisionPolicy::Skip) => report.skipped += 1,
                (Some(id), CollisionPolicy::Overwrite) => {
                    write_row(&tx, id, record, now)?;
                    report.overwritten += 1;
                }
            }
        }

        tx.commit().map_err(db_err)?;
        tracing::info!(
            "DB TRANSACTION: merge inserted={} skipped={} overwritten={} policy={policy:?}",
            report.inserted,
            report.skipped,
            report.overwritten
        );
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Backup / restore
    // ------------------------------------------------------------------

    /// Write a consistent copy of the database to `dest`.
    pub fn backup_to(&self, dest: &Path) -> Result<()> {
        if dest.exists() {
            return Err(StorDbError::CommandFailed(format!(
                "backup target {} already exists",
                dest.display()
            )));
        }
        self.conn
            .execute("VACUUM INTO ?1", [dest.to_string_lossy().into_owned()])
            .map_err(db_err)?;
        tracing::info!("DB BACKUP: -> {}", dest.display());
        Ok(())
    }

    /// Replace the database at `db_path` with the backup at `backup`.
    ///
    /// The backup must open as a stordb database. The copy lands next to
    /// the target and is renamed over it.
    pub fn restore_from(backup: &Path, db_path: &Path) -> Result<()> {
        if !backup.exists() {
            return Err(StorDbError::NotFound(format!(
                "at backup path {}",
                backup.display()
            )));
        }

        let probe = Connection::open_with_flags(backup, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(db_err)?;
        let has_table: bool = probe
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'secrets'",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|n| n == 1)
            .unwrap_or(false);
        drop(probe);
        if !has_table {
            return Err(StorDbError::CommandFailed(format!(
                "{} is not a stordb database",
                backup.display()
            )));
        }

        let parent = db_path.parent().unwrap_or(Path::new("."));
        let tmp_path = parent.join(format!(
            ".{}.restore",
            db_path.file_name().unwrap_or_default().to_string_lossy()
        ));
        fs::copy(backup, &tmp_path)?;
        fs::rename(&tmp_path, db_path)?;

        tracing::info!("DB RESTORE: {} -> {}", backup.display(), db_path.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row helpers (shared by plain calls and transactions)
// ---------------------------------------------------------------------------

fn insert_row(conn: &Connection, record: &ValidatedRecord, now: DateTime<Utc>) -> Result<i64> {
    let ts = now.to_rfc3339();
    conn.execute(
        "INSERT INTO secrets (owner, device_name, mac_address, secret_value, description, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        rusqlite::params![
            record.owner(),
            record.device_name(),
            record.mac_address().as_str(),
            record.secret_value(),
            record.description(),
            ts,
        ],
    )
    .map_err(write_err)?;
    Ok(conn.last_insert_rowid())
}

fn write_row(conn: &Connection, id: i64, record: &ValidatedRecord, now: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE secrets
         SET owner = ?1, device_name = ?2, mac_address = ?3, secret_value = ?4,
             description = ?5, updated_at = ?6
         WHERE id = ?7",
        rusqlite::params![
            record.owner(),
            record.device_name(),
            record.mac_address().as_str(),
            record.secret_value(),
            record.description(),
            now.to_rfc3339(),
            id,
        ],
    )
    .map_err(write_err)?;
    Ok(())
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<SecretRecord> {
    Ok(SecretRecord {
        id: row.get(0)?,
        owner: row.get(1)?,
        device_name: row.get(2)?,
        mac_address: MacAddress::from_canonical(row.get(3)?),
        secret_value: row.get(4)?,
        description: row.get(5)?,
        created_at: parse_timestamp(row, 6)?,
        updated_at: parse_timestamp(row, 7)?,
    })
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn db_err(e: rusqlite::Error) -> StorDbError {
    StorDbError::Database(e.to_string())
}

/// The only constraint a validated write can break is the MAC index.
fn write_err(e: rusqlite::Error) -> StorDbError {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorDbError::DuplicateKey
        }
        _ => db_err(e),
    }
}
