//! Bulk import from CSV and JSON.
//!
//! Both formats map their column/key names onto `Field`s, build a
//! `RecordFields` per row, and push it through `validate` and
//! `RecordStore::create`. A bad row is recorded and skipped; only a
//! broken container (missing required column, non-array JSON) aborts.

mod csv_import;
mod json_import;

pub use csv_import::import_csv;
pub use json_import::import_json;
pub(crate) use json_import::{fields_from_object, parse_object_array};

use crate::errors::{Result, StorDbError};
use crate::record::{validate, RecordFields};
use crate::store::RecordStore;

/// Why one row was not imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    /// 1-based data row (the CSV header is not counted).
    pub row: usize,
    pub reason: String,
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub accepted: usize,
    pub rejected: Vec<RowRejection>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }

    fn reject(&mut self, row: usize, reason: String) {
        tracing::warn!("import row {row} rejected: {reason}");
        self.rejected.push(RowRejection { row, reason });
    }

    /// Turn a report with rejections into `PartialImport` for exit-code purposes.
    pub fn into_result(self) -> Result<Self> {
        if self.is_clean() {
            Ok(self)
        } else {
            Err(StorDbError::PartialImport {
                accepted: self.accepted,
                rejected: self.rejected.len(),
            })
        }
    }
}

/// Validate and store one candidate row, recording the outcome.
///
/// Record-level failures land in the report; anything else (a broken
/// database) propagates and stops the batch.
fn ingest(store: &RecordStore, report: &mut ImportReport, row: usize, fields: &RecordFields) -> Result<()> {
    let record = match validate(fields) {
        Ok(record) => record,
        Err(e) => {
            report.reject(row, e.to_string());
            return Ok(());
        }
    };

    match store.create(&record) {
        Ok(_) => {
            report.accepted += 1;
            Ok(())
        }
        Err(e @ (StorDbError::DuplicateKey | StorDbError::Validation(_))) => {
            report.reject(row, e.to_string());
            Ok(())
        }
        Err(e) => Err(e),
    }
}
