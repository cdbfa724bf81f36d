//! CSV import.

use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};

use super::{ingest, ImportReport};
use crate::errors::{Result, StorDbError};
use crate::record::{Field, RecordFields};
use crate::store::RecordStore;

/// Import every data row of a CSV stream into `store`.
///
/// The header decides the column mapping (case and spacing are ignored,
/// unknown columns are dropped). If owner, device name, or MAC address
/// has no column, nothing is imported.
pub fn import_csv<R: Read>(store: &RecordStore, reader: R) -> Result<ImportReport> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| StorDbError::StructuralImport(format!("unreadable header row: {e}")))?
        .clone();
    let columns = map_header(&headers)?;

    let mut report = ImportReport::default();
    for (idx, result) in rdr.records().enumerate() {
        let row = idx + 1;
        match result {
            Ok(record) => {
                let fields = row_fields(&columns, &record);
                ingest(store, &mut report, row, &fields)?;
            }
            Err(e) if e.is_io_error() => return Err(StorDbError::Io(e.into())),
            Err(e) => report.reject(row, format!("unreadable row: {e}")),
        }
    }

    tracing::info!(
        "DB TRANSACTION: import_csv accepted={} rejected={}",
        report.accepted,
        report.rejected.len()
    );
    Ok(report)
}

/// Resolve each header cell to a field. The first column naming a field wins.
fn map_header(headers: &StringRecord) -> Result<Vec<Option<Field>>> {
    let mut seen = Vec::new();
    let columns: Vec<Option<Field>> = headers
        .iter()
        .map(|name| match Field::from_name(name) {
            Some(field) if !seen.contains(&field) => {
                seen.push(field);
                Some(field)
            }
            _ => None,
        })
        .collect();

    let missing: Vec<&str> = Field::REQUIRED
        .iter()
        .filter(|f| !seen.contains(f))
        .map(|f| f.name())
        .collect();
    if !missing.is_empty() {
        return Err(StorDbError::StructuralImport(format!(
            "CSV header is missing required column(s): {}",
            missing.join(", ")
        )));
    }

    Ok(columns)
}

fn row_fields(columns: &[Option<Field>], record: &StringRecord) -> RecordFields {
    let mut fields = RecordFields::default();
    for (column, value) in columns.iter().zip(record.iter()) {
        if let Some(field) = column {
            fields.set(*field, Some(value.to_string()));
        }
    }
    fields
}
