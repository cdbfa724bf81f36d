//! JSON import: an array of objects keyed like the CSV header.

use std::io::Read;

use serde_json::{Map, Value};

use super::{ingest, ImportReport};
use crate::errors::{Result, StorDbError};
use crate::record::{Field, RecordFields};
use crate::store::RecordStore;

/// Import every object of a JSON array into `store`.
///
/// Anything other than an array of objects is a structural error and
/// nothing is imported. Per-object problems are reported by position.
pub fn import_json<R: Read>(store: &RecordStore, reader: R) -> Result<ImportReport> {
    let objects = parse_object_array(reader)?;

    let mut report = ImportReport::default();
    for (idx, object) in objects.iter().enumerate() {
        let row = idx + 1;
        match fields_from_object(object) {
            Ok(fields) => ingest(store, &mut report, row, &fields)?,
            Err(reason) => report.reject(row, reason),
        }
    }

    tracing::info!(
        "DB TRANSACTION: import_json accepted={} rejected={}",
        report.accepted,
        report.rejected.len()
    );
    Ok(report)
}

/// Parse a stream as a JSON array whose every element is an object.
pub(crate) fn parse_object_array<R: Read>(reader: R) -> Result<Vec<Map<String, Value>>> {
    let value: Value = serde_json::from_reader(reader)
        .map_err(|e| StorDbError::StructuralImport(format!("malformed JSON: {e}")))?;

    let Value::Array(items) = value else {
        return Err(StorDbError::StructuralImport(
            "expected a JSON array of record objects".into(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(map) => Ok(map),
            _ => Err(StorDbError::StructuralImport(format!(
                "element {} is not an object",
                idx + 1
            ))),
        })
        .collect()
}

/// Map one JSON object onto candidate fields.
///
/// Keys use the same loose matching as CSV headers; unknown keys are
/// dropped. Strings are taken as-is, numbers and booleans stringified,
/// `null` counts as absent. Nested arrays/objects reject the row.
pub(crate) fn fields_from_object(object: &Map<String, Value>) -> std::result::Result<RecordFields, String> {
    let mut fields = RecordFields::default();
    for (key, value) in object {
        let Some(field) = Field::from_name(key) else {
            continue;
        };
        if fields.get(field).is_some() {
            continue;
        }
        let text = match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Array(_) | Value::Object(_) => {
                return Err(format!("{field} must be a string, not a nested value"));
            }
        };
        fields.set(field, text);
    }
    Ok(fields)
}
