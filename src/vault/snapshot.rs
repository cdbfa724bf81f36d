//! Plaintext form of a vault: the whole record set as a JSON array.
//!
//! The shape matches what `--import-json` accepts, so a decrypted vault
//! can be inspected or re-imported by hand.

use std::io::Read;

use zeroize::Zeroizing;

use crate::errors::{Result, StorDbError};
use crate::import::{fields_from_object, parse_object_array};
use crate::record::{validate, SecretRecord, ValidatedRecord};

/// Serialize every record, in store order.
pub(crate) fn serialize(records: &[SecretRecord]) -> Result<Zeroizing<Vec<u8>>> {
    serde_json::to_vec_pretty(records)
        .map(Zeroizing::new)
        .map_err(|e| StorDbError::Serialization(format!("vault snapshot: {e}")))
}

/// Parse and validate a decrypted snapshot.
///
/// A vault holds previously trusted data, so one bad record fails the
/// whole snapshot instead of being skipped.
pub(crate) fn parse<R: Read>(reader: R) -> Result<Vec<ValidatedRecord>> {
    let objects = parse_object_array(reader)?;

    objects
        .iter()
        .enumerate()
        .map(|(idx, object)| {
            let n = idx + 1;
            let fields = fields_from_object(object)
                .map_err(|reason| StorDbError::StructuralImport(format!("vault record {n}: {reason}")))?;
            validate(&fields)
                .map_err(|e| StorDbError::StructuralImport(format!("vault record {n}: {e}")))
        })
        .collect()
}
