//! Redacted views of records.
//!
//! `RedactedRecord` is the only record type the output helpers and log
//! lines accept. Building one masks `mac_address` and `secret_value`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Field, SecretRecord};

/// Fixed token that replaces sensitive values.
pub const MASK: &str = "[REDACTED]";

/// A record with its sensitive fields masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedactedRecord {
    pub id: i64,
    pub owner: String,
    pub device_name: String,
    pub mac_address: &'static str,
    /// `Some(MASK)` when the record holds a secret, `None` otherwise.
    pub secret_value: Option<&'static str>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for RedactedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={} device_name='{}' owner='{}' mac_address='{}' secret_value='{}'",
            self.id,
            self.device_name,
            self.owner,
            self.mac_address,
            self.secret_value.unwrap_or("")
        )?;
        if let Some(desc) = &self.description {
            write!(f, " description='{desc}'")?;
        }
        Ok(())
    }
}

/// Anything that can produce a redacted view of itself.
pub trait Redact {
    fn redacted(&self) -> RedactedRecord;
}

impl Redact for SecretRecord {
    fn redacted(&self) -> RedactedRecord {
        RedactedRecord {
            id: self.id,
            owner: self.owner.clone(),
            device_name: self.device_name.clone(),
            mac_address: MASK,
            secret_value: self.secret_value.as_ref().map(|_| MASK),
            description: self.description.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl Redact for RedactedRecord {
    fn redacted(&self) -> RedactedRecord {
        self.clone()
    }
}

/// Redact each record in order.
pub fn redact_many<R: Redact>(records: &[R]) -> Vec<RedactedRecord> {
    records.iter().map(Redact::redacted).collect()
}

/// Value of one field change as it may appear in logs or output.
pub fn redact_value(field: Field, value: &str) -> &str {
    if field.is_sensitive() {
        MASK
    } else {
        value
    }
}
