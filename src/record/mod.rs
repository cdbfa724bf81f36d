//! Record module: the device/secret record and its candidate form.
//!
//! This module provides:
//! - `SecretRecord`, the stored row (`SecretRecord`, `MacAddress`)
//! - `RecordFields`, untrusted candidate input from the CLI, CSV, or JSON
//! - Field validation (`validate`) and output redaction (`redact`)

pub mod redact;
pub mod validate;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use redact::{Redact, RedactedRecord, MASK};
pub use validate::{validate, ValidatedRecord, ValidationError};

/// A MAC address in canonical form (`AA:BB:CC:DD:EE:01`).
///
/// Only `validate::parse_mac` builds one. `Debug` is masked so a stray
/// `{:?}` in a log line cannot leak the address.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MacAddress(String);

impl MacAddress {
    pub(crate) fn from_canonical(canonical: String) -> Self {
        Self(canonical)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({MASK})")
    }
}

/// One record as held by the store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    pub id: i64,
    pub owner: String,
    pub device_name: String,
    pub mac_address: MacAddress,
    #[serde(default)]
    pub secret_value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SecretRecord {
    /// The record's fields as a candidate, e.g. to merge an update into.
    pub fn to_fields(&self) -> RecordFields {
        RecordFields {
            owner: Some(self.owner.clone()),
            device_name: Some(self.device_name.clone()),
            mac_address: Some(self.mac_address.as_str().to_string()),
            secret_value: self.secret_value.clone(),
            description: self.description.clone(),
        }
    }

    /// True when both records carry the same user-facing fields.
    /// Ids and timestamps are store-assigned and ignored.
    pub fn same_fields(&self, other: &SecretRecord) -> bool {
        self.owner == other.owner
            && self.device_name == other.device_name
            && self.mac_address == other.mac_address
            && self.secret_value == other.secret_value
            && self.description == other.description
    }
}

impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.redacted(), f)
    }
}

/// The user-settable fields of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Owner,
    DeviceName,
    MacAddress,
    SecretValue,
    Description,
}

impl Field {
    /// Every field, in canonical column order.
    pub const ALL: [Field; 5] = [
        Field::Owner,
        Field::DeviceName,
        Field::MacAddress,
        Field::SecretValue,
        Field::Description,
    ];

    /// Fields a record cannot exist without.
    pub const REQUIRED: [Field; 3] = [Field::Owner, Field::DeviceName, Field::MacAddress];

    /// Canonical (column) name.
    pub fn name(self) -> &'static str {
        match self {
            Field::Owner => "owner",
            Field::DeviceName => "device_name",
            Field::MacAddress => "mac_address",
            Field::SecretValue => "secret_value",
            Field::Description => "description",
        }
    }

    /// Fields that must never reach a log or terminal unmasked.
    pub fn is_sensitive(self) -> bool {
        matches!(self, Field::MacAddress | Field::SecretValue)
    }

    /// Map a free-form column or key name to a field.
    ///
    /// Case-insensitive; spaces, hyphens, and repeated whitespace are
    /// treated as `_`, so "MAC Address", "mac-address", and "mac_address"
    /// all match. Returns `None` for names that map to nothing.
    pub fn from_name(raw: &str) -> Option<Field> {
        let normalized = normalize_name(raw);
        match normalized.as_str() {
            "owner" => Some(Field::Owner),
            "device_name" | "device" | "name" => Some(Field::DeviceName),
            "mac_address" | "mac" => Some(Field::MacAddress),
            "secret_value" | "secret" => Some(Field::SecretValue),
            "description" | "desc" | "notes" => Some(Field::Description),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn normalize_name(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('\u{feff}')
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}

/// Untrusted candidate input for a record.
///
/// Every entry point (CLI, CSV row, JSON object, vault snapshot) builds
/// one of these and hands it to `validate`.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct RecordFields {
    pub owner: Option<String>,
    pub device_name: Option<String>,
    pub mac_address: Option<String>,
    pub secret_value: Option<String>,
    pub description: Option<String>,
}

impl RecordFields {
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Owner => self.owner.as_deref(),
            Field::DeviceName => self.device_name.as_deref(),
            Field::MacAddress => self.mac_address.as_deref(),
            Field::SecretValue => self.secret_value.as_deref(),
            Field::Description => self.description.as_deref(),
        }
    }

    pub fn set(&mut self, field: Field, value: Option<String>) {
        let slot = match field {
            Field::Owner => &mut self.owner,
            Field::DeviceName => &mut self.device_name,
            Field::MacAddress => &mut self.mac_address,
            Field::SecretValue => &mut self.secret_value,
            Field::Description => &mut self.description,
        };
        *slot = value;
    }
}

impl fmt::Debug for RecordFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| MASK);
        f.debug_struct("RecordFields")
            .field("owner", &self.owner)
            .field("device_name", &self.device_name)
            .field("mac_address", &mask(&self.mac_address))
            .field("secret_value", &mask(&self.secret_value))
            .field("description", &self.description)
            .finish()
    }
}
