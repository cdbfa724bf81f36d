//! Candidate validation shared by every entry point.
//!
//! CLI `--add`, `--update`, CSV rows, JSON objects, and vault snapshots
//! all go through `validate`. The store only accepts a `ValidatedRecord`,
//! which nothing else can construct.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use super::{Field, MacAddress, RecordFields};

/// Six hex octets, all separated by `:` or all by `-`.
const MAC_PATTERN: &str =
    r"^(?:[0-9A-Fa-f]{2}(?::[0-9A-Fa-f]{2}){5}|[0-9A-Fa-f]{2}(?:-[0-9A-Fa-f]{2}){5})$";

fn mac_regex() -> &'static Regex {
    static MAC_RE: OnceLock<Regex> = OnceLock::new();
    MAC_RE.get_or_init(|| Regex::new(MAC_PATTERN).expect("MAC pattern is a valid regex"))
}

/// Parse a MAC address into canonical upper-case, colon-separated form.
///
/// Returns `None` for anything that is not six hex octets; nothing is
/// coerced (no padding, no separator guessing).
pub fn parse_mac(raw: &str) -> Option<MacAddress> {
    let trimmed = raw.trim();
    if !mac_regex().is_match(trimmed) {
        return None;
    }
    let canonical = trimmed.replace('-', ":").to_ascii_uppercase();
    Some(MacAddress::from_canonical(canonical))
}

/// One problem found with a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldIssue {
    /// A required field is absent or blank.
    Missing(Field),
    /// The MAC address is not six hex octets.
    InvalidMac,
    /// An update named a field that does not exist.
    Unknown(String),
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldIssue::Missing(field) => write!(f, "{field} is required"),
            FieldIssue::InvalidMac => f.write_str(
                "invalid MAC format for mac_address (expected six hex octets separated by ':' or '-')",
            ),
            FieldIssue::Unknown(name) => write!(f, "unknown field '{name}'"),
        }
    }
}

/// All issues found with one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<FieldIssue>) -> Self {
        Self { issues }
    }

    #[cfg(test)]
    fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    /// Names of the offending fields, in the order they were found.
    #[cfg(test)]
    fn field_names(&self) -> Vec<String> {
        self.issues
            .iter()
            .map(|issue| match issue {
                FieldIssue::Missing(field) => field.name().to_string(),
                FieldIssue::InvalidMac => Field::MacAddress.name().to_string(),
                FieldIssue::Unknown(name) => name.clone(),
            })
            .collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// A candidate that passed `validate`: required fields present and
/// trimmed, MAC canonical, blank optionals collapsed to `None`.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidatedRecord {
    owner: String,
    device_name: String,
    mac_address: MacAddress,
    secret_value: Option<String>,
    description: Option<String>,
}

impl ValidatedRecord {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn mac_address(&self) -> &MacAddress {
        &self.mac_address
    }

    pub fn secret_value(&self) -> Option<&str> {
        self.secret_value.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl fmt::Debug for ValidatedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedRecord")
            .field("owner", &self.owner)
            .field("device_name", &self.device_name)
            .field("mac_address", &self.mac_address)
            .field("secret_value", &self.secret_value.as_ref().map(|_| super::MASK))
            .field("description", &self.description)
            .finish()
    }
}

fn required(fields: &RecordFields, field: Field, issues: &mut Vec<FieldIssue>) -> String {
    match fields.get(field).map(str::trim) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => {
            issues.push(FieldIssue::Missing(field));
            String::new()
        }
    }
}

fn optional(fields: &RecordFields, field: Field) -> Option<String> {
    fields
        .get(field)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validate a candidate. Pure; reports every issue at once.
pub fn validate(fields: &RecordFields) -> Result<ValidatedRecord, ValidationError> {
    let mut issues = Vec::new();

    let owner = required(fields, Field::Owner, &mut issues);
    let device_name = required(fields, Field::DeviceName, &mut issues);
    let raw_mac = required(fields, Field::MacAddress, &mut issues);

    let mac_address = if raw_mac.is_empty() {
        None
    } else {
        let parsed = parse_mac(&raw_mac);
        if parsed.is_none() {
            issues.push(FieldIssue::InvalidMac);
        }
        parsed
    };

    match mac_address {
        Some(mac_address) if issues.is_empty() => Ok(ValidatedRecord {
            owner,
            device_name,
            mac_address,
            secret_value: optional(fields, Field::SecretValue),
            description: optional(fields, Field::Description),
        }),
        _ => Err(ValidationError::new(issues)),
    }
}
