//! `stordb --list`, `--owner OWNER`, `--device NAME`: show records.

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::config::Settings;
use crate::errors::{Result, StorDbError};
use crate::record::redact::redact_many;
use crate::store::LookupField;

/// Execute `--list` (no filter) or `--owner` / `--device` (filtered).
///
/// An empty filtered result is `NotFound`; an empty `--list` is not.
pub fn execute(cli: &Cli, settings: &Settings, filter: Option<(LookupField, &str)>) -> Result<()> {
    let store = open_store(cli, settings)?;

    let records = match filter {
        None => store.list_all()?,
        Some((field, value)) => {
            let found = store.find_by(field, value)?;
            if found.is_empty() {
                let what = match field {
                    LookupField::Owner => "owner",
                    LookupField::DeviceName => "device name",
                };
                return Err(StorDbError::NotFound(format!("with {what} '{value}'")));
            }
            found
        }
    };

    if !cli.json && filter.is_none() {
        output::info(&format!("{} record(s)", records.len()));
    }
    output::print_records(&redact_many(&records), cli.json)
}
