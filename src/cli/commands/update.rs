//! `stordb --update ID field=value ...`: change fields of one record.

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::record::Redact;

/// Execute the `--update` command.
pub fn execute(cli: &Cli, settings: &Settings, id: i64, changes: &[(String, String)]) -> Result<()> {
    let store = open_store(cli, settings)?;
    let updated = store.update(id, changes)?;

    output::success(&format!("Updated record {id}"));
    output::print_records(&[updated.redacted()], cli.json)
}
