//! `stordb --lookup MAC`: show one record.

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::record::Redact;

/// Execute the `--lookup` command.
pub fn execute(cli: &Cli, settings: &Settings, mac: &str) -> Result<()> {
    let store = open_store(cli, settings)?;
    let record = store.find_by_mac(mac)?;
    output::print_records(&[record.redacted()], cli.json)
}
