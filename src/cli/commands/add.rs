//! `stordb --add MAC NAME OWNER DESC`: add one record.

use crate::cli::output;
use crate::cli::{open_store, read_secret, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::record::{validate, RecordFields};

/// Execute the `--add` command.
///
/// With `--secret`, the secret value comes from piped stdin or a hidden
/// prompt, never from argv.
pub fn execute(
    cli: &Cli,
    settings: &Settings,
    mac: &str,
    name: &str,
    owner: &str,
    description: &str,
) -> Result<()> {
    let secret = if cli.secret { Some(read_secret()?) } else { None };

    let fields = RecordFields {
        owner: Some(owner.to_string()),
        device_name: Some(name.to_string()),
        mac_address: Some(mac.to_string()),
        secret_value: secret.as_ref().map(|s| s.to_string()),
        description: Some(description.to_string()),
    };
    let record = validate(&fields)?;

    let store = open_store(cli, settings)?;
    let id = store.create(&record)?;

    output::success(&format!("Added '{name}' for {owner} with id {id}"));
    Ok(())
}
