//! `stordb --delete ID`: remove a record.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{is_interactive, open_store, Cli};
use crate::config::Settings;
use crate::errors::{Result, StorDbError};

/// Execute the `--delete` command.
pub fn execute(cli: &Cli, settings: &Settings, id: i64) -> Result<()> {
    let store = open_store(cli, settings)?;
    let record = store.get(id)?;

    // Unless --force is set (or nobody is there to answer), confirm first.
    if !cli.force && is_interactive() {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete record {id} ('{}' owned by {})?",
                record.device_name, record.owner
            ))
            .default(false)
            .interact()
            .map_err(|e| StorDbError::CommandFailed(format!("confirm prompt: {e}")))?;
        require(confirmed)?;
    }

    store.delete(id)?;
    output::success(&format!("Deleted record {id}"));
    Ok(())
}

/// A declined confirmation aborts with `UserCancelled`.
fn require(confirmed: bool) -> Result<()> {
    if confirmed {
        Ok(())
    } else {
        Err(StorDbError::UserCancelled)
    }
}
