//! `stordb --init`: create the database and its schema.

use crate::cli::output;
use crate::cli::{db_path, open_store, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `--init` command. Safe to run on an existing database.
pub fn execute(cli: &Cli, settings: &Settings) -> Result<()> {
    let path = db_path(cli, settings);
    let existed = path.exists();

    let store = open_store(cli, settings)?;

    if existed {
        output::info(&format!(
            "Database {} already initialised ({} record(s))",
            path.display(),
            store.count()?
        ));
    } else {
        output::success(&format!("Database created at {}", path.display()));
        output::tip("Run `stordb --add MAC NAME OWNER DESC` to add your first record.");
    }
    Ok(())
}
