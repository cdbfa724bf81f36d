//! `stordb --backup-db [PATH]` / `--restore-db PATH`.

use std::path::{Path, PathBuf};

use chrono::Local;

use crate::cli::output;
use crate::cli::{db_path, open_store, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::store::RecordStore;

/// Default backup name: `<db>.backup_<YYYYmmdd_HHMMSS>` next to the database.
pub fn default_backup_path(db: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let mut name = db.as_os_str().to_os_string();
    name.push(format!(".backup_{stamp}"));
    PathBuf::from(name)
}

/// Execute `--backup-db`.
pub fn backup(cli: &Cli, settings: &Settings, dest: Option<&Path>) -> Result<()> {
    let db = db_path(cli, settings);
    let dest = dest
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_backup_path(&db));

    let store = open_store(cli, settings)?;
    store.backup_to(&dest)?;

    output::success(&format!("Database backed up to {}", dest.display()));
    Ok(())
}

/// Execute `--restore-db`.
pub fn restore(cli: &Cli, settings: &Settings, source: &Path) -> Result<()> {
    let db = db_path(cli, settings);
    RecordStore::restore_from(source, &db)?;

    output::success(&format!(
        "Database {} restored from {}",
        db.display(),
        source.display()
    ));
    Ok(())
}
