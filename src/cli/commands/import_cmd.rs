//! `stordb --import-csv FILE` / `--import-json FILE`: bulk import.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::cli::output;
use crate::cli::{open_store, Cli};
use crate::config::Settings;
use crate::errors::{Result, StorDbError};
use crate::import::{import_csv, import_json};

/// Source format of a bulk import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Csv,
    Json,
}

/// Execute an import. Rejected rows make the command exit non-zero
/// after the accepted rows are committed.
pub fn execute(cli: &Cli, settings: &Settings, source: &Path, format: Format) -> Result<()> {
    if !source.exists() {
        return Err(StorDbError::NotFound(format!(
            "at import path {}",
            source.display()
        )));
    }

    let store = open_store(cli, settings)?;
    let reader = BufReader::new(File::open(source)?);

    let report = match format {
        Format::Csv => import_csv(&store, reader)?,
        Format::Json => import_json(&store, reader)?,
    };

    output::print_import_report(&report);
    report.into_result().map(|_| ())
}
