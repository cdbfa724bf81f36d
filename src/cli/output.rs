//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command. Record printers take only
//! `RedactedRecord`s.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::errors::{Result, StorDbError};
use crate::import::ImportReport;
use crate::record::RedactedRecord;
use crate::vault::VaultImportReport;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print records as a table, or as a JSON array with `json`.
pub fn print_records(records: &[RedactedRecord], json: bool) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(records)
            .map_err(|e| StorDbError::Serialization(e.to_string()))?;
        println!("{text}");
        return Ok(());
    }

    if records.is_empty() {
        info("No records yet.");
        tip("Run `stordb --add MAC NAME OWNER DESC` or `stordb --import-csv FILE`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "ID", "Device", "Owner", "MAC", "Secret", "Description", "Updated",
    ]);

    for r in records {
        table.add_row(vec![
            r.id.to_string(),
            r.device_name.clone(),
            r.owner.clone(),
            r.mac_address.to_string(),
            r.secret_value.unwrap_or("-").to_string(),
            r.description.clone().unwrap_or_default(),
            r.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Summarise a bulk import, one line per rejected row.
pub fn print_import_report(report: &ImportReport) {
    if report.accepted > 0 {
        success(&format!("Imported {} record(s)", report.accepted));
    } else {
        info("No records imported.");
    }
    for rejection in &report.rejected {
        warning(&format!("Row {}: {}", rejection.row, rejection.reason));
    }
}

/// Summarise a vault import.
pub fn print_vault_report(report: &VaultImportReport) {
    success(&format!(
        "Vault imported: {} inserted, {} skipped, {} overwritten",
        report.inserted, report.skipped, report.overwritten
    ));
    if report.skipped > 0 {
        tip("Use `--on-collision overwrite` to replace records whose MAC address is already stored.");
    }
}
