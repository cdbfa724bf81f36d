//! `stordb --export-vault [FILE]` / `--import-vault [FILE]`.

use std::path::{Path, PathBuf};

use crate::cli::output;
use crate::cli::{open_store, prompt_new_password, prompt_password, vault_bridge, Cli};
use crate::config::Settings;
use crate::errors::Result;

fn resolve(path: Option<&Path>, settings: &Settings) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| settings.vault_path.clone())
}

/// Execute `--export-vault`.
pub fn export(cli: &Cli, settings: &Settings, path: Option<&Path>) -> Result<()> {
    let vault = resolve(path, settings);
    let store = open_store(cli, settings)?;
    let password = prompt_new_password()?;

    let count = vault_bridge(cli, settings).export(&store, &vault, &password)?;

    output::success(&format!(
        "Exported {count} record(s) to {}",
        vault.display()
    ));
    Ok(())
}

/// Execute `--import-vault`. `--on-collision` wins over the configured policy.
pub fn import(cli: &Cli, settings: &Settings, path: Option<&Path>) -> Result<()> {
    let vault = resolve(path, settings);
    let store = open_store(cli, settings)?;
    let policy = cli.on_collision.unwrap_or(settings.collision_policy);
    let password = prompt_password()?;

    let report = vault_bridge(cli, settings).import(&store, &vault, &password, policy)?;

    output::print_vault_report(&report);
    Ok(())
}
