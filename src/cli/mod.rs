//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::io::{self, BufRead, IsTerminal};
use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use zeroize::Zeroizing;

use crate::config::{CipherKind, Settings};
use crate::errors::{Result, StorDbError};
use crate::store::{CollisionPolicy, RecordStore};
use crate::vault::{ExternalToolCipher, NativeCipher, VaultBridge, DEFAULT_STALE_AFTER};

/// Environment variable consulted before prompting for the vault password.
pub const PASSWORD_ENV: &str = "VAULT_PASSWORD";

/// stordb CLI: local hardware & secrets catalog.
#[derive(Parser, Debug)]
#[command(
    name = "stordb",
    about = "Local hardware & secrets catalog with encrypted vault export",
    version
)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args([
            "init", "add", "lookup", "owner", "device", "list", "update", "delete",
            "import_csv", "import_json", "export_vault", "import_vault", "backup_db", "restore_db",
        ])
))]
pub struct Cli {
    /// Create the database and its schema
    #[arg(long)]
    pub init: bool,

    /// Add a record
    #[arg(long, num_args = 4, value_names = ["MAC", "NAME", "OWNER", "DESC"])]
    pub add: Option<Vec<String>>,

    /// With --add: read a secret value from stdin (or a hidden prompt)
    #[arg(long, requires = "add")]
    pub secret: bool,

    /// Show the record with this MAC address
    #[arg(long, value_name = "MAC")]
    pub lookup: Option<String>,

    /// Show every record owned by OWNER
    #[arg(long, value_name = "OWNER")]
    pub owner: Option<String>,

    /// Show every record with this device name
    #[arg(long, value_name = "NAME")]
    pub device: Option<String>,

    /// Show all records
    #[arg(long)]
    pub list: bool,

    /// Change fields of a record: --update ID field=value [field=value ...]
    #[arg(long, num_args = 2.., value_names = ["ID", "FIELD=VALUE"])]
    pub update: Option<Vec<String>>,

    /// Delete the record with this id
    #[arg(long, value_name = "ID")]
    pub delete: Option<i64>,

    /// With --delete: skip the confirmation prompt
    #[arg(short, long, requires = "delete")]
    pub force: bool,

    /// Import records from a CSV file
    #[arg(long, value_name = "FILE")]
    pub import_csv: Option<PathBuf>,

    /// Import records from a JSON array
    #[arg(long, value_name = "FILE")]
    pub import_json: Option<PathBuf>,

    /// Encrypt every record into a vault file (default from config)
    #[arg(long, value_name = "FILE", num_args = 0..=1)]
    pub export_vault: Option<Option<PathBuf>>,

    /// Merge records from a vault file (default from config)
    #[arg(long, value_name = "FILE", num_args = 0..=1)]
    pub import_vault: Option<Option<PathBuf>>,

    /// Copy the database to PATH (default: <db>.backup_<timestamp>)
    #[arg(long, value_name = "PATH", num_args = 0..=1)]
    pub backup_db: Option<Option<PathBuf>>,

    /// Replace the database with a backup
    #[arg(long, value_name = "PATH")]
    pub restore_db: Option<PathBuf>,

    /// Database file (overrides `db_path` in .stordb.toml)
    #[arg(long, env = "STORDB_DB_PATH", value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Print records as (redacted) JSON
    #[arg(long)]
    pub json: bool,

    /// Log to stdout at debug level instead of the log file
    #[arg(long)]
    pub debug: bool,

    /// With --import-vault: what to do with MAC addresses already stored
    #[arg(long, value_enum, value_name = "POLICY")]
    pub on_collision: Option<CollisionPolicy>,
}

/// The one action requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Init,
    Add {
        mac: String,
        name: String,
        owner: String,
        description: String,
    },
    Lookup(String),
    Owner(String),
    Device(String),
    List,
    Update {
        id: i64,
        changes: Vec<(String, String)>,
    },
    Delete(i64),
    ImportCsv(PathBuf),
    ImportJson(PathBuf),
    ExportVault(Option<PathBuf>),
    ImportVault(Option<PathBuf>),
    BackupDb(Option<PathBuf>),
    RestoreDb(PathBuf),
}

impl Action {
    /// The flag that selected this action, for `UI ACTION` log lines.
    /// Arguments are left out; some of them are sensitive.
    pub fn flag(&self) -> &'static str {
        match self {
            Action::Init => "--init",
            Action::Add { .. } => "--add",
            Action::Lookup(_) => "--lookup",
            Action::Owner(_) => "--owner",
            Action::Device(_) => "--device",
            Action::List => "--list",
            Action::Update { .. } => "--update",
            Action::Delete(_) => "--delete",
            Action::ImportCsv(_) => "--import-csv",
            Action::ImportJson(_) => "--import-json",
            Action::ExportVault(_) => "--export-vault",
            Action::ImportVault(_) => "--import-vault",
            Action::BackupDb(_) => "--backup-db",
            Action::RestoreDb(_) => "--restore-db",
        }
    }
}

impl Cli {
    /// Resolve the parsed flags into a single `Action`.
    ///
    /// Clap's `action` group guarantees exactly one is present.
    pub fn action(&self) -> Result<Action> {
        if self.init {
            return Ok(Action::Init);
        }
        if let Some(args) = &self.add {
            let [mac, name, owner, description] = args.as_slice() else {
                return Err(StorDbError::CommandFailed(
                    "--add takes MAC NAME OWNER DESC".into(),
                ));
            };
            return Ok(Action::Add {
                mac: mac.clone(),
                name: name.clone(),
                owner: owner.clone(),
                description: description.clone(),
            });
        }
        if let Some(mac) = &self.lookup {
            return Ok(Action::Lookup(mac.clone()));
        }
        if let Some(owner) = &self.owner {
            return Ok(Action::Owner(owner.clone()));
        }
        if let Some(device) = &self.device {
            return Ok(Action::Device(device.clone()));
        }
        if self.list {
            return Ok(Action::List);
        }
        if let Some(args) = &self.update {
            return parse_update(args);
        }
        if let Some(id) = self.delete {
            return Ok(Action::Delete(id));
        }
        if let Some(path) = &self.import_csv {
            return Ok(Action::ImportCsv(path.clone()));
        }
        if let Some(path) = &self.import_json {
            return Ok(Action::ImportJson(path.clone()));
        }
        if let Some(path) = &self.export_vault {
            return Ok(Action::ExportVault(path.clone()));
        }
        if let Some(path) = &self.import_vault {
            return Ok(Action::ImportVault(path.clone()));
        }
        if let Some(path) = &self.backup_db {
            return Ok(Action::BackupDb(path.clone()));
        }
        if let Some(path) = &self.restore_db {
            return Ok(Action::RestoreDb(path.clone()));
        }
        Err(StorDbError::CommandFailed("no action given".into()))
    }
}

fn parse_update(args: &[String]) -> Result<Action> {
    let Some((raw_id, assignments)) = args.split_first() else {
        return Err(StorDbError::CommandFailed(
            "--update takes ID FIELD=VALUE".into(),
        ));
    };
    let id = raw_id
        .parse::<i64>()
        .map_err(|_| StorDbError::CommandFailed(format!("invalid record id '{raw_id}'")))?;

    let mut changes = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let Some((field, value)) = assignment.split_once('=') else {
            return Err(StorDbError::CommandFailed(
                "updates must be written as field=value".into(),
            ));
        };
        changes.push((field.trim().to_string(), value.to_string()));
    }
    Ok(Action::Update { id, changes })
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Database path: `--db` / `STORDB_DB_PATH`, else the configured one.
pub fn db_path(cli: &Cli, settings: &Settings) -> PathBuf {
    cli.db.clone().unwrap_or_else(|| settings.db_path.clone())
}

/// Open (creating if needed) the record store for this invocation.
pub fn open_store(cli: &Cli, settings: &Settings) -> Result<RecordStore> {
    RecordStore::open(&db_path(cli, settings))
}

/// Build the vault bridge for the configured cipher.
pub fn vault_bridge(cli: &Cli, settings: &Settings) -> VaultBridge {
    let scratch = settings.scratch_dir(&db_path(cli, settings));
    let cipher: Box<dyn crate::vault::Cipher> = match settings.cipher {
        CipherKind::AnsibleVault => Box::new(ExternalToolCipher::new(
            settings.vault_tool.clone(),
            settings.tool_timeout(),
            &scratch,
        )),
        CipherKind::Native => Box::new(NativeCipher::new(settings.argon2_params())),
    };
    // A live plaintext file may sit in scratch for a whole tool run.
    let stale_after = DEFAULT_STALE_AFTER.max(settings.tool_timeout() * 2);
    VaultBridge::new(cipher, scratch).with_stale_after(stale_after)
}

/// Get the vault password, trying in order:
/// 1. `VAULT_PASSWORD` env var (scripts, CI)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Vault password")
        .interact()
        .map_err(|e| StorDbError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Like `prompt_password`, but an interactive prompt asks twice.
/// Used before writing a vault, where a typo would lock the data away.
pub fn prompt_new_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Vault password")
        .with_confirmation("Confirm vault password", "Passwords do not match, try again")
        .interact()
        .map_err(|e| StorDbError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

fn password_from_env() -> Option<Zeroizing<String>> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}

/// Read a secret value: the first line of piped stdin, or a hidden prompt.
pub fn read_secret() -> Result<Zeroizing<String>> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        let mut line = Zeroizing::new(String::new());
        stdin.lock().read_line(&mut line)?;
        let trimmed = line.trim_end_matches(|c| c == '\r' || c == '\n');
        return Ok(Zeroizing::new(trimmed.to_string()));
    }

    let secret = dialoguer::Password::new()
        .with_prompt("Secret value")
        .allow_empty_password(true)
        .interact()
        .map_err(|e| StorDbError::CommandFailed(format!("secret prompt: {e}")))?;
    Ok(Zeroizing::new(secret))
}

/// True when a confirmation prompt can be shown.
pub fn is_interactive() -> bool {
    io::stdin().is_terminal()
}
