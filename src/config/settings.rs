use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::Argon2Params;
use crate::errors::{Result, StorDbError};
use crate::store::CollisionPolicy;

/// Default scratch directory name, created next to the database.
pub const SCRATCH_DIR_NAME: &str = ".stordb-scratch";

/// Which cipher backs `--export-vault` / `--import-vault`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CipherKind {
    /// Shell out to `vault_tool` (ansible-vault compatible).
    #[default]
    AnsibleVault,
    /// In-process AES-256-GCM with an Argon2id key.
    Native,
}

/// Project-level configuration, loaded from `.stordb.toml`.
///
/// Every field has a default, so stordb works without a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Vault file used when `--export-vault` / `--import-vault` get no path.
    #[serde(default = "default_vault_path")]
    pub vault_path: PathBuf,

    /// Append-only log file (ignored with `--debug`, which logs to stdout).
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,

    #[serde(default)]
    pub cipher: CipherKind,

    /// Executable used by the ansible-vault cipher.
    #[serde(default = "default_vault_tool")]
    pub vault_tool: PathBuf,

    /// Seconds before a running vault tool is killed.
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// What vault import does with a MAC address that is already stored.
    #[serde(default)]
    pub collision_policy: CollisionPolicy,

    /// Where plaintext intermediates may briefly live (default: `.stordb-scratch/` beside the database).
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,

    /// Argon2 memory cost in KiB for the native cipher (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_db_path() -> PathBuf {
    PathBuf::from("stordb.sqlite3")
}

fn default_vault_path() -> PathBuf {
    PathBuf::from("vault.ansible")
}

fn default_log_file() -> PathBuf {
    PathBuf::from("stordb.log")
}

fn default_vault_tool() -> PathBuf {
    PathBuf::from("ansible-vault")
}

fn default_tool_timeout_secs() -> u64 {
    120
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            vault_path: default_vault_path(),
            log_file: default_log_file(),
            cipher: CipherKind::default(),
            vault_tool: default_vault_tool(),
            tool_timeout_secs: default_tool_timeout_secs(),
            collision_policy: CollisionPolicy::default(),
            scratch_dir: None,
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the working directory.
    pub const FILE_NAME: &'static str = ".stordb.toml";

    /// Load settings from `<project_dir>/.stordb.toml`, then apply
    /// `STORDB_DB_PATH` / `STORDB_VAULT_PATH` from the environment.
    ///
    /// A missing file means defaults; an unparsable one is an error.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        let mut settings = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            toml::from_str(&contents).map_err(|e| {
                StorDbError::Config(format!("Failed to parse {}: {e}", config_path.display()))
            })?
        } else {
            Self::default()
        };

        settings.apply_overrides(|name| std::env::var_os(name).map(PathBuf::from));
        settings.check()?;
        Ok(settings)
    }

    /// Override paths from `lookup` (the process environment in `load`).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<PathBuf>) {
        if let Some(path) = lookup("STORDB_DB_PATH").filter(|p| !p.as_os_str().is_empty()) {
            self.db_path = path;
        }
        if let Some(path) = lookup("STORDB_VAULT_PATH").filter(|p| !p.as_os_str().is_empty()) {
            self.vault_path = path;
        }
    }

    fn check(&self) -> Result<()> {
        if self.tool_timeout_secs == 0 {
            return Err(StorDbError::Config(
                "tool_timeout_secs must be at least 1".into(),
            ));
        }
        if self.cipher == CipherKind::Native {
            self.argon2_params().check()?;
        }
        Ok(())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Directory for plaintext intermediates: the configured one, else
    /// `.stordb-scratch/` beside the database, so runs against different
    /// databases (or by different users) never share leftovers.
    pub fn scratch_dir(&self, db_path: &Path) -> PathBuf {
        if let Some(dir) = &self.scratch_dir {
            return dir.clone();
        }
        match db_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(SCRATCH_DIR_NAME),
            _ => PathBuf::from(SCRATCH_DIR_NAME),
        }
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
