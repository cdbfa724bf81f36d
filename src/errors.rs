use thiserror::Error;

use crate::record::validate::ValidationError;

/// Exit code for general failures (IO, database, config).
pub const EXIT_FAILURE: i32 = 1;
/// Exit code for rejected input on a single-record operation.
pub const EXIT_INVALID: i32 = 3;
/// Exit code for lookups that matched nothing.
pub const EXIT_NOT_FOUND: i32 = 4;
/// Exit code for a bulk import aborted before any row was processed.
pub const EXIT_STRUCTURAL: i32 = 5;
/// Exit code for a bulk import that committed some rows and rejected others.
pub const EXIT_PARTIAL: i32 = 6;
/// Exit code for external vault tool / cipher failures.
pub const EXIT_VAULT_TOOL: i32 = 7;

/// All errors that can occur in stordb.
///
/// Messages never carry a stored `secret_value` or a stored MAC address.
#[derive(Debug, Error)]
pub enum StorDbError {
    // --- Record errors ---
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("A record with this MAC address already exists")]
    DuplicateKey,

    #[error("No record found {0}")]
    NotFound(String),

    // --- Import errors ---
    #[error("Import aborted: {0}")]
    StructuralImport(String),

    #[error("{rejected} row(s) rejected, {accepted} accepted")]
    PartialImport { accepted: usize, rejected: usize },

    // --- Vault errors ---
    #[error("Vault tool error: {0}")]
    VaultTool(String),

    // --- Storage errors ---
    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    Config(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,
}

impl StorDbError {
    /// Process exit code for this error class.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) | Self::DuplicateKey => EXIT_INVALID,
            Self::NotFound(_) => EXIT_NOT_FOUND,
            Self::StructuralImport(_) => EXIT_STRUCTURAL,
            Self::PartialImport { .. } => EXIT_PARTIAL,
            Self::VaultTool(_) => EXIT_VAULT_TOOL,
            Self::Database(_)
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Config(_)
            | Self::CommandFailed(_)
            | Self::UserCancelled => EXIT_FAILURE,
        }
    }
}

/// Convenience type alias for stordb results.
pub type Result<T> = std::result::Result<T, StorDbError>;
