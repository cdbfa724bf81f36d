//! Password-based key derivation using Argon2id.
//!
//! Cost parameters come from `Settings` and are stored in the vault
//! header, so a vault written under one configuration still opens after
//! the configuration changes.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::errors::{Result, StorDbError};

/// Length of the salt in bytes.
pub const SALT_LEN: usize = 32;

/// Length of the derived key in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Minimum memory cost in KiB (8 MB).
const MIN_MEMORY_KIB: u32 = 8_192;

/// Maximum memory cost in KiB (1 GiB).
pub const MAX_MEMORY_KIB: u32 = 1_048_576;

/// Maximum iteration count.
pub const MAX_ITERATIONS: u32 = 64;

/// Maximum parallelism lanes.
pub const MAX_PARALLELISM: u32 = 64;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Params {
    /// Memory cost in KiB (default: 65 536 = 64 MB).
    pub memory_kib: u32,
    /// Number of iterations (default: 3).
    pub iterations: u32,
    /// Parallelism lanes (default: 4).
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl Argon2Params {
    /// Reject settings too weak to be worth encrypting with, or too
    /// expensive to derive on an ordinary machine.
    pub fn check(&self) -> Result<()> {
        match self.out_of_range() {
            Some(reason) => Err(StorDbError::Config(format!("argon2_{reason}"))),
            None => Ok(()),
        }
    }

    /// Describe the first cost outside the accepted range, if any.
    ///
    /// Vault headers are checked with this before any key derivation, so
    /// a tampered header cannot ask for gigabytes of memory.
    pub fn out_of_range(&self) -> Option<String> {
        if !(MIN_MEMORY_KIB..=MAX_MEMORY_KIB).contains(&self.memory_kib) {
            return Some(format!(
                "memory_kib must be between {MIN_MEMORY_KIB} and {MAX_MEMORY_KIB} (got {})",
                self.memory_kib
            ));
        }
        if !(1..=MAX_ITERATIONS).contains(&self.iterations) {
            return Some(format!(
                "iterations must be between 1 and {MAX_ITERATIONS} (got {})",
                self.iterations
            ));
        }
        if !(1..=MAX_PARALLELISM).contains(&self.parallelism) {
            return Some(format!(
                "parallelism must be between 1 and {MAX_PARALLELISM} (got {})",
                self.parallelism
            ));
        }
        None
    }
}

/// Derive a 32-byte key from a password and salt.
///
/// The same password, salt, and params always give the same key.
pub fn derive_key(
    password: &[u8],
    salt: &[u8],
    argon2_params: &Argon2Params,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    argon2_params.check()?;

    let params = Params::new(
        argon2_params.memory_kib,
        argon2_params.iterations,
        argon2_params.parallelism,
        Some(KEY_LEN),
    )
    .map_err(|e| StorDbError::VaultTool(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password, salt, &mut key[..])
        .map_err(|e| StorDbError::VaultTool(format!("key derivation failed: {e}")))?;

    Ok(key)
}

/// Generate a random salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}
