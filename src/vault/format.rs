//! Native vault envelope and atomic vault-file writes.
//!
//! A vault written by the native cipher has this layout:
//!
//! ```text
//! [SDBV: 4][version: 1][m_cost: 4 LE][t_cost: 4 LE][p_cost: 4 LE][salt: 32][nonce: 12][ciphertext + tag]
//! ```
//!
//! The Argon2 cost is stored so a vault still opens after the
//! configured cost changes. Vaults produced by the external tool are
//! opaque and only go through `write_atomic`.

use std::fs;
use std::path::Path;

use crate::crypto::{Argon2Params, NONCE_LEN, SALT_LEN};
use crate::errors::{Result, StorDbError};

/// Magic bytes at the start of every native vault.
const MAGIC: &[u8; 4] = b"SDBV";

/// Current envelope version.
pub const CURRENT_VERSION: u8 = 1;

/// Fixed-size prefix: magic + version + three u32 costs + salt.
const HEADER_LEN: usize = 4 + 1 + 12 + SALT_LEN;

/// KDF inputs recorded in the envelope header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub params: Argon2Params,
    pub salt: [u8; SALT_LEN],
}

/// Prefix `sealed` (nonce + ciphertext) with the header.
pub fn encode(header: &EnvelopeHeader, sealed: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + sealed.len());
    buf.extend_from_slice(MAGIC);
    buf.push(CURRENT_VERSION);
    buf.extend_from_slice(&header.params.memory_kib.to_le_bytes());
    buf.extend_from_slice(&header.params.iterations.to_le_bytes());
    buf.extend_from_slice(&header.params.parallelism.to_le_bytes());
    buf.extend_from_slice(&header.salt);
    buf.extend_from_slice(sealed);
    buf
}

/// Split an envelope into its header and the sealed payload.
pub fn decode(data: &[u8]) -> Result<(EnvelopeHeader, &[u8])> {
    if data.len() < HEADER_LEN + NONCE_LEN {
        return Err(invalid("file too small to be a stordb vault"));
    }
    if &data[0..4] != MAGIC {
        return Err(invalid("missing SDBV magic bytes (was it written by ansible-vault?)"));
    }
    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(invalid(&format!(
            "unsupported version {version}, expected {CURRENT_VERSION}"
        )));
    }

    let params = Argon2Params {
        memory_kib: read_u32(data, 5),
        iterations: read_u32(data, 9),
        parallelism: read_u32(data, 13),
    };
    // The header is not authenticated; refuse costs we would not write.
    if let Some(reason) = params.out_of_range() {
        return Err(invalid(&format!("Argon2 {reason}")));
    }
    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&data[17..HEADER_LEN]);

    Ok((EnvelopeHeader { params, salt }, &data[HEADER_LEN..]))
}

fn read_u32(data: &[u8], at: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[at..at + 4]);
    u32::from_le_bytes(bytes)
}

fn invalid(reason: &str) -> StorDbError {
    StorDbError::VaultTool(format!("invalid vault file: {reason}"))
}

/// Write a vault file **atomically** with owner-only permissions.
///
/// The bytes go to a temp file in the same directory, which is then
/// renamed over `path`; readers never see a half-written vault.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    let result = write_owner_only(&tmp_path, bytes)
        .and_then(|()| fs::rename(&tmp_path, path).map_err(StorDbError::from));
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_owner_only(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn header() -> EnvelopeHeader {
        EnvelopeHeader {
            params: Argon2Params {
                memory_kib: 8_192,
                iterations: 2,
                parallelism: 1,
            },
            salt: [9u8; SALT_LEN],
        }
    }

    #[test]
    fn decode_reads_back_header_and_payload() {
        let sealed = vec![1u8; NONCE_LEN + 20];
        let bytes = encode(&header(), &sealed);
        let (h, payload) = decode(&bytes).unwrap();
        assert_eq!(h, header());
        assert_eq!(payload, &sealed[..]);
    }

    #[test]
    fn decode_rejects_foreign_and_truncated_files() {
        let ansible = b"$ANSIBLE_VAULT;1.1;AES256\n6162636465666768696a6b6c6d6e6f70717273747576\n";
        assert!(matches!(decode(ansible).unwrap_err(), StorDbError::VaultTool(_)));
        assert!(decode(b"SDBV").is_err());

        let mut bytes = encode(&header(), &[0u8; NONCE_LEN + 16]);
        bytes[4] = 99;
        let err = decode(&bytes).unwrap_err().to_string();
        assert!(err.contains("unsupported version 99"));
    }

    #[test]
    fn decode_rejects_oversized_kdf_costs() {
        let good = encode(&header(), &[0u8; NONCE_LEN + 16]);

        let mut bytes = good.clone();
        bytes[5..9].copy_from_slice(&0x0FFF_FFFFu32.to_le_bytes());
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, StorDbError::VaultTool(_)));
        assert!(err.to_string().contains("invalid vault file: Argon2 memory_kib"));

        let mut bytes = good.clone();
        bytes[9..13].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(decode(&bytes).unwrap_err().to_string().contains("iterations"));

        let mut bytes = good;
        bytes[13..17].copy_from_slice(&0u32.to_le_bytes());
        assert!(decode(&bytes).unwrap_err().to_string().contains("parallelism"));
    }

    #[test]
    fn write_atomic_replaces_target_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.ansible");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn write_atomic_into_missing_dir_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("vault.ansible");
        assert!(write_atomic(&path, b"x").is_err());
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn vault_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vault.ansible");
        write_atomic(&path, b"blob").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
