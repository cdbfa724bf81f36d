//! Cipher providers for the vault bridge.
//!
//! The bridge only knows `Cipher`: bytes in, bytes out, plus a password.
//! `ExternalToolCipher` (in `external`) shells out to ansible-vault;
//! `NativeCipher` encrypts in-process with AES-256-GCM.

use zeroize::Zeroizing;

use super::format::{self, EnvelopeHeader};
use crate::crypto::{self, Argon2Params};
use crate::errors::Result;

/// Password-based encryption of a whole snapshot.
pub trait Cipher {
    /// Short name for log lines.
    fn name(&self) -> &str;

    fn encrypt(&self, plaintext: &[u8], password: &str) -> Result<Vec<u8>>;

    fn decrypt(&self, blob: &[u8], password: &str) -> Result<Zeroizing<Vec<u8>>>;
}

/// In-process AES-256-GCM with an Argon2id-derived key.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCipher {
    params: Argon2Params,
}

impl NativeCipher {
    pub fn new(params: Argon2Params) -> Self {
        Self { params }
    }
}

impl Cipher for NativeCipher {
    fn name(&self) -> &str {
        "native"
    }

    fn encrypt(&self, plaintext: &[u8], password: &str) -> Result<Vec<u8>> {
        let header = EnvelopeHeader {
            params: self.params,
            salt: crypto::generate_salt(),
        };
        let key = crypto::derive_key(password.as_bytes(), &header.salt, &header.params)?;
        let sealed = crypto::encrypt(&key[..], plaintext)?;
        Ok(format::encode(&header, &sealed))
    }

    /// Costs come from the vault header, not from `self`.
    fn decrypt(&self, blob: &[u8], password: &str) -> Result<Zeroizing<Vec<u8>>> {
        let (header, sealed) = format::decode(blob)?;
        let key = crypto::derive_key(password.as_bytes(), &header.salt, &header.params)?;
        crypto::decrypt(&key[..], sealed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StorDbError;

    fn cipher() -> NativeCipher {
        NativeCipher::new(Argon2Params {
            memory_kib: 8_192,
            iterations: 1,
            parallelism: 1,
        })
    }

    #[test]
    fn encrypt_then_decrypt_with_same_password() {
        let blob = cipher().encrypt(b"[]", "correct horse").unwrap();
        assert!(blob.starts_with(b"SDBV"));
        assert_eq!(&cipher().decrypt(&blob, "correct horse").unwrap()[..], b"[]");
    }

    #[test]
    fn wrong_password_is_a_vault_error() {
        let blob = cipher().encrypt(b"[]", "correct horse").unwrap();
        let err = cipher().decrypt(&blob, "battery staple").unwrap_err();
        assert!(matches!(err, StorDbError::VaultTool(_)));
        assert!(err.to_string().contains("decryption failed"));
    }

    #[test]
    fn decrypt_uses_costs_from_the_header() {
        let blob = cipher().encrypt(b"payload", "pw").unwrap();
        let stronger = NativeCipher::new(Argon2Params {
            memory_kib: 16_384,
            iterations: 2,
            parallelism: 2,
        });
        assert_eq!(&stronger.decrypt(&blob, "pw").unwrap()[..], b"payload");
    }

    #[test]
    fn tampered_memory_cost_fails_without_deriving() {
        let mut blob = cipher().encrypt(b"[]", "pw").unwrap();
        blob[5..9].copy_from_slice(&0x0FFF_FFFFu32.to_le_bytes());

        let err = NativeCipher::default().decrypt(&blob, "pw").unwrap_err();
        assert!(matches!(err, StorDbError::VaultTool(_)));
        assert!(err.to_string().contains("invalid vault file"));
    }

    #[test]
    fn ciphertext_does_not_contain_plaintext() {
        let blob = cipher().encrypt(b"AA:BB:CC:DD:EE:01 hunter2", "pw").unwrap();
        let haystack = String::from_utf8_lossy(&blob);
        assert!(!haystack.contains("hunter2"));
    }
}
