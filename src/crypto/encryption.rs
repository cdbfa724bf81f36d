//! Sealing the native vault body.
//!
//! Output is `nonce(12) || ciphertext || tag(16)`; a new nonce is drawn
//! for every call.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use zeroize::Zeroizing;

use crate::errors::{Result, StorDbError};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Encrypt `plaintext` under a 32-byte `key`, returning `nonce || ciphertext`.
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| StorDbError::VaultTool(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| StorDbError::VaultTool(format!("encryption failed: {e}")))?;

    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt a buffer produced by `encrypt`.
///
/// A wrong key and a tampered buffer are indistinguishable here; both
/// come back as the same error.
pub fn decrypt(key: &[u8], ciphertext_with_nonce: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if ciphertext_with_nonce.len() < NONCE_LEN {
        return Err(decryption_failed());
    }

    let (nonce_bytes, ciphertext) = ciphertext_with_nonce.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| decryption_failed())?;
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| decryption_failed())?;

    Ok(Zeroizing::new(plaintext))
}

fn decryption_failed() -> StorDbError {
    StorDbError::VaultTool("decryption failed (wrong password or corrupted vault)".into())
}
