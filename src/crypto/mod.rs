//! Cryptographic primitives behind the native vault cipher.
//!
//! This module provides:
//! - AES-256-GCM encryption and decryption (`encryption`)
//! - Argon2id password-based key derivation (`kdf`)

pub mod encryption;
pub mod kdf;

pub use encryption::{decrypt, encrypt, NONCE_LEN};
pub use kdf::{derive_key, generate_salt, Argon2Params, KEY_LEN, SALT_LEN};
