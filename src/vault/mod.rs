//! Vault module: encrypted export and import of the whole record set.
//!
//! This module provides:
//! - The `Cipher` provider seam and the in-process `NativeCipher` (`cipher`)
//! - `ExternalToolCipher`, which shells out to ansible-vault (`external`)
//! - The native envelope and atomic vault writes (`format`)
//! - Scoped plaintext scratch files (`plaintext`)
//! - `VaultBridge`, which ties the store to a cipher (`bridge`)

pub mod bridge;
pub mod cipher;
pub mod external;
pub mod format;
pub mod plaintext;
mod snapshot;

pub use bridge::{VaultBridge, VaultImportReport};
pub use cipher::{Cipher, NativeCipher};
pub use external::ExternalToolCipher;
pub use plaintext::{ensure_scratch_dir, sweep_stale, PlaintextFile, DEFAULT_STALE_AFTER, PLAINTEXT_PREFIX};
