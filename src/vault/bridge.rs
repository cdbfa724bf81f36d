//! Export the record store into an encrypted vault, and back.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::cipher::Cipher;
use super::format;
use super::plaintext::{ensure_scratch_dir, sweep_stale, PlaintextFile, DEFAULT_STALE_AFTER};
use super::snapshot;
use crate::errors::{Result, StorDbError};
use crate::store::{CollisionPolicy, MergeReport, RecordStore};

/// Outcome of a vault import: how each snapshot record was applied.
pub type VaultImportReport = MergeReport;

/// Moves the full record set between a `RecordStore` and a vault file.
pub struct VaultBridge {
    cipher: Box<dyn Cipher>,
    scratch_dir: PathBuf,
    stale_after: Duration,
}

impl VaultBridge {
    /// `scratch_dir` is where plaintext intermediates may briefly live.
    pub fn new(cipher: Box<dyn Cipher>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            cipher,
            scratch_dir: scratch_dir.into(),
            stale_after: DEFAULT_STALE_AFTER,
        }
    }

    /// Age at which a leftover plaintext file counts as abandoned. Must
    /// outlast the slowest cipher call, or a concurrent run loses its file.
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Make sure the scratch dir exists, then clear out abandoned plaintext.
    fn prepare_scratch(&self) -> Result<()> {
        ensure_scratch_dir(&self.scratch_dir)?;
        sweep_stale(&self.scratch_dir, self.stale_after);
        Ok(())
    }

    /// Encrypt every record into `vault_path` and return how many were written.
    ///
    /// On failure no vault file is written and an existing one is left
    /// as it was.
    pub fn export(&self, store: &RecordStore, vault_path: &Path, password: &str) -> Result<usize> {
        self.prepare_scratch()?;
        tracing::info!(
            "Vault encrypt requested: target={} cipher={}",
            vault_path.display(),
            self.cipher.name()
        );

        let records = store.list_all()?;
        let plaintext = snapshot::serialize(&records)?;
        let blob = self.cipher.encrypt(&plaintext, password)?;
        drop(plaintext);

        format::write_atomic(vault_path, &blob)?;
        tracing::info!("Vault encryption complete: {} record(s) exported", records.len());
        Ok(records.len())
    }

    /// Decrypt `vault_path` and merge its records into `store`.
    ///
    /// Every record is validated before anything is written; one bad
    /// record aborts the import with the store unchanged.
    pub fn import(
        &self,
        store: &RecordStore,
        vault_path: &Path,
        password: &str,
        policy: CollisionPolicy,
    ) -> Result<VaultImportReport> {
        self.prepare_scratch()?;
        tracing::info!(
            "Vault decrypt requested: source={} cipher={}",
            vault_path.display(),
            self.cipher.name()
        );

        if !vault_path.exists() {
            return Err(StorDbError::NotFound(format!(
                "at vault path {}",
                vault_path.display()
            )));
        }
        let blob = fs::read(vault_path)?;

        let records = {
            let decrypted = self.cipher.decrypt(&blob, password)?;
            let plain = PlaintextFile::create(&self.scratch_dir, &decrypted)?;
            drop(decrypted);
            snapshot::parse(&plain.contents()?[..])?
        };

        let report = store.merge(&records, policy)?;
        tracing::info!(
            "Vault decryption complete: inserted={} skipped={} overwritten={}",
            report.inserted,
            report.skipped,
            report.overwritten
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{validate, RecordFields};
    use crate::vault::plaintext::leftovers;
    use tempfile::TempDir;
    use zeroize::Zeroizing;

    /// XOR with the password plus a check prefix: deterministic, and a
    /// wrong password is detected.
    struct XorCipher;

    const CHECK: &[u8] = b"XOR1";

    fn xor(data: &[u8], password: &str) -> Vec<u8> {
        let key = password.as_bytes();
        data.iter()
            .enumerate()
            .map(|(i, b)| b ^ key[i % key.len()])
            .collect()
    }

    impl Cipher for XorCipher {
        fn name(&self) -> &str {
            "xor"
        }

        fn encrypt(&self, plaintext: &[u8], password: &str) -> Result<Vec<u8>> {
            let mut data = CHECK.to_vec();
            data.extend_from_slice(plaintext);
            Ok(xor(&data, password))
        }

        fn decrypt(&self, blob: &[u8], password: &str) -> Result<Zeroizing<Vec<u8>>> {
            let data = xor(blob, password);
            match data.strip_prefix(CHECK) {
                Some(rest) => Ok(Zeroizing::new(rest.to_vec())),
                None => Err(StorDbError::VaultTool("decryption failed".into())),
            }
        }
    }

    /// Decrypts anything into text that is not a snapshot.
    struct GarbageCipher;

    impl Cipher for GarbageCipher {
        fn name(&self) -> &str {
            "garbage"
        }

        fn encrypt(&self, _: &[u8], _: &str) -> Result<Vec<u8>> {
            Err(StorDbError::VaultTool("encrypt exploded".into()))
        }

        fn decrypt(&self, _: &[u8], _: &str) -> Result<Zeroizing<Vec<u8>>> {
            Ok(Zeroizing::new(b"{ this is not a snapshot".to_vec()))
        }
    }

    fn seeded_store(n: usize) -> RecordStore {
        let store = RecordStore::open_in_memory().unwrap();
        for i in 1..=n {
            let record = validate(&RecordFields {
                owner: Some("Alice".into()),
                device_name: Some(format!("dev{i}")),
                mac_address: Some(format!("00:00:00:00:00:{i:02X}")),
                secret_value: Some(format!("secret{i}")),
                description: None,
            })
            .unwrap();
            store.create(&record).unwrap();
        }
        store
    }

    #[test]
    fn export_then_import_into_fresh_store() {
        let dir = TempDir::new().unwrap();
        let vault = dir.path().join("vault.ansible");
        let bridge = VaultBridge::new(Box::new(XorCipher), dir.path());

        let source = seeded_store(3);
        assert_eq!(bridge.export(&source, &vault, "pw").unwrap(), 3);

        let target = RecordStore::open_in_memory().unwrap();
        let report = bridge
            .import(&target, &vault, "pw", CollisionPolicy::Skip)
            .unwrap();
        assert_eq!(report.inserted, 3);

        let before = source.list_all().unwrap();
        let after = target.list_all().unwrap();
        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(&after) {
            assert!(a.same_fields(b));
        }
        assert!(leftovers(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn wrong_password_leaves_store_unchanged_and_no_plaintext() {
        let dir = TempDir::new().unwrap();
        let vault = dir.path().join("vault.ansible");
        let bridge = VaultBridge::new(Box::new(XorCipher), dir.path());
        bridge.export(&seeded_store(2), &vault, "right").unwrap();

        let target = seeded_store(1);
        let err = bridge
            .import(&target, &vault, "wrong", CollisionPolicy::Overwrite)
            .unwrap_err();
        assert!(matches!(err, StorDbError::VaultTool(_)));
        assert_eq!(target.count().unwrap(), 1);
        assert!(leftovers(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn failed_encrypt_writes_no_vault() {
        let dir = TempDir::new().unwrap();
        let vault = dir.path().join("vault.ansible");
        let bridge = VaultBridge::new(Box::new(GarbageCipher), dir.path());

        let err = bridge.export(&seeded_store(1), &vault, "pw").unwrap_err();
        assert!(matches!(err, StorDbError::VaultTool(_)));
        assert!(!vault.exists());
        assert!(leftovers(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn parse_failure_cleans_up_plaintext() {
        let dir = TempDir::new().unwrap();
        let vault = dir.path().join("vault.ansible");
        fs::write(&vault, b"opaque").unwrap();
        let bridge = VaultBridge::new(Box::new(GarbageCipher), dir.path());

        let store = RecordStore::open_in_memory().unwrap();
        let err = bridge
            .import(&store, &vault, "pw", CollisionPolicy::Skip)
            .unwrap_err();
        assert!(matches!(err, StorDbError::StructuralImport(_)));
        assert_eq!(store.count().unwrap(), 0);
        assert!(leftovers(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn import_of_missing_vault_is_not_found() {
        let dir = TempDir::new().unwrap();
        let bridge = VaultBridge::new(Box::new(XorCipher), dir.path());
        let store = RecordStore::open_in_memory().unwrap();
        let err = bridge
            .import(&store, &dir.path().join("absent"), "pw", CollisionPolicy::Skip)
            .unwrap_err();
        assert!(matches!(err, StorDbError::NotFound(_)));
    }

    #[test]
    fn stale_plaintext_is_swept_before_export() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(format!("{}crashed", crate::vault::PLAINTEXT_PREFIX)),
            b"[]",
        )
        .unwrap();
        let bridge =
            VaultBridge::new(Box::new(XorCipher), dir.path()).with_stale_after(Duration::ZERO);
        bridge
            .export(&seeded_store(1), &dir.path().join("v"), "pw")
            .unwrap();
        assert!(leftovers(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn recent_plaintext_of_another_run_survives_export_and_import() {
        let dir = TempDir::new().unwrap();
        let vault = dir.path().join("vault.ansible");
        let bridge = VaultBridge::new(Box::new(XorCipher), dir.path());
        let other_run = PlaintextFile::create(dir.path(), b"[]").unwrap();

        bridge.export(&seeded_store(2), &vault, "pw").unwrap();
        bridge
            .import(&RecordStore::open_in_memory().unwrap(), &vault, "pw", CollisionPolicy::Skip)
            .unwrap();

        assert!(other_run.path().exists());
        assert_eq!(leftovers(dir.path()).unwrap(), vec![other_run.path().to_path_buf()]);
    }

    #[test]
    fn missing_scratch_dir_is_created() {
        let dir = TempDir::new().unwrap();
        let scratch = dir.path().join(".stordb-scratch");
        let vault = dir.path().join("vault.ansible");
        let bridge = VaultBridge::new(Box::new(XorCipher), &scratch);

        bridge.export(&seeded_store(1), &vault, "pw").unwrap();
        let report = bridge
            .import(&RecordStore::open_in_memory().unwrap(), &vault, "pw", CollisionPolicy::Skip)
            .unwrap();
        assert_eq!(report.inserted, 1);
        assert!(scratch.is_dir());
        assert!(leftovers(&scratch).unwrap().is_empty());
    }

    #[test]
    fn import_applies_collision_policy() {
        let dir = TempDir::new().unwrap();
        let vault = dir.path().join("vault.ansible");
        let bridge = VaultBridge::new(Box::new(XorCipher), dir.path());
        bridge.export(&seeded_store(2), &vault, "pw").unwrap();

        let target = seeded_store(1);
        target
            .update(1, &[("owner".into(), "Changed".into())])
            .unwrap();

        let skip = bridge
            .import(&target, &vault, "pw", CollisionPolicy::Skip)
            .unwrap();
        assert_eq!((skip.inserted, skip.skipped), (1, 1));
        assert_eq!(target.get(1).unwrap().owner, "Changed");

        let overwrite = bridge
            .import(&target, &vault, "pw", CollisionPolicy::Overwrite)
            .unwrap();
        assert_eq!(overwrite.overwritten, 2);
        assert_eq!(target.get(1).unwrap().owner, "Alice");
        assert_eq!(target.count().unwrap(), 2);
    }
}
