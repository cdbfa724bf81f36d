//! Scoped plaintext scratch files.
//!
//! A `PlaintextFile` is the only place a decrypted or about-to-be-encrypted
//! snapshot touches the disk. It lives in the scratch directory under a
//! fixed prefix, is owner-only, and is zero-filled and unlinked when it
//! goes out of scope, whichever way the scope is left.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{Duration, SystemTime};

use tempfile::NamedTempFile;
use zeroize::Zeroizing;

use crate::errors::Result;

/// File-name prefix of every plaintext scratch file.
pub const PLAINTEXT_PREFIX: &str = ".stordb-plain-";

/// An exclusively-owned plaintext file, destroyed on drop.
pub struct PlaintextFile {
    file: NamedTempFile,
}

impl PlaintextFile {
    /// Create a new scratch file in `dir` holding `contents`.
    pub fn create(dir: &Path, contents: &[u8]) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(PLAINTEXT_PREFIX)
            .tempfile_in(dir)?;

        // Wrapped before the write so a failed write still wipes.
        let mut scoped = Self { file };
        scoped.file.write_all(contents)?;
        scoped.file.as_file().sync_all()?;
        Ok(scoped)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read the whole file back.
    pub fn contents(&self) -> Result<Zeroizing<Vec<u8>>> {
        let mut f = File::open(self.path())?;
        let mut buf = Zeroizing::new(Vec::new());
        f.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Drop for PlaintextFile {
    fn drop(&mut self) {
        if let Err(e) = zero_fill(self.file.as_file_mut()) {
            tracing::warn!("could not zero plaintext scratch file before removal: {e}");
        }
        // `NamedTempFile` unlinks the file when the field is dropped.
    }
}

fn zero_fill(file: &mut File) -> io::Result<()> {
    let len = file.metadata()?.len();
    file.seek(SeekFrom::Start(0))?;
    io::copy(&mut io::repeat(0).take(len), file)?;
    file.sync_all()
}

/// Leftovers younger than this may still belong to a running export or
/// import and are not swept.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(15 * 60);

/// Create the scratch directory if needed, owner-only on unix.
///
/// An existing directory is used as it is.
pub fn ensure_scratch_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

/// Remove plaintext files left behind by a run that died mid-operation.
///
/// Only files last modified at least `older_than` ago are touched; a
/// file that cannot be removed is logged and left. Returns how many
/// were removed.
pub fn sweep_stale(dir: &Path, older_than: Duration) -> usize {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return 0,
        Err(e) => {
            tracing::warn!("could not scan scratch dir {} for leftovers: {e}", dir.display());
            return 0;
        }
    };

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries.flatten() {
        let is_plaintext = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(PLAINTEXT_PREFIX));
        if !is_plaintext {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let age = meta
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < older_than {
            continue;
        }

        let path = entry.path();
        if let Ok(mut f) = OpenOptions::new().write(true).open(&path) {
            let _ = zero_fill(&mut f);
        }
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::warn!("could not remove stale plaintext {}: {e}", path.display()),
        }
    }

    if removed > 0 {
        tracing::warn!("removed {removed} stale plaintext file(s) from {}", dir.display());
    }
    removed
}

/// Plaintext scratch files currently present in `dir`.
pub fn leftovers(dir: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(PLAINTEXT_PREFIX))
        {
            found.push(entry.path());
        }
    }
    Ok(found)
}
