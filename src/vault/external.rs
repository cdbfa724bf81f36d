//! ansible-vault (or a compatible tool) as a subprocess cipher.
//!
//! The password is written to the child's stdin and read there through
//! `--vault-password-file -`; it never appears in argv. Ciphertext and
//! decrypted text travel over stdout. Only stderr is used for error
//! messages, truncated and with the password scrubbed.

use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use zeroize::Zeroizing;

use super::cipher::Cipher;
use super::plaintext::PlaintextFile;
use crate::errors::{Result, StorDbError};
use crate::record::MASK;

/// How often a running tool is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Longest stderr excerpt carried into an error message.
const MAX_DIAGNOSTIC: usize = 512;

/// Prefix of the (already encrypted) blob handed to the tool on decrypt.
const CIPHERTEXT_PREFIX: &str = ".stordb-vault-";

/// Runs an ansible-vault compatible executable.
#[derive(Debug, Clone)]
pub struct ExternalToolCipher {
    program: PathBuf,
    timeout: Duration,
    scratch_dir: PathBuf,
}

impl ExternalToolCipher {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration, scratch_dir: &Path) -> Self {
        Self {
            program: program.into(),
            timeout,
            scratch_dir: scratch_dir.to_path_buf(),
        }
    }

    /// Run the tool with `args`, feeding `password` on stdin.
    fn run(&self, args: Vec<OsString>, password: &str) -> Result<Zeroizing<Vec<u8>>> {
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(&e))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A tool that exits without reading closes the pipe; its exit
            // status tells the real story.
            let _ = stdin.write_all(password.as_bytes());
            let _ = stdin.write_all(b"\n");
        }

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait_with_deadline(&mut child)?;

        let out = Zeroizing::new(join(stdout));
        let err = join(stderr);

        if !status.success() {
            return Err(StorDbError::VaultTool(format!(
                "{} exited with {}: {}",
                self.program.display(),
                describe(status),
                diagnostic(&err, password)
            )));
        }
        Ok(out)
    }

    fn wait_with_deadline(&self, child: &mut Child) -> Result<ExitStatus> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(StorDbError::VaultTool(format!(
                    "{} did not finish within {:?} and was killed",
                    self.program.display(),
                    self.timeout
                )));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn spawn_error(&self, e: &io::Error) -> StorDbError {
        if e.kind() == io::ErrorKind::NotFound {
            StorDbError::VaultTool(format!(
                "vault tool '{}' not found; install ansible or set `vault_tool` in .stordb.toml",
                self.program.display()
            ))
        } else {
            StorDbError::VaultTool(format!(
                "could not start '{}': {e}",
                self.program.display()
            ))
        }
    }
}

impl Cipher for ExternalToolCipher {
    fn name(&self) -> &str {
        "ansible-vault"
    }

    fn encrypt(&self, plaintext: &[u8], password: &str) -> Result<Vec<u8>> {
        let plain = PlaintextFile::create(&self.scratch_dir, plaintext)?;
        let out = self.run(
            vec![
                "encrypt".into(),
                plain.path().into(),
                "--output".into(),
                "-".into(),
                "--vault-password-file".into(),
                "-".into(),
            ],
            password,
        )?;
        if out.is_empty() {
            return Err(StorDbError::VaultTool(format!(
                "{} produced no output",
                self.program.display()
            )));
        }
        Ok(out.to_vec())
    }

    fn decrypt(&self, blob: &[u8], password: &str) -> Result<Zeroizing<Vec<u8>>> {
        let mut sealed = tempfile::Builder::new()
            .prefix(CIPHERTEXT_PREFIX)
            .tempfile_in(&self.scratch_dir)?;
        sealed.write_all(blob)?;
        sealed.as_file().sync_all()?;

        self.run(
            vec![
                "decrypt".into(),
                sealed.path().into(),
                "--output".into(),
                "-".into(),
                "--vault-password-file".into(),
                "-".into(),
            ],
            password,
        )
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn join(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn describe(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("status {code}"),
        None => "a signal".into(),
    }
}

/// Trimmed, truncated stderr with the password masked.
fn diagnostic(stderr: &[u8], password: &str) -> String {
    let mut text = String::from_utf8_lossy(stderr).trim().to_string();
    if !password.is_empty() {
        text = text.replace(password, MASK);
    }
    if text.is_empty() {
        return "no diagnostic output".into();
    }
    if text.len() > MAX_DIAGNOSTIC {
        let mut cut = MAX_DIAGNOSTIC;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str(" ...");
    }
    text
}
