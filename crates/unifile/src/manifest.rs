//! Content-addressed deduplication manifest.
//!
//! The manifest is an append-only JSON-lines log. Each line records one file seen by
//! the dispatcher: its SHA-256, size, a MIME hint and the outcome. On open, the log is
//! replayed to rebuild the set of seen hashes, so a later process makes exactly the
//! duplicate decisions the writing process would have made.
//!
//! Appends from one process are serialized, and [`Manifest::claim`] makes the
//! duplicate decision and the seen-set insert one step, so concurrent workers in
//! one process extract a given content at most once. Concurrent writers in
//! separate processes are not coordinated.
//!
//! A torn final line left by a crash is skipped on replay, and the next append
//! starts on a fresh line.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Result, UnifileError};

/// Outcome recorded for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    Ok,
    Error,
    Duplicate,
}

/// One line of the manifest log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub hash: String,
    pub byte_size: u64,
    pub mime_hint: String,
    pub status: ManifestStatus,
}

/// Result of [`Manifest::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestCheck {
    pub is_duplicate: bool,
    pub hash: String,
    pub byte_size: u64,
}

struct ManifestState {
    seen: HashSet<String>,
    log: File,
}

/// Append-only content-hash log.
pub struct Manifest {
    path: PathBuf,
    state: Mutex<ManifestState>,
}

impl std::fmt::Debug for Manifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manifest").field("path", &self.path).finish_non_exhaustive()
    }
}

impl Manifest {
    /// Open (or create) the log at `path` and replay its entries.
    ///
    /// Lines that are not UTF-8 JSON objects with a string `hash` are skipped with a warning.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let seen = if path.exists() { replay(&path)? } else { HashSet::new() };

        let mut log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| UnifileError::manifest_with_source(format!("Cannot open {}", path.display()), e))?;

        if !ends_with_newline(&path)? {
            tracing::warn!(manifest = %path.display(), "Manifest ends in a partial line, starting a new one");
            log.write_all(b"\n")
                .and_then(|_| log.flush())
                .map_err(|e| UnifileError::manifest_with_source(format!("Cannot append to {}", path.display()), e))?;
        }

        tracing::debug!(manifest = %path.display(), known_hashes = seen.len(), "Opened manifest");
        Ok(Self {
            path,
            state: Mutex::new(ManifestState { seen, log }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hash `file` and report whether that content was seen before.
    pub fn check(&self, file: impl AsRef<Path>) -> Result<ManifestCheck> {
        let (hash, byte_size) = hash_file(file.as_ref())?;
        let is_duplicate = self.lock()?.seen.contains(&hash);
        Ok(ManifestCheck {
            is_duplicate,
            hash,
            byte_size,
        })
    }

    /// Hash `file` and claim its content in one step.
    ///
    /// Returns `is_duplicate = false` to exactly one caller per distinct content;
    /// every later claim, from any thread, sees a duplicate. A claimant that ends
    /// up recording nothing should hand the hash back with [`release`](Self::release).
    pub fn claim(&self, file: impl AsRef<Path>) -> Result<ManifestCheck> {
        let (hash, byte_size) = hash_file(file.as_ref())?;
        let is_duplicate = !self.lock()?.seen.insert(hash.clone());
        Ok(ManifestCheck {
            is_duplicate,
            hash,
            byte_size,
        })
    }

    /// Forget a claimed hash that was never recorded.
    pub fn release(&self, hash: &str) -> Result<()> {
        self.lock()?.seen.remove(hash);
        Ok(())
    }

    /// Hash `file` again and append an entry with `status`.
    ///
    /// The hash joins the seen set once the line is written.
    pub fn record(&self, file: impl AsRef<Path>, status: ManifestStatus) -> Result<ManifestEntry> {
        let file = file.as_ref();
        let (hash, byte_size) = hash_file(file)?;
        let entry = ManifestEntry {
            path: file.to_string_lossy().into_owned(),
            hash,
            byte_size,
            mime_hint: mime_guess::from_path(file).first_or_octet_stream().essence_str().to_string(),
            status,
        };

        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let mut state = self.lock()?;
        state
            .log
            .write_all(line.as_bytes())
            .and_then(|_| state.log.flush())
            .map_err(|e| UnifileError::manifest_with_source(format!("Cannot append to {}", self.path.display()), e))?;
        state.seen.insert(entry.hash.clone());
        Ok(entry)
    }

    pub fn contains_hash(&self, hash: &str) -> Result<bool> {
        Ok(self.lock()?.seen.contains(hash))
    }

    /// Number of distinct hashes known.
    pub fn known_hashes(&self) -> Result<usize> {
        Ok(self.lock()?.seen.len())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ManifestState>> {
        self.state
            .lock()
            .map_err(|e| UnifileError::LockPoisoned(format!("Manifest lock poisoned: {}", e)))
    }
}

/// Seen hashes from every readable line of the log.
///
/// Lines that are not UTF-8, not JSON, or lack a string `hash` are skipped with a warning.
fn replay(path: &Path) -> Result<HashSet<String>> {
    let mut seen = HashSet::new();
    for (lineno, line) in read_lines(path)?.into_iter().enumerate() {
        let Some(line) = line else {
            tracing::warn!(manifest = %path.display(), line = lineno + 1, "Skipping non UTF-8 manifest line");
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<serde_json::Value>(line)
            .ok()
            .and_then(|v| v.get("hash").and_then(|h| h.as_str()).map(str::to_string))
        {
            Some(hash) => {
                seen.insert(hash);
            }
            None => {
                tracing::warn!(manifest = %path.display(), line = lineno + 1, "Skipping malformed manifest line");
            }
        }
    }
    Ok(seen)
}

/// Raw lines of the log; `None` for a line that is not valid UTF-8.
fn read_lines(path: &Path) -> Result<Vec<Option<String>>> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    for chunk in reader.split(b'\n') {
        lines.push(String::from_utf8(chunk?).ok());
    }
    Ok(lines)
}

fn ends_with_newline(path: &Path) -> Result<bool> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Read every well-formed entry from a manifest log, in append order.
pub fn read_entries(path: impl AsRef<Path>) -> Result<Vec<ManifestEntry>> {
    Ok(read_lines(path.as_ref())?
        .into_iter()
        .flatten()
        .filter_map(|line| serde_json::from_str::<ManifestEntry>(line.trim()).ok())
        .collect())
}

/// Streamed SHA-256 of a file, hex encoded, with its size in bytes.
pub fn hash_file(path: &Path) -> Result<(String, u64)> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let byte_size = std::io::copy(&mut file, &mut hasher)?;
    Ok((hex::encode(hasher.finalize()), byte_size))
}
