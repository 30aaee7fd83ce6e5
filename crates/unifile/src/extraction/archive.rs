//! Archive unpacking into a scratch directory.
//!
//! Supports ZIP, TAR, gzip-compressed TAR and single-file gzip. Member paths that
//! would escape the destination are skipped. Writing stops once the total number of
//! unpacked bytes would exceed the configured cap; the report says so.

use crate::{Result, UnifileError};
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tar::Archive as TarArchive;
use zip::ZipArchive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    /// A single gzip-compressed file.
    Gz,
}

impl ArchiveFormat {
    /// Pick the format for `path` given its resolved extension.
    ///
    /// `name.tar.gz` resolves to `gz` and is read as a compressed tarball.
    pub fn detect(path: &Path, extension: &str) -> Option<Self> {
        match extension {
            "zip" => Some(Self::Zip),
            "tar" => Some(Self::Tar),
            "tgz" => Some(Self::TarGz),
            "gz" => {
                let stem = path.file_stem().map(|s| s.to_string_lossy().to_lowercase());
                if stem.is_some_and(|s| s.ends_with(".tar")) {
                    Some(Self::TarGz)
                } else {
                    Some(Self::Gz)
                }
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::Gz => "gz",
        }
    }
}

/// What an unpack run wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnpackReport {
    pub files_written: usize,
    pub bytes_written: u64,
    /// True when the byte cap stopped unpacking early.
    pub truncated: bool,
    /// Member names rejected for escaping the destination.
    pub skipped: Vec<String>,
}

/// Unpack `archive` into `dest`, writing at most `max_bytes` of member content.
///
/// # Errors
///
/// Returns `Parsing` when the container itself is unreadable and `Io` when the
/// destination cannot be written.
pub fn unpack(archive: &Path, format: ArchiveFormat, dest: &Path, max_bytes: u64) -> Result<UnpackReport> {
    let file = File::open(archive)?;
    fs::create_dir_all(dest)?;
    match format {
        ArchiveFormat::Zip => unpack_zip(file, dest, max_bytes),
        ArchiveFormat::Tar => unpack_tar(BufReader::new(file), dest, max_bytes),
        ArchiveFormat::TarGz => unpack_tar(GzDecoder::new(BufReader::new(file)), dest, max_bytes),
        ArchiveFormat::Gz => unpack_gz(archive, file, dest, max_bytes),
    }
}

/// Copy at most `remaining` bytes into `target`. Returns `None` and removes the
/// partial file when the source holds more.
fn copy_capped<R: Read>(reader: &mut R, target: &Path, remaining: u64) -> io::Result<Option<u64>> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = File::create(target)?;
    let written = io::copy(&mut reader.take(remaining.saturating_add(1)), &mut out)?;
    if written > remaining {
        drop(out);
        fs::remove_file(target)?;
        return Ok(None);
    }
    Ok(Some(written))
}

fn unpack_zip(file: File, dest: &Path, max_bytes: u64) -> Result<UnpackReport> {
    let mut archive = ZipArchive::new(BufReader::new(file))
        .map_err(|e| UnifileError::parsing(format!("Failed to read ZIP archive: {}", e)))?;
    let mut report = UnpackReport::default();

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| UnifileError::parsing(format!("Failed to read ZIP entry: {}", e)))?;
        if entry.is_dir() {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            report.skipped.push(entry.name().to_string());
            continue;
        };

        let remaining = max_bytes.saturating_sub(report.bytes_written);
        match copy_capped(&mut entry, &dest.join(relative), remaining)? {
            Some(written) => {
                report.files_written += 1;
                report.bytes_written += written;
            }
            None => {
                report.truncated = true;
                break;
            }
        }
    }

    Ok(report)
}

fn unpack_tar<R: Read>(reader: R, dest: &Path, max_bytes: u64) -> Result<UnpackReport> {
    let mut archive = TarArchive::new(reader);
    let mut report = UnpackReport::default();

    let entries = archive
        .entries()
        .map_err(|e| UnifileError::parsing(format!("Failed to read TAR archive: {}", e)))?;

    for entry_result in entries {
        let mut entry = entry_result.map_err(|e| UnifileError::parsing(format!("Failed to read TAR entry: {}", e)))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let size = entry.size();
        if report.bytes_written.saturating_add(size) > max_bytes {
            report.truncated = true;
            break;
        }

        let name = entry
            .path()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        if entry.unpack_in(dest)? {
            report.files_written += 1;
            report.bytes_written += size;
        } else {
            report.skipped.push(name);
        }
    }

    Ok(report)
}

fn unpack_gz(archive: &Path, file: File, dest: &Path, max_bytes: u64) -> Result<UnpackReport> {
    let name: PathBuf = archive
        .file_stem()
        .map(PathBuf::from)
        .filter(|s| !s.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from("member"));
    let mut decoder = GzDecoder::new(BufReader::new(file));
    let mut report = UnpackReport::default();

    match copy_capped(&mut decoder, &dest.join(name), max_bytes) {
        Ok(Some(written)) => {
            report.files_written = 1;
            report.bytes_written = written;
        }
        Ok(None) => report.truncated = true,
        Err(e) if e.kind() == io::ErrorKind::InvalidInput || e.kind() == io::ErrorKind::InvalidData => {
            return Err(UnifileError::parsing_with_source("Failed to decompress gzip stream", e));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(report)
}
