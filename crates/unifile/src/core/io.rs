//! File I/O utilities.

use crate::{Result, UnifileError};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Check that `path` exists and is a regular file.
///
/// # Errors
///
/// Returns `UnifileError::NotFound` for missing paths, directories and other
/// non-regular files.
pub fn validate_regular_file(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(UnifileError::not_found(path)),
    }
}

/// Persist raw bytes to a scratch file so extractors can work on a path.
///
/// Only the final component of `filename` is used, so the file always lands
/// inside the returned directory. The directory (and file) are deleted when the
/// returned [`TempDir`] is dropped.
///
/// # Errors
///
/// Returns `Validation` if `filename` has no usable file name component.
pub fn write_scratch_file(bytes: &[u8], filename: &str) -> Result<(TempDir, PathBuf)> {
    let name = Path::new(filename.trim())
        .file_name()
        .map(|n| n.to_os_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            UnifileError::validation(format!(
                "A filename with an extension is required for byte input, got '{}'",
                filename
            ))
        })?;

    let dir = tempfile::Builder::new().prefix("unifile_bytes_").tempdir()?;
    let path = dir.path().join(name);
    std::fs::write(&path, bytes)?;
    Ok((dir, path))
}

/// Collect regular files under `dir`, sorted by path.
///
/// Symbolic links are never followed or returned.
///
/// # Errors
///
/// Returns `Validation` if `dir` is not a directory, or `Io` if a directory
/// can't be read.
pub fn traverse_directory<F>(dir: impl AsRef<Path>, recursive: bool, filter: Option<F>) -> Result<Vec<PathBuf>>
where
    F: Fn(&Path) -> bool,
{
    let dir = dir.as_ref();
    let mut files = Vec::new();

    if !dir.is_dir() {
        return Err(UnifileError::validation(format!(
            "Path is not a directory: {}",
            dir.display()
        )));
    }

    traverse_directory_impl(dir, recursive, &filter, &mut files)?;
    files.sort();
    Ok(files)
}

fn traverse_directory_impl<F>(dir: &Path, recursive: bool, filter: &Option<F>, files: &mut Vec<PathBuf>) -> Result<()>
where
    F: Fn(&Path) -> bool,
{
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();

        if file_type.is_file() {
            if filter.as_ref().is_none_or(|f| f(&path)) {
                files.push(path);
            }
        } else if file_type.is_dir() && recursive {
            traverse_directory_impl(&path, recursive, filter, files)?;
        }
    }

    Ok(())
}
