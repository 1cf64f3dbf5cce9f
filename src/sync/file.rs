//! Atomic file operations.
//!
//! The planning store is always written as a whole: the new content goes to
//! a sibling temp file, is synced to disk, and is then renamed over the
//! target. Readers see either the old file or the new one, never a partial
//! write.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Path of the temp file used while replacing `path`.
#[must_use]
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace a file atomically.
///
/// This function:
/// 1. Removes a stale temp file left by an earlier crash
/// 2. Lets `write` produce the new content at the temp path
/// 3. Calls `fsync` to ensure data is on disk
/// 4. Atomically renames the temp file to the target path
///
/// If any step fails, the temp file is removed and the original file (if
/// any) remains untouched.
///
/// # Errors
///
/// Returns the error from `write` or from any file operation.
pub fn atomic_replace<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&Path) -> Result<()>,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_path_for(path);
    if temp_path.exists() {
        fs::remove_file(&temp_path)?;
    }

    let result = write(&temp_path).and_then(|()| {
        File::open(&temp_path)?.sync_all()?;
        fs::rename(&temp_path, path)?;
        Ok(())
    });

    if result.is_err() && temp_path.exists() {
        let _ = fs::remove_file(&temp_path);
    }

    result
}

/// Atomically replace a file with a byte buffer.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    atomic_replace(path, |temp| {
        fs::write(temp, content)?;
        Ok(())
    })
}

/// Get the size of a file in bytes.
///
/// Returns 0 if the file doesn't exist.
pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
