//! Atomic whole-file replacement

use crate::io::error::MarkerError;
use std::fs;
use std::path::{Path, PathBuf};

/// Replace the contents of `path` with `bytes` atomically.
///
/// Writes to a sibling temp file and renames it over the target, so a reader
/// sees either the previous content or the new content, never a torn file.
/// The parent directory must already exist.
///
/// # Errors
///
/// Returns `MarkerError::InvalidPath` if `path` has no file name, or
/// `MarkerError::Io` if the temp write or the rename fails. On rename failure
/// the temp file is removed.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), MarkerError> {
    let temp_path = temp_path_for(path)?;

    fs::write(&temp_path, bytes).map_err(|e| MarkerError::io(&temp_path, e))?;

    // On Windows, rename does not replace an existing file
    #[cfg(windows)]
    if path.exists() {
        fs::remove_file(path).map_err(|e| MarkerError::io(path, e))?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(MarkerError::io(path, e));
    }

    Ok(())
}

/// Temp file next to `path`: `.<name>.<pid>.swap`
fn temp_path_for(path: &Path) -> Result<PathBuf, MarkerError> {
    let name = path
        .file_name()
        .ok_or_else(|| MarkerError::InvalidPath {
            path: path.to_path_buf(),
        })?
        .to_string_lossy();
    Ok(path.with_file_name(format!(".{name}.{}.swap", std::process::id())))
}
