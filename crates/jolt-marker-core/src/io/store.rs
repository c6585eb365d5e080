//! Marker file store
//!
//! Owns the one marker file for this process. Writes go through
//! [`atomic_write`](super::atomic::atomic_write); deletes are idempotent and
//! only ever remove a file this store wrote.

use crate::io::atomic::atomic_write;
use crate::io::error::MarkerError;
use crate::schema::MarkerRecord;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read/write/delete access to the marker file at a fixed path.
#[derive(Debug)]
pub struct MarkerStore {
    path: PathBuf,
    /// Whether this store believes the artifact is currently on disk
    present: bool,
}

impl MarkerStore {
    /// Create a store for the marker at `path`. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            present: false,
        }
    }

    /// Serialize `record` to the marker path, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns `MarkerError::Json` if serialization fails, or
    /// `MarkerError::Io` if the file cannot be written.
    pub fn write(&mut self, record: &MarkerRecord) -> Result<(), MarkerError> {
        let json = serde_json::to_vec(record).map_err(|e| MarkerError::Json {
            path: self.path.clone(),
            source: e,
        })?;
        atomic_write(&self.path, &json)?;
        self.present = true;
        debug!(path = %self.path.display(), "marker written");
        Ok(())
    }

    /// Remove the marker if this store wrote it.
    ///
    /// Calling this when nothing was written, or a second time, succeeds
    /// without touching the filesystem. A file that already vanished counts as
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns `MarkerError::Io` if the removal fails for a reason other than
    /// the file being absent. The store keeps `present` set in that case so a
    /// later call can retry.
    pub fn delete(&mut self) -> Result<(), MarkerError> {
        if !self.present {
            return Ok(());
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(MarkerError::io(&self.path, e)),
        }

        self.present = false;
        debug!(path = %self.path.display(), "marker deleted");
        Ok(())
    }

    /// Read the record currently on disk, `Ok(None)` if there is none.
    ///
    /// # Errors
    ///
    /// Returns `MarkerError::Io` on read failure and `MarkerError::Json` if the
    /// file content is not a marker record.
    pub fn read(&self) -> Result<Option<MarkerRecord>, MarkerError> {
        read_marker(&self.path)
    }

    /// Marker file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this store has a marker on disk
    pub fn is_present(&self) -> bool {
        self.present
    }
}

/// Read and parse the marker at `path`, `Ok(None)` if the file is absent.
pub fn read_marker(path: &Path) -> Result<Option<MarkerRecord>, MarkerError> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(MarkerError::io(path, e)),
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| MarkerError::Json {
            path: path.to_path_buf(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> MarkerStore {
        MarkerStore::new(dir.path().join(".jolt-marker.tmp"))
    }

    #[test]
    fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store_in(&temp_dir);
        let record = MarkerRecord::new(std::process::id(), Some(5173), Utc::now());

        store.write(&record).unwrap();

        assert!(store.is_present());
        assert_eq!(store.read().unwrap(), Some(record));
    }

    #[test]
    fn test_repeated_write_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store_in(&temp_dir);
        let mut record = MarkerRecord::new(1, None, Utc::now());

        store.write(&record).unwrap();
        record.set_server_port(Some(3000));
        store.write(&record).unwrap();

        let on_disk = store.read().unwrap().unwrap();
        assert_eq!(on_disk.server_port, Some(3000));
    }

    #[test]
    fn test_delete_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store_in(&temp_dir);
        store.write(&MarkerRecord::new(1, None, Utc::now())).unwrap();

        store.delete().unwrap();

        assert!(!store.path().exists());
        assert!(!store.is_present());
    }

    #[test]
    fn test_delete_twice_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store_in(&temp_dir);
        store.write(&MarkerRecord::new(1, None, Utc::now())).unwrap();

        store.delete().unwrap();
        store.delete().unwrap();

        assert!(!store.path().exists());
    }

    #[test]
    fn test_delete_without_write_leaves_foreign_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store_in(&temp_dir);
        fs::write(store.path(), "left by another process").unwrap();

        store.delete().unwrap();

        assert!(store.path().exists());
    }

    #[test]
    fn test_delete_after_external_removal() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = store_in(&temp_dir);
        store.write(&MarkerRecord::new(1, None, Utc::now())).unwrap();
        fs::remove_file(store.path()).unwrap();

        store.delete().unwrap();

        assert!(!store.is_present());
    }

    #[test]
    fn test_read_absent_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn test_read_garbage_is_json_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = store_in(&temp_dir);
        fs::write(store.path(), "not json").unwrap();

        assert!(matches!(store.read(), Err(MarkerError::Json { .. })));
    }

    #[test]
    fn test_write_failure_keeps_absent() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = MarkerStore::new(temp_dir.path().join("nope").join("m.tmp"));

        let result = store.write(&MarkerRecord::new(1, None, Utc::now()));

        assert!(result.is_err());
        assert!(!store.is_present());
    }
}
