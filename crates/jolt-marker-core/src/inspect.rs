//! Consumer-side marker inspection
//!
//! Editors and orchestrators answer "is a dev server running here, and on
//! which port?" by reading the marker. Presence alone is not enough: a
//! crashed session can leave its marker behind. A marker is only trusted when
//! its `lastUpdatedAt` is within the staleness window and its process still
//! exists.
//!
//! ## Liveness
//!
//! Process liveness is checked with `kill(pid, 0)` on Unix, which probes
//! existence without sending a signal. Other platforms skip the check and
//! rely on the timestamp alone.

use crate::io::{MarkerError, read_marker};
use crate::schema::MarkerRecord;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;

/// What a reader should conclude from the marker file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerLiveness {
    /// No marker file
    Absent,
    /// Fresh marker from a live process
    Live(MarkerRecord),
    /// Marker exists but its session is likely dead
    Stale(MarkerRecord),
}

impl MarkerLiveness {
    /// Port of a live session, if it advertised one
    pub fn live_port(&self) -> Option<u16> {
        match self {
            MarkerLiveness::Live(record) => record.server_port,
            _ => None,
        }
    }
}

/// Inspect the marker at `path` as of now.
///
/// # Errors
///
/// Returns `MarkerError::Io` if the file exists but cannot be read and
/// `MarkerError::Json` if its content is not a marker record.
pub fn inspect(path: &Path, stale_after: Duration) -> Result<MarkerLiveness, MarkerError> {
    inspect_at(path, stale_after, Utc::now())
}

/// [`inspect`] against an explicit clock.
pub fn inspect_at(
    path: &Path,
    stale_after: Duration,
    now: DateTime<Utc>,
) -> Result<MarkerLiveness, MarkerError> {
    let Some(record) = read_marker(path)? else {
        return Ok(MarkerLiveness::Absent);
    };

    if record.is_stale_at(now, stale_after) || !is_pid_alive(record.process_id) {
        return Ok(MarkerLiveness::Stale(record));
    }

    Ok(MarkerLiveness::Live(record))
}

/// Check whether a process with `pid` exists.
///
/// Always `true` on non-Unix platforms, where only the timestamp is used.
pub fn is_pid_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        pid_alive_unix(pid)
    }

    #[cfg(not(unix))]
    {
        let _ = pid;
        true
    }
}

#[cfg(unix)]
fn pid_alive_unix(pid: u32) -> bool {
    let Ok(pid_t) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid_t <= 0 {
        return false;
    }
    // SAFETY: kill with sig=0 never sends a signal; it only checks PID existence.
    let result = unsafe { libc::kill(pid_t, 0) };
    if result == 0 {
        return true;
    }
    // EPERM: the process exists but belongs to someone else
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MarkerStore;
    use tempfile::TempDir;

    const WINDOW: Duration = Duration::from_secs(70);

    #[test]
    fn test_absent_marker() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".jolt-marker.tmp");
        assert_eq!(inspect(&path, WINDOW).unwrap(), MarkerLiveness::Absent);
    }

    #[test]
    fn test_fresh_marker_from_this_process_is_live() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = MarkerStore::new(temp_dir.path().join(".jolt-marker.tmp"));
        let record = MarkerRecord::new(std::process::id(), Some(5173), Utc::now());
        store.write(&record).unwrap();

        let liveness = inspect(store.path(), WINDOW).unwrap();

        assert_eq!(liveness.live_port(), Some(5173));
        assert_eq!(liveness, MarkerLiveness::Live(record));
    }

    #[test]
    fn test_old_marker_is_stale() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = MarkerStore::new(temp_dir.path().join(".jolt-marker.tmp"));
        let written_at = Utc::now();
        store
            .write(&MarkerRecord::new(std::process::id(), None, written_at))
            .unwrap();

        let later = written_at + chrono::Duration::seconds(71);
        let liveness = inspect_at(store.path(), WINDOW, later).unwrap();

        assert!(matches!(liveness, MarkerLiveness::Stale(_)));
        assert_eq!(liveness.live_port(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_dead_pid_is_stale() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = MarkerStore::new(temp_dir.path().join(".jolt-marker.tmp"));
        // Beyond the default Linux pid_max, so no such process exists
        store
            .write(&MarkerRecord::new(4_194_304 + 17, None, Utc::now()))
            .unwrap();

        let liveness = inspect(store.path(), WINDOW).unwrap();

        assert!(matches!(liveness, MarkerLiveness::Stale(_)));
    }

    #[test]
    fn test_garbage_marker_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".jolt-marker.tmp");
        std::fs::write(&path, "{}").unwrap();

        assert!(matches!(
            inspect(&path, WINDOW),
            Err(MarkerError::Json { .. })
        ));
    }

    #[test]
    fn test_is_pid_alive_self() {
        assert!(is_pid_alive(std::process::id()));
    }
}
