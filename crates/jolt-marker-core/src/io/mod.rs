//! Marker file I/O
//!
//! - **Atomic replace**: temp file + rename, readers never see a torn record
//! - **Idempotent delete**: only removes what this process wrote, tolerates
//!   the file already being gone
//!
//! # Example
//!
//! ```rust,no_run
//! use jolt_marker_core::io::MarkerStore;
//! use jolt_marker_core::MarkerRecord;
//!
//! let mut store = MarkerStore::new(".jolt-marker.tmp");
//! let record = MarkerRecord::new(std::process::id(), Some(5173), chrono::Utc::now());
//! store.write(&record).unwrap();
//! store.delete().unwrap();
//! store.delete().unwrap(); // no-op
//! ```

pub mod atomic;
pub mod error;
pub mod store;

pub use error::MarkerError;
pub use store::{MarkerStore, read_marker};
