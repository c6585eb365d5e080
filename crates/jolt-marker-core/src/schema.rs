//! Marker record persisted to the marker file

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The single persisted entity: identity and freshness of a dev session.
///
/// Serialized as a flat camelCase JSON object:
///
/// ```json
/// {"processId":4242,"serverPort":5173,"createdAt":"2026-10-17T09:00:00Z","lastUpdatedAt":"2026-10-17T09:01:00Z"}
/// ```
///
/// `serverPort` is written as `null` when the port is not known yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerRecord {
    /// OS process id of the dev session
    pub process_id: u32,
    /// Port the dev server bound to, if known
    #[serde(default)]
    pub server_port: Option<u16>,
    /// When the session's first marker write happened
    pub created_at: DateTime<Utc>,
    /// When the marker was last refreshed
    pub last_updated_at: DateTime<Utc>,
}

impl MarkerRecord {
    /// Create a record for a session starting at `now`.
    ///
    /// A port of `0` means "not bound yet" and is stored as absent.
    pub fn new(process_id: u32, server_port: Option<u16>, now: DateTime<Utc>) -> Self {
        Self {
            process_id,
            server_port: normalize_port(server_port),
            created_at: now,
            last_updated_at: now,
        }
    }

    /// Refresh `last_updated_at`. Never moves it backwards, even if the wall
    /// clock stepped back since the previous write.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_updated_at {
            self.last_updated_at = now;
        }
    }

    /// Update the advertised port; `0` clears it.
    pub fn set_server_port(&mut self, port: Option<u16>) {
        self.server_port = normalize_port(port);
    }

    /// True when the last refresh is older than `stale_after` relative to `now`.
    pub fn is_stale_at(&self, now: DateTime<Utc>, stale_after: Duration) -> bool {
        let age = now.signed_duration_since(self.last_updated_at);
        match chrono::Duration::from_std(stale_after) {
            Ok(limit) => age > limit,
            Err(_) => false,
        }
    }
}

fn normalize_port(port: Option<u16>) -> Option<u16> {
    port.filter(|p| *p != 0)
}
