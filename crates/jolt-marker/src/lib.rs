//! Dev-server liveness marker lifecycle
//!
//! While a host build tool runs an interactive dev server, this crate keeps a
//! marker file (`.jolt-marker.tmp` by default) in the project root so that
//! editors and other tools can discover the server:
//!
//! ```json
//! {"processId": 4242, "serverPort": 5173,
//!  "createdAt": "2026-01-05T10:00:00Z", "lastUpdatedAt": "2026-01-05T10:01:00Z"}
//! ```
//!
//! The marker exists only while the session is active. It is refreshed by a
//! heartbeat and removed on explicit end, drop, process exit and termination
//! signals. Test runners, editor tooling and type checkers that load the
//! host config are recognised and never write one.
//!
//! Hosts drive it through [`plugin::DevServerMarkerPlugin`], or use
//! [`manager::LifecycleManager`] directly.

pub mod guard;
pub mod heartbeat;
pub mod host;
pub mod manager;
pub mod plugin;

pub use guard::{SessionCleanup, TerminationGuard};
pub use heartbeat::HeartbeatScheduler;
pub use host::{HookError, HookMetadata, HostCommand, HostContext, HostHooks};
pub use manager::{LifecycleManager, SessionState, StartOutcome};
pub use plugin::DevServerMarkerPlugin;
