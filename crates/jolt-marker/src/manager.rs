//! Dev-server marker lifecycle
//!
//! ```text
//!            start (serve + real session)          end / signal / drop
//!   Idle ───────────────────────────────▶ Active ───────────────────────▶ Terminated
//!    │ start (probe, build, ...)
//!    └──▶ stays Idle, nothing written
//! ```
//!
//! `Terminated` is final: one session per process.

use crate::guard::{SessionCleanup, TerminationGuard, weak_target};
use crate::heartbeat::HeartbeatScheduler;
use crate::host::{HostCommand, HostContext};
use chrono::Utc;
use jolt_marker_core::classify::{EnvSource, ProbeReason, ProcessEnv, Verdict, classify};
use jolt_marker_core::config::Config;
use jolt_marker_core::{MarkerError, MarkerRecord, MarkerStore};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Lifecycle state of the marker session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session started (or the invocation was not a real dev session)
    Idle,
    /// Marker written and refreshed
    Active,
    /// Marker removed; final
    Terminated,
}

/// What `start_session` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Marker written, heartbeat running
    Started { marker_path: PathBuf },
    /// The host is not running a dev server command
    NotServe,
    /// The invocation is tooling, not a dev session
    Probe(ProbeReason),
    /// A session is already active
    AlreadyActive,
    /// The session already ended in this process
    AlreadyTerminated,
}

/// Orchestrates classification, marker writes, heartbeat and cleanup.
pub struct LifecycleManager {
    core: Arc<SessionCore>,
    guard: TerminationGuard,
    config: Config,
    env: Box<dyn EnvSource + Send + Sync>,
    command: Option<HostCommand>,
}

/// State shared with the heartbeat task and the signal listeners
#[derive(Debug)]
struct SessionCore {
    session: Mutex<Session>,
    heartbeat: Mutex<HeartbeatScheduler>,
}

#[derive(Debug)]
struct Session {
    state: SessionState,
    store: Option<MarkerStore>,
    record: Option<MarkerRecord>,
    /// First write carries `lastUpdatedAt == createdAt`
    initial_write: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionCore {
    fn new() -> Self {
        Self {
            session: Mutex::new(Session {
                state: SessionState::Idle,
                store: None,
                record: None,
                initial_write: false,
            }),
            heartbeat: Mutex::new(HeartbeatScheduler::new()),
        }
    }

    /// Heartbeat tick: refresh `lastUpdatedAt` and rewrite. Writes nothing
    /// once the session left `Active`, so a late tick cannot resurrect the
    /// marker after cleanup.
    fn refresh(&self) -> Result<(), MarkerError> {
        let mut session = lock(&self.session);
        if session.state != SessionState::Active {
            return Ok(());
        }
        let Session {
            store,
            record,
            initial_write,
            ..
        } = &mut *session;
        match (store.as_mut(), record.as_mut()) {
            (Some(store), Some(record)) => {
                if !std::mem::take(initial_write) {
                    record.touch(Utc::now());
                }
                store.write(record)
            }
            _ => Ok(()),
        }
    }
}

impl SessionCleanup for SessionCore {
    fn cleanup(&self) -> Result<(), MarkerError> {
        lock(&self.heartbeat).stop();

        let mut session = lock(&self.session);
        if session.state == SessionState::Idle {
            return Ok(());
        }
        if session.state == SessionState::Active {
            info!("Dev session ended, removing marker");
        }
        session.state = SessionState::Terminated;

        #[cfg(unix)]
        crate::guard::raw::disarm();

        match session.store.as_mut() {
            Some(store) => store.delete(),
            None => Ok(()),
        }
    }
}

impl LifecycleManager {
    /// Manager that classifies against the real process environment.
    pub fn new(config: Config) -> Self {
        Self::with_env(config, ProcessEnv)
    }

    /// Manager reading the environment through `env`.
    pub fn with_env(config: Config, env: impl EnvSource + Send + Sync + 'static) -> Self {
        Self {
            core: Arc::new(SessionCore::new()),
            guard: TerminationGuard::new(),
            config,
            env: Box::new(env),
            command: None,
        }
    }

    /// Replace the termination guard (before the session starts).
    pub fn with_termination_guard(mut self, guard: TerminationGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Record which command the host resolved its config for.
    pub fn set_command(&mut self, command: HostCommand) {
        self.command = Some(command);
    }

    pub fn state(&self) -> SessionState {
        lock(&self.core.session).state
    }

    /// Marker path of the current or last session
    pub fn marker_path(&self) -> Option<PathBuf> {
        lock(&self.core.session)
            .store
            .as_ref()
            .map(|s| s.path().to_path_buf())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start the session if this is a real dev-server invocation.
    ///
    /// On success the marker has been written once (a failed first write is
    /// logged; the session still becomes active and the heartbeat retries),
    /// the heartbeat is running and the termination guard is registered.
    pub fn start_session(&mut self, ctx: &HostContext) -> StartOutcome {
        match self.state() {
            SessionState::Active => return StartOutcome::AlreadyActive,
            SessionState::Terminated => return StartOutcome::AlreadyTerminated,
            SessionState::Idle => {}
        }

        if !self.command.is_some_and(HostCommand::is_serve) {
            debug!("Not a serve command; skipping dev-server marker");
            return StartOutcome::NotServe;
        }

        if let Verdict::Probe(reason) = classify(&self.config.classifier, self.env.as_ref()) {
            info!("Tooling invocation ({}); skipping dev-server marker", reason);
            return StartOutcome::Probe(reason);
        }

        let marker_path = ctx.root.join(&self.config.marker.file);
        {
            let mut session = lock(&self.core.session);
            session.store = Some(MarkerStore::new(&marker_path));
            session.record = Some(MarkerRecord::new(
                self.env.process_id(),
                ctx.server_port,
                Utc::now(),
            ));
            session.initial_write = true;
            session.state = SessionState::Active;
        }
        self.guard.arm(&marker_path);

        // First tick is the initial write
        let core = Arc::clone(&self.core);
        let period = self.config.marker.heartbeat_period();
        lock(&self.core.heartbeat).start(move || core.refresh(), period);

        self.guard.ensure_registered(weak_target(&self.core));

        info!(
            path = %marker_path.display(),
            port = ?ctx.server_port,
            "Dev session started"
        );
        StartOutcome::Started { marker_path }
    }

    /// Update the advertised port and rewrite the marker right away.
    /// Ignored unless a session is active.
    pub fn set_server_port(&self, port: Option<u16>) -> Result<(), MarkerError> {
        let mut session = lock(&self.core.session);
        if session.state != SessionState::Active {
            return Ok(());
        }
        let Session { store, record, .. } = &mut *session;
        match (store.as_mut(), record.as_mut()) {
            (Some(store), Some(record)) => {
                record.set_server_port(port);
                record.touch(Utc::now());
                store.write(record)
            }
            _ => Ok(()),
        }
    }

    /// Stop the heartbeat and delete the marker. Idempotent; also what every
    /// termination path runs.
    pub fn end_session(&self) -> Result<(), MarkerError> {
        self.core.cleanup()
    }
}

impl Drop for LifecycleManager {
    fn drop(&mut self) {
        if let Err(e) = self.core.cleanup() {
            warn!("Failed to remove dev-server marker on shutdown: {}", e);
        }
    }
}

impl std::fmt::Debug for LifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("state", &self.state())
            .field("command", &self.command)
            .field("guard", &self.guard)
            .finish()
    }
}
