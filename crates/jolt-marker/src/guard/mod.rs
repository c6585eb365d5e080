//! Termination guard
//!
//! Makes sure the marker is removed however the process ends:
//!
//! - **Explicit end**: the host calls `session_end`, which runs cleanup directly.
//! - **Normal exit**: dropping the `LifecycleManager` runs cleanup (return from
//!   `main`, panic unwinding); an `atexit` hook covers `std::process::exit`.
//! - **Asynchronous signals** (HUP, INT, QUIT, TERM, USR1, USR2): a listener task
//!   per signal runs cleanup, then terminates the process with `128 + signo`.
//! - **Synchronous signals** (ABRT, BUS, FPE, ILL, SEGV, TRAP): a raw handler
//!   unlinks the marker and re-raises (see [`raw`]).
//!
//! Registration happens at most once per guard. Cleanup itself is idempotent,
//! so any number of these paths may fire.

#[cfg(unix)]
pub(crate) mod raw;

use jolt_marker_core::MarkerError;
use std::path::Path;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Something the guard can clean up on termination.
pub trait SessionCleanup: Send + Sync + 'static {
    /// Stop the heartbeat and delete the marker. Must be idempotent.
    fn cleanup(&self) -> Result<(), MarkerError>;
}

/// Process-exit action; `std::process::exit` outside tests
pub type ExitFn = fn(i32);

fn process_exit(code: i32) {
    std::process::exit(code)
}

/// Signals received through the async runtime: (signo, name)
#[cfg(unix)]
const ASYNC_SIGNALS: &[(libc::c_int, &str)] = &[
    (libc::SIGHUP, "SIGHUP"),
    (libc::SIGINT, "SIGINT"),
    (libc::SIGQUIT, "SIGQUIT"),
    (libc::SIGTERM, "SIGTERM"),
    (libc::SIGUSR1, "SIGUSR1"),
    (libc::SIGUSR2, "SIGUSR2"),
];

/// Once-only registration of exit and signal handlers for one session owner.
pub struct TerminationGuard {
    registered: bool,
    listeners: Vec<JoinHandle<()>>,
    exit: ExitFn,
}

impl Default for TerminationGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TerminationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminationGuard")
            .field("registered", &self.registered)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl TerminationGuard {
    pub fn new() -> Self {
        Self::with_exit(process_exit)
    }

    /// Guard whose signal path calls `exit` instead of terminating the process.
    pub fn with_exit(exit: ExitFn) -> Self {
        Self {
            registered: false,
            listeners: Vec::new(),
            exit,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Register handlers that call `target.cleanup()`. Returns `true` on the
    /// first call, `false` (no new handlers) afterwards.
    ///
    /// The guard keeps only a weak reference; once the target is dropped a
    /// signal still terminates the process but has nothing to clean.
    /// Signal listeners need a tokio runtime; without one only the raw hooks
    /// are installed.
    pub fn ensure_registered(&mut self, target: Weak<dyn SessionCleanup>) -> bool {
        if self.registered {
            return false;
        }
        self.registered = true;

        #[cfg(unix)]
        raw::install();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                self.listeners = spawn_listeners(&handle, target, self.exit);
                debug!("Registered {} termination listener(s)", self.listeners.len());
            }
            Err(_) => warn!("No async runtime available; signal cleanup disabled"),
        }
        true
    }

    /// Publish the marker path to the raw exit/fault hooks.
    pub fn arm(&self, path: &Path) {
        #[cfg(unix)]
        raw::arm(path);
        #[cfg(not(unix))]
        let _ = path;
    }

    /// Withdraw the marker path from the raw exit/fault hooks.
    pub fn disarm(&self) {
        #[cfg(unix)]
        raw::disarm();
    }
}

/// Run cleanup for a received signal and return the exit status to use.
///
/// Cleanup errors are swallowed: the process is going away and a failed
/// best-effort delete is not actionable.
pub fn handle_termination(target: &Weak<dyn SessionCleanup>, signo: i32, name: &str) -> i32 {
    info!("Received {}, removing dev-server marker", name);
    if let Some(target) = target.upgrade()
        && let Err(e) = target.cleanup()
    {
        debug!("Marker cleanup during {} failed: {}", name, e);
    }
    128 + signo
}

#[cfg(unix)]
fn spawn_listeners(
    handle: &tokio::runtime::Handle,
    target: Weak<dyn SessionCleanup>,
    exit: ExitFn,
) -> Vec<JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut listeners = Vec::new();
    for &(signo, name) in ASYNC_SIGNALS {
        let mut stream = match signal(SignalKind::from_raw(signo)) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to create {} handler: {}", name, e);
                continue;
            }
        };
        let target = target.clone();
        listeners.push(handle.spawn(async move {
            if stream.recv().await.is_some() {
                let code = handle_termination(&target, signo, name);
                exit(code);
            }
        }));
    }
    listeners
}

#[cfg(not(unix))]
fn spawn_listeners(
    handle: &tokio::runtime::Handle,
    target: Weak<dyn SessionCleanup>,
    exit: ExitFn,
) -> Vec<JoinHandle<()>> {
    vec![handle.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let code = handle_termination(&target, 2, "Ctrl+C");
            exit(code);
        }
    })]
}

/// Convenience for callers holding a strong reference.
pub fn weak_target<T: SessionCleanup>(target: &Arc<T>) -> Weak<dyn SessionCleanup> {
    let target: Arc<dyn SessionCleanup> = target.clone();
    Arc::downgrade(&target)
}
