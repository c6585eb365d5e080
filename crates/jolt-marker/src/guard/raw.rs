//! Raw `sigaction` and `atexit` hooks
//!
//! Synchronous signals (abort, faults, breakpoints) are delivered to the
//! thread that caused them and end the process before any runtime task could
//! run. Their handler, and the `atexit` hook covering `std::process::exit`,
//! can only do async-signal-safe work: unlink the armed marker path. The path
//! is published as a leaked C string through one atomic pointer.
//!
//! Handlers already installed for these signals (the Rust runtime's
//! stack-overflow reporter on SIGSEGV/SIGBUS, a host's crash reporter) are
//! kept and chained to after the unlink. Ours runs on the alternate signal
//! stack so a stack overflow can still reach it.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr;
use std::sync::{Once, OnceLock};
use std::sync::atomic::{AtomicPtr, Ordering};
use tracing::warn;

/// Signals handled with a raw handler: (signo, name)
pub(crate) const SYNC_SIGNALS: &[(libc::c_int, &str)] = &[
    (libc::SIGABRT, "SIGABRT"),
    (libc::SIGBUS, "SIGBUS"),
    (libc::SIGFPE, "SIGFPE"),
    (libc::SIGILL, "SIGILL"),
    (libc::SIGSEGV, "SIGSEGV"),
    (libc::SIGTRAP, "SIGTRAP"),
];

static ARMED_PATH: AtomicPtr<libc::c_char> = AtomicPtr::new(ptr::null_mut());
static INSTALL: Once = Once::new();
static PREVIOUS: OnceLock<Vec<(libc::c_int, libc::sigaction)>> = OnceLock::new();

/// Install the raw handlers and the atexit hook. Process-wide, runs once.
pub(crate) fn install() {
    INSTALL.call_once(|| {
        let mut previous = Vec::with_capacity(SYNC_SIGNALS.len());
        for &(signo, name) in SYNC_SIGNALS {
            // SAFETY: both actions are fully initialized (zeroed, then mask
            // emptied) and `on_sync_signal` only performs async-signal-safe calls.
            let (rc, old) = unsafe {
                let mut action: libc::sigaction = std::mem::zeroed();
                let mut old: libc::sigaction = std::mem::zeroed();
                action.sa_sigaction = on_sync_signal as extern "C" fn(libc::c_int) as usize;
                action.sa_flags = libc::SA_RESETHAND | libc::SA_NODEFER | libc::SA_ONSTACK;
                libc::sigemptyset(&mut action.sa_mask);
                (libc::sigaction(signo, &action, &mut old), old)
            };
            if rc == 0 {
                previous.push((signo, old));
            } else {
                warn!(
                    "Failed to install {} handler: {}",
                    name,
                    std::io::Error::last_os_error()
                );
            }
        }
        let _ = PREVIOUS.set(previous);

        // SAFETY: registering a plain extern "C" fn with no captured state.
        if unsafe { libc::atexit(on_exit) } != 0 {
            warn!("Failed to register marker atexit hook");
        }
    });
}

/// Publish `path` as the file the raw handlers remove.
pub(crate) fn arm(path: &Path) {
    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        warn!(path = %path.display(), "Marker path contains NUL; raw exit hooks disabled");
        return;
    };
    // Previous strings are leaked: a handler on another thread may still hold one
    ARMED_PATH.swap(c_path.into_raw(), Ordering::SeqCst);
}

/// Stop the raw handlers from touching the marker.
pub(crate) fn disarm() {
    ARMED_PATH.swap(ptr::null_mut(), Ordering::SeqCst);
}

/// Whether a marker path is currently armed
pub(crate) fn is_armed() -> bool {
    !ARMED_PATH.load(Ordering::SeqCst).is_null()
}

fn unlink_armed() {
    let path = ARMED_PATH.swap(ptr::null_mut(), Ordering::SeqCst);
    if !path.is_null() {
        // SAFETY: `path` came from CString::into_raw and is never freed.
        unsafe {
            libc::unlink(path);
        }
    }
}

fn previous_action(signo: libc::c_int) -> Option<&'static libc::sigaction> {
    PREVIOUS
        .get()?
        .iter()
        .find(|(s, _)| *s == signo)
        .map(|(_, action)| action)
}

/// Whether `signo` currently has the default disposition
fn is_default_action(signo: libc::c_int) -> bool {
    // SAFETY: query only; `current` is written by the kernel.
    unsafe {
        let mut current: libc::sigaction = std::mem::zeroed();
        libc::sigaction(signo, ptr::null(), &mut current) == 0
            && current.sa_sigaction == libc::SIG_DFL
    }
}

extern "C" fn on_sync_signal(signo: libc::c_int) {
    unlink_armed();

    // SAFETY: sigaction, signal and raise are async-signal-safe.
    unsafe {
        match previous_action(signo) {
            Some(previous) => {
                libc::sigaction(signo, previous, ptr::null_mut());
            }
            None => {
                libc::signal(signo, libc::SIG_DFL);
            }
        }
        libc::raise(signo);

        // A chained handler that reset the default and returned (the runtime's
        // stack-overflow handler does this for non-overflow faults) leaves a
        // raised signal unhandled; terminate with it.
        if is_default_action(signo) {
            libc::raise(signo);
        }
    }
}

extern "C" fn on_exit() {
    unlink_armed();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial(armed_path)]
    fn test_unlink_armed_removes_file_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".jolt-marker.tmp");
        std::fs::write(&path, "{}").unwrap();

        arm(&path);
        assert!(is_armed());
        unlink_armed();

        assert!(!path.exists());
        assert!(!is_armed());

        // Disarmed: a file recreated at the same path is left alone
        std::fs::write(&path, "{}").unwrap();
        unlink_armed();
        assert!(path.exists());
    }

    #[test]
    fn test_install_keeps_previous_handlers() {
        install();

        let previous = PREVIOUS.get().unwrap();
        assert_eq!(previous.len(), SYNC_SIGNALS.len());

        let ours = on_sync_signal as extern "C" fn(libc::c_int) as usize;
        // The test runtime installed its own stack-overflow handler first
        let segv = previous_action(libc::SIGSEGV).unwrap();
        assert_ne!(segv.sa_sigaction, ours);

        let current = unsafe {
            let mut current: libc::sigaction = std::mem::zeroed();
            libc::sigaction(libc::SIGSEGV, ptr::null(), &mut current);
            current
        };
        assert_eq!(current.sa_sigaction, ours);
        assert_ne!(current.sa_flags & libc::SA_ONSTACK, 0);
    }

    #[test]
    #[serial(armed_path)]
    fn test_disarm() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".jolt-marker.tmp");
        std::fs::write(&path, "{}").unwrap();

        arm(&path);
        disarm();
        on_exit();

        assert!(path.exists());
    }
}
