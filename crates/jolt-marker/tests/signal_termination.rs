//! Signal-driven termination
//!
//! Raises a real SIGUSR2 at this test process and checks that the listener
//! removes the marker and stops the heartbeat before reaching the exit path.
//! Runs as its own test binary so the process-wide handlers do not leak into
//! other suites.

#![cfg(unix)]

use jolt_marker::guard::TerminationGuard;
use jolt_marker::{HostCommand, HostContext, LifecycleManager, SessionState};
use jolt_marker_core::classify::FixedEnv;
use jolt_marker_core::config::Config;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;
use tempfile::TempDir;

static EXIT_CODE: AtomicI32 = AtomicI32::new(-1);

fn record_exit(code: i32) {
    EXIT_CODE.store(code, Ordering::SeqCst);
}

async fn wait_for_exit() -> Option<i32> {
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        let code = EXIT_CODE.load(Ordering::SeqCst);
        if code >= 0 {
            return Some(code);
        }
        if std::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sigusr2_removes_marker_and_stops_heartbeat() {
    let root = TempDir::new().unwrap();
    let mut config = Config::default();
    config.marker.heartbeat_ms = 50;
    let mut manager = LifecycleManager::with_env(config, FixedEnv::new())
        .with_termination_guard(TerminationGuard::with_exit(record_exit));
    manager.set_command(HostCommand::Serve);

    manager.start_session(&HostContext::new(root.path()).with_server_port(5173));
    let marker = manager.marker_path().unwrap();
    assert!(marker.exists());

    // SAFETY: a handler for SIGUSR2 is registered by start_session
    unsafe {
        libc::raise(libc::SIGUSR2);
    }

    let code = wait_for_exit().await;
    assert_eq!(code, Some(128 + libc::SIGUSR2));
    assert!(!marker.exists());
    assert_eq!(manager.state(), SessionState::Terminated);

    // Several heartbeat periods later the marker is still gone
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!marker.exists());
}
