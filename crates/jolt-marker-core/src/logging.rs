//! Shared logging initialization for hosts embedding the marker.
//!
//! Library code only emits `tracing` events. A host that has no subscriber of
//! its own can call [`init`] to get plain formatted output on stderr.

use std::sync::OnceLock;

/// Environment variable selecting the log level (`trace`..`error`).
pub const LOG_ENV: &str = "JOLT_MARKER_LOG";

static INIT: OnceLock<()> = OnceLock::new();

fn parse_level(raw: Option<&str>) -> tracing::Level {
    match raw.unwrap_or("info").trim().to_ascii_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

/// Initialize process-level tracing output from `JOLT_MARKER_LOG`.
///
/// Safe to call multiple times; only the first call initializes the
/// subscriber. Best-effort: if the host already installed a global
/// subscriber this silently does nothing.
pub fn init() {
    if INIT.get().is_some() {
        return;
    }
    let level = parse_level(std::env::var(LOG_ENV).ok().as_deref());
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    let _ = INIT.set(());
}
