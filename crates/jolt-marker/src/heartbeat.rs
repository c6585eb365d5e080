//! Periodic marker refresh

use jolt_marker_core::MarkerError;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default heartbeat period (one minute)
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(60_000);

/// Runs a write callback immediately and then once per period until stopped.
///
/// Ticks are cooperative tasks on the current tokio runtime, not OS threads.
/// `stop()` prevents future ticks; a tick already executing finishes.
#[derive(Debug, Default)]
pub struct HeartbeatScheduler {
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl HeartbeatScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke `write_fn` now, then every `period`.
    ///
    /// Returns `false` (and does nothing) if the scheduler is already running.
    /// Outside a tokio runtime only the immediate write happens and a warning
    /// is logged.
    pub fn start<F>(&mut self, mut write_fn: F, period: Duration) -> bool
    where
        F: FnMut() -> Result<(), MarkerError> + Send + 'static,
    {
        if self.is_running() {
            return false;
        }

        run_tick(&mut write_fn);

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available; marker heartbeat disabled");
            return false;
        };

        let cancel = CancellationToken::new();
        let task = handle.spawn(heartbeat_loop(write_fn, period, cancel.clone()));
        self.cancel = Some(cancel);
        self.task = Some(task);
        true
    }

    /// Cancel future ticks. Safe to call when stopped or more than once.
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
            debug!("Heartbeat stop requested");
        }
        // Detach: the loop observes the token and exits on its own
        self.task = None;
    }

    pub fn is_running(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| !c.is_cancelled())
    }
}

impl Drop for HeartbeatScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn heartbeat_loop<F>(mut write_fn: F, period: Duration, cancel: CancellationToken)
where
    F: FnMut() -> Result<(), MarkerError> + Send + 'static,
{
    info!("Starting marker heartbeat (interval: {:?})", period);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Marker heartbeat cancelled");
                break;
            }
            _ = ticker.tick() => {
                run_tick(&mut write_fn);
            }
        }
    }
}

fn run_tick<F>(write_fn: &mut F)
where
    F: FnMut() -> Result<(), MarkerError>,
{
    match write_fn() {
        Ok(()) => debug!("Marker heartbeat written"),
        Err(e) => warn!("Marker heartbeat write failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    const PERIOD: Duration = Duration::from_secs(60);

    fn counting() -> (Arc<AtomicUsize>, impl FnMut() -> Result<(), MarkerError> + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    /// Let spawned tasks observe the current (paused) clock
    async fn settle() {
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_writes_immediately() {
        let (count, write) = counting();
        let mut scheduler = HeartbeatScheduler::new();

        assert!(scheduler.start(write, PERIOD));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_period() {
        let (count, write) = counting();
        let mut scheduler = HeartbeatScheduler::new();
        scheduler.start(write, PERIOD);
        settle().await;

        tokio::time::sleep(PERIOD + Duration::from_millis(1)).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        tokio::time::sleep(PERIOD).await;
        settle().await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_before_period() {
        let (count, write) = counting();
        let mut scheduler = HeartbeatScheduler::new();
        scheduler.start(write, PERIOD);
        settle().await;

        tokio::time::sleep(PERIOD - Duration::from_secs(1)).await;
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_future_ticks() {
        let (count, write) = counting();
        let mut scheduler = HeartbeatScheduler::new();
        scheduler.start(write, PERIOD);
        settle().await;

        scheduler.stop();
        tokio::time::sleep(PERIOD * 3).await;
        settle().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let mut scheduler = HeartbeatScheduler::new();
        scheduler.stop();

        let (_count, write) = counting();
        scheduler.start(write, PERIOD);
        scheduler.stop();
        scheduler.stop();

        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_noop() {
        let (first, write1) = counting();
        let (second, write2) = counting();
        let mut scheduler = HeartbeatScheduler::new();

        assert!(scheduler.start(write1, PERIOD));
        assert!(!scheduler.start(write2, PERIOD));

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_failed_tick_keeps_running() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let a = Arc::clone(&attempts);
        let write = move || {
            let n = a.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(MarkerError::Io {
                    path: PathBuf::from("/readonly/.jolt-marker.tmp"),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                })
            } else {
                Ok(())
            }
        };
        let mut scheduler = HeartbeatScheduler::new();
        scheduler.start(write, PERIOD);
        settle().await;

        tokio::time::sleep(PERIOD + Duration::from_millis(1)).await;
        settle().await;
        tokio::time::sleep(PERIOD).await;
        settle().await;

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(scheduler.is_running());
        assert!(logs_contain("Marker heartbeat write failed"));
    }

    #[test]
    fn test_start_outside_runtime_writes_once() {
        let (count, write) = counting();
        let mut scheduler = HeartbeatScheduler::new();

        assert!(!scheduler.start(write, PERIOD));

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_running());
    }
}
