//! Periodic eviction of stale limiter entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::limiter::RateLimiter;
use crate::error::{FloodgateError, Result};

/// How often stale entries are swept when nothing else is configured.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Handle to a running sweep task.
///
/// The task stops when the handle is shut down or dropped.
#[derive(Debug)]
pub struct SweepHandle {
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Stop the sweep task.
    pub fn shutdown(self) {
        self.task.abort();
    }

    /// Whether the sweep task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start sweeping `limiter` every `interval`.
///
/// The first sweep runs one full interval after the call. A zero interval is
/// rejected. Must be called from within a tokio runtime.
pub fn spawn_sweeper(limiter: &Arc<RateLimiter>, interval: Duration) -> Result<SweepHandle> {
    if interval.is_zero() {
        return Err(FloodgateError::Config(
            "sweep interval must be greater than zero".to_string(),
        ));
    }

    let limiter = Arc::clone(limiter);

    info!(interval_secs = interval.as_secs(), "Starting rate limit sweeper");

    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let evicted = limiter.cleanup();
            debug!(
                evicted = evicted,
                tracked = limiter.tracked_count(),
                "Rate limit sweep complete"
            );
        }
    });

    Ok(SweepHandle { task })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::{LimitConfig, ManualClock};

    fn create_test_limiter() -> (Arc<RateLimiter>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let config =
            LimitConfig::new(3, Duration::from_secs(60), Duration::from_secs(120)).unwrap();
        let limiter = Arc::new(RateLimiter::with_clock(config, clock.clone()));
        (limiter, clock)
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_after_interval() {
        let (limiter, clock) = create_test_limiter();
        limiter.is_allowed("fp_once");
        clock.advance(61_000);

        let _handle = spawn_sweeper(&limiter, Duration::from_secs(300)).unwrap();

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert_eq!(limiter.tracked_count(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(limiter.tracked_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_keeps_active_entries() {
        let (limiter, _clock) = create_test_limiter();
        limiter.is_allowed("fp_active");

        let _handle = spawn_sweeper(&limiter, Duration::from_secs(10)).unwrap();

        tokio::time::sleep(Duration::from_secs(35)).await;
        tokio::task::yield_now().await;
        assert_eq!(limiter.tracked_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_on_shutdown() {
        let (limiter, clock) = create_test_limiter();
        let handle = spawn_sweeper(&limiter, Duration::from_secs(10)).unwrap();
        handle.shutdown();

        limiter.is_allowed("fp_once");
        clock.advance(61_000);

        tokio::time::sleep(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        assert_eq!(limiter.tracked_count(), 1);
    }

    #[tokio::test]
    async fn test_sweeper_rejects_zero_interval() {
        let (limiter, _clock) = create_test_limiter();

        let err = spawn_sweeper(&limiter, Duration::ZERO).unwrap_err();
        assert!(matches!(err, FloodgateError::Config(_)));
    }
}
