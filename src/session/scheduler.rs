//! Periodic background renewal check.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::RenewalCoordinator;

/// Owns the recurring timer that keeps the session fresh.
///
/// One timer task at most: `start` while running does nothing. The task
/// is aborted by `stop` and when the scheduler is dropped.
pub struct BackgroundScheduler {
    coordinator: RenewalCoordinator,
    period: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl BackgroundScheduler {
    pub fn new(coordinator: RenewalCoordinator, period: Duration) -> Self {
        Self {
            coordinator,
            period: period.max(Duration::from_millis(1)),
            task: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Spawn the timer task. Must be called from within a tokio runtime.
    ///
    /// The first check happens one period after start.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            tracing::debug!("Session scheduler already running");
            return;
        }

        let coordinator = self.coordinator.clone();
        let period = self.period;
        *task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                if coordinator.store().current().is_none() {
                    tracing::trace!("No session, skipping renewal check");
                    continue;
                }

                match coordinator.ensure_fresh().await {
                    Ok(credential) => tracing::debug!(
                        "Session check ok ({}s remaining)",
                        credential.seconds_remaining()
                    ),
                    Err(e) => tracing::warn!("Background renewal failed: {}", e),
                }
            }
        }));
        tracing::debug!("Session scheduler started (every {:?})", period);
    }

    /// Abort the timer task if one is running.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
            tracing::debug!("Session scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for BackgroundScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for BackgroundScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundScheduler")
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish()
    }
}
