//! Navigation mode: a cancellable fixed-cadence reroute timer.
//!
//! A session is either idle or actively navigating. Starting hands the
//! session a tick callback which fires once per reroute period until the
//! session is stopped or dropped. The timer task holds no reference back to
//! its owner, so dropping the session always tears the task down.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use utoipa::ToSchema;

/// Whether the session is currently navigating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NavigationStatus {
    /// No reroute timer is running.
    Idle,

    /// A reroute timer is firing on its cadence.
    Active,
}

/// Owns the reroute timer for one tracking session.
#[derive(Debug, Default)]
pub struct NavigationSession {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl NavigationSession {
    /// Creates an idle session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> NavigationStatus {
        if self.is_active() {
            NavigationStatus::Active
        } else {
            NavigationStatus::Idle
        }
    }

    /// Whether a reroute timer is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock_task()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Starts the reroute timer, firing `on_tick` once per `period`.
    ///
    /// The first tick fires one full period after starting. Returns `false`
    /// without replacing the timer if navigation is already active.
    pub fn start<F>(&self, period: Duration, mut on_tick: F) -> bool
    where
        F: FnMut() + Send + 'static,
    {
        let mut slot = self.lock_task();
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        let handle = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                on_tick();
            }
        });

        *slot = Some(handle);
        true
    }

    /// Stops the reroute timer. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        match self.lock_task().take() {
            Some(handle) => {
                let was_active = !handle.is_finished();
                handle.abort();
                was_active
            }
            None => false,
        }
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for NavigationSession {
    fn drop(&mut self) {
        if let Some(handle) = self.lock_task().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Let woken tasks run their callbacks.
    async fn drain() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn counting(counter: &Arc<AtomicUsize>) -> impl FnMut() + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_per_period_until_stopped() {
        let session = NavigationSession::new();
        let ticks = Arc::new(AtomicUsize::new(0));

        assert!(session.start(Duration::from_secs(6), counting(&ticks)));
        assert_eq!(session.status(), NavigationStatus::Active);
        drain().await;

        // Nothing fires before the first full period.
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        for expected in 1..=3 {
            tokio::time::advance(Duration::from_secs(6)).await;
            drain().await;
            assert_eq!(ticks.load(Ordering::SeqCst), expected);
        }

        assert!(session.stop());
        assert_eq!(session.status(), NavigationStatus::Idle);

        tokio::time::advance(Duration::from_secs(60)).await;
        drain().await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_active_keeps_existing_timer() {
        let session = NavigationSession::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        assert!(session.start(Duration::from_secs(6), counting(&first)));
        assert!(!session.start(Duration::from_secs(1), counting(&second)));

        drain().await;
        tokio::time::advance(Duration::from_secs(6)).await;
        drain().await;

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_a_no_op() {
        let session = NavigationSession::new();
        assert!(!session.stop());
        assert_eq!(session.status(), NavigationStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop() {
        let session = NavigationSession::new();
        let ticks = Arc::new(AtomicUsize::new(0));

        assert!(session.start(Duration::from_secs(6), counting(&ticks)));
        session.stop();
        assert!(session.start(Duration::from_secs(6), counting(&ticks)));

        drain().await;
        tokio::time::advance(Duration::from_secs(6)).await;
        drain().await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_tears_the_timer_down() {
        let ticks = Arc::new(AtomicUsize::new(0));
        {
            let session = NavigationSession::new();
            assert!(session.start(Duration::from_secs(6), counting(&ticks)));
            drain().await;
        }

        tokio::time::advance(Duration::from_secs(60)).await;
        drain().await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }
}
