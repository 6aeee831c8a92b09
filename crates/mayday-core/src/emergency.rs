//! Emergency mode shared across the whole service.
//!
//! Emergency state is a single [`watch`] channel: transitions go through
//! compare-and-set closures on the sender, so two racing SOS triggers can
//! never both activate it, and any part of the system can subscribe to
//! observe transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use utoipa::ToSchema;

/// Reason recorded when emergency mode is activated by hand.
pub const DEFAULT_MANUAL_REASON: &str = "Manual SOS";

/// Current emergency state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EmergencyStatus {
    /// Whether emergency mode is active.
    pub active: bool,

    /// Why it was activated. Cleared when deactivated.
    #[schema(example = "Auto SOS Activated")]
    pub reason: Option<String>,

    /// When emergency mode was last activated. Survives deactivation.
    pub last_activated_at: Option<DateTime<Utc>>,
}

/// Handle to the shared emergency state.
///
/// Cheap to clone; all clones observe and mutate the same state.
#[derive(Debug, Clone)]
pub struct EmergencySession {
    tx: Arc<watch::Sender<EmergencyStatus>>,
}

impl Default for EmergencySession {
    fn default() -> Self {
        Self::new()
    }
}

impl EmergencySession {
    /// Creates an inactive session.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(EmergencyStatus::default());
        Self { tx: Arc::new(tx) }
    }

    /// Activates emergency mode with the given reason.
    ///
    /// Returns `false` without touching the state if emergency mode is
    /// already active.
    pub fn start(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let started = self.tx.send_if_modified(|status| {
            if status.active {
                return false;
            }
            status.active = true;
            status.reason = Some(reason.clone());
            status.last_activated_at = Some(Utc::now());
            true
        });

        if started {
            info!(reason = %reason, "Emergency mode activated");
        }
        started
    }

    /// Deactivates emergency mode.
    ///
    /// Returns `false` if it was not active. The last activation timestamp
    /// is kept for the record.
    pub fn stop(&self) -> bool {
        let stopped = self.tx.send_if_modified(|status| {
            if !status.active {
                return false;
            }
            status.active = false;
            status.reason = None;
            true
        });

        if stopped {
            info!("Emergency mode deactivated");
        }
        stopped
    }

    /// Current state.
    #[must_use]
    pub fn status(&self) -> EmergencyStatus {
        self.tx.borrow().clone()
    }

    /// Subscribe to state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<EmergencyStatus> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_inactive() {
        let session = EmergencySession::new();
        let status = session.status();
        assert!(!status.active);
        assert!(status.reason.is_none());
        assert!(status.last_activated_at.is_none());
    }

    #[test]
    fn test_start_records_reason_and_timestamp() {
        let session = EmergencySession::new();
        assert!(session.start("Fall detected"));

        let status = session.status();
        assert!(status.active);
        assert_eq!(status.reason.as_deref(), Some("Fall detected"));
        assert!(status.last_activated_at.is_some());
    }

    #[test]
    fn test_start_while_active_is_a_no_op() {
        let session = EmergencySession::new();
        assert!(session.start("First"));
        assert!(!session.start("Second"));

        // The original activation is untouched
        assert_eq!(session.status().reason.as_deref(), Some("First"));
    }

    #[test]
    fn test_stop_clears_reason_but_keeps_timestamp() {
        let session = EmergencySession::new();
        session.start(DEFAULT_MANUAL_REASON);
        assert!(session.stop());

        let status = session.status();
        assert!(!status.active);
        assert!(status.reason.is_none());
        assert!(status.last_activated_at.is_some());
    }

    #[test]
    fn test_stop_when_inactive_is_a_no_op() {
        let session = EmergencySession::new();
        assert!(!session.stop());
    }

    #[test]
    fn test_clones_share_state() {
        let session = EmergencySession::new();
        let clone = session.clone();
        session.start("Shared");
        assert!(clone.status().active);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_starts_activate_exactly_once() {
        let session = EmergencySession::new();

        let mut handles = Vec::new();
        for i in 0..8 {
            let session = session.clone();
            handles.push(tokio::spawn(async move { session.start(format!("racer {i}")) }));
        }

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
        assert!(session.status().active);
    }

    #[tokio::test]
    async fn test_subscribers_observe_transitions() {
        let session = EmergencySession::new();
        let mut rx = session.subscribe();

        session.start("Watch me");
        rx.changed().await.unwrap();
        assert!(rx.borrow().active);

        session.stop();
        rx.changed().await.unwrap();
        assert!(!rx.borrow().active);
    }
}
