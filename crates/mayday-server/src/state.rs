//! Application state shared across handlers.

use std::collections::HashMap;
use std::sync::Arc;

use mayday_core::alerts::{AlertStore, JsonAlertStore};
use mayday_core::{
    ContactRegistry, DeviceRegistry, EmergencySession, MaydayConfig, Result, TrackingSession,
};
use tokio::sync::RwLock;

/// Shared application state behind one process-wide lock.
pub type SharedState = Arc<RwLock<AppState>>;

/// Everything the handlers work against.
pub struct AppState {
    /// Loaded configuration.
    pub config: MaydayConfig,

    /// Process-wide emergency session, shared with every tracking session.
    pub emergency: EmergencySession,

    /// Alert persistence.
    pub alerts: Arc<dyn AlertStore>,

    /// Registered jackets.
    pub devices: DeviceRegistry,

    /// Emergency contacts.
    pub contacts: ContactRegistry,

    /// Open tracking sessions by jacket id.
    pub sessions: HashMap<String, Arc<TrackingSession>>,
}

impl AppState {
    /// Builds the state from a loaded configuration, persisting under its
    /// data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if no data directory can be resolved.
    pub fn new(config: MaydayConfig) -> anyhow::Result<Self> {
        let data_dir = config.data_dir()?;

        Ok(Self {
            emergency: EmergencySession::new(),
            alerts: Arc::new(JsonAlertStore::new(data_dir.clone())),
            devices: DeviceRegistry::new(&data_dir),
            contacts: ContactRegistry::new(&data_dir),
            sessions: HashMap::new(),
            config,
        })
    }

    /// Wraps the state for sharing across handlers.
    #[must_use]
    pub fn into_shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }

    /// Opens a tracking session for `jacket_id`, or returns the one already
    /// open. The flag is `true` when a new session was created.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid jacket id or unusable upstream
    /// configuration.
    pub fn open_session(&mut self, jacket_id: &str) -> Result<(Arc<TrackingSession>, bool)> {
        if let Some(session) = self.sessions.get(jacket_id) {
            return Ok((Arc::clone(session), false));
        }

        let session = Arc::new(TrackingSession::open(
            jacket_id,
            &self.config,
            self.emergency.clone(),
            Arc::clone(&self.alerts),
        )?);
        self.sessions
            .insert(jacket_id.to_string(), Arc::clone(&session));
        Ok((session, true))
    }

    /// The open session for `jacket_id`, if any.
    #[must_use]
    pub fn session(&self, jacket_id: &str) -> Option<Arc<TrackingSession>> {
        self.sessions.get(jacket_id).map(Arc::clone)
    }

    /// Closes the session for `jacket_id`, stopping its timers. Returns
    /// `false` when no session was open.
    pub fn close_session(&mut self, jacket_id: &str) -> bool {
        match self.sessions.remove(jacket_id) {
            Some(session) => {
                session.shutdown();
                true
            }
            None => false,
        }
    }
}
