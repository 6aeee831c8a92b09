//! Live jacket telemetry: polling, GPS noise filtering, and vitals merging.
//!
//! A [`TelemetryPoller`] polls the jacket backend on a fixed cadence and
//! publishes [`TelemetrySnapshot`]s over a watch channel. Position updates
//! below the configured movement threshold are treated as GPS jitter and
//! dropped; vitals arrive as partial frames and merge field by field into
//! the previous reading.
//!
//! A failed poll never interrupts the cadence. The tracker counts misses and
//! flags the snapshot stale once too many polls in a row have failed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};
use url::Url;
use utoipa::ToSchema;

use crate::config::TelemetryConfig;
use crate::error::{MaydayError, Result};
use crate::geo::LocationPoint;

/// One raw reading from the jacket backend.
///
/// Every field is optional: the firmware sends whatever sensors produced a
/// value this cycle. Unknown fields are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TelemetryFrame {
    /// Reported latitude in decimal degrees.
    pub lat: Option<f64>,

    /// Reported longitude in decimal degrees.
    pub lng: Option<f64>,

    /// Blood oxygen saturation in percent.
    pub spo2: Option<f64>,

    /// Pulse in beats per minute.
    pub pulse: Option<f64>,

    /// Body temperature in degrees Celsius.
    pub temperature: Option<f64>,
}

/// The latest known vitals, merged across frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VitalsSnapshot {
    /// Blood oxygen saturation in percent.
    #[schema(example = 98.0)]
    pub spo2: f64,

    /// Pulse in beats per minute.
    #[schema(example = 78.0)]
    pub pulse: f64,

    /// Body temperature in degrees Celsius.
    #[schema(example = 36.7)]
    pub temperature: f64,
}

impl Default for VitalsSnapshot {
    /// Resting baseline published until the jacket first reports vitals.
    fn default() -> Self {
        Self {
            spo2: 98.0,
            pulse: 78.0,
            temperature: 36.7,
        }
    }
}

impl VitalsSnapshot {
    /// Merge a frame into this reading. Fields absent from the frame keep
    /// their previous value.
    #[must_use]
    pub fn merged(self, frame: &TelemetryFrame) -> Self {
        Self {
            spo2: frame.spo2.unwrap_or(self.spo2),
            pulse: frame.pulse.unwrap_or(self.pulse),
            temperature: frame.temperature.unwrap_or(self.temperature),
        }
    }
}

/// The tracked state published after every poll.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TelemetrySnapshot {
    /// Last accepted position.
    pub location: LocationPoint,

    /// Last merged vitals.
    pub vitals: VitalsSnapshot,

    /// When the backend last answered a poll.
    pub last_contact_at: Option<DateTime<Utc>>,

    /// When the position last moved past the noise threshold.
    pub moved_at: Option<DateTime<Utc>>,

    /// Consecutive failed polls since the last successful one.
    pub missed_polls: u32,

    /// Whether too many consecutive polls have failed.
    pub stale: bool,
}

/// Pure state machine behind the poller.
///
/// Separated from the polling loop so the filtering and merge rules can be
/// exercised without a backend.
#[derive(Debug)]
pub struct TelemetryTracker {
    location: LocationPoint,
    vitals: VitalsSnapshot,
    noise_threshold_km: f64,
    stale_after_polls: u32,
    last_contact_at: Option<DateTime<Utc>>,
    moved_at: Option<DateTime<Utc>>,
    missed_polls: u32,
}

impl TelemetryTracker {
    /// Creates a tracker publishing `fallback` until the jacket reports.
    #[must_use]
    pub fn new(fallback: LocationPoint, noise_threshold_km: f64, stale_after_polls: u32) -> Self {
        Self {
            location: fallback,
            vitals: VitalsSnapshot::default(),
            noise_threshold_km,
            stale_after_polls,
            last_contact_at: None,
            moved_at: None,
            missed_polls: 0,
        }
    }

    /// Applies a successful poll. Returns `true` if the position moved.
    pub fn apply_frame(&mut self, frame: &TelemetryFrame, now: DateTime<Utc>) -> bool {
        self.last_contact_at = Some(now);
        self.missed_polls = 0;

        let mut moved = false;
        if let (Some(lat), Some(lng)) = (frame.lat, frame.lng) {
            let reported = LocationPoint::new(lat, lng);
            if self.location.distance_km(reported) > self.noise_threshold_km {
                self.location = reported;
                self.moved_at = Some(now);
                moved = true;
            }
        }

        self.vitals = self.vitals.merged(frame);
        moved
    }

    /// Records a failed poll. The previous snapshot stays in place.
    pub fn record_failure(&mut self) {
        self.missed_polls = self.missed_polls.saturating_add(1);
    }

    /// Current published state.
    #[must_use]
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            location: self.location,
            vitals: self.vitals,
            last_contact_at: self.last_contact_at,
            moved_at: self.moved_at,
            missed_polls: self.missed_polls,
            stale: self.missed_polls >= self.stale_after_polls,
        }
    }
}

/// HTTP client for the jacket telemetry backend.
#[derive(Debug, Clone)]
pub struct TelemetryClient {
    client: reqwest::Client,
    base_url: Url,
}

impl TelemetryClient {
    /// Creates a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|err| {
            MaydayError::ConfigValidationError(format!("telemetry.base_url: {err}"))
        })?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| MaydayError::HttpClientError(err.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Fetch one telemetry frame for a jacket.
    ///
    /// # Errors
    ///
    /// Returns [`MaydayError::TelemetryFetchFailed`] on transport errors,
    /// non-success status codes, or undecodable bodies.
    pub async fn fetch(&self, jacket_id: &str) -> Result<TelemetryFrame> {
        let url = self
            .base_url
            .join(&format!("/api/location/{jacket_id}"))
            .map_err(|err| MaydayError::TelemetryFetchFailed {
                jacket_id: jacket_id.to_string(),
                message: err.to_string(),
            })?;

        let frame = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| MaydayError::TelemetryFetchFailed {
                jacket_id: jacket_id.to_string(),
                message: err.to_string(),
            })?
            .json::<TelemetryFrame>()
            .await
            .map_err(|err| MaydayError::TelemetryFetchFailed {
                jacket_id: jacket_id.to_string(),
                message: format!("invalid telemetry payload: {err}"),
            })?;

        Ok(frame)
    }
}

/// Background task polling one jacket on a fixed cadence.
///
/// The task is aborted when the poller is dropped or [`stop`] is called.
///
/// [`stop`]: TelemetryPoller::stop
#[derive(Debug)]
pub struct TelemetryPoller {
    handle: JoinHandle<()>,
    rx: watch::Receiver<TelemetrySnapshot>,
}

impl TelemetryPoller {
    /// Spawns the polling loop for `jacket_id`.
    #[must_use]
    pub fn spawn(client: TelemetryClient, jacket_id: String, config: &TelemetryConfig) -> Self {
        let tracker = TelemetryTracker::new(
            LocationPoint::new(config.fallback_lat, config.fallback_lng),
            config.noise_threshold_km,
            config.stale_after_polls,
        );
        let (tx, rx) = watch::channel(tracker.snapshot());
        let period = config.poll_interval();

        let handle = tokio::spawn(poll_loop(client, jacket_id, tracker, tx, period));

        Self { handle, rx }
    }

    /// Most recent published snapshot.
    #[must_use]
    pub fn latest(&self) -> TelemetrySnapshot {
        self.rx.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.rx.clone()
    }

    /// Stops the polling loop. The last snapshot stays readable.
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for TelemetryPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn poll_loop(
    client: TelemetryClient,
    jacket_id: String,
    mut tracker: TelemetryTracker,
    tx: watch::Sender<TelemetrySnapshot>,
    period: std::time::Duration,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match client.fetch(&jacket_id).await {
            Ok(frame) => {
                let moved = tracker.apply_frame(&frame, Utc::now());
                if moved {
                    debug!(jacket_id = %jacket_id, "Position updated");
                }
            }
            Err(err) => {
                warn!(jacket_id = %jacket_id, error = %err, "Telemetry poll failed");
                tracker.record_failure();
            }
        }

        tx.send_replace(tracker.snapshot());
    }
}
