//! Live tracking sessions, one per jacket.
//!
//! A [`TrackingSession`] bundles everything needed to track one jacket:
//! the telemetry poller, the nearby-hospital list with its search text and
//! selection, the route planner, the navigation reroute timer, and the SOS
//! dispatch guard. The emergency session and alert store are shared
//! process-wide and injected. All timers the session owns die with it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::alerts::{AlertRecord, AlertStore};
use crate::config::MaydayConfig;
use crate::emergency::{EmergencySession, EmergencyStatus};
use crate::error::{MaydayError, Result};
use crate::geo::LocationPoint;
use crate::hospitals::{rank_hospitals, HospitalRecord, OverpassClient, RankedHospital};
use crate::navigation::{NavigationSession, NavigationStatus};
use crate::registry::is_valid_jacket_id;
use crate::routing::{OsrmClient, RoutePlanner, RouteResult, RouteState};
use crate::telemetry::{TelemetryClient, TelemetryPoller, TelemetrySnapshot};

/// Reason recorded when an SOS is dispatched without one.
pub const DEFAULT_SOS_REASON: &str = "Auto SOS Activated";

/// Hospital list, search text, and selection for one session.
#[derive(Debug, Default)]
struct HospitalListState {
    records: Vec<HospitalRecord>,
    search: String,
    selected: Option<HospitalRecord>,
}

/// Point-in-time view of a whole tracking session.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TrackingSnapshot {
    /// Jacket this session tracks.
    pub jacket_id: String,

    /// Latest telemetry, vitals merged and position noise-filtered.
    pub telemetry: TelemetrySnapshot,

    /// Known hospitals matching the stored search, nearest first.
    pub hospitals: Vec<RankedHospital>,

    /// Currently selected hospital, if any.
    pub selected_hospital: Option<RankedHospital>,

    /// Route planner state for the selected hospital.
    pub route: RouteState,

    /// Whether the reroute timer is running.
    pub navigation: NavigationStatus,

    /// Shared emergency session state.
    pub emergency: EmergencyStatus,

    /// Whether an SOS has already been dispatched from this session.
    pub sos_sent: bool,
}

/// Live tracking for one jacket.
///
/// Sessions are cheap to share behind an `Arc`; every operation takes
/// `&self`. Dropping the session aborts the telemetry poller and any
/// running reroute timer.
pub struct TrackingSession {
    jacket_id: String,
    poller: TelemetryPoller,
    overpass: OverpassClient,
    search_radius_m: u32,
    hospitals: Arc<Mutex<HospitalListState>>,
    planner: Arc<RoutePlanner>,
    navigation: NavigationSession,
    emergency: EmergencySession,
    alerts: Arc<dyn AlertStore>,
    sos_sent: AtomicBool,
    reroute_interval: Duration,
}

impl TrackingSession {
    /// Opens a session and starts polling telemetry for `jacket_id`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MaydayError::InvalidJacketId`] for a malformed id, or a
    /// configuration error if one of the upstream URLs cannot be parsed.
    pub fn open(
        jacket_id: impl Into<String>,
        config: &MaydayConfig,
        emergency: EmergencySession,
        alerts: Arc<dyn AlertStore>,
    ) -> Result<Self> {
        let jacket_id = jacket_id.into();
        if !is_valid_jacket_id(&jacket_id) {
            return Err(MaydayError::InvalidJacketId(jacket_id));
        }

        let client = TelemetryClient::new(&config.telemetry)?;
        let poller = TelemetryPoller::spawn(client, jacket_id.clone(), &config.telemetry);
        info!(jacket_id = %jacket_id, "Tracking session opened");

        Ok(Self {
            jacket_id,
            poller,
            overpass: OverpassClient::new(&config.hospitals)?,
            search_radius_m: config.hospitals.search_radius_m,
            hospitals: Arc::new(Mutex::new(HospitalListState::default())),
            planner: Arc::new(RoutePlanner::new(OsrmClient::new(&config.routing)?)),
            navigation: NavigationSession::new(),
            emergency,
            alerts,
            sos_sent: AtomicBool::new(false),
            reroute_interval: config.routing.reroute_interval(),
        })
    }

    /// Assembles a point-in-time view of the whole session.
    ///
    /// Hospital distances are recomputed from the latest accepted position
    /// on every call.
    #[must_use]
    pub fn snapshot(&self) -> TrackingSnapshot {
        let telemetry = self.poller.latest();
        let (hospitals, selected_hospital) = {
            let list = lock_list(&self.hospitals);
            let ranked = rank_hospitals(&list.records, telemetry.location, &list.search);
            let selected = list.selected.as_ref().and_then(|record| {
                rank_hospitals(std::slice::from_ref(record), telemetry.location, "").pop()
            });
            (ranked, selected)
        };

        TrackingSnapshot {
            jacket_id: self.jacket_id.clone(),
            telemetry,
            hospitals,
            selected_hospital,
            route: self.planner.state(),
            navigation: self.navigation.status(),
            emergency: self.emergency.status(),
            sos_sent: self.sos_sent.load(Ordering::SeqCst),
        }
    }

    /// Queries nearby hospitals around the latest accepted position.
    ///
    /// Prior results, the stored search text, the selection, and any route
    /// state are cleared before the query goes out, and an in-flight route
    /// response from before the refresh is discarded. A running reroute
    /// timer keeps ticking but skips until a hospital is selected again.
    ///
    /// # Errors
    ///
    /// Returns [`MaydayError::HospitalSearchFailed`] when the query fails;
    /// the list stays empty.
    pub async fn refresh_hospitals(&self) -> Result<Vec<RankedHospital>> {
        refresh_list(
            self.overpass.clone(),
            Arc::clone(&self.hospitals),
            Arc::clone(&self.planner),
            self.search_radius_m,
            self.poller.latest().location,
        )
        .await
    }

    /// Ranks the known hospitals from the latest accepted position.
    ///
    /// Passing `Some(search)` stores the search text; it keeps filtering
    /// subsequent calls until changed or cleared by a refresh.
    #[must_use]
    pub fn hospitals(&self, search: Option<&str>) -> Vec<RankedHospital> {
        let location = self.poller.latest().location;
        let mut list = lock_list(&self.hospitals);
        if let Some(search) = search {
            list.search = search.to_string();
        }
        rank_hospitals(&list.records, location, &list.search)
    }

    /// Selects a hospital by id and plans a route to it right away.
    ///
    /// The selection sticks even when route planning fails, and a running
    /// reroute timer picks it up on its next tick.
    ///
    /// # Errors
    ///
    /// Returns [`MaydayError::HospitalNotFound`] for an unknown id, or the
    /// route planning error.
    pub async fn select_hospital(&self, hospital_id: &str) -> Result<Option<RouteResult>> {
        let destination = {
            let mut list = lock_list(&self.hospitals);
            let record = list
                .records
                .iter()
                .find(|record| record.id == hospital_id)
                .cloned()
                .ok_or_else(|| MaydayError::HospitalNotFound(hospital_id.to_string()))?;
            list.selected = Some(record.clone());
            record
        };

        let from = self.poller.latest().location;
        self.planner.plan(from, &destination).await
    }

    /// Starts the reroute timer for the selected hospital.
    ///
    /// Every tick replans the route from the latest accepted position to
    /// the hospital selected at that moment; ticks with no selection are
    /// skipped. The first tick fires one full interval after starting.
    /// Returns `Ok(false)` when navigation is already active.
    ///
    /// # Errors
    ///
    /// Returns [`MaydayError::NoHospitalSelected`] when nothing is selected.
    pub fn start_navigation(&self) -> Result<bool> {
        if lock_list(&self.hospitals).selected.is_none() {
            return Err(MaydayError::NoHospitalSelected);
        }

        let hospitals = Arc::clone(&self.hospitals);
        let planner = Arc::clone(&self.planner);
        let telemetry = self.poller.subscribe();
        let started = self.navigation.start(self.reroute_interval, move || {
            let location = telemetry.borrow().location;
            replan(&hospitals, &planner, location);
        });

        if started {
            info!(jacket_id = %self.jacket_id, "Navigation started");
        }
        Ok(started)
    }

    /// Stops the reroute timer. The last planned route stays available.
    /// Returns `false` when navigation was not active.
    pub fn stop_navigation(&self) -> bool {
        let stopped = self.navigation.stop();
        if stopped {
            info!(jacket_id = %self.jacket_id, "Navigation stopped");
        }
        stopped
    }

    /// Dispatches an SOS: persists an alert built from the latest
    /// telemetry, activates the emergency session, and kicks off a hospital
    /// refresh in the background.
    ///
    /// A blank or missing `reason` falls back to [`DEFAULT_SOS_REASON`].
    /// The double-submission guard is set before persisting and released
    /// only when persisting fails, so a failed dispatch can be retried. The
    /// background refresh never fails the SOS; its errors are logged and
    /// left in the hospital state.
    ///
    /// # Errors
    ///
    /// Returns [`MaydayError::SosAlreadySent`] when an SOS was already
    /// dispatched from this session, or the persistence error.
    pub async fn trigger_sos(&self, reason: Option<String>) -> Result<AlertRecord> {
        if self.sos_sent.swap(true, Ordering::SeqCst) {
            return Err(MaydayError::SosAlreadySent);
        }

        let reason = reason
            .map(|reason| reason.trim().to_string())
            .filter(|reason| !reason.is_empty())
            .unwrap_or_else(|| DEFAULT_SOS_REASON.to_string());

        let latest = self.poller.latest();
        let record =
            AlertRecord::new(self.jacket_id.clone(), reason, latest.vitals, latest.location);

        if let Err(err) = self.alerts.append(&record) {
            self.sos_sent.store(false, Ordering::SeqCst);
            return Err(err);
        }

        info!(jacket_id = %self.jacket_id, reason = %record.reason, "SOS dispatched");
        self.emergency.start(record.reason.clone());

        let overpass = self.overpass.clone();
        let hospitals = Arc::clone(&self.hospitals);
        let planner = Arc::clone(&self.planner);
        let radius = self.search_radius_m;
        let center = latest.location;
        tokio::spawn(async move {
            if let Err(err) = refresh_list(overpass, hospitals, planner, radius, center).await {
                warn!(error = %err, "Hospital refresh after SOS failed");
            }
        });

        Ok(record)
    }

    /// Stops the telemetry poller and any running reroute timer.
    pub fn shutdown(&self) {
        self.navigation.stop();
        self.poller.stop();
        info!(jacket_id = %self.jacket_id, "Tracking session closed");
    }
}

impl std::fmt::Debug for TrackingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingSession")
            .field("jacket_id", &self.jacket_id)
            .field("sos_sent", &self.sos_sent)
            .finish_non_exhaustive()
    }
}

fn lock_list(list: &Mutex<HospitalListState>) -> MutexGuard<'_, HospitalListState> {
    list.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Replans the route to the current selection, if any, without blocking
/// the caller.
fn replan(
    hospitals: &Arc<Mutex<HospitalListState>>,
    planner: &Arc<RoutePlanner>,
    location: LocationPoint,
) {
    let Some(destination) = lock_list(hospitals).selected.clone() else {
        debug!("Reroute tick skipped, no hospital selected");
        return;
    };

    let planner = Arc::clone(planner);
    tokio::spawn(async move {
        if let Err(err) = planner.plan(location, &destination).await {
            debug!(error = %err, "Reroute attempt failed");
        }
    });
}

/// Clears the list state and route, then queries and stores fresh results.
async fn refresh_list(
    overpass: OverpassClient,
    hospitals: Arc<Mutex<HospitalListState>>,
    planner: Arc<RoutePlanner>,
    radius_m: u32,
    center: LocationPoint,
) -> Result<Vec<RankedHospital>> {
    {
        let mut list = lock_list(&hospitals);
        list.records.clear();
        list.search.clear();
        list.selected = None;
    }
    planner.clear();

    let records = overpass.find_nearby(center, radius_m).await?;
    let ranked = rank_hospitals(&records, center, "");
    lock_list(&hospitals).records = records;
    Ok(ranked)
}
