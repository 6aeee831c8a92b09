//! Route planning against an OSRM instance.
//!
//! The [`RoutePlanner`] owns the mutable route state a tracking session
//! exposes: the decoded path, the distance/duration summary, and a loading
//! flag. Route queries may overlap (a reroute tick can fire while an earlier
//! query is still in flight), so every request takes a monotonically
//! increasing sequence number and only the newest request may write its
//! outcome back. Responses to superseded requests are discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;
use utoipa::ToSchema;

use crate::config::RoutingConfig;
use crate::error::{MaydayError, Result};
use crate::geo::LocationPoint;
use crate::hospitals::HospitalRecord;
use crate::polyline;

/// A computed route to a destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RouteResult {
    /// Decoded path as coordinate pairs, start to destination.
    pub coordinates: Vec<LocationPoint>,

    /// Driving distance in kilometers, rounded to two decimals.
    #[schema(example = 4.82)]
    pub distance_km: f64,

    /// Driving duration in whole minutes, rounded up.
    #[schema(example = 13)]
    pub duration_min: u32,
}

/// How the most recent route request ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RouteOutcome {
    /// No route has been requested yet.
    #[default]
    NotRequested,

    /// A route was found and stored.
    Found,

    /// The routing service answered but had no route for the pair.
    NoRouteFound,

    /// The request failed; see the error message.
    Failed,
}

/// Route state as exposed in tracking snapshots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct RouteState {
    /// Whether a route request is currently in flight.
    pub loading: bool,

    /// The current route, if the latest request found one.
    pub route: Option<RouteResult>,

    /// How the latest request ended.
    pub last_outcome: RouteOutcome,

    /// Error message from the latest request, if it failed.
    pub last_error: Option<String>,
}

/// HTTP client for an OSRM routing service.
#[derive(Debug, Clone)]
pub struct OsrmClient {
    client: reqwest::Client,
    base_url: Url,
}

impl OsrmClient {
    /// Creates a client for the configured OSRM instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &RoutingConfig) -> Result<Self> {
        let base_url = Url::parse(&config.osrm_url).map_err(|err| {
            MaydayError::ConfigValidationError(format!("routing.osrm_url: {err}"))
        })?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| MaydayError::HttpClientError(err.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Queries the driving route between two points.
    ///
    /// Returns `Ok(None)` when the service has no route for the pair.
    ///
    /// # Errors
    ///
    /// Returns [`MaydayError::RouteFetchFailed`] on transport errors and
    /// [`MaydayError::RouteDecodeFailed`] if the geometry is malformed.
    pub async fn route(&self, from: LocationPoint, to: LocationPoint) -> Result<Option<RouteResult>> {
        let mut url = self
            .base_url
            .join(&format!(
                "/route/v1/driving/{},{};{},{}",
                from.lng, from.lat, to.lng, to.lat
            ))
            .map_err(|err| MaydayError::RouteFetchFailed(err.to_string()))?;
        url.set_query(Some("overview=full&geometries=polyline"));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| MaydayError::RouteFetchFailed(err.to_string()))?
            .json::<OsrmResponse>()
            .await
            .map_err(|err| {
                MaydayError::RouteFetchFailed(format!("invalid osrm payload: {err}"))
            })?;

        let Some(first) = response.routes.into_iter().next() else {
            return Ok(None);
        };

        let coordinates = polyline::decode(&first.geometry)?;
        Ok(Some(RouteResult {
            coordinates,
            distance_km: round_to_km(first.distance),
            duration_min: ceil_to_minutes(first.duration),
        }))
    }
}

/// Meters to kilometers with two decimal places.
fn round_to_km(meters: f64) -> f64 {
    (meters / 10.0).round() / 100.0
}

/// Seconds to whole minutes, rounded up.
fn ceil_to_minutes(seconds: f64) -> u32 {
    (seconds / 60.0).ceil() as u32
}

/// Owns the session's route state and serializes concurrent route requests.
#[derive(Debug)]
pub struct RoutePlanner {
    client: OsrmClient,
    state: Mutex<RouteState>,
    seq: AtomicU64,
}

impl RoutePlanner {
    /// Creates a planner with empty route state.
    #[must_use]
    pub fn new(client: OsrmClient) -> Self {
        Self {
            client,
            state: Mutex::new(RouteState::default()),
            seq: AtomicU64::new(0),
        }
    }

    /// Current route state.
    #[must_use]
    pub fn state(&self) -> RouteState {
        self.lock_state().clone()
    }

    /// Clears the route state and invalidates any in-flight request.
    pub fn clear(&self) {
        self.seq.fetch_add(1, Ordering::SeqCst);
        *self.lock_state() = RouteState::default();
    }

    /// Fetches a route from `from` to the given hospital and stores it.
    ///
    /// The stored route and summary are cleared while the request is in
    /// flight. If a newer request starts before this one finishes, this
    /// one's response is discarded and the state reflects the newer request.
    ///
    /// # Errors
    ///
    /// Propagates the fetch or decode error after recording it in the state.
    pub async fn plan(
        &self,
        from: LocationPoint,
        destination: &HospitalRecord,
    ) -> Result<Option<RouteResult>> {
        let attempt = self.begin();

        match self.client.route(from, destination.location()).await {
            Ok(Some(route)) => {
                attempt.complete(Completion::Found(route.clone()));
                Ok(Some(route))
            }
            Ok(None) => {
                attempt.complete(Completion::NoRoute);
                Ok(None)
            }
            Err(err) => {
                attempt.complete(Completion::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RouteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks a new request in flight and clears the visible route.
    fn begin(&self) -> Attempt<'_> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.lock_state();
        state.loading = true;
        state.route = None;
        state.last_error = None;

        Attempt {
            planner: self,
            seq,
            done: false,
        }
    }

    /// Applies a request outcome unless the request has been superseded.
    fn finish(&self, seq: u64, completion: Completion) -> bool {
        if self.seq.load(Ordering::SeqCst) != seq {
            debug!(seq, "Discarding stale route response");
            return false;
        }

        let mut state = self.lock_state();
        state.loading = false;
        match completion {
            Completion::Found(route) => {
                state.route = Some(route);
                state.last_outcome = RouteOutcome::Found;
                state.last_error = None;
            }
            Completion::NoRoute => {
                state.route = None;
                state.last_outcome = RouteOutcome::NoRouteFound;
                state.last_error = None;
            }
            Completion::Failed(message) => {
                state.route = None;
                state.last_outcome = RouteOutcome::Failed;
                state.last_error = Some(message);
            }
        }
        true
    }
}

enum Completion {
    Found(RouteResult),
    NoRoute,
    Failed(String),
}

/// In-flight request handle. Ensures the loading flag is released even if
/// the owning future is dropped mid-request.
struct Attempt<'a> {
    planner: &'a RoutePlanner,
    seq: u64,
    done: bool,
}

impl Attempt<'_> {
    fn complete(mut self, completion: Completion) -> bool {
        self.done = true;
        self.planner.finish(self.seq, completion)
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.planner
                .finish(self.seq, Completion::Failed("route request aborted".to_string()));
        }
    }
}

// OSRM wire format.

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: String,
    /// Meters.
    distance: f64,
    /// Seconds.
    duration: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::routing::get;
    use axum::{Json, Router};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Notify;

    const FROM: LocationPoint = LocationPoint::new(28.6139, 77.2090);

    fn hospital(id: &str, lat: f64, lng: f64) -> HospitalRecord {
        HospitalRecord {
            id: id.to_string(),
            name: format!("Hospital {id}"),
            lat,
            lng,
        }
    }

    async fn spawn_backend(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn config_for(addr: SocketAddr) -> RoutingConfig {
        RoutingConfig {
            osrm_url: format!("http://{addr}"),
            reroute_interval_ms: 6000,
            request_timeout_secs: 2,
        }
    }

    fn osrm_body(geometry: &str, distance: f64, duration: f64) -> serde_json::Value {
        serde_json::json!({
            "code": "Ok",
            "routes": [{"geometry": geometry, "distance": distance, "duration": duration}]
        })
    }

    #[test]
    fn test_unit_conversions() {
        assert!((round_to_km(4816.0) - 4.82).abs() < 1e-9);
        assert!((round_to_km(999.0) - 1.0).abs() < 1e-9);
        assert_eq!(ceil_to_minutes(90.0), 2);
        assert_eq!(ceil_to_minutes(60.0), 1);
        assert_eq!(ceil_to_minutes(0.0), 0);
    }

    #[tokio::test]
    async fn test_route_parses_and_converts_units() {
        let router = Router::new().route(
            "/route/v1/driving/{coords}",
            get(|| async { Json(osrm_body("_p~iF~ps|U_ulLnnqC", 4816.0, 754.0)) }),
        );
        let addr = spawn_backend(router).await;
        let client = OsrmClient::new(&config_for(addr)).unwrap();

        let route = client
            .route(FROM, LocationPoint::new(28.70, 77.30))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(route.coordinates.len(), 2);
        assert!((route.distance_km - 4.82).abs() < 1e-9);
        assert_eq!(route.duration_min, 13);
    }

    #[tokio::test]
    async fn test_route_returns_none_when_service_has_no_route() {
        let router = Router::new().route(
            "/route/v1/driving/{coords}",
            get(|| async { Json(serde_json::json!({"code": "NoRoute", "routes": []})) }),
        );
        let addr = spawn_backend(router).await;
        let client = OsrmClient::new(&config_for(addr)).unwrap();

        let route = client.route(FROM, LocationPoint::new(28.70, 77.30)).await.unwrap();
        assert!(route.is_none());
    }

    #[tokio::test]
    async fn test_route_rejects_malformed_geometry() {
        let router = Router::new().route(
            "/route/v1/driving/{coords}",
            get(|| async { Json(osrm_body("_p~iF", 100.0, 60.0)) }),
        );
        let addr = spawn_backend(router).await;
        let client = OsrmClient::new(&config_for(addr)).unwrap();

        let err = client
            .route(FROM, LocationPoint::new(28.70, 77.30))
            .await
            .unwrap_err();
        assert!(matches!(err, MaydayError::RouteDecodeFailed(_)));
    }

    #[tokio::test]
    async fn test_plan_stores_route_and_clears_loading() {
        let router = Router::new().route(
            "/route/v1/driving/{coords}",
            get(|| async { Json(osrm_body("_ibE_ibE", 1000.0, 90.0)) }),
        );
        let addr = spawn_backend(router).await;
        let planner = RoutePlanner::new(OsrmClient::new(&config_for(addr)).unwrap());

        let route = planner.plan(FROM, &hospital("A", 28.70, 77.30)).await.unwrap();
        assert!(route.is_some());

        let state = planner.state();
        assert!(!state.loading);
        assert_eq!(state.last_outcome, RouteOutcome::Found);
        assert_eq!(state.route.unwrap().duration_min, 2);
    }

    #[tokio::test]
    async fn test_plan_with_no_route_leaves_cleared_state() {
        let router = Router::new().route(
            "/route/v1/driving/{coords}",
            get(|| async { Json(serde_json::json!({"routes": []})) }),
        );
        let addr = spawn_backend(router).await;
        let planner = RoutePlanner::new(OsrmClient::new(&config_for(addr)).unwrap());

        let route = planner.plan(FROM, &hospital("A", 28.70, 77.30)).await.unwrap();
        assert!(route.is_none());

        let state = planner.state();
        assert!(!state.loading);
        assert!(state.route.is_none());
        assert_eq!(state.last_outcome, RouteOutcome::NoRouteFound);
        assert!(state.last_error.is_none());
    }

    #[tokio::test]
    async fn test_plan_failure_is_recorded_and_propagated() {
        let router = Router::new().route(
            "/route/v1/driving/{coords}",
            get(|| async { axum::http::StatusCode::SERVICE_UNAVAILABLE }),
        );
        let addr = spawn_backend(router).await;
        let planner = RoutePlanner::new(OsrmClient::new(&config_for(addr)).unwrap());

        let err = planner.plan(FROM, &hospital("A", 28.70, 77.30)).await.unwrap_err();
        assert!(matches!(err, MaydayError::RouteFetchFailed(_)));

        let state = planner.state();
        assert!(!state.loading);
        assert_eq!(state.last_outcome, RouteOutcome::Failed);
        assert!(state.last_error.is_some());
    }

    #[tokio::test]
    async fn test_slow_response_to_superseded_request_is_discarded() {
        let gate = Arc::new(Notify::new());
        let release = Arc::clone(&gate);
        let router = Router::new().route(
            "/route/v1/driving/{coords}",
            get(move |Path(coords): Path<String>| {
                let gate = Arc::clone(&release);
                async move {
                    if coords.contains("77.3,") {
                        // First destination: hold the response until released.
                        gate.notified().await;
                        Json(osrm_body("_ibE_ibE", 5000.0, 600.0))
                    } else {
                        Json(osrm_body("??", 1000.0, 60.0))
                    }
                }
            }),
        );
        let addr = spawn_backend(router).await;
        let planner = Arc::new(RoutePlanner::new(OsrmClient::new(&config_for(addr)).unwrap()));

        let slow_planner = Arc::clone(&planner);
        let slow = tokio::spawn(async move {
            slow_planner.plan(FROM, &hospital("slow", 28.70, 77.30)).await
        });
        // Let the slow request take its sequence number first.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let fast = planner.plan(FROM, &hospital("fast", 28.50, 77.10)).await.unwrap();
        assert!(fast.is_some());
        assert!((planner.state().route.as_ref().unwrap().distance_km - 1.0).abs() < 1e-9);

        // Release the slow response; it must not overwrite the newer route.
        gate.notify_one();
        let slow_result = slow.await.unwrap().unwrap();
        assert!(slow_result.is_some());

        let state = planner.state();
        assert!(!state.loading);
        assert_eq!(state.last_outcome, RouteOutcome::Found);
        assert!((state.route.unwrap().distance_km - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_clear_invalidates_in_flight_request() {
        let gate = Arc::new(Notify::new());
        let release = Arc::clone(&gate);
        let router = Router::new().route(
            "/route/v1/driving/{coords}",
            get(move || {
                let gate = Arc::clone(&release);
                async move {
                    gate.notified().await;
                    Json(osrm_body("??", 1000.0, 60.0))
                }
            }),
        );
        let addr = spawn_backend(router).await;
        let planner = Arc::new(RoutePlanner::new(OsrmClient::new(&config_for(addr)).unwrap()));

        let in_flight_planner = Arc::clone(&planner);
        let in_flight = tokio::spawn(async move {
            in_flight_planner.plan(FROM, &hospital("A", 28.70, 77.30)).await
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(planner.state().loading);

        planner.clear();
        gate.notify_one();
        let _ = in_flight.await.unwrap();

        let state = planner.state();
        assert!(!state.loading);
        assert!(state.route.is_none());
        assert_eq!(state.last_outcome, RouteOutcome::NotRequested);
    }

    #[tokio::test]
    async fn test_aborted_request_releases_loading_flag() {
        let router = Router::new().route(
            "/route/v1/driving/{coords}",
            get(|| async {
                // Never answers within the test window.
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(serde_json::json!({"routes": []}))
            }),
        );
        let addr = spawn_backend(router).await;
        let planner = Arc::new(RoutePlanner::new(OsrmClient::new(&config_for(addr)).unwrap()));

        let task_planner = Arc::clone(&planner);
        let task = tokio::spawn(async move {
            let _ = task_planner.plan(FROM, &hospital("A", 28.70, 77.30)).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(planner.state().loading);

        task.abort();
        let _ = task.await;

        let state = planner.state();
        assert!(!state.loading);
        assert_eq!(state.last_outcome, RouteOutcome::Failed);
    }
}
