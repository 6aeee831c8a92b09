//! Live tracking API endpoints.
//!
//! The original map screen as a REST surface: open a session for a jacket,
//! read live snapshots, search and select nearby hospitals, run navigation,
//! and dispatch an SOS. A session keeps polling telemetry until it is
//! explicitly closed.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use mayday_core::{NavigationStatus, RankedHospital, RouteResult, TrackingSession, TrackingSnapshot};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::alerts::AlertResponse;
use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the tracking router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/{jacket_id}", get(get_snapshot).delete(close_tracking))
        .route("/{jacket_id}/start", post(start_tracking))
        .route("/{jacket_id}/hospitals", get(list_hospitals))
        .route("/{jacket_id}/hospitals/refresh", post(refresh_hospitals))
        .route(
            "/{jacket_id}/hospitals/{poi_id}/select",
            post(select_hospital),
        )
        .route("/{jacket_id}/navigation/start", post(start_navigation))
        .route("/{jacket_id}/navigation/stop", post(stop_navigation))
        .route("/{jacket_id}/sos", post(trigger_sos))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response after opening a tracking session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StartTrackingResponse {
    /// Whether this call created the session. `false` when one was
    /// already open for the jacket.
    #[schema(example = true)]
    pub created: bool,

    /// Session state right after opening.
    pub snapshot: TrackingSnapshot,
}

/// Response after closing a tracking session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"closed": true, "jacket_id": "JKT-001"}))]
pub struct CloseTrackingResponse {
    /// Whether a session was open and is now closed.
    #[schema(example = true)]
    pub closed: bool,

    /// Jacket the session tracked.
    #[schema(example = "JKT-001")]
    pub jacket_id: String,
}

/// Query parameters for the hospital listing endpoint.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct HospitalsQuery {
    /// Case-insensitive name filter. Stored on the session; it keeps
    /// filtering until changed or cleared by a refresh.
    #[param(example = "apollo")]
    pub search: Option<String>,
}

/// Hospitals ranked nearest first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HospitalsResponse {
    /// Matching hospitals, nearest first, distances recomputed from the
    /// latest accepted position.
    pub hospitals: Vec<RankedHospital>,

    /// Number of hospitals returned.
    #[schema(example = 3)]
    pub total: usize,
}

/// Response after selecting a hospital.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SelectHospitalResponse {
    /// Id of the now-selected hospital.
    #[schema(example = "52344")]
    pub selected_id: String,

    /// The planned route, or `null` when the routing service had no route
    /// for the pair. The selection sticks either way.
    pub route: Option<RouteResult>,
}

/// Response after a navigation start attempt.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({"started": true, "navigation": "active"}))]
pub struct StartNavigationResponse {
    /// Whether this call started the reroute timer. `false` when
    /// navigation was already active.
    #[schema(example = true)]
    pub started: bool,

    /// Navigation state after the call.
    pub navigation: NavigationStatus,
}

/// Response after a navigation stop attempt.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({"stopped": true, "navigation": "idle"}))]
pub struct StopNavigationResponse {
    /// Whether this call stopped the reroute timer. `false` when
    /// navigation was not active.
    #[schema(example = true)]
    pub stopped: bool,

    /// Navigation state after the call.
    pub navigation: NavigationStatus,
}

/// Request body for dispatching an SOS.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({"reason": "Fall detected"}))]
pub struct SosRequest {
    /// Why the SOS was raised. Defaults to "Auto SOS Activated".
    #[schema(example = "Fall detected")]
    pub reason: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Fetches the open session for `jacket_id` without holding the state lock
/// across the caller's upstream awaits.
async fn session_for(state: &SharedState, jacket_id: &str) -> ApiResult<Arc<TrackingSession>> {
    state
        .read()
        .await
        .session(jacket_id)
        .ok_or_else(|| ApiError::NotFound {
            error_code: "tracking_session_not_found".to_string(),
            message: format!("No open tracking session for jacket: {jacket_id}"),
        })
}

/// Open a tracking session.
#[utoipa::path(
    post,
    path = "/api/tracking/{jacket_id}/start",
    tag = "tracking",
    operation_id = "startTracking",
    summary = "Open a tracking session",
    description = "Opens a live tracking session for the jacket and starts \
        polling its telemetry. Opening an already open session returns the \
        existing one with `created: false`.",
    params(
        ("jacket_id" = String, Path, description = "Jacket hardware identifier")
    ),
    responses(
        (status = 201, description = "Session opened", body = StartTrackingResponse),
        (status = 200, description = "Session was already open", body = StartTrackingResponse),
        (status = 400, description = "Malformed jacket id", body = ErrorResponse)
    )
)]
pub async fn start_tracking(
    State(state): State<SharedState>,
    Path(jacket_id): Path<String>,
) -> ApiResult<(StatusCode, Json<StartTrackingResponse>)> {
    let (session, created) = state.write().await.open_session(&jacket_id)?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(StartTrackingResponse {
            created,
            snapshot: session.snapshot(),
        }),
    ))
}

/// Get a live snapshot of a tracking session.
#[utoipa::path(
    get,
    path = "/api/tracking/{jacket_id}",
    tag = "tracking",
    operation_id = "getTrackingSnapshot",
    summary = "Get a live tracking snapshot",
    description = "Returns the latest telemetry, the ranked hospital list, \
        route and navigation state, the shared emergency state, and the SOS \
        guard for one open session. Hospital distances are recomputed from \
        the latest accepted position on every call.",
    params(
        ("jacket_id" = String, Path, description = "Jacket hardware identifier")
    ),
    responses(
        (status = 200, description = "Snapshot retrieved", body = TrackingSnapshot),
        (status = 404, description = "No open session for this jacket", body = ErrorResponse)
    )
)]
pub async fn get_snapshot(
    State(state): State<SharedState>,
    Path(jacket_id): Path<String>,
) -> ApiResult<Json<TrackingSnapshot>> {
    let session = session_for(&state, &jacket_id).await?;
    Ok(Json(session.snapshot()))
}

/// Close a tracking session.
#[utoipa::path(
    delete,
    path = "/api/tracking/{jacket_id}",
    tag = "tracking",
    operation_id = "closeTracking",
    summary = "Close a tracking session",
    description = "Stops the telemetry poller and any running reroute timer, \
        then forgets the session. Closing a session that is not open reports \
        `closed: false`.",
    params(
        ("jacket_id" = String, Path, description = "Jacket hardware identifier")
    ),
    responses(
        (status = 200, description = "Close attempt processed", body = CloseTrackingResponse)
    )
)]
pub async fn close_tracking(
    State(state): State<SharedState>,
    Path(jacket_id): Path<String>,
) -> Json<CloseTrackingResponse> {
    let closed = state.write().await.close_session(&jacket_id);
    Json(CloseTrackingResponse { closed, jacket_id })
}

/// List ranked hospitals for a session.
#[utoipa::path(
    get,
    path = "/api/tracking/{jacket_id}/hospitals",
    tag = "tracking",
    operation_id = "listHospitals",
    summary = "List nearby hospitals, nearest first",
    description = "Ranks the session's known hospitals by distance from the \
        latest accepted position. Passing `search` stores a case-insensitive \
        name filter on the session.",
    params(
        ("jacket_id" = String, Path, description = "Jacket hardware identifier"),
        HospitalsQuery
    ),
    responses(
        (status = 200, description = "Hospitals retrieved", body = HospitalsResponse),
        (status = 404, description = "No open session for this jacket", body = ErrorResponse)
    )
)]
pub async fn list_hospitals(
    State(state): State<SharedState>,
    Path(jacket_id): Path<String>,
    Query(query): Query<HospitalsQuery>,
) -> ApiResult<Json<HospitalsResponse>> {
    let session = session_for(&state, &jacket_id).await?;
    let hospitals = session.hospitals(query.search.as_deref());
    let total = hospitals.len();
    Ok(Json(HospitalsResponse { hospitals, total }))
}

/// Refresh the hospital list from the POI service.
#[utoipa::path(
    post,
    path = "/api/tracking/{jacket_id}/hospitals/refresh",
    tag = "tracking",
    operation_id = "refreshHospitals",
    summary = "Search for nearby hospitals",
    description = "Queries the POI service for hospitals around the latest \
        accepted position. Prior results, the stored search text, the \
        selection, and any route state are cleared before the query goes \
        out. An empty result is valid, not an error.",
    params(
        ("jacket_id" = String, Path, description = "Jacket hardware identifier")
    ),
    responses(
        (status = 200, description = "Hospitals refreshed", body = HospitalsResponse),
        (status = 404, description = "No open session for this jacket", body = ErrorResponse),
        (status = 503, description = "POI service unreachable", body = ErrorResponse)
    )
)]
pub async fn refresh_hospitals(
    State(state): State<SharedState>,
    Path(jacket_id): Path<String>,
) -> ApiResult<Json<HospitalsResponse>> {
    let session = session_for(&state, &jacket_id).await?;
    let hospitals = session.refresh_hospitals().await?;
    let total = hospitals.len();
    Ok(Json(HospitalsResponse { hospitals, total }))
}

/// Select a hospital and plan a route to it.
#[utoipa::path(
    post,
    path = "/api/tracking/{jacket_id}/hospitals/{poi_id}/select",
    tag = "tracking",
    operation_id = "selectHospital",
    summary = "Select a hospital and route to it",
    description = "Marks the hospital as the navigation destination and \
        plans a route right away. A `null` route means the routing service \
        had no route for the pair; the selection sticks either way.",
    params(
        ("jacket_id" = String, Path, description = "Jacket hardware identifier"),
        ("poi_id" = String, Path, description = "Hospital POI id from the ranked list")
    ),
    responses(
        (status = 200, description = "Hospital selected", body = SelectHospitalResponse),
        (status = 404, description = "No open session, or no such hospital", body = ErrorResponse),
        (status = 503, description = "Routing service unreachable", body = ErrorResponse)
    )
)]
pub async fn select_hospital(
    State(state): State<SharedState>,
    Path((jacket_id, poi_id)): Path<(String, String)>,
) -> ApiResult<Json<SelectHospitalResponse>> {
    let session = session_for(&state, &jacket_id).await?;
    let route = session.select_hospital(&poi_id).await?;
    Ok(Json(SelectHospitalResponse {
        selected_id: poi_id,
        route,
    }))
}

/// Start navigation to the selected hospital.
#[utoipa::path(
    post,
    path = "/api/tracking/{jacket_id}/navigation/start",
    tag = "tracking",
    operation_id = "startNavigation",
    summary = "Start navigation",
    description = "Starts the reroute timer. Every tick replans the route \
        from the latest accepted position to the selected hospital. Requires \
        a selected hospital; starting while already active reports \
        `started: false`.",
    params(
        ("jacket_id" = String, Path, description = "Jacket hardware identifier")
    ),
    responses(
        (status = 200, description = "Start attempt processed", body = StartNavigationResponse),
        (status = 400, description = "No hospital selected", body = ErrorResponse),
        (status = 404, description = "No open session for this jacket", body = ErrorResponse)
    )
)]
pub async fn start_navigation(
    State(state): State<SharedState>,
    Path(jacket_id): Path<String>,
) -> ApiResult<Json<StartNavigationResponse>> {
    let session = session_for(&state, &jacket_id).await?;
    let started = session.start_navigation()?;
    Ok(Json(StartNavigationResponse {
        started,
        navigation: session.snapshot().navigation,
    }))
}

/// Stop navigation.
#[utoipa::path(
    post,
    path = "/api/tracking/{jacket_id}/navigation/stop",
    tag = "tracking",
    operation_id = "stopNavigation",
    summary = "Stop navigation",
    description = "Cancels the reroute timer. The last planned route stays \
        available in snapshots. Stopping while idle reports `stopped: false`.",
    params(
        ("jacket_id" = String, Path, description = "Jacket hardware identifier")
    ),
    responses(
        (status = 200, description = "Stop attempt processed", body = StopNavigationResponse),
        (status = 404, description = "No open session for this jacket", body = ErrorResponse)
    )
)]
pub async fn stop_navigation(
    State(state): State<SharedState>,
    Path(jacket_id): Path<String>,
) -> ApiResult<Json<StopNavigationResponse>> {
    let session = session_for(&state, &jacket_id).await?;
    let stopped = session.stop_navigation();
    Ok(Json(StopNavigationResponse {
        stopped,
        navigation: session.snapshot().navigation,
    }))
}

/// Dispatch an SOS.
#[utoipa::path(
    post,
    path = "/api/tracking/{jacket_id}/sos",
    tag = "tracking",
    operation_id = "triggerSos",
    summary = "Dispatch an SOS",
    description = "Persists an alert built from the latest telemetry, \
        activates the process-wide emergency session, and refreshes the \
        hospital list in the background. A second SOS from the same session \
        is rejected with 409; a failed dispatch releases the guard so it can \
        be retried.",
    params(
        ("jacket_id" = String, Path, description = "Jacket hardware identifier")
    ),
    request_body(content = SosRequest, description = "Optional reason"),
    responses(
        (status = 201, description = "SOS dispatched", body = AlertResponse),
        (status = 404, description = "No open session for this jacket", body = ErrorResponse),
        (status = 409, description = "SOS already dispatched from this session", body = ErrorResponse),
        (status = 500, description = "Alert could not be persisted", body = ErrorResponse)
    )
)]
pub async fn trigger_sos(
    State(state): State<SharedState>,
    Path(jacket_id): Path<String>,
    body: Option<Json<SosRequest>>,
) -> ApiResult<(StatusCode, Json<AlertResponse>)> {
    let session = session_for(&state, &jacket_id).await?;
    let reason = body.and_then(|Json(request)| request.reason);
    let record = session.trigger_sos(reason).await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}
