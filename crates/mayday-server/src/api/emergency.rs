//! Emergency session API endpoints.
//!
//! One process-wide emergency flag shared by every consumer: SOS dispatch
//! turns it on, an explicit stop turns it off. Starting while active and
//! stopping while inactive are no-ops, not errors.

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use mayday_core::{EmergencyStatus, DEFAULT_MANUAL_REASON};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::SharedState;

/// Creates the emergency router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(get_emergency))
        .route("/start", post(start_emergency))
        .route("/stop", post(stop_emergency))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for starting the emergency session.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({"reason": "Chest pain reported"}))]
pub struct StartEmergencyRequest {
    /// Why the emergency was started. Defaults to "Manual SOS".
    #[schema(example = "Chest pain reported")]
    pub reason: Option<String>,
}

/// Response after a start attempt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "started": true,
    "emergency": {
        "active": true,
        "reason": "Manual SOS",
        "last_activated_at": "2025-01-15T03:30:00Z"
    }
}))]
pub struct StartEmergencyResponse {
    /// Whether this call activated the session. `false` when it was
    /// already active.
    #[schema(example = true)]
    pub started: bool,

    /// Session state after the call.
    pub emergency: EmergencyStatus,
}

/// Response after a stop attempt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "stopped": true,
    "emergency": {
        "active": false,
        "reason": null,
        "last_activated_at": "2025-01-15T03:30:00Z"
    }
}))]
pub struct StopEmergencyResponse {
    /// Whether this call deactivated the session. `false` when it was
    /// already inactive.
    #[schema(example = true)]
    pub stopped: bool,

    /// Session state after the call.
    pub emergency: EmergencyStatus,
}

// ============================================================================
// Handlers
// ============================================================================

/// Get the emergency session state.
#[utoipa::path(
    get,
    path = "/api/emergency",
    tag = "emergency",
    operation_id = "getEmergency",
    summary = "Get emergency session state",
    description = "Returns whether an emergency is active, its reason, and \
        when it was last activated.",
    responses(
        (status = 200, description = "Emergency state retrieved", body = EmergencyStatus)
    )
)]
pub async fn get_emergency(State(state): State<SharedState>) -> Json<EmergencyStatus> {
    let state_guard = state.read().await;
    Json(state_guard.emergency.status())
}

/// Start the emergency session.
#[utoipa::path(
    post,
    path = "/api/emergency/start",
    tag = "emergency",
    operation_id = "startEmergency",
    summary = "Start the emergency session",
    description = "Activates the process-wide emergency session. Starting an \
        already active session changes nothing and reports `started: false`.",
    request_body(content = StartEmergencyRequest, description = "Optional reason"),
    responses(
        (status = 200, description = "Start attempt processed", body = StartEmergencyResponse)
    )
)]
pub async fn start_emergency(
    State(state): State<SharedState>,
    body: Option<Json<StartEmergencyRequest>>,
) -> Json<StartEmergencyResponse> {
    let reason = body
        .and_then(|Json(request)| request.reason)
        .map(|reason| reason.trim().to_string())
        .filter(|reason| !reason.is_empty())
        .unwrap_or_else(|| DEFAULT_MANUAL_REASON.to_string());

    let state_guard = state.read().await;
    let started = state_guard.emergency.start(reason);

    Json(StartEmergencyResponse {
        started,
        emergency: state_guard.emergency.status(),
    })
}

/// Stop the emergency session.
#[utoipa::path(
    post,
    path = "/api/emergency/stop",
    tag = "emergency",
    operation_id = "stopEmergency",
    summary = "Stop the emergency session",
    description = "Deactivates the emergency session, keeping the last \
        activation timestamp. Stopping an inactive session changes nothing \
        and reports `stopped: false`.",
    responses(
        (status = 200, description = "Stop attempt processed", body = StopEmergencyResponse)
    )
)]
pub async fn stop_emergency(State(state): State<SharedState>) -> Json<StopEmergencyResponse> {
    let state_guard = state.read().await;
    let stopped = state_guard.emergency.stop();

    Json(StopEmergencyResponse {
        stopped,
        emergency: state_guard.emergency.status(),
    })
}
