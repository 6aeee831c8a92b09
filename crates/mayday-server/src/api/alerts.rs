//! Alert history API endpoints.
//!
//! Every dispatched SOS persists one alert record. This endpoint lists
//! them newest first, optionally narrowed to one jacket.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use mayday_core::alerts::AlertRecord;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Creates the alerts router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(list_alerts))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for the alert history endpoint.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct AlertsQuery {
    /// Only return alerts for this jacket id.
    #[param(example = "JKT-001")]
    pub jacket_id: Option<String>,
}

/// One persisted SOS alert.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "5cbe2a9e-6a4f-4dc6-9f0e-c2a5f3e4b7a1",
    "jacket_id": "JKT-001",
    "reason": "Auto SOS Activated",
    "spo2": 97.0,
    "pulse": 80.0,
    "temperature": 36.8,
    "lat": 28.6139,
    "lng": 77.2090,
    "status": "ACTIVE",
    "created_at": "2025-01-15T03:30:00Z"
}))]
pub struct AlertResponse {
    /// Unique alert id.
    pub id: String,

    /// Jacket the alert was raised for.
    #[schema(example = "JKT-001")]
    pub jacket_id: String,

    /// Why the alert was raised.
    #[schema(example = "Auto SOS Activated")]
    pub reason: String,

    /// Blood oxygen saturation at dispatch, percent.
    #[schema(example = 97.0)]
    pub spo2: f64,

    /// Pulse at dispatch, beats per minute.
    #[schema(example = 80.0)]
    pub pulse: f64,

    /// Body temperature at dispatch, degrees Celsius.
    #[schema(example = 36.8)]
    pub temperature: f64,

    /// Latitude at dispatch.
    pub lat: f64,

    /// Longitude at dispatch.
    pub lng: f64,

    /// Alert status; alerts are never resolved by this service.
    #[schema(example = "ACTIVE")]
    pub status: String,

    /// When the alert was dispatched.
    pub created_at: DateTime<Utc>,
}

impl From<AlertRecord> for AlertResponse {
    fn from(record: AlertRecord) -> Self {
        Self {
            id: record.id,
            jacket_id: record.jacket_id,
            reason: record.reason,
            spo2: record.spo2,
            pulse: record.pulse,
            temperature: record.temperature,
            lat: record.lat,
            lng: record.lng,
            status: "ACTIVE".to_string(),
            created_at: record.created_at,
        }
    }
}

/// Alert history, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AlertsResponse {
    /// Alerts, newest first.
    pub alerts: Vec<AlertResponse>,

    /// Number of alerts returned.
    #[schema(example = 1)]
    pub total: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// List alert history, newest first.
#[utoipa::path(
    get,
    path = "/api/alerts",
    tag = "alerts",
    operation_id = "listAlerts",
    summary = "List SOS alert history",
    description = "Returns persisted SOS alerts newest first. Pass `jacket_id` \
        to narrow the history to one jacket.",
    params(AlertsQuery),
    responses(
        (status = 200, description = "Alerts retrieved", body = AlertsResponse)
    )
)]
pub async fn list_alerts(
    State(state): State<SharedState>,
    Query(query): Query<AlertsQuery>,
) -> ApiResult<Json<AlertsResponse>> {
    let state_guard = state.read().await;

    let records = match query.jacket_id.as_deref() {
        Some(jacket_id) => state_guard.alerts.for_jacket(jacket_id)?,
        None => state_guard.alerts.all()?,
    };

    let alerts: Vec<AlertResponse> = records.into_iter().map(AlertResponse::from).collect();
    let total = alerts.len();
    Ok(Json(AlertsResponse { alerts, total }))
}
