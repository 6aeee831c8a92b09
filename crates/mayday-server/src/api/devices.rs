//! Device registration API endpoints.
//!
//! A device is a registered smart jacket plus the wearer's health profile.
//! The jacket id recorded here is what the tracking endpoints poll
//! telemetry for.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use mayday_core::{DeviceDraft, DeviceRecord};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the devices router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_devices).post(register_device))
        .route(
            "/{id}",
            get(get_device).put(update_device).delete(remove_device),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for registering or editing a device.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "device_name": "Dad's jacket",
    "jacket_id": "JKT-001",
    "age": "68",
    "blood_group": "B+"
}))]
pub struct DeviceRequest {
    /// Display name for the device. Required.
    #[schema(example = "Dad's jacket", min_length = 1)]
    pub device_name: String,

    /// Jacket hardware identifier. Required; letters, digits, `-`, `_`.
    #[schema(example = "JKT-001", min_length = 1, max_length = 64)]
    pub jacket_id: String,

    /// Wearer's age, free text.
    pub age: Option<String>,

    /// Wearer's weight, free text.
    pub weight: Option<String>,

    /// Wearer's height, free text.
    pub height: Option<String>,

    /// Wearer's blood group.
    #[schema(example = "B+")]
    pub blood_group: Option<String>,

    /// Known allergies.
    pub allergies: Option<String>,
}

impl From<DeviceRequest> for DeviceDraft {
    fn from(request: DeviceRequest) -> Self {
        Self {
            device_name: request.device_name,
            jacket_id: request.jacket_id,
            age: request.age,
            weight: request.weight,
            height: request.height,
            blood_group: request.blood_group,
            allergies: request.allergies,
        }
    }
}

/// A registered device.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "a3f1c9ab-7c5e-4d19-9f39-6b9f2f8f0d11",
    "device_name": "Dad's jacket",
    "jacket_id": "JKT-001",
    "age": "68",
    "weight": null,
    "height": null,
    "blood_group": "B+",
    "allergies": null,
    "created_at": "2025-01-15T03:30:00Z",
    "updated_at": null
}))]
pub struct DeviceResponse {
    /// Unique registration id.
    pub id: String,

    /// Display name for the device.
    #[schema(example = "Dad's jacket")]
    pub device_name: String,

    /// Jacket hardware identifier.
    #[schema(example = "JKT-001")]
    pub jacket_id: String,

    /// Wearer's age, free text.
    pub age: Option<String>,

    /// Wearer's weight, free text.
    pub weight: Option<String>,

    /// Wearer's height, free text.
    pub height: Option<String>,

    /// Wearer's blood group.
    pub blood_group: Option<String>,

    /// Known allergies.
    pub allergies: Option<String>,

    /// When the device was registered.
    pub created_at: DateTime<Utc>,

    /// When the profile was last edited.
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<DeviceRecord> for DeviceResponse {
    fn from(record: DeviceRecord) -> Self {
        Self {
            id: record.id,
            device_name: record.device_name,
            jacket_id: record.jacket_id,
            age: record.age,
            weight: record.weight,
            height: record.height,
            blood_group: record.blood_group,
            allergies: record.allergies,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// List of registered devices.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DevicesResponse {
    /// Registered devices in registration order.
    pub devices: Vec<DeviceResponse>,

    /// Number of registered devices.
    #[schema(example = 1)]
    pub total: usize,
}

/// Response after removing a device.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"deleted": true, "id": "a3f1c9ab-7c5e-4d19-9f39-6b9f2f8f0d11"}))]
pub struct DeleteDeviceResponse {
    /// Whether the device was removed.
    #[schema(example = true)]
    pub deleted: bool,

    /// Id of the removed device.
    pub id: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// List registered devices.
#[utoipa::path(
    get,
    path = "/api/devices",
    tag = "devices",
    operation_id = "listDevices",
    summary = "List registered devices",
    description = "Returns every registered smart jacket with its wearer profile.",
    responses(
        (status = 200, description = "Devices retrieved", body = DevicesResponse)
    )
)]
pub async fn list_devices(State(state): State<SharedState>) -> ApiResult<Json<DevicesResponse>> {
    let state_guard = state.read().await;
    let devices: Vec<DeviceResponse> = state_guard
        .devices
        .list()?
        .into_iter()
        .map(DeviceResponse::from)
        .collect();

    let total = devices.len();
    Ok(Json(DevicesResponse { devices, total }))
}

/// Register a new device.
#[utoipa::path(
    post,
    path = "/api/devices",
    tag = "devices",
    operation_id = "registerDevice",
    summary = "Register a smart jacket",
    description = "Registers a jacket with a display name and wearer profile. \
        The jacket id must be unique-looking but uniqueness is not enforced; \
        tracking sessions key on it.",
    request_body = DeviceRequest,
    responses(
        (status = 201, description = "Device registered", body = DeviceResponse),
        (status = 400, description = "Missing name or malformed jacket id", body = ErrorResponse)
    )
)]
pub async fn register_device(
    State(state): State<SharedState>,
    Json(request): Json<DeviceRequest>,
) -> ApiResult<(StatusCode, Json<DeviceResponse>)> {
    let state_guard = state.write().await;
    let record = state_guard.devices.register(request.into())?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

/// Get one device by id.
#[utoipa::path(
    get,
    path = "/api/devices/{id}",
    tag = "devices",
    operation_id = "getDevice",
    summary = "Get a device",
    params(
        ("id" = String, Path, description = "Device registration id")
    ),
    responses(
        (status = 200, description = "Device retrieved", body = DeviceResponse),
        (status = 404, description = "No device with this id", body = ErrorResponse)
    )
)]
pub async fn get_device(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeviceResponse>> {
    let state_guard = state.read().await;
    let record = state_guard.devices.get(&id)?.ok_or_else(|| ApiError::NotFound {
        error_code: "device_not_found".to_string(),
        message: format!("Device not found: {id}"),
    })?;

    Ok(Json(record.into()))
}

/// Replace a device's name, jacket id, and profile.
#[utoipa::path(
    put,
    path = "/api/devices/{id}",
    tag = "devices",
    operation_id = "updateDevice",
    summary = "Edit a device profile",
    description = "Replaces the device's display name, jacket id, and wearer \
        profile, and stamps the edit time.",
    params(
        ("id" = String, Path, description = "Device registration id")
    ),
    request_body = DeviceRequest,
    responses(
        (status = 200, description = "Device updated", body = DeviceResponse),
        (status = 400, description = "Missing name or malformed jacket id", body = ErrorResponse),
        (status = 404, description = "No device with this id", body = ErrorResponse)
    )
)]
pub async fn update_device(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(request): Json<DeviceRequest>,
) -> ApiResult<Json<DeviceResponse>> {
    let state_guard = state.write().await;
    let record = state_guard.devices.update(&id, request.into())?;
    Ok(Json(record.into()))
}

/// Remove a device.
#[utoipa::path(
    delete,
    path = "/api/devices/{id}",
    tag = "devices",
    operation_id = "removeDevice",
    summary = "Remove a device",
    params(
        ("id" = String, Path, description = "Device registration id")
    ),
    responses(
        (status = 200, description = "Device removed", body = DeleteDeviceResponse),
        (status = 404, description = "No device with this id", body = ErrorResponse)
    )
)]
pub async fn remove_device(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteDeviceResponse>> {
    let state_guard = state.write().await;
    state_guard.devices.remove(&id)?;
    Ok(Json(DeleteDeviceResponse { deleted: true, id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{test_server, test_state};
    use serde_json::json;

    #[tokio::test]
    async fn test_device_crud_round_trip() {
        let (state, _dir) = test_state();
        let server = test_server(state);

        let response = server
            .post("/api/devices")
            .json(&json!({
                "device_name": "Dad's jacket",
                "jacket_id": "JKT-001",
                "age": "68"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: DeviceResponse = response.json();
        assert_eq!(created.device_name, "Dad's jacket");
        assert_eq!(created.age.as_deref(), Some("68"));

        let response = server.get("/api/devices").await;
        response.assert_status_ok();
        let list: DevicesResponse = response.json();
        assert_eq!(list.total, 1);
        assert_eq!(list.devices[0].id, created.id);

        let response = server
            .put(&format!("/api/devices/{}", created.id))
            .json(&json!({
                "device_name": "Renamed",
                "jacket_id": "JKT-002"
            }))
            .await;
        response.assert_status_ok();
        let updated: DeviceResponse = response.json();
        assert_eq!(updated.device_name, "Renamed");
        assert!(updated.updated_at.is_some());

        let response = server.delete(&format!("/api/devices/{}", created.id)).await;
        response.assert_status_ok();

        let response = server.get(&format!("/api/devices/{}", created.id)).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_register_device_validation() {
        let (state, _dir) = test_state();
        let server = test_server(state);

        let response = server
            .post("/api/devices")
            .json(&json!({"device_name": "", "jacket_id": "JKT-001"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .post("/api/devices")
            .json(&json!({"device_name": "Jacket", "jacket_id": "has spaces"}))
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: ErrorResponse = response.json();
        assert_eq!(body.error, "invalid_jacket_id");
    }
}
