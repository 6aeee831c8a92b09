//! OpenAPI specification generation for the mayday API.
//!
//! The generated document is served at `/api/openapi.json`, rendered by
//! Swagger UI at `/docs`, and written to disk by the `gen-openapi` binary.
//! Descriptions are written to be understood by both human developers and
//! API clients.

use mayday_core::{
    EmergencyStatus, LocationPoint, NavigationStatus, RankedHospital, RouteOutcome, RouteResult,
    RouteState, TelemetrySnapshot, TrackingSnapshot, VitalsSnapshot,
};
use utoipa::OpenApi;

// Import all the handler modules to reference their types
use super::alerts::{AlertResponse, AlertsResponse};
use super::contacts::{
    ContactRequest, ContactResponse, ContactsResponse, DeleteContactResponse,
};
use super::devices::{DeleteDeviceResponse, DeviceRequest, DeviceResponse, DevicesResponse};
use super::emergency::{StartEmergencyRequest, StartEmergencyResponse, StopEmergencyResponse};
use super::error::ErrorResponse;
use super::health::HealthResponse;
use super::tracking::{
    CloseTrackingResponse, HospitalsResponse, SelectHospitalResponse, SosRequest,
    StartNavigationResponse, StartTrackingResponse, StopNavigationResponse,
};

/// Returns the OpenAPI specification as a string (for writing to file).
/// Used by the gen-openapi binary.
#[allow(dead_code)]
pub fn get_openapi_json() -> String {
    ApiDoc::openapi()
        .to_pretty_json()
        .expect("Failed to serialize OpenAPI spec")
}

/// Main OpenAPI document structure for mayday.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "mayday API",
        version = "0.1.0",
        description = r#"
# mayday API

mayday tracks a smart safety jacket: live location and vitals, nearby
hospitals, turn-by-turn routing, and SOS alerting.

## Overview

1. **Devices & Contacts**: Register jackets with a wearer profile and keep a
   list of emergency contacts (the first contact added is primary).
2. **Tracking Sessions**: Open one session per jacket. The session polls the
   jacket's telemetry, filters GPS noise, and merges partial vitals.
3. **Hospitals & Routing**: Search for hospitals near the jacket, select one,
   and navigate to it; active navigation replans the route as the jacket
   moves.
4. **SOS**: One call persists an alert from the latest telemetry, raises the
   process-wide emergency flag, and refreshes the hospital list.

## Conventions

- Timestamps are RFC 3339 UTC.
- Errors share one JSON body: `{error, message, details}` with a
  machine-readable `error` code.
- Empty results (no hospitals, no route) are valid responses, not errors.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local mayday server")
    ),
    tags(
        (
            name = "system",
            description = "Health checks and service status"
        ),
        (
            name = "tracking",
            description = "Live tracking sessions: telemetry snapshots, hospital search, navigation, and SOS"
        ),
        (
            name = "devices",
            description = "Smart jacket registration and wearer health profiles"
        ),
        (
            name = "contacts",
            description = "Emergency contacts notified when an SOS goes out"
        ),
        (
            name = "alerts",
            description = "Persisted SOS alert history"
        ),
        (
            name = "emergency",
            description = "The process-wide emergency session shared by every consumer"
        )
    ),
    paths(
        // Health endpoints
        super::health::health_check,
        // Tracking endpoints
        super::tracking::start_tracking,
        super::tracking::get_snapshot,
        super::tracking::close_tracking,
        super::tracking::list_hospitals,
        super::tracking::refresh_hospitals,
        super::tracking::select_hospital,
        super::tracking::start_navigation,
        super::tracking::stop_navigation,
        super::tracking::trigger_sos,
        // Device endpoints
        super::devices::list_devices,
        super::devices::register_device,
        super::devices::get_device,
        super::devices::update_device,
        super::devices::remove_device,
        // Contact endpoints
        super::contacts::list_contacts,
        super::contacts::add_contact,
        super::contacts::remove_contact,
        // Alert endpoints
        super::alerts::list_alerts,
        // Emergency endpoints
        super::emergency::get_emergency,
        super::emergency::start_emergency,
        super::emergency::stop_emergency,
    ),
    components(
        schemas(
            // Error types
            ErrorResponse,
            // Health types
            HealthResponse,
            // Tracking types
            StartTrackingResponse,
            CloseTrackingResponse,
            HospitalsResponse,
            SelectHospitalResponse,
            StartNavigationResponse,
            StopNavigationResponse,
            SosRequest,
            // Core types embedded in tracking snapshots
            TrackingSnapshot,
            TelemetrySnapshot,
            VitalsSnapshot,
            LocationPoint,
            RankedHospital,
            RouteState,
            RouteResult,
            RouteOutcome,
            NavigationStatus,
            EmergencyStatus,
            // Device types
            DeviceRequest,
            DeviceResponse,
            DevicesResponse,
            DeleteDeviceResponse,
            // Contact types
            ContactRequest,
            ContactResponse,
            ContactsResponse,
            DeleteContactResponse,
            // Alert types
            AlertResponse,
            AlertsResponse,
            // Emergency types
            StartEmergencyRequest,
            StartEmergencyResponse,
            StopEmergencyResponse,
        )
    )
)]
pub struct ApiDoc;
