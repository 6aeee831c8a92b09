//! HTTP API routes and handlers.
//!
//! This module contains all HTTP endpoint implementations organized by domain:
//! - `tracking` - Live tracking sessions: telemetry, hospitals, routing, SOS
//! - `devices` - Smart jacket registration and wearer profiles
//! - `contacts` - Emergency contact management
//! - `alerts` - Persisted SOS alert history
//! - `emergency` - The process-wide emergency session
//! - `health` - Service health checks
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::SharedState;

pub mod alerts;
pub mod contacts;
pub mod devices;
pub mod emergency;
pub mod error;
pub mod health;
pub mod openapi;
pub mod tracking;

// Re-export commonly used types
#[allow(unused_imports)]
pub use error::{ApiError, ApiResult, ErrorResponse};

// Re-export OpenAPI utilities for the gen-openapi binary
#[allow(unused_imports)]
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                - Health check
/// /docs                  - Swagger UI
/// /api
/// ├── /tracking          - Live tracking sessions, hospitals, navigation, SOS
/// ├── /devices           - Device registration
/// ├── /contacts          - Emergency contacts
/// ├── /alerts            - SOS alert history
/// ├── /emergency         - Emergency session control
/// └── /openapi.json      - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                // Live tracking sessions
                .nest("/tracking", tracking::router())
                // Device registration
                .nest("/devices", devices::router())
                // Emergency contacts
                .nest("/contacts", contacts::router())
                // Alert history
                .nest("/alerts", alerts::router())
                // Emergency session control
                .nest("/emergency", emergency::router()),
        )
        .with_state(state)
        // Swagger UI also serves the raw spec at /api/openapi.json
        .merge(
            SwaggerUi::new("/docs").url("/api/openapi.json", openapi::ApiDoc::openapi()),
        )
}
