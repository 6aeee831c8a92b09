//! Emergency contact API endpoints.
//!
//! Contacts are the people notified when an SOS goes out. The first contact
//! added becomes the primary contact and sorts first in every listing.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use mayday_core::{ContactDraft, ContactRecord};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::{ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Creates the contacts router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_contacts).post(add_contact))
        .route("/{id}", axum::routing::delete(remove_contact))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for adding a contact.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "name": "Asha",
    "phone": "+91 98100 11223",
    "relationship": "Daughter"
}))]
pub struct ContactRequest {
    /// Contact's name. Required.
    #[schema(example = "Asha", min_length = 1)]
    pub name: String,

    /// Dialable phone number. Required.
    #[schema(example = "+91 98100 11223", min_length = 7)]
    pub phone: String,

    /// Relationship to the wearer.
    #[schema(example = "Daughter")]
    pub relationship: Option<String>,
}

/// One emergency contact.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "0c9a7e4e-4d0f-4e6f-a9d1-2f62a1f3b8c4",
    "name": "Asha",
    "phone": "+91 98100 11223",
    "relationship": "Daughter",
    "is_primary": true,
    "created_at": "2025-01-15T03:30:00Z"
}))]
pub struct ContactResponse {
    /// Unique contact id.
    pub id: String,

    /// Contact's name.
    #[schema(example = "Asha")]
    pub name: String,

    /// Dialable phone number.
    #[schema(example = "+91 98100 11223")]
    pub phone: String,

    /// Relationship to the wearer.
    pub relationship: Option<String>,

    /// Whether this contact is called first.
    #[schema(example = true)]
    pub is_primary: bool,

    /// When the contact was added.
    pub created_at: DateTime<Utc>,
}

impl From<ContactRecord> for ContactResponse {
    fn from(record: ContactRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            phone: record.phone,
            relationship: record.relationship,
            is_primary: record.is_primary,
            created_at: record.created_at,
        }
    }
}

/// List of emergency contacts, primary first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContactsResponse {
    /// Contacts, primary first, then in the order they were added.
    pub contacts: Vec<ContactResponse>,

    /// Number of contacts.
    #[schema(example = 2)]
    pub total: usize,
}

/// Response after removing a contact.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"deleted": true, "id": "0c9a7e4e-4d0f-4e6f-a9d1-2f62a1f3b8c4"}))]
pub struct DeleteContactResponse {
    /// Whether the contact was removed.
    #[schema(example = true)]
    pub deleted: bool,

    /// Id of the removed contact.
    pub id: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// List emergency contacts, primary first.
#[utoipa::path(
    get,
    path = "/api/contacts",
    tag = "contacts",
    operation_id = "listContacts",
    summary = "List emergency contacts",
    description = "Returns every emergency contact, the primary contact first.",
    responses(
        (status = 200, description = "Contacts retrieved", body = ContactsResponse)
    )
)]
pub async fn list_contacts(State(state): State<SharedState>) -> ApiResult<Json<ContactsResponse>> {
    let state_guard = state.read().await;
    let contacts: Vec<ContactResponse> = state_guard
        .contacts
        .list()?
        .into_iter()
        .map(ContactResponse::from)
        .collect();

    let total = contacts.len();
    Ok(Json(ContactsResponse { contacts, total }))
}

/// Add an emergency contact.
#[utoipa::path(
    post,
    path = "/api/contacts",
    tag = "contacts",
    operation_id = "addContact",
    summary = "Add an emergency contact",
    description = "Adds a contact with a name and dialable phone number. The \
        first contact ever added becomes the primary contact.",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Contact added", body = ContactResponse),
        (status = 400, description = "Missing name or undialable phone number", body = ErrorResponse)
    )
)]
pub async fn add_contact(
    State(state): State<SharedState>,
    Json(request): Json<ContactRequest>,
) -> ApiResult<(StatusCode, Json<ContactResponse>)> {
    let state_guard = state.write().await;
    let record = state_guard.contacts.add(ContactDraft {
        name: request.name,
        phone: request.phone,
        relationship: request.relationship,
    })?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// Remove a contact.
#[utoipa::path(
    delete,
    path = "/api/contacts/{id}",
    tag = "contacts",
    operation_id = "removeContact",
    summary = "Remove a contact",
    params(
        ("id" = String, Path, description = "Contact id")
    ),
    responses(
        (status = 200, description = "Contact removed", body = DeleteContactResponse),
        (status = 404, description = "No contact with this id", body = ErrorResponse)
    )
)]
pub async fn remove_contact(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteContactResponse>> {
    let state_guard = state.write().await;
    state_guard.contacts.remove(&id)?;
    Ok(Json(DeleteContactResponse { deleted: true, id }))
}
