//! Registered jackets and emergency contacts.
//!
//! Both registries persist as single JSON documents under the data
//! directory, loaded and saved per operation. Records use camelCase keys on
//! disk, matching the documents the companion app already stores.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{MaydayError, Result};
use crate::storage;

static JACKET_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid regex"));

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("valid regex"));

/// Whether a jacket identifier is acceptable: 1-64 characters of letters,
/// digits, `-` or `_`.
#[must_use]
pub fn is_valid_jacket_id(jacket_id: &str) -> bool {
    JACKET_ID_RE.is_match(jacket_id)
}

/// Whether a phone number is dialable: 7-15 digits with an optional leading
/// `+`, ignoring spaces and dashes.
#[must_use]
pub fn is_valid_phone_number(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    PHONE_RE.is_match(&compact)
}

/// Trims a free-text field, mapping empty input to `None`.
fn normalize(field: Option<String>) -> Option<String> {
    field
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

// ============================================================================
// Devices
// ============================================================================

/// A registered smart jacket with its wearer's health profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    /// Unique registration id.
    pub id: String,

    /// Display name for the device.
    #[schema(example = "Dad's jacket")]
    pub device_name: String,

    /// Jacket hardware identifier used for telemetry polling.
    #[schema(example = "JKT-001")]
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

    /// When the device was registered.
    pub created_at: DateTime<Utc>,

    /// When the profile was last edited.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for registering or editing a device.
#[derive(Debug, Clone, Default)]
pub struct DeviceDraft {
    /// Display name. Required.
    pub device_name: String,

    /// Jacket hardware identifier. Required.
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
}

impl DeviceDraft {
    fn validate(&self) -> Result<()> {
        if self.device_name.trim().is_empty() {
            return Err(MaydayError::MissingField("device_name"));
        }
        let jacket_id = self.jacket_id.trim();
        if jacket_id.is_empty() {
            return Err(MaydayError::MissingField("jacket_id"));
        }
        if !is_valid_jacket_id(jacket_id) {
            return Err(MaydayError::InvalidJacketId(jacket_id.to_string()));
        }
        Ok(())
    }
}

/// Persistent registry of jackets.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    path: PathBuf,
}

impl DeviceRegistry {
    /// Creates a registry stored under `data_dir`.
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("devices.json"),
        }
    }

    /// All registered devices in registration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry file cannot be read.
    pub fn list(&self) -> Result<Vec<DeviceRecord>> {
        Ok(storage::load_json(&self.path)?.unwrap_or_default())
    }

    /// Looks a device up by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry file cannot be read.
    pub fn get(&self, id: &str) -> Result<Option<DeviceRecord>> {
        Ok(self.list()?.into_iter().find(|device| device.id == id))
    }

    /// Registers a new device.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a missing name or bad jacket id, or a
    /// persistence error if the registry cannot be written.
    pub fn register(&self, draft: DeviceDraft) -> Result<DeviceRecord> {
        draft.validate()?;

        let record = DeviceRecord {
            id: Uuid::new_v4().to_string(),
            device_name: draft.device_name.trim().to_string(),
            jacket_id: draft.jacket_id.trim().to_string(),
            age: normalize(draft.age),
            weight: normalize(draft.weight),
            height: normalize(draft.height),
            blood_group: normalize(draft.blood_group),
            allergies: normalize(draft.allergies),
            created_at: Utc::now(),
            updated_at: None,
        };

        let mut devices = self.list()?;
        devices.push(record.clone());
        storage::save_json(&self.path, &devices)?;
        Ok(record)
    }

    /// Replaces a device's name, jacket id, and profile.
    ///
    /// # Errors
    ///
    /// Returns [`MaydayError::DeviceNotFound`] if no device has this id,
    /// plus the same validation errors as [`register`].
    ///
    /// [`register`]: DeviceRegistry::register
    pub fn update(&self, id: &str, draft: DeviceDraft) -> Result<DeviceRecord> {
        draft.validate()?;

        let mut devices = self.list()?;
        let device = devices
            .iter_mut()
            .find(|device| device.id == id)
            .ok_or_else(|| MaydayError::DeviceNotFound(id.to_string()))?;

        device.device_name = draft.device_name.trim().to_string();
        device.jacket_id = draft.jacket_id.trim().to_string();
        device.age = normalize(draft.age);
        device.weight = normalize(draft.weight);
        device.height = normalize(draft.height);
        device.blood_group = normalize(draft.blood_group);
        device.allergies = normalize(draft.allergies);
        device.updated_at = Some(Utc::now());
        let updated = device.clone();

        storage::save_json(&self.path, &devices)?;
        Ok(updated)
    }

    /// Removes a device.
    ///
    /// # Errors
    ///
    /// Returns [`MaydayError::DeviceNotFound`] if no device has this id.
    pub fn remove(&self, id: &str) -> Result<()> {
        let mut devices = self.list()?;
        let before = devices.len();
        devices.retain(|device| device.id != id);
        if devices.len() == before {
            return Err(MaydayError::DeviceNotFound(id.to_string()));
        }
        storage::save_json(&self.path, &devices)
    }
}

// ============================================================================
// Emergency contacts
// ============================================================================

/// One emergency contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    /// Unique contact id.
    pub id: String,

    /// Contact's name.
    #[schema(example = "Asha")]
    pub name: String,

    /// Dialable phone number.
    #[schema(example = "+91 98100 11223")]
    pub phone: String,

    /// Relationship to the wearer.
    #[schema(example = "Daughter")]
    pub relationship: Option<String>,

    /// Whether this contact is called first. The first contact added
    /// becomes primary.
    pub is_primary: bool,

    /// When the contact was added.
    pub created_at: DateTime<Utc>,
}

/// Input for adding a contact.
#[derive(Debug, Clone, Default)]
pub struct ContactDraft {
    /// Contact's name. Required.
    pub name: String,

    /// Phone number. Required.
    pub phone: String,

    /// Relationship to the wearer.
    pub relationship: Option<String>,
}

/// Persistent registry of emergency contacts.
#[derive(Debug, Clone)]
pub struct ContactRegistry {
    path: PathBuf,
}

impl ContactRegistry {
    /// Creates a registry stored under `data_dir`.
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("contacts.json"),
        }
    }

    /// All contacts, primary first, then in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry file cannot be read.
    pub fn list(&self) -> Result<Vec<ContactRecord>> {
        let mut contacts: Vec<ContactRecord> =
            storage::load_json(&self.path)?.unwrap_or_default();
        contacts.sort_by_key(|contact| !contact.is_primary);
        Ok(contacts)
    }

    /// Adds a contact. The first contact ever added becomes primary.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a missing name or undialable phone
    /// number, or a persistence error if the registry cannot be written.
    pub fn add(&self, draft: ContactDraft) -> Result<ContactRecord> {
        if draft.name.trim().is_empty() {
            return Err(MaydayError::MissingField("name"));
        }
        let phone = draft.phone.trim();
        if phone.is_empty() {
            return Err(MaydayError::MissingField("phone"));
        }
        if !is_valid_phone_number(phone) {
            return Err(MaydayError::InvalidPhoneNumber(phone.to_string()));
        }

        let mut contacts: Vec<ContactRecord> =
            storage::load_json(&self.path)?.unwrap_or_default();
        let record = ContactRecord {
            id: Uuid::new_v4().to_string(),
            name: draft.name.trim().to_string(),
            phone: phone.to_string(),
            relationship: normalize(draft.relationship),
            is_primary: contacts.is_empty(),
            created_at: Utc::now(),
        };
        contacts.push(record.clone());
        storage::save_json(&self.path, &contacts)?;
        Ok(record)
    }

    /// Removes a contact. Primary status is not reassigned.
    ///
    /// # Errors
    ///
    /// Returns [`MaydayError::ContactNotFound`] if no contact has this id.
    pub fn remove(&self, id: &str) -> Result<()> {
        let mut contacts: Vec<ContactRecord> =
            storage::load_json(&self.path)?.unwrap_or_default();
        let before = contacts.len();
        contacts.retain(|contact| contact.id != id);
        if contacts.len() == before {
            return Err(MaydayError::ContactNotFound(id.to_string()));
        }
        storage::save_json(&self.path, &contacts)
    }
}
