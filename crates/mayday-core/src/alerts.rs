//! SOS alert records and their persistence.
//!
//! Every dispatched SOS becomes one immutable [`AlertRecord`] capturing the
//! vitals and position at the moment of the alert. Records are stored
//! through the [`AlertStore`] trait so deployments can swap the JSON file
//! store for something else without touching session logic.
//!
//! The on-disk format uses camelCase keys, matching the alert documents the
//! companion app already stores.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::Result;
use crate::geo::LocationPoint;
use crate::storage;
use crate::telemetry::VitalsSnapshot;

/// Lifecycle state of an alert.
///
/// Alerts are only ever created active; resolution workflows live outside
/// this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    /// The alert is live.
    Active,
}

/// One dispatched SOS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    /// Unique alert id.
    pub id: String,

    /// Jacket that raised the alert.
    #[schema(example = "JKT-001")]
    pub jacket_id: String,

    /// Why the alert was raised.
    #[schema(example = "Auto SOS Activated")]
    pub reason: String,

    /// Blood oxygen saturation at dispatch time, in percent.
    pub spo2: f64,

    /// Pulse at dispatch time, in beats per minute.
    pub pulse: f64,

    /// Body temperature at dispatch time, in degrees Celsius.
    pub temperature: f64,

    /// Latitude at dispatch time.
    pub lat: f64,

    /// Longitude at dispatch time.
    pub lng: f64,

    /// Lifecycle state.
    pub status: AlertStatus,

    /// When the alert was dispatched.
    pub created_at: DateTime<Utc>,
}

impl AlertRecord {
    /// Builds an active alert from the current telemetry.
    #[must_use]
    pub fn new(
        jacket_id: String,
        reason: String,
        vitals: VitalsSnapshot,
        location: LocationPoint,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            jacket_id,
            reason,
            spo2: vitals.spo2,
            pulse: vitals.pulse,
            temperature: vitals.temperature,
            lat: location.lat,
            lng: location.lng,
            status: AlertStatus::Active,
            created_at: Utc::now(),
        }
    }
}

/// Persistence seam for alert records.
///
/// Implementations must be safe to share across the server's handlers.
pub trait AlertStore: Send + Sync {
    /// Appends one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be persisted.
    fn append(&self, record: &AlertRecord) -> Result<()>;

    /// All records for one jacket, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be read.
    fn for_jacket(&self, jacket_id: &str) -> Result<Vec<AlertRecord>>;

    /// All records across jackets, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the records cannot be read.
    fn all(&self) -> Result<Vec<AlertRecord>>;
}

/// JSON file alert store, one file per jacket under `<data_dir>/alerts/`.
#[derive(Debug, Clone)]
pub struct JsonAlertStore {
    data_dir: PathBuf,
}

impl JsonAlertStore {
    /// Creates a store rooted at `data_dir`.
    #[must_use]
    pub const fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    fn jacket_path(&self, jacket_id: &str) -> PathBuf {
        self.data_dir.join("alerts").join(format!("{jacket_id}.json"))
    }

    fn load_jacket(&self, jacket_id: &str) -> Result<Vec<AlertRecord>> {
        Ok(storage::load_json(&self.jacket_path(jacket_id))?.unwrap_or_default())
    }
}

impl AlertStore for JsonAlertStore {
    fn append(&self, record: &AlertRecord) -> Result<()> {
        let mut records = self.load_jacket(&record.jacket_id)?;
        records.push(record.clone());
        storage::save_json(&self.jacket_path(&record.jacket_id), &records)
    }

    fn for_jacket(&self, jacket_id: &str) -> Result<Vec<AlertRecord>> {
        let mut records = self.load_jacket(jacket_id)?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn all(&self) -> Result<Vec<AlertRecord>> {
        let alerts_dir = self.data_dir.join("alerts");
        if !alerts_dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in std::fs::read_dir(alerts_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let mut file_records: Vec<AlertRecord> =
                    storage::load_json(&path)?.unwrap_or_default();
                records.append(&mut file_records);
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

/// In-memory alert store for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryAlertStore {
    records: Mutex<Vec<AlertRecord>>,
}

impl MemoryAlertStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlertStore for MemoryAlertStore {
    fn append(&self, record: &AlertRecord) -> Result<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }

    fn for_jacket(&self, jacket_id: &str) -> Result<Vec<AlertRecord>> {
        let mut records: Vec<AlertRecord> = self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|record| record.jacket_id == jacket_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    fn all(&self) -> Result<Vec<AlertRecord>> {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn record_at(jacket_id: &str, reason: &str, created_at: DateTime<Utc>) -> AlertRecord {
        AlertRecord {
            created_at,
            ..AlertRecord::new(
                jacket_id.to_string(),
                reason.to_string(),
                VitalsSnapshot::default(),
                LocationPoint::new(28.6139, 77.2090),
            )
        }
    }

    #[test]
    fn test_record_serializes_with_camel_case_keys() {
        let record = AlertRecord::new(
            "JKT-001".to_string(),
            "Auto SOS Activated".to_string(),
            VitalsSnapshot::default(),
            LocationPoint::new(28.6139, 77.2090),
        );
        let json = serde_json::to_string(&record).unwrap();

        assert!(json.contains("\"jacketId\":\"JKT-001\""));
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"status\":\"ACTIVE\""));
        assert!(json.contains("\"spo2\":98.0"));
    }

    #[test]
    fn test_json_store_round_trip_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonAlertStore::new(dir.path().to_path_buf());

        let now = Utc::now();
        store
            .append(&record_at("JKT-001", "older", now - Duration::minutes(5)))
            .unwrap();
        store.append(&record_at("JKT-001", "newer", now)).unwrap();

        let records = store.for_jacket("JKT-001").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].reason, "newer");
        assert_eq!(records[1].reason, "older");
    }

    #[test]
    fn test_json_store_all_merges_jackets() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonAlertStore::new(dir.path().to_path_buf());

        let now = Utc::now();
        store.append(&record_at("JKT-001", "first", now)).unwrap();
        store
            .append(&record_at("JKT-002", "second", now + Duration::minutes(1)))
            .unwrap();

        let records = store.all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].jacket_id, "JKT-002");
    }

    #[test]
    fn test_json_store_empty_without_data() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonAlertStore::new(dir.path().to_path_buf());

        assert!(store.for_jacket("JKT-404").unwrap().is_empty());
        assert!(store.all().unwrap().is_empty());
    }

    #[test]
    fn test_memory_store_filters_by_jacket() {
        let store = MemoryAlertStore::new();
        let now = Utc::now();
        store.append(&record_at("JKT-001", "mine", now)).unwrap();
        store.append(&record_at("JKT-002", "theirs", now)).unwrap();

        let records = store.for_jacket("JKT-001").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].reason, "mine");
        assert_eq!(store.all().unwrap().len(), 2);
    }

    #[test]
    fn test_store_is_object_safe() {
        let store: Arc<dyn AlertStore> = Arc::new(MemoryAlertStore::new());
        store
            .append(&record_at("JKT-001", "via trait object", Utc::now()))
            .unwrap();
        assert_eq!(store.for_jacket("JKT-001").unwrap().len(), 1);
    }
}
