//! # mayday-core
//!
//! Core business logic for the mayday smart jacket tracking system.
//!
//! This crate provides:
//! - Telemetry polling with GPS noise filtering and partial vitals merging
//! - Nearby-hospital search and distance ranking
//! - Route planning with encoded-polyline decoding
//! - Navigation rerouting, emergency sessions, and SOS dispatch
//! - Device and emergency-contact registries with JSON persistence
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`telemetry`] - Jacket telemetry polling, noise filtering, and vitals merging
//! - [`geo`] - Geographic points and haversine distances
//! - [`hospitals`] - Overpass hospital search and distance ranking
//! - [`routing`] - OSRM route planning with stale-response sequencing
//! - [`polyline`] - Encoded polyline decoding
//! - [`navigation`] - The reroute timer lifecycle
//! - [`emergency`] - The process-wide emergency session
//! - [`tracking`] - Per-jacket tracking sessions tying the above together
//! - [`alerts`] - SOS alert records and their stores
//! - [`registry`] - Registered devices and emergency contacts
//! - [`config`] - Application configuration loading, saving, and validation
//! - [`storage`] - JSON file persistence helpers
//! - [`error`] - Unified error types for the crate

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod alerts;
pub mod config;
pub mod emergency;
pub mod error;
pub mod geo;
pub mod hospitals;
pub mod navigation;
pub mod polyline;
pub mod registry;
pub mod routing;
pub mod storage;
pub mod telemetry;
pub mod tracking;

// Re-export primary types for convenience
pub use alerts::{AlertRecord, AlertStatus, AlertStore, JsonAlertStore, MemoryAlertStore};
pub use config::{
    HospitalsConfig, MaydayConfig, RoutingConfig, ServerConfig, StorageConfig, TelemetryConfig,
};
pub use emergency::{EmergencySession, EmergencyStatus, DEFAULT_MANUAL_REASON};
pub use error::{MaydayError, Result};
pub use geo::{LocationPoint, EARTH_RADIUS_KM};
pub use hospitals::{rank_hospitals, HospitalRecord, OverpassClient, RankedHospital};
pub use navigation::{NavigationSession, NavigationStatus};
pub use registry::{
    is_valid_jacket_id, is_valid_phone_number, ContactDraft, ContactRecord, ContactRegistry,
    DeviceDraft, DeviceRecord, DeviceRegistry,
};
pub use routing::{OsrmClient, RouteOutcome, RoutePlanner, RouteResult, RouteState};
pub use storage::default_data_dir;
pub use telemetry::{
    TelemetryClient, TelemetryFrame, TelemetryPoller, TelemetrySnapshot, TelemetryTracker,
    VitalsSnapshot,
};
pub use tracking::{TrackingSession, TrackingSnapshot, DEFAULT_SOS_REASON};
