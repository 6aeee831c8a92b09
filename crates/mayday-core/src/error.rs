//! Unified error types for the mayday core library.
//!
//! This module provides a unified error type [`MaydayError`] that covers all
//! failure modes across the mayday system: upstream telemetry/POI/routing
//! services, tracking session state, registries, configuration, and
//! persistence.
//!
//! # Design Principles
//!
//! - **Specific variants**: Each error variant captures exactly one failure mode
//! - **Actionable messages**: Error messages guide users toward resolution
//! - **Context preservation**: Wrapped errors maintain their original context
//! - **HTTP-ready**: Error types include HTTP status codes and error codes
//!
//! # Example
//!
//! ```rust
//! use mayday_core::error::{MaydayError, Result};
//! use std::path::PathBuf;
//!
//! fn load_config(path: &PathBuf) -> Result<()> {
//!     if !path.exists() {
//!         return Err(MaydayError::ConfigNotFound(path.clone()));
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for all mayday operations.
///
/// This enum covers all failure modes that can occur in the mayday system.
/// Each variant is designed to be:
///
/// 1. **Self-descriptive**: The variant name indicates the failure mode
/// 2. **Contextual**: Variants include relevant data for debugging
/// 3. **Actionable**: Error messages suggest how to resolve the issue
#[derive(Debug, Error)]
pub enum MaydayError {
    // =========================================================================
    // TELEMETRY ERRORS
    // =========================================================================
    /// A telemetry poll against the jacket backend failed.
    #[error("Telemetry fetch failed for jacket '{jacket_id}': {message}")]
    TelemetryFetchFailed {
        /// Identifier of the jacket being polled.
        jacket_id: String,
        /// Underlying transport or decoding failure.
        message: String,
    },

    // =========================================================================
    // HOSPITAL SEARCH ERRORS
    // =========================================================================
    /// The POI query against the Overpass endpoint failed.
    #[error("Hospital search failed: {0}")]
    HospitalSearchFailed(String),

    /// The requested hospital is not in the current nearby list.
    #[error("Hospital not found: '{0}'. Refresh the nearby list and try again.")]
    HospitalNotFound(String),

    // =========================================================================
    // ROUTING ERRORS
    // =========================================================================
    /// The route query against the OSRM endpoint failed.
    #[error("Route fetch failed: {0}")]
    RouteFetchFailed(String),

    /// The routing service answered but its polyline geometry was malformed.
    #[error("Failed to decode route geometry: {0}")]
    RouteDecodeFailed(String),

    // =========================================================================
    // NAVIGATION & SOS ERRORS
    // =========================================================================
    /// Navigation was started without a selected destination hospital.
    #[error("No hospital selected. Select a destination before starting navigation.")]
    NoHospitalSelected,

    /// An SOS has already been dispatched for this tracking session.
    #[error("SOS already sent for this tracking session")]
    SosAlreadySent,

    // =========================================================================
    // VALIDATION ERRORS
    // =========================================================================
    /// The jacket identifier does not match the accepted format.
    #[error("Invalid jacket id: '{0}'. Expected 1-64 characters of letters, digits, '-' or '_'.")]
    InvalidJacketId(String),

    /// A required request field was missing or empty.
    #[error("Required field missing: {0}")]
    MissingField(&'static str),

    /// The phone number does not look like a dialable number.
    #[error("Invalid phone number: '{0}'")]
    InvalidPhoneNumber(String),

    /// A registered device was not found by its identifier.
    #[error("Device not found: '{0}'")]
    DeviceNotFound(String),

    /// An emergency contact was not found by its identifier.
    #[error("Contact not found: '{0}'")]
    ContactNotFound(String),

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // PERSISTENCE & I/O ERRORS
    // =========================================================================
    /// An error occurred while persisting or reading data.
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The shared HTTP client could not be constructed.
    #[error("Failed to construct HTTP client: {0}")]
    HttpClientError(String),
}

/// A specialized [`Result`] type for mayday operations.
///
/// This type alias eliminates the need to specify the error type explicitly
/// when returning results from mayday functions.
pub type Result<T> = std::result::Result<T, MaydayError>;

impl MaydayError {
    /// Returns `true` if this error came from an upstream HTTP service
    /// (jacket telemetry, Overpass, or OSRM).
    #[inline]
    #[must_use]
    pub fn is_upstream_error(&self) -> bool {
        matches!(
            self,
            Self::TelemetryFetchFailed { .. }
                | Self::HospitalSearchFailed(_)
                | Self::RouteFetchFailed(_)
                | Self::RouteDecodeFailed(_)
        )
    }

    /// Returns `true` if this error was caused by invalid caller input.
    #[inline]
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidJacketId(_)
                | Self::MissingField(_)
                | Self::InvalidPhoneNumber(_)
                | Self::NoHospitalSelected
        )
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns `true` if this error is related to I/O or persistence.
    #[inline]
    #[must_use]
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::PersistenceError(_) | Self::IoError(_))
    }

    /// Returns `true` if this error represents an expected operational state.
    ///
    /// Some errors (like a repeated SOS press) are not system failures but
    /// expected operational conditions.
    #[inline]
    #[must_use]
    pub fn is_expected_state(&self) -> bool {
        matches!(self, Self::SosAlreadySent)
    }

    /// Returns `true` if this error is likely transient and clears on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TelemetryFetchFailed { .. }
                | Self::HospitalSearchFailed(_)
                | Self::RouteFetchFailed(_)
        )
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::InvalidJacketId(_)
            | Self::MissingField(_)
            | Self::InvalidPhoneNumber(_)
            | Self::NoHospitalSelected => 400,

            // 404 Not Found
            Self::HospitalNotFound(_)
            | Self::DeviceNotFound(_)
            | Self::ContactNotFound(_)
            | Self::ConfigNotFound(_) => 404,

            // 409 Conflict - the session is already in the requested state
            Self::SosAlreadySent => 409,

            // 422 Unprocessable Entity - semantic errors
            Self::ConfigParseError(_) | Self::ConfigValidationError(_) => 422,

            // 500 Internal Server Error - server-side issues
            Self::PersistenceError(_) | Self::IoError(_) | Self::HttpClientError(_) => 500,

            // 502 Bad Gateway - upstream answered with garbage
            Self::RouteDecodeFailed(_) => 502,

            // 503 Service Unavailable - upstream unreachable or erroring
            Self::TelemetryFetchFailed { .. }
            | Self::HospitalSearchFailed(_)
            | Self::RouteFetchFailed(_) => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::TelemetryFetchFailed { .. } => "telemetry_fetch_failed",
            Self::HospitalSearchFailed(_) => "hospital_search_failed",
            Self::HospitalNotFound(_) => "hospital_not_found",
            Self::RouteFetchFailed(_) => "route_fetch_failed",
            Self::RouteDecodeFailed(_) => "route_decode_failed",
            Self::NoHospitalSelected => "no_hospital_selected",
            Self::SosAlreadySent => "sos_already_sent",
            Self::InvalidJacketId(_) => "invalid_jacket_id",
            Self::MissingField(_) => "missing_field",
            Self::InvalidPhoneNumber(_) => "invalid_phone_number",
            Self::DeviceNotFound(_) => "device_not_found",
            Self::ContactNotFound(_) => "contact_not_found",
            Self::ConfigNotFound(_) => "config_not_found",
            Self::ConfigParseError(_) => "config_parse_error",
            Self::ConfigValidationError(_) => "config_validation_error",
            Self::PersistenceError(_) => "persistence_error",
            Self::IoError(_) => "io_error",
            Self::HttpClientError(_) => "http_client_error",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM LIBRARY ERRORS
// =============================================================================

impl From<serde_json::Error> for MaydayError {
    fn from(err: serde_json::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl From<toml::de::Error> for MaydayError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for MaydayError {
    fn from(err: toml::ser::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoErr, ErrorKind};

    #[test]
    fn test_upstream_error_classification() {
        assert!(MaydayError::TelemetryFetchFailed {
            jacket_id: "JKT-1".into(),
            message: "timeout".into()
        }
        .is_upstream_error());
        assert!(MaydayError::HospitalSearchFailed("overpass 504".into()).is_upstream_error());
        assert!(MaydayError::RouteFetchFailed("connection refused".into()).is_upstream_error());
        assert!(MaydayError::RouteDecodeFailed("truncated".into()).is_upstream_error());

        assert!(!MaydayError::NoHospitalSelected.is_upstream_error());
    }

    #[test]
    fn test_validation_error_classification() {
        assert!(MaydayError::InvalidJacketId("!!".into()).is_validation_error());
        assert!(MaydayError::MissingField("phone").is_validation_error());
        assert!(MaydayError::InvalidPhoneNumber("abc".into()).is_validation_error());
        assert!(MaydayError::NoHospitalSelected.is_validation_error());

        assert!(!MaydayError::SosAlreadySent.is_validation_error());
    }

    #[test]
    fn test_config_error_classification() {
        assert!(MaydayError::ConfigNotFound(PathBuf::from("/test")).is_config_error());
        assert!(MaydayError::ConfigParseError("syntax error".into()).is_config_error());
        assert!(MaydayError::ConfigValidationError("invalid value".into()).is_config_error());

        assert!(!MaydayError::NoHospitalSelected.is_config_error());
    }

    #[test]
    fn test_io_error_classification() {
        assert!(MaydayError::PersistenceError("disk full".into()).is_io_error());
        assert!(MaydayError::IoError(IoErr::new(ErrorKind::NotFound, "test")).is_io_error());

        assert!(!MaydayError::SosAlreadySent.is_io_error());
    }

    #[test]
    fn test_expected_state() {
        assert!(MaydayError::SosAlreadySent.is_expected_state());
        assert!(!MaydayError::NoHospitalSelected.is_expected_state());
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(MaydayError::RouteFetchFailed("timeout".into()).is_recoverable());
        assert!(MaydayError::HospitalSearchFailed("timeout".into()).is_recoverable());
        assert!(!MaydayError::RouteDecodeFailed("bad byte".into()).is_recoverable());
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(MaydayError::InvalidJacketId("@".into()).http_status_code(), 400);
        assert_eq!(MaydayError::NoHospitalSelected.http_status_code(), 400);
        assert_eq!(
            MaydayError::HospitalNotFound("way/123".into()).http_status_code(),
            404
        );
        assert_eq!(MaydayError::SosAlreadySent.http_status_code(), 409);
        assert_eq!(
            MaydayError::ConfigParseError("error".into()).http_status_code(),
            422
        );
        assert_eq!(
            MaydayError::PersistenceError("error".into()).http_status_code(),
            500
        );
        assert_eq!(
            MaydayError::RouteDecodeFailed("error".into()).http_status_code(),
            502
        );
        assert_eq!(
            MaydayError::RouteFetchFailed("error".into()).http_status_code(),
            503
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(MaydayError::SosAlreadySent.error_code(), "sos_already_sent");
        assert_eq!(
            MaydayError::NoHospitalSelected.error_code(),
            "no_hospital_selected"
        );
        assert_eq!(
            MaydayError::ConfigNotFound(PathBuf::new()).error_code(),
            "config_not_found"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoErr::new(ErrorKind::NotFound, "file not found");
        let err = MaydayError::from(io_err);
        assert!(matches!(err, MaydayError::IoError(_)));
        assert_eq!(err.http_status_code(), 500);
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
        let err = MaydayError::from(json_err);
        assert!(matches!(err, MaydayError::PersistenceError(_)));
    }

    #[test]
    fn test_error_messages_are_actionable() {
        let err = MaydayError::NoHospitalSelected;
        assert!(err.to_string().contains("Select a destination"));

        let err = MaydayError::HospitalNotFound("node/42".into());
        assert!(err.to_string().contains("Refresh the nearby list"));
    }
}
