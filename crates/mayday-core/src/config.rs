//! Application configuration management.
//!
//! Handles loading, saving, and validating mayday configuration including:
//! - Jacket telemetry backend and polling cadence
//! - GPS noise threshold for movement detection
//! - Overpass endpoint and hospital search radius
//! - OSRM endpoint and reroute cadence
//! - HTTP server bind address and storage location

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{MaydayError, Result};

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MaydayConfig {
    /// Jacket telemetry polling.
    pub telemetry: TelemetryConfig,

    /// Nearby hospital search.
    pub hospitals: HospitalsConfig,

    /// Route planning and rerouting.
    pub routing: RoutingConfig,

    /// HTTP server binding.
    pub server: ServerConfig,

    /// On-disk storage locations.
    pub storage: StorageConfig,
}

/// Telemetry polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Base URL of the jacket telemetry backend.
    pub base_url: String,

    /// Poll cadence in milliseconds.
    pub poll_interval_ms: u64,

    /// Minimum movement in kilometers before a reported position replaces
    /// the tracked one. Filters out GPS jitter.
    pub noise_threshold_km: f64,

    /// Number of consecutive failed polls before telemetry is flagged stale.
    pub stale_after_polls: u32,

    /// Latitude published until the jacket first reports a position.
    pub fallback_lat: f64,

    /// Longitude published until the jacket first reports a position.
    pub fallback_lng: f64,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

/// Hospital search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HospitalsConfig {
    /// Overpass API interpreter endpoint.
    pub overpass_url: String,

    /// Search radius around the current position in meters.
    pub search_radius_m: u32,

    /// Per-request timeout in seconds. Overpass queries can be slow.
    pub request_timeout_secs: u64,
}

/// Routing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// OSRM routing service base URL.
    pub osrm_url: String,

    /// Reroute cadence while navigation is active, in milliseconds.
    pub reroute_interval_ms: u64,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind on.
    pub host: String,

    /// Port to listen on.
    pub port: u16,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory override. Defaults to the platform data dir when unset.
    pub data_dir: Option<PathBuf>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            poll_interval_ms: 2000,
            noise_threshold_km: 0.02,
            stale_after_polls: 3,
            fallback_lat: 28.6139,
            fallback_lng: 77.2090,
            request_timeout_secs: 10,
        }
    }
}

impl Default for HospitalsConfig {
    fn default() -> Self {
        Self {
            overpass_url: "https://overpass-api.de/api/interpreter".to_string(),
            search_radius_m: 8000,
            request_timeout_secs: 30,
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            osrm_url: "https://router.project-osrm.org".to_string(),
            reroute_interval_ms: 6000,
            request_timeout_secs: 15,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl TelemetryConfig {
    /// Poll cadence as a [`Duration`].
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl HospitalsConfig {
    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl RoutingConfig {
    /// Reroute cadence as a [`Duration`].
    #[must_use]
    pub const fn reroute_interval(&self) -> Duration {
        Duration::from_millis(self.reroute_interval_ms)
    }

    /// Per-request timeout as a [`Duration`].
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl MaydayConfig {
    /// Load configuration from the given path.
    ///
    /// # Errors
    ///
    /// Returns [`MaydayError::ConfigNotFound`] if the file does not exist and
    /// [`MaydayError::ConfigParseError`] if it cannot be parsed.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(MaydayError::ConfigNotFound(path));
        }
        let content = std::fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the given path, falling back to defaults if
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only if a file exists but cannot be read or parsed.
    pub fn load_or_default(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the given path, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    ///
    /// On Linux servers: `/etc/mayday/config.toml`
    /// For development on other platforms: `~/.config/mayday/config.toml`
    ///
    /// # Errors
    ///
    /// Returns an error if the platform config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            Ok(PathBuf::from("/etc/mayday/config.toml"))
        }
        #[cfg(not(target_os = "linux"))]
        {
            let dirs = directories::ProjectDirs::from("", "", "mayday").ok_or_else(|| {
                MaydayError::ConfigValidationError("Cannot determine config directory".into())
            })?;
            Ok(dirs.config_dir().join("config.toml"))
        }
    }

    /// Validate the configuration, reporting every problem at once.
    ///
    /// # Errors
    ///
    /// Returns [`MaydayError::ConfigValidationError`] listing each invalid
    /// field.
    pub fn validate(&self) -> Result<()> {
        let mut issues = Vec::new();

        if Url::parse(&self.telemetry.base_url).is_err() {
            issues.push(format!(
                "telemetry.base_url is not a valid URL: '{}'",
                self.telemetry.base_url
            ));
        }
        if self.telemetry.poll_interval_ms == 0 {
            issues.push("telemetry.poll_interval_ms must be greater than zero".to_string());
        }
        if !self.telemetry.noise_threshold_km.is_finite() || self.telemetry.noise_threshold_km < 0.0
        {
            issues.push(format!(
                "telemetry.noise_threshold_km must be a non-negative number, got {}",
                self.telemetry.noise_threshold_km
            ));
        }
        if self.telemetry.stale_after_polls == 0 {
            issues.push("telemetry.stale_after_polls must be at least 1".to_string());
        }
        if self.telemetry.request_timeout_secs == 0 {
            issues.push("telemetry.request_timeout_secs must be greater than zero".to_string());
        }

        if Url::parse(&self.hospitals.overpass_url).is_err() {
            issues.push(format!(
                "hospitals.overpass_url is not a valid URL: '{}'",
                self.hospitals.overpass_url
            ));
        }
        if !(1..=50_000).contains(&self.hospitals.search_radius_m) {
            issues.push(format!(
                "hospitals.search_radius_m must be between 1 and 50000, got {}",
                self.hospitals.search_radius_m
            ));
        }
        if self.hospitals.request_timeout_secs == 0 {
            issues.push("hospitals.request_timeout_secs must be greater than zero".to_string());
        }

        if Url::parse(&self.routing.osrm_url).is_err() {
            issues.push(format!(
                "routing.osrm_url is not a valid URL: '{}'",
                self.routing.osrm_url
            ));
        }
        if self.routing.reroute_interval_ms == 0 {
            issues.push("routing.reroute_interval_ms must be greater than zero".to_string());
        }
        if self.routing.request_timeout_secs == 0 {
            issues.push("routing.request_timeout_secs must be greater than zero".to_string());
        }

        if self.server.host.parse::<IpAddr>().is_err() {
            issues.push(format!(
                "server.host must be an IP address, got '{}'",
                self.server.host
            ));
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(MaydayError::ConfigValidationError(issues.join("; ")))
        }
    }

    /// Resolve the data directory, honoring the configured override.
    ///
    /// # Errors
    ///
    /// Returns an error if no override is set and the platform data
    /// directory cannot be determined.
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.storage.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => crate::storage::default_data_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MaydayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.telemetry.poll_interval_ms, 2000);
        assert!((config.telemetry.noise_threshold_km - 0.02).abs() < f64::EPSILON);
        assert_eq!(config.hospitals.search_radius_m, 8000);
        assert_eq!(config.routing.reroute_interval_ms, 6000);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = MaydayConfig::default();
        config.telemetry.base_url = "http://192.168.1.20:5000".to_string();
        config.server.port = 8080;
        config.save(&path).unwrap();

        let loaded = MaydayConfig::load(&path).unwrap();
        assert_eq!(loaded.telemetry.base_url, "http://192.168.1.20:5000");
        assert_eq!(loaded.server.port, 8080);
        assert_eq!(loaded.routing.reroute_interval_ms, 6000);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = MaydayConfig::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, MaydayError::ConfigNotFound(_)));
    }

    #[test]
    fn test_load_or_default_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = MaydayConfig::load_or_default(dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "telemetry = {").unwrap();

        let err = MaydayConfig::load(&path).unwrap_err();
        assert!(matches!(err, MaydayError::ConfigParseError(_)));
    }

    #[test]
    fn test_partial_file_keeps_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[telemetry]\npoll_interval_ms = 500\n").unwrap();

        let config = MaydayConfig::load(&path).unwrap();
        assert_eq!(config.telemetry.poll_interval_ms, 500);
        // Untouched fields keep their defaults
        assert!((config.telemetry.noise_threshold_km - 0.02).abs() < f64::EPSILON);
        assert_eq!(config.hospitals.search_radius_m, 8000);
    }

    #[test]
    fn test_validation_collects_all_issues() {
        let mut config = MaydayConfig::default();
        config.telemetry.base_url = "not a url".to_string();
        config.telemetry.poll_interval_ms = 0;
        config.hospitals.search_radius_m = 0;

        let err = config.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("telemetry.base_url"));
        assert!(message.contains("telemetry.poll_interval_ms"));
        assert!(message.contains("hospitals.search_radius_m"));
    }

    #[test]
    fn test_validation_rejects_bad_host() {
        let mut config = MaydayConfig::default();
        config.server.host = "example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_interval_helpers() {
        let config = MaydayConfig::default();
        assert_eq!(config.telemetry.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.routing.reroute_interval(), Duration::from_secs(6));
        assert_eq!(config.hospitals.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_data_dir_override() {
        let mut config = MaydayConfig::default();
        config.storage.data_dir = Some(PathBuf::from("/tmp/mayday-test"));
        assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/mayday-test"));
    }
}
