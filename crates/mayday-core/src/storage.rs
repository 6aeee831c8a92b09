//! JSON file persistence shared by the alert store and device registries.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{MaydayError, Result};

/// Get the default data directory.
///
/// On Linux servers: `/var/lib/mayday/`
/// For development on other platforms: `~/.local/share/mayday/`
///
/// # Errors
///
/// Returns an error if the platform data directory cannot be determined.
pub fn default_data_dir() -> Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        Ok(PathBuf::from("/var/lib/mayday"))
    }
    #[cfg(not(target_os = "linux"))]
    {
        let dirs = directories::ProjectDirs::from("", "", "mayday").ok_or_else(|| {
            MaydayError::PersistenceError("Cannot determine data directory".into())
        })?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// Load a JSON document from disk.
///
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let value: T = serde_json::from_str(&content)?;
    Ok(Some(value))
}

/// Save a JSON document to disk, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sample.json");

        let sample = Sample {
            name: "jacket".to_string(),
            count: 3,
        };
        save_json(&path, &sample).unwrap();

        let loaded: Sample = load_json(&path).unwrap().unwrap();
        assert_eq!(loaded, sample);
    }

    #[test]
    fn test_load_missing_file_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded: Option<Sample> = load_json(&dir.path().join("missing.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = load_json::<Sample>(&path).unwrap_err();
        assert!(matches!(err, MaydayError::PersistenceError(_)));
    }
}
