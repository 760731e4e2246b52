//! Client configuration.
//!
//! `ClientSettings` lives in `settings.json` inside the client data directory,
//! next to the local state files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::util::{is_http_url, normalize_text_option};

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DATA_DIR_ENV: &str = "NEUTRON_DATA_DIR";
pub const API_URL_ENV: &str = "NEUTRON_API_URL";

const SETTINGS_FILE_NAME: &str = "settings.json";
const DATA_DIR_NAME: &str = "neutron";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientSettings {
    #[serde(default)]
    pub api_base_url: Option<String>,
}

impl ClientSettings {
    pub fn path_in(data_dir: &Path) -> PathBuf {
        data_dir.join(SETTINGS_FILE_NAME)
    }

    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        Self::load_from_path(&Self::path_in(data_dir))
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| settings_error(path, &error))?;
        let mut settings =
            serde_json::from_str::<Self>(&raw).map_err(|error| settings_error(path, &error))?;
        settings.api_base_url = normalize_text_option(settings.api_base_url);
        Ok(settings)
    }

    pub fn save_to_dir(&self, data_dir: &Path) -> Result<PathBuf> {
        let path = Self::path_in(data_dir);
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| settings_error(parent, &error))?;
        }

        let mut normalized = self.clone();
        normalized.api_base_url = normalize_text_option(normalized.api_base_url);
        let serialized = serde_json::to_string_pretty(&normalized)?;
        std::fs::write(path, serialized).map_err(|error| settings_error(path, &error))
    }

    /// Validate and store a new API base URL.
    pub fn set_api_base_url(&mut self, raw: &str) -> Result<()> {
        self.api_base_url = Some(normalize_api_base_url(raw)?);
        Ok(())
    }

    /// Effective API base URL: `NEUTRON_API_URL`, then the stored value, then the default.
    pub fn resolve_api_base_url(&self) -> Result<String> {
        self.resolve_api_base_url_with(|key| std::env::var(key).ok())
    }

    fn resolve_api_base_url_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
        let raw = normalize_text_option(lookup(API_URL_ENV))
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        normalize_api_base_url(&raw)
    }
}

/// Trim and strip trailing slashes; reject values without an http(s) scheme.
pub fn normalize_api_base_url(raw: &str) -> Result<String> {
    let base = raw.trim().trim_end_matches('/').to_string();
    if base.is_empty() {
        return Err(Error::InvalidInput(
            "API base URL must not be empty".to_string(),
        ));
    }
    if !is_http_url(&base) {
        return Err(Error::InvalidInput(
            "API base URL must include http:// or https://".to_string(),
        ));
    }
    Ok(base)
}

/// Client data directory: explicit value, then `NEUTRON_DATA_DIR`, then the
/// platform data directory.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    resolve_data_dir_with(explicit, |key| std::env::var(key).ok(), dirs::data_dir)
}

fn resolve_data_dir_with(
    explicit: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
    platform_dir: impl FnOnce() -> Option<PathBuf>,
) -> Result<PathBuf> {
    if let Some(path) = explicit.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = normalize_text_option(lookup(DATA_DIR_ENV)) {
        return Ok(PathBuf::from(path));
    }
    platform_dir()
        .map(|dir| dir.join(DATA_DIR_NAME))
        .ok_or_else(|| {
            Error::InvalidInput(format!(
                "Could not determine a data directory; pass --data-dir or set {DATA_DIR_ENV}"
            ))
        })
}

fn settings_error(path: &Path, error: &dyn std::fmt::Display) -> Error {
    Error::LocalState {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    fn lookup(values: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = values
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_settings_file_loads_defaults() {
        let temp = tempdir().unwrap();
        let settings = ClientSettings::load_from_dir(temp.path()).unwrap();
        assert_eq!(settings, ClientSettings::default());
        assert_eq!(
            settings.resolve_api_base_url_with(lookup(&[])).unwrap(),
            DEFAULT_API_BASE_URL
        );
    }

    #[test]
    fn saved_settings_round_trip() {
        let temp = tempdir().unwrap();
        let mut settings = ClientSettings::default();
        settings
            .set_api_base_url(" https://saves.example.com/ ")
            .unwrap();
        let path = settings.save_to_dir(&temp.path().join("nested")).unwrap();

        let loaded = ClientSettings::load_from_path(&path).unwrap();
        assert_eq!(
            loaded.api_base_url.as_deref(),
            Some("https://saves.example.com")
        );
    }

    #[test]
    fn set_api_base_url_rejects_missing_scheme() {
        let mut settings = ClientSettings::default();
        assert!(settings.set_api_base_url("saves.example.com").is_err());
        assert!(settings.set_api_base_url("   ").is_err());
        assert_eq!(settings.api_base_url, None);
    }

    #[test]
    fn env_override_wins_over_stored_url() {
        let settings = ClientSettings {
            api_base_url: Some("https://stored.example.com".to_string()),
        };
        assert_eq!(
            settings
                .resolve_api_base_url_with(lookup(&[(API_URL_ENV, "http://localhost:9000/")]))
                .unwrap(),
            "http://localhost:9000"
        );
        assert_eq!(
            settings.resolve_api_base_url_with(lookup(&[])).unwrap(),
            "https://stored.example.com"
        );
    }

    #[test]
    fn data_dir_resolution_order() {
        let explicit = PathBuf::from("/tmp/explicit");
        let platform = || Some(PathBuf::from("/home/u/.local/share"));

        assert_eq!(
            resolve_data_dir_with(Some(&explicit), lookup(&[(DATA_DIR_ENV, "/env")]), platform)
                .unwrap(),
            explicit
        );
        assert_eq!(
            resolve_data_dir_with(None, lookup(&[(DATA_DIR_ENV, "/env")]), platform).unwrap(),
            PathBuf::from("/env")
        );
        assert_eq!(
            resolve_data_dir_with(None, lookup(&[]), platform).unwrap(),
            PathBuf::from("/home/u/.local/share/neutron")
        );
        assert!(resolve_data_dir_with(None, lookup(&[]), || None).is_err());
    }
}
