use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::geocode::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Env var that overrides the configured storage backend at startup.
pub const STORAGE_ENV: &str = "CLOCKIN_STORAGE";

const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageBackend {
    Local,
    Remote,
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::Local
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub remote_base_url: Option<String>,
    pub remote_api_key: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            remote_base_url: None,
            remote_api_key: None,
        }
    }
}

impl StorageSettings {
    /// The configured backend, unless [`STORAGE_ENV`] overrides it.
    /// Unrecognized override values are ignored with a warning.
    pub fn effective_backend(&self) -> StorageBackend {
        match std::env::var(STORAGE_ENV) {
            Ok(value) => match parse_backend(&value) {
                Some(backend) => backend,
                None => {
                    log::warn!("Ignoring {STORAGE_ENV}={value}; expected local or remote");
                    self.backend
                }
            },
            Err(_) => self.backend,
        }
    }
}

fn parse_backend(value: &str) -> Option<StorageBackend> {
    match value.trim().to_ascii_lowercase().as_str() {
        "local" => Some(StorageBackend::Local),
        "remote" => Some(StorageBackend::Remote),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocoderSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.into(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }
}

impl GeocoderSettings {
    /// The configured key, falling back to the `GEMINI_API_KEY` env var.
    /// Blank values count as absent.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| {
                std::env::var(GEMINI_KEY_ENV)
                    .ok()
                    .filter(|key| !key.trim().is_empty())
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSettings {
    pub username: String,
    pub password: String,
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            username: "admin".into(),
            password: "Admin1234".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserSettings {
    storage: StorageSettings,
    geocoder: GeocoderSettings,
    admin: AdminSettings,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            storage: StorageSettings::default(),
            geocoder: GeocoderSettings::default(),
            admin: AdminSettings::default(),
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    /// Loads settings from `path`. A missing file is created with defaults so
    /// it can be hand-edited; an unparseable file falls back to defaults but
    /// is left in place.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            let defaults = UserSettings::default();
            let store = Self {
                path: path.clone(),
                data: RwLock::new(defaults),
            };
            store.persist(&store.data.read().unwrap())?;
            return Ok(store);
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn storage(&self) -> StorageSettings {
        self.data.read().unwrap().storage.clone()
    }

    pub fn geocoder(&self) -> GeocoderSettings {
        self.data.read().unwrap().geocoder.clone()
    }

    pub fn admin(&self) -> AdminSettings {
        self.data.read().unwrap().admin.clone()
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_run_writes_defaults_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();

        assert_eq!(store.storage().backend, StorageBackend::Local);
        assert_eq!(store.admin().username, "admin");
        assert_eq!(store.admin().password, "Admin1234");
        assert_eq!(store.geocoder().model, DEFAULT_MODEL);

        // The file now exists and parses back to the same defaults.
        let contents = fs::read_to_string(&path).unwrap();
        let reread: UserSettings = serde_json::from_str(&contents).unwrap();
        assert_eq!(reread.storage.backend, StorageBackend::Local);
    }

    #[test]
    fn reads_a_remote_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{
                "storage": {
                    "backend": "remote",
                    "remoteBaseUrl": "https://records.example.com/api",
                    "remoteApiKey": "secret"
                },
                "geocoder": {
                    "apiKey": "gm-key",
                    "model": "gemini-2.5-flash",
                    "baseUrl": "https://generativelanguage.googleapis.com"
                },
                "admin": { "username": "boss", "password": "Hunter2" }
            }"#,
        )
        .unwrap();

        let store = SettingsStore::new(path).unwrap();

        let storage = store.storage();
        assert_eq!(storage.backend, StorageBackend::Remote);
        assert_eq!(
            storage.remote_base_url.as_deref(),
            Some("https://records.example.com/api")
        );
        assert_eq!(store.admin().username, "boss");
        assert_eq!(store.geocoder().api_key.as_deref(), Some("gm-key"));
    }

    #[test]
    fn unparseable_files_fall_back_to_defaults_without_being_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ this is not json").unwrap();

        let store = SettingsStore::new(path.clone()).unwrap();

        assert_eq!(store.storage().backend, StorageBackend::Local);
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ this is not json");
    }

    #[test]
    fn configured_geocoder_key_wins_over_the_environment() {
        let settings = GeocoderSettings {
            api_key: Some("from-settings".into()),
            ..GeocoderSettings::default()
        };
        assert_eq!(settings.resolved_api_key().as_deref(), Some("from-settings"));
    }

    #[test]
    fn backend_override_values_parse_case_insensitively() {
        assert_eq!(parse_backend("local"), Some(StorageBackend::Local));
        assert_eq!(parse_backend("Remote"), Some(StorageBackend::Remote));
        assert_eq!(parse_backend(" REMOTE "), Some(StorageBackend::Remote));
        assert_eq!(parse_backend("sqlite"), None);
    }
}
