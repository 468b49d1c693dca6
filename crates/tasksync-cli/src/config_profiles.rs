//! Persistent CLI profile configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tasksync_core::config::SyncSettings;

const CONFIG_FILE_NAME: &str = "cli-config.json";
const STORE_FILE_NAME: &str = "tasksync.db";
const PROFILE_ENV: &str = "TASKSYNC_PROFILE";
const STORE_PATH_ENV: &str = "TASKSYNC_STORE_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfilesConfig {
    #[serde(default = "default_config_version")]
    pub version: u32,
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, CliProfile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliProfile {
    #[serde(default)]
    pub store_path: Option<PathBuf>,
    #[serde(default)]
    pub settings: SyncSettings,
}

const fn default_config_version() -> u32 {
    1
}

pub fn default_config_path() -> Result<PathBuf, String> {
    dirs::config_dir()
        .map(|dir| dir.join("tasksync").join(CONFIG_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI config directory".to_string())
}

pub fn default_store_path() -> Result<PathBuf, String> {
    dirs::data_dir()
        .map(|dir| dir.join("tasksync").join(STORE_FILE_NAME))
        .ok_or_else(|| "Failed to resolve CLI data directory".to_string())
}

pub fn normalize_profile_name(value: Option<&str>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

impl CliProfilesConfig {
    pub fn load() -> Result<Self, String> {
        Self::load_from_path(&default_config_path()?)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|error| format!("Failed to read config at {}: {}", path.display(), error))?;
        let mut config = serde_json::from_str::<Self>(&raw)
            .map_err(|error| format!("Failed to parse config at {}: {}", path.display(), error))?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, String> {
        let path = default_config_path()?;
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|error| {
                format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    error
                )
            })?;
        }

        let mut normalized = self.clone();
        normalized.normalize();
        let serialized = serde_json::to_string_pretty(&normalized)
            .map_err(|error| format!("Failed to serialize config: {error}"))?;
        std::fs::write(path, serialized)
            .map_err(|error| format!("Failed to write config at {}: {}", path.display(), error))
    }

    pub fn resolve_profile_name(&self, explicit: Option<&str>) -> String {
        if let Some(profile) = normalize_profile_name(explicit) {
            return profile;
        }
        if let Some(profile) = normalize_profile_name(std::env::var(PROFILE_ENV).ok().as_deref()) {
            return profile;
        }
        if let Some(profile) = normalize_profile_name(self.active_profile.as_deref()) {
            return profile;
        }
        "default".to_string()
    }

    pub fn profile(&self, name: &str) -> Option<&CliProfile> {
        self.profiles.get(name)
    }

    pub fn profile_mut_or_default(&mut self, name: &str) -> &mut CliProfile {
        self.profiles.entry(name.to_string()).or_default()
    }

    fn normalize(&mut self) {
        self.active_profile = normalize_profile_name(self.active_profile.as_deref());
        for profile in self.profiles.values_mut() {
            profile.normalize();
        }
    }
}

impl CliProfile {
    /// Store location: explicit flag, then `TASKSYNC_STORE_PATH`, then the
    /// profile, then the platform data directory.
    pub fn resolve_store_path(&self, explicit: Option<PathBuf>) -> Result<PathBuf, String> {
        if let Some(path) = explicit {
            return Ok(path);
        }
        if let Some(path) = std::env::var_os(STORE_PATH_ENV).filter(|value| !value.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        if let Some(path) = self.store_path.clone() {
            return Ok(path);
        }
        default_store_path()
    }

    /// Profile settings with environment overrides applied, validated.
    pub fn resolve_settings(&self) -> Result<SyncSettings, String> {
        self.settings
            .clone()
            .apply_env()
            .map_err(|error| error.to_string())
    }

    fn normalize(&mut self) {
        self.store_path = self
            .store_path
            .take()
            .filter(|path| !path.as_os_str().is_empty());
        self.settings.api_url = self.settings.api_url.trim().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_profile_name_rejects_empty() {
        assert_eq!(normalize_profile_name(None), None);
        assert_eq!(normalize_profile_name(Some(" ")), None);
    }

    #[test]
    fn config_roundtrip_preserves_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = CliProfilesConfig {
            version: 1,
            active_profile: Some(" work ".to_string()),
            profiles: BTreeMap::new(),
        };
        config.profiles.insert(
            "work".to_string(),
            CliProfile {
                store_path: Some(PathBuf::from("/tmp/tasksync-work.db")),
                settings: SyncSettings {
                    api_url: " https://linear.example.com/graphql ".to_string(),
                    draft_debounce_ms: 250,
                    ..SyncSettings::default()
                },
            },
        );

        config.save_to_path(&path).unwrap();
        let loaded = CliProfilesConfig::load_from_path(&path).unwrap();

        assert_eq!(loaded.active_profile.as_deref(), Some("work"));
        let profile = loaded.profile("work").unwrap();
        assert_eq!(
            profile.store_path.as_deref(),
            Some(Path::new("/tmp/tasksync-work.db"))
        );
        assert_eq!(profile.settings.api_url, "https://linear.example.com/graphql");
        assert_eq!(profile.settings.draft_debounce_ms, 250);
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = CliProfilesConfig::load_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded, CliProfilesConfig::default());
    }

    #[test]
    fn profile_without_settings_uses_defaults() {
        let config: CliProfilesConfig =
            serde_json::from_str(r#"{"version":1,"profiles":{"default":{}}}"#).unwrap();
        assert_eq!(
            config.profile("default").unwrap().settings,
            SyncSettings::default()
        );
    }

    #[test]
    fn resolve_profile_name_prefers_explicit_then_active() {
        let config = CliProfilesConfig {
            version: 1,
            active_profile: Some("work".to_string()),
            profiles: BTreeMap::new(),
        };
        assert_eq!(config.resolve_profile_name(Some("home")), "home");
        assert_eq!(config.resolve_profile_name(None), "work");
    }

    #[test]
    fn explicit_store_path_wins() {
        let profile = CliProfile {
            store_path: Some(PathBuf::from("/profile.db")),
            settings: SyncSettings::default(),
        };
        assert_eq!(
            profile
                .resolve_store_path(Some(PathBuf::from("/flag.db")))
                .unwrap(),
            PathBuf::from("/flag.db")
        );
    }
}
