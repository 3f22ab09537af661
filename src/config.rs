use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::timezone::DisplayZone;
use crate::utils;

const TIMEZONE_ENV: &str = "ARC_TIMERS_TIMEZONE";
const DEFAULT_COOLDOWN_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub debug_dump: bool,
    pub timezone: Option<String>,
    pub refresh_cooldown_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            debug_dump: true,
            timezone: None,
            refresh_cooldown_secs: DEFAULT_COOLDOWN_SECS,
        }
    }
}

impl AppConfig {
    /// Falls back to the system zone when the stored name no longer parses.
    pub fn display_zone(&self) -> DisplayZone {
        match DisplayZone::from_setting(self.timezone.as_deref()) {
            Ok(zone) => zone,
            Err(err) => {
                tracing::warn!(event = "config.timezone_invalid", error = %err);
                DisplayZone::Local
            }
        }
    }

    pub fn refresh_cooldown(&self) -> Duration {
        Duration::from_secs(self.refresh_cooldown_secs)
    }

    /// Trims the zone name, treating blank as "system zone", and rejects
    /// names that are not IANA zones.
    pub fn validated(mut self) -> Result<Self, String> {
        self.timezone = self
            .timezone
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        DisplayZone::from_setting(self.timezone.as_deref()).map_err(|err| err.to_string())?;
        Ok(self)
    }
}

/// Zone forced through `ARC_TIMERS_TIMEZONE`, if set and non-blank.
pub fn env_zone_override() -> Option<String> {
    std::env::var(TIMEZONE_ENV)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|zone| !zone.is_empty())
}

pub struct ConfigStore {
    path: PathBuf,
    data: Mutex<AppConfig>,
    // Never written back to disk.
    zone_override: Option<String>,
}

impl ConfigStore {
    pub fn load() -> Self {
        Self::load_from(utils::config_path()).with_zone_override(env_zone_override())
    }

    pub fn with_zone_override(mut self, zone: Option<String>) -> Self {
        if let Some(zone) = zone.as_deref() {
            tracing::info!(event = "config.zone_override", timezone = zone);
        }
        self.zone_override = zone;
        self
    }

    pub fn load_from(path: PathBuf) -> Self {
        let data = match read_config(&path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(event = "config.read_failed", path = ?path, error = %err);
                AppConfig::default()
            }
        };
        Self {
            path,
            data: Mutex::new(data),
            zone_override: None,
        }
    }

    /// Zone times are rendered in: the env override when it parses, else the
    /// stored setting.
    pub fn display_zone(&self) -> DisplayZone {
        if let Some(name) = self.zone_override.as_deref() {
            match DisplayZone::from_setting(Some(name)) {
                Ok(zone) => return zone,
                Err(err) => tracing::warn!(event = "config.zone_override_invalid", error = %err),
            }
        }
        self.read().display_zone()
    }

    pub fn read(&self) -> AppConfig {
        match self.data.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update<F>(&self, transform: F) -> Result<AppConfig, String>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut guard = self
            .data
            .lock()
            .map_err(|_| "config mutex poisoned".to_string())?;
        transform(&mut guard);
        write_config(&self.path, &guard)?;
        Ok(guard.clone())
    }

    /// Validates `settings` and replaces the stored config with them.
    /// Nothing is written when validation fails.
    pub fn apply(&self, settings: AppConfig) -> Result<AppConfig, String> {
        let settings = settings.validated()?;
        self.update(|config| *config = settings)
    }
}

fn read_config(path: &Path) -> Result<AppConfig, String> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|err| err.to_string())?;
    serde_json::from_str(&contents).map_err(|err| err.to_string())
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            return Err(err.to_string());
        }
    }
    let contents = serde_json::to_string_pretty(config).map_err(|err| err.to_string())?;
    fs::write(path, contents).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::load_from(dir.path().join("config.json"));
        let config = store.read();
        assert!(config.debug_dump);
        assert_eq!(config.timezone, None);
        assert_eq!(config.refresh_cooldown(), Duration::from_secs(60));
    }

    #[test]
    fn update_persists_to_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.json");
        let store = ConfigStore::load_from(path.clone());
        store
            .update(|config| {
                config.timezone = Some("Europe/Berlin".to_string());
                config.debug_dump = false;
            })
            .expect("update config");

        let reloaded = ConfigStore::load_from(path).read();
        assert_eq!(reloaded.timezone.as_deref(), Some("Europe/Berlin"));
        assert!(!reloaded.debug_dump);
        assert_eq!(
            reloaded.display_zone(),
            DisplayZone::Named(chrono_tz::Europe::Berlin)
        );
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"refresh_cooldown_secs": 120}"#).expect("write config");
        let config = ConfigStore::load_from(path).read();
        assert_eq!(config.refresh_cooldown_secs, 120);
        assert!(config.debug_dump);
    }

    #[test]
    fn apply_rejects_unknown_zone_without_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        let store = ConfigStore::load_from(path.clone());
        let settings = AppConfig {
            timezone: Some("Mars/Olympus".to_string()),
            ..AppConfig::default()
        };

        let err = store.apply(settings).expect_err("unknown zone");
        assert!(err.contains("Mars/Olympus"), "got {err}");
        assert!(!path.exists());
        assert_eq!(store.read(), AppConfig::default());
    }

    #[test]
    fn apply_trims_and_persists_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        let store = ConfigStore::load_from(path.clone());
        let applied = store
            .apply(AppConfig {
                debug_dump: false,
                timezone: Some("  Asia/Tokyo ".to_string()),
                refresh_cooldown_secs: 30,
            })
            .expect("apply settings");
        assert_eq!(applied.timezone.as_deref(), Some("Asia/Tokyo"));

        let reloaded = ConfigStore::load_from(path).read();
        assert_eq!(reloaded, applied);
    }

    #[test]
    fn blank_zone_means_system_zone() {
        let config = AppConfig {
            timezone: Some("   ".to_string()),
            ..AppConfig::default()
        }
        .validated()
        .expect("blank zone is valid");
        assert_eq!(config.timezone, None);
    }

    #[test]
    fn zone_override_wins_but_is_not_persisted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        let store = ConfigStore::load_from(path.clone())
            .with_zone_override(Some("America/New_York".to_string()));
        assert_eq!(
            store.display_zone(),
            DisplayZone::Named(chrono_tz::America::New_York)
        );
        assert_eq!(store.read().timezone, None);

        // A settings round-trip must not leak the override into the file.
        store.apply(store.read()).expect("round-trip");
        let reloaded = ConfigStore::load_from(path).read();
        assert_eq!(reloaded.timezone, None);
    }

    #[test]
    fn invalid_override_falls_back_to_stored_zone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::load_from(dir.path().join("config.json"))
            .with_zone_override(Some("Nowhere/Special".to_string()));
        store
            .update(|config| config.timezone = Some("Europe/Berlin".to_string()))
            .expect("update config");
        assert_eq!(
            store.display_zone(),
            DisplayZone::Named(chrono_tz::Europe::Berlin)
        );
    }

    #[test]
    fn env_override_is_read_and_trimmed() {
        std::env::set_var(TIMEZONE_ENV, " Asia/Tokyo ");
        let from_env = env_zone_override();
        std::env::set_var(TIMEZONE_ENV, "  ");
        let blank = env_zone_override();
        std::env::remove_var(TIMEZONE_ENV);

        assert_eq!(from_env.as_deref(), Some("Asia/Tokyo"));
        assert_eq!(blank, None);
        assert_eq!(env_zone_override(), None);
    }

    #[test]
    fn invalid_zone_falls_back_to_local() {
        let config = AppConfig {
            timezone: Some("Nowhere/Special".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(config.display_zone(), DisplayZone::Local);
    }
}
