//! Persisted settings (vault root, export path, etc.) in the app data directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app_data;
use crate::export::DEFAULT_CONCURRENCY;

const CONFIG_FILENAME: &str = "config.toml";

/// User settings. Fields missing from the stored file keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Free-form user setting.
    pub my_setting: String,
    /// Directory that exports are written under. Empty means "not set".
    pub export_path: String,
    /// Path to the user's vault (chosen by them).
    pub vault_root: Option<String>,
    /// Maximum number of files copied at once.
    pub concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            my_setting: "default".to_string(),
            export_path: String::new(),
            vault_root: None,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl Settings {
    pub fn vault_root(&self) -> Option<PathBuf> {
        self.vault_root
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }

    pub fn export_path(&self) -> Option<PathBuf> {
        Some(self.export_path.as_str())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    }
}

/// Path of the settings file, if the app data directory is available.
pub fn config_path() -> Option<PathBuf> {
    app_data::app_data_dir().map(|d| d.join(CONFIG_FILENAME))
}

/// Load settings from the app data directory. Returns defaults if missing or invalid.
pub fn load_settings() -> Settings {
    match config_path() {
        Some(path) => load_settings_from(&path),
        None => Settings::default(),
    }
}

/// Load settings from `path`: defaults, overridden by whatever the file stores.
pub fn load_settings_from(path: &Path) -> Settings {
    let Ok(s) = std::fs::read_to_string(path) else {
        return Settings::default();
    };
    match toml::from_str(&s) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "invalid settings file, using defaults");
            Settings::default()
        }
    }
}

/// Save settings to the app data directory.
pub fn save_settings(settings: &Settings) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoDataDir)?;
    save_settings_to(&path, settings)
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<(), ConfigError> {
    let s = toml::to_string_pretty(settings).map_err(ConfigError::Serialize)?;
    std::fs::write(path, s).map_err(ConfigError::Write)?;
    tracing::debug!(path = %path.display(), "saved settings");
    Ok(())
}

/// Get the configured vault root, if any.
pub fn get_vault_root() -> Option<PathBuf> {
    load_settings().vault_root()
}

/// Set and persist the vault root.
pub fn set_vault_root(path: &Path) -> Result<(), ConfigError> {
    let path = canonical_dir(path)?;
    let mut settings = load_settings();
    settings.vault_root = Some(path.to_string_lossy().into_owned());
    save_settings(&settings)
}

/// Set and persist the export directory. It is created if missing.
pub fn set_export_path(path: &Path) -> Result<(), ConfigError> {
    std::fs::create_dir_all(path).map_err(ConfigError::Write)?;
    let path = canonical_dir(path)?;
    let mut settings = load_settings();
    settings.export_path = path.to_string_lossy().into_owned();
    save_settings(&settings)
}

pub fn set_my_setting(value: &str) -> Result<(), ConfigError> {
    let mut settings = load_settings();
    settings.my_setting = value.to_string();
    save_settings(&settings)
}

fn canonical_dir(path: &Path) -> Result<PathBuf, ConfigError> {
    let path = path.canonicalize().map_err(ConfigError::Canonicalize)?;
    if !path.is_dir() {
        return Err(ConfigError::NotADirectory(path));
    }
    Ok(path)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine app data directory")]
    NoDataDir,
    #[error("failed to serialize settings: {0}")]
    Serialize(toml::ser::Error),
    #[error("failed to write settings: {0}")]
    Write(std::io::Error),
    #[error("failed to resolve path: {0}")]
    Canonicalize(std::io::Error),
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("config.toml"));
        assert_eq!(s, Settings::default());
        assert_eq!(s.my_setting, "default");
        assert!(s.export_path().is_none());
    }

    #[test]
    fn stored_values_override_defaults_field_by_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "export_path = \"/tmp/out\"\n").unwrap();
        let s = load_settings_from(&path);
        assert_eq!(s.export_path(), Some(PathBuf::from("/tmp/out")));
        assert_eq!(s.my_setting, "default");
        assert_eq!(s.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "my_setting = [not toml").unwrap();
        assert_eq!(load_settings_from(&path), Settings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let settings = Settings {
            my_setting: "secret".to_string(),
            export_path: "/exports".to_string(),
            vault_root: Some("/vault".to_string()),
            concurrency: 2,
        };
        save_settings_to(&path, &settings).unwrap();
        assert_eq!(load_settings_from(&path), settings);
    }

    #[test]
    fn empty_vault_root_is_unset() {
        let s = Settings {
            vault_root: Some(String::new()),
            ..Settings::default()
        };
        assert!(s.vault_root().is_none());
    }
}
