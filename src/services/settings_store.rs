// Autoscroll Default Settings Store
// Persists the default scroll settings record used when scrolling starts without
// explicit settings. The record is stored as a JSON file at the platform-specific
// config path, under the `defaultSettings` key.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::ScrollSettings;

/// Trait defining the default settings store interface.
pub trait SettingsStoreTrait {
    fn load(&mut self) -> Result<ScrollSettings, SettingsError>;
    fn save(&self) -> Result<(), SettingsError>;
    fn get_settings(&self) -> &ScrollSettings;
    fn set_defaults(&mut self, settings: ScrollSettings) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<(), SettingsError>;
    fn get_config_path(&self) -> &str;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    default_settings: ScrollSettings,
}

/// Store implementation backed by a JSON file on disk.
pub struct DefaultSettingsStore {
    config_path: String,
    settings: ScrollSettings,
}

impl DefaultSettingsStore {
    /// Creates a new store.
    ///
    /// If `path_override` is `Some`, uses that path for the settings file.
    /// Otherwise, uses `settings.json` in the platform config directory.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = match path_override {
            Some(p) => p,
            None => platform::get_settings_path().to_string_lossy().to_string(),
        };

        Self {
            config_path,
            settings: ScrollSettings::default(),
        }
    }
}

impl SettingsStoreTrait for DefaultSettingsStore {
    /// Loads the record from disk.
    ///
    /// On first run (no file) the built-in defaults are written out and returned.
    /// A malformed file is a serialization error; an out-of-bounds record is an
    /// invalid value. Neither replaces the in-memory settings.
    fn load(&mut self) -> Result<ScrollSettings, SettingsError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            self.settings = ScrollSettings::default();
            info!(event = "defaults_initialized", path = %self.config_path);
            self.save()?;
            return Ok(self.settings);
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SettingsError::IoError(format!("Failed to read settings file: {}", e)))?;

        let record: StoredRecord = serde_json::from_str(&content).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to parse settings file: {}", e))
        })?;

        record
            .default_settings
            .validate()
            .map_err(|e| SettingsError::InvalidValue(e.to_string()))?;

        self.settings = record.default_settings;
        debug!(path = %self.config_path, "default settings loaded");
        Ok(self.settings)
    }

    /// Writes the current record, creating parent directories if needed.
    fn save(&self) -> Result<(), SettingsError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                SettingsError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let record = StoredRecord {
            default_settings: self.settings,
        };
        let json = serde_json::to_string_pretty(&record).map_err(|e| {
            SettingsError::SerializationError(format!("Failed to serialize settings: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| SettingsError::IoError(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    fn get_settings(&self) -> &ScrollSettings {
        &self.settings
    }

    /// Replaces the record after validating it, then persists it.
    /// Out-of-bounds settings leave both memory and disk untouched.
    fn set_defaults(&mut self, settings: ScrollSettings) -> Result<(), SettingsError> {
        settings
            .validate()
            .map_err(|e| SettingsError::InvalidValue(e.to_string()))?;
        let previous = self.settings;
        self.settings = settings;
        if let Err(e) = self.save() {
            self.settings = previous;
            return Err(e);
        }
        info!(
            event = "defaults_saved",
            pixels = settings.pixels_per_step,
            interval_ms = settings.step_interval_ms,
            looping = settings.looping
        );
        Ok(())
    }

    fn reset(&mut self) -> Result<(), SettingsError> {
        self.settings = ScrollSettings::default();
        self.save()
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
