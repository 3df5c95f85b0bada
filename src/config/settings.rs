use crate::models::{Shortcut, ShortcutParseError, WindowAction};
use crate::services::action_history::{CYCLE_COOLDOWN_MS, DEFAULT_HISTORY_CAPACITY};
use crate::services::grid_calculator::GridCalculator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const SETTINGS_FILE_NAME: &str = "settings.toml";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("File IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),
    #[error("Validation error: {message}")]
    ValidationError { message: String },
    #[error("Invalid shortcut for '{action}': {source}")]
    ShortcutError {
        action: String,
        #[source]
        source: ShortcutParseError,
    },
}

/// User preferences read from `~/.config/gridsnap/settings.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Space left between snapped windows and around the screen edge
    pub window_gap: f64,
    /// Round snapped frames to multiples of this many points; 0 disables
    pub snap_grid_unit: f64,
    pub cycling_enabled: bool,
    pub cycle_cooldown_ms: u64,
    pub history_capacity: usize,
    /// Lay windows out inside the area not covered by the menu bar and Dock
    pub respect_visible_frame: bool,
    /// Action name (`leftHalf`, `undo`, `nextScreen`, ...) to shortcut string
    pub shortcuts: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_gap: 0.0,
            snap_grid_unit: 0.0,
            cycling_enabled: true,
            cycle_cooldown_ms: CYCLE_COOLDOWN_MS as u64,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            respect_visible_frame: true,
            shortcuts: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn default_path() -> PathBuf {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home_dir
            .join(".config")
            .join("gridsnap")
            .join(SETTINGS_FILE_NAME)
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "No settings file; using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings = Self::from_toml(&content)?;
        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_toml_string(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        self.validate()?;
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("toml.tmp");
        fs::write(&temp_path, self.to_toml_string()?)?;
        fs::rename(temp_path, path)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |message: String| Err(SettingsError::ValidationError { message });

        if !self.window_gap.is_finite() || self.window_gap < 0.0 {
            return invalid(format!("window_gap must be >= 0, got {}", self.window_gap));
        }
        if !self.snap_grid_unit.is_finite() || self.snap_grid_unit < 0.0 {
            return invalid(format!(
                "snap_grid_unit must be >= 0, got {}",
                self.snap_grid_unit
            ));
        }
        if self.history_capacity == 0 {
            return invalid("history_capacity must be at least 1".to_string());
        }

        self.shortcut_overrides().map(|_| ())
    }

    pub fn calculator(&self) -> GridCalculator {
        GridCalculator::new(self.window_gap, self.snap_grid_unit)
    }

    /// Parsed `[shortcuts]` table, in action-name order
    pub fn shortcut_overrides(&self) -> Result<Vec<(Shortcut, WindowAction)>, SettingsError> {
        self.shortcuts
            .iter()
            .map(|(action, shortcut)| {
                let wrap = |source| SettingsError::ShortcutError {
                    action: action.clone(),
                    source,
                };
                let action_value = action.parse::<WindowAction>().map_err(wrap)?;
                let shortcut = Shortcut::parse(shortcut).map_err(wrap)?;
                Ok((shortcut, action_value))
            })
            .collect()
    }
}
