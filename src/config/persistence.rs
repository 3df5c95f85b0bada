//! JSON-backed storage for user data: custom positions, app rules and saved
//! layouts.
//!
//! Everything lives in a single JSON object keyed by collection name. A key
//! that fails to decode is treated as empty so one corrupt collection never
//! takes the others down with it.

use crate::models::{AppRule, CustomPosition, RuleBook, WindowLayout};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

pub const CUSTOM_POSITIONS_KEY: &str = "customPositions";
pub const APP_RULES_KEY: &str = "appRules";
pub const WINDOW_LAYOUTS_KEY: &str = "windowLayouts";

const STORE_FILE_NAME: &str = "state.json";

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Location of the store file
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    pub data_dir: PathBuf,
    pub file_name: String,
}

impl PersistenceConfig {
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            file_name: STORE_FILE_NAME.to_string(),
        }
    }

    pub fn file_path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::in_dir(home_dir.join(".config").join("gridsnap"))
    }
}

/// File-backed key/value store of JSON blobs
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    entries: RwLock<Map<String, Value>>,
}

impl JsonStore {
    /// Open the store at `config`, reading existing contents if present.
    ///
    /// An unreadable or non-object file is logged and replaced by an empty
    /// store on the next write.
    pub fn open(config: &PersistenceConfig) -> Result<Self, PersistenceError> {
        let path = config.file_path();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map,
                Ok(_) | Err(_) => {
                    warn!(path = %path.display(), "Store file is not a JSON object; starting empty");
                    Map::new()
                }
            }
        } else {
            Map::new()
        };

        debug!(path = %path.display(), keys = entries.len(), "Opened JSON store");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Decode the value stored under `key`, falling back to `T::default()`
    /// when it is missing or malformed
    pub fn load<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let Some(value) = entries.get(key) else {
            return T::default();
        };

        match serde_json::from_value(value.clone()) {
            Ok(decoded) => decoded,
            Err(error) => {
                warn!(key, %error, "Failed to decode stored value; using default");
                T::default()
            }
        }
    }

    /// Store `value` under `key` and flush the whole store to disk
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), PersistenceError>
    where
        T: Serialize + ?Sized,
    {
        let encoded = serde_json::to_value(value)?;
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), encoded);
        self.write_atomic(&entries)
    }

    pub fn remove(&self, key: &str) -> Result<bool, PersistenceError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.write_atomic(&entries)?;
        Ok(true)
    }

    fn write_atomic(&self, entries: &Map<String, Value>) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(entries)?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path)?;

        debug!(path = %self.path.display(), "Flushed JSON store");
        Ok(())
    }
}

/// Typed access to custom positions and app rules on top of a `JsonStore`
#[derive(Debug)]
pub struct CustomPositionStore {
    store: std::sync::Arc<JsonStore>,
}

impl CustomPositionStore {
    pub fn new(store: std::sync::Arc<JsonStore>) -> Self {
        Self { store }
    }

    pub fn positions(&self) -> Vec<CustomPosition> {
        self.store.load(CUSTOM_POSITIONS_KEY)
    }

    pub fn position(&self, id: Uuid) -> Option<CustomPosition> {
        self.positions().into_iter().find(|position| position.id == id)
    }

    /// Insert or replace a position, keyed by id
    pub fn upsert_position(&self, position: CustomPosition) -> Result<(), PersistenceError> {
        let mut positions = self.positions();
        match positions.iter_mut().find(|existing| existing.id == position.id) {
            Some(existing) => *existing = position,
            None => positions.push(position),
        }
        self.store.save(CUSTOM_POSITIONS_KEY, &positions)
    }

    pub fn remove_position(&self, id: Uuid) -> Result<bool, PersistenceError> {
        let mut positions = self.positions();
        let before = positions.len();
        positions.retain(|position| position.id != id);
        if positions.len() == before {
            return Ok(false);
        }
        self.store.save(CUSTOM_POSITIONS_KEY, &positions)?;
        Ok(true)
    }

    /// Stamp `last_used` on a stored position and return the updated record
    pub fn mark_position_used(
        &self,
        id: Uuid,
        when: DateTime<Utc>,
    ) -> Result<CustomPosition, PersistenceError> {
        let position = self
            .position(id)
            .ok_or_else(|| PersistenceError::NotFound(format!("custom position {id}")))?
            .with_last_used(when);
        self.upsert_position(position.clone())?;
        Ok(position)
    }

    pub fn rules(&self) -> RuleBook {
        RuleBook::new(self.store.load::<Vec<AppRule>>(APP_RULES_KEY))
    }

    pub fn save_rules(&self, rules: &RuleBook) -> Result<(), PersistenceError> {
        self.store.save(APP_RULES_KEY, &rules.rules)
    }

    pub fn upsert_rule(&self, rule: AppRule) -> Result<(), PersistenceError> {
        let mut rules = self.rules();
        rules.upsert(rule);
        self.save_rules(&rules)
    }
}

/// Typed access to saved window layouts on top of a `JsonStore`
#[derive(Debug)]
pub struct LayoutStore {
    store: std::sync::Arc<JsonStore>,
}

impl LayoutStore {
    pub fn new(store: std::sync::Arc<JsonStore>) -> Self {
        Self { store }
    }

    pub fn layouts(&self) -> Vec<WindowLayout> {
        self.store.load(WINDOW_LAYOUTS_KEY)
    }

    pub fn layout(&self, id: Uuid) -> Option<WindowLayout> {
        self.layouts().into_iter().find(|layout| layout.id == id)
    }

    pub fn upsert_layout(&self, layout: WindowLayout) -> Result<(), PersistenceError> {
        let mut layouts = self.layouts();
        match layouts.iter_mut().find(|existing| existing.id == layout.id) {
            Some(existing) => *existing = layout,
            None => layouts.push(layout),
        }
        self.store.save(WINDOW_LAYOUTS_KEY, &layouts)
    }

    pub fn remove_layout(&self, id: Uuid) -> Result<bool, PersistenceError> {
        let mut layouts = self.layouts();
        let before = layouts.len();
        layouts.retain(|layout| layout.id != id);
        if layouts.len() == before {
            return Ok(false);
        }
        self.store.save(WINDOW_LAYOUTS_KEY, &layouts)?;
        Ok(true)
    }
}
