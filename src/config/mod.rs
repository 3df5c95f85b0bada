//! Configuration and persisted user data for GridSnap

pub mod persistence;
pub mod settings;

pub use persistence::{
    CustomPositionStore, JsonStore, LayoutStore, PersistenceConfig, PersistenceError,
    APP_RULES_KEY, CUSTOM_POSITIONS_KEY, WINDOW_LAYOUTS_KEY,
};
pub use settings::{Settings, SettingsError};
