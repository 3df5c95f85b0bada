//! GridSnap - Menu-bar window snapping for macOS
//!
//! GridSnap moves the focused window onto named grid positions (halves,
//! quarters, thirds, center, maximize), cycles through related positions on
//! repeated shortcut presses, keeps an undo/redo history of window frames, and
//! captures or restores whole window layouts across multiple displays.

pub mod config;
pub mod logging;
pub mod macos;
pub mod models;
pub mod services;

pub use models::*;
pub use services::*;

/// Result type alias for GridSnap operations
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to GridSnap operations
#[derive(thiserror::Error, Debug)]
pub enum GridSnapError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("No target window: {0}")]
    NoTargetWindow(String),

    #[error("Window not found: {0}")]
    WindowNotFound(u32),

    #[error("Screen not found: {0}")]
    ScreenNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("macOS API error: {0}")]
    MacOSAPIError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),
}
