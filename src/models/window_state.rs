use crate::models::geometry::Rect;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Composite key used to correlate a window across repeated lookups.
///
/// This is not a stable OS handle: two windows of the same process with the
/// same title resolve to the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowIdentity {
    pub application_name: String,
    pub title: String,
    pub pid: i32,
}

impl WindowIdentity {
    pub fn new(application_name: impl Into<String>, title: impl Into<String>, pid: i32) -> Self {
        Self {
            application_name: application_name.into(),
            title: title.into(),
            pid,
        }
    }
}

impl fmt::Display for WindowIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.application_name, self.title, self.pid)
    }
}

/// Frame snapshot taken around a mutating window action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowState {
    pub window: WindowIdentity,
    /// Frame before the action, in accessibility space
    pub rect: Rect,
    /// Frame the action applied, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied: Option<Rect>,
    pub timestamp: DateTime<Utc>,
    pub action: String,
}

impl WindowState {
    pub fn new(
        action: impl Into<String>,
        window: WindowIdentity,
        rect: Rect,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            window,
            rect,
            applied: None,
            timestamp,
            action: action.into(),
        }
    }

    pub fn with_applied(self, applied: Rect) -> Self {
        Self {
            applied: Some(applied),
            ..self
        }
    }
}
