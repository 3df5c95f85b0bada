use crate::models::geometry::Rect;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One window's placement inside a saved layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutEntry {
    pub application_name: String,
    pub title: String,
    /// Frame in accessibility space
    pub frame: Rect,
}

/// Snapshot of every visible window's frame, restorable later
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowLayout {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    pub windows: Vec<LayoutEntry>,
}

impl WindowLayout {
    pub fn new(name: impl Into<String>, windows: Vec<LayoutEntry>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
            last_used: None,
            windows,
        }
    }

    pub fn with_last_used(self, when: DateTime<Utc>) -> Self {
        Self {
            last_used: Some(when),
            ..self
        }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self
        }
    }

    /// Distinct application names in capture order
    pub fn applications(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for entry in &self.windows {
            if !names.contains(&entry.application_name.as_str()) {
                names.push(&entry.application_name);
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(app: &str, title: &str) -> LayoutEntry {
        LayoutEntry {
            application_name: app.to_string(),
            title: title.to_string(),
            frame: Rect::from_xywh(0.0, 25.0, 800.0, 600.0),
        }
    }

    #[test]
    fn applications_are_deduplicated_in_order() {
        let layout = WindowLayout::new(
            "Coding",
            vec![entry("Code", "main.rs"), entry("Terminal", "zsh"), entry("Code", "lib.rs")],
        );
        assert_eq!(layout.applications(), vec!["Code", "Terminal"]);
    }

    #[test]
    fn rename_keeps_identity() {
        let layout = WindowLayout::new("Old", vec![]);
        let renamed = layout.clone().with_name("New");
        assert_eq!(renamed.id, layout.id);
        assert_eq!(renamed.name, "New");
    }
}
