use crate::config::persistence::LayoutStore;
use crate::macos::accessibility::{AXWindow, AccessibilityProvider};
use crate::models::{LayoutEntry, WindowLayout};
use crate::{GridSnapError, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of restoring a saved layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Entries whose frame was written
    pub applied: usize,
    /// Entries with no live window to receive them
    pub missing: usize,
    /// Entries whose frame write was rejected
    pub failed: usize,
}

impl RestoreReport {
    pub fn is_complete(&self) -> bool {
        self.missing == 0 && self.failed == 0
    }
}

/// Captures every visible window's frame under a name and puts them back later
pub struct LayoutManager {
    accessibility: Arc<dyn AccessibilityProvider>,
    store: Arc<LayoutStore>,
}

impl LayoutManager {
    pub fn new(accessibility: Arc<dyn AccessibilityProvider>, store: Arc<LayoutStore>) -> Self {
        Self {
            accessibility,
            store,
        }
    }

    /// Snapshot all non-minimized windows and persist them as `name`
    pub async fn capture(&self, name: &str) -> Result<WindowLayout> {
        if name.trim().is_empty() {
            return Err(GridSnapError::ValidationError("Layout name cannot be empty".into()).into());
        }

        let windows = self.accessibility.list_windows(false)?;
        let entries = windows
            .iter()
            .map(|window| LayoutEntry {
                application_name: window.application_name.clone(),
                title: window.title.clone(),
                frame: window.frame,
            })
            .collect();

        let layout = WindowLayout::new(name.trim(), entries);
        self.store
            .upsert_layout(layout.clone())
            .map_err(|err| GridSnapError::PersistenceError(err.to_string()))?;

        info!(id = %layout.id, name = %layout.name, windows = layout.windows.len(), "Captured layout");
        Ok(layout)
    }

    /// Apply a saved layout to the live windows.
    ///
    /// Each entry claims at most one window: an exact application and title
    /// match first, otherwise the first unclaimed window of the same
    /// application. Individual write failures are counted, not fatal.
    pub async fn restore(&self, id: Uuid) -> Result<RestoreReport> {
        let layout = self
            .store
            .layout(id)
            .ok_or_else(|| GridSnapError::ValidationError(format!("Unknown layout {id}")))?;

        let windows = self.accessibility.list_windows(false)?;
        let mut claimed = vec![false; windows.len()];
        let mut report = RestoreReport::default();

        for entry in &layout.windows {
            let Some(index) = match_entry(entry, &windows, &claimed) else {
                debug!(app = %entry.application_name, title = %entry.title, "No window for layout entry");
                report.missing += 1;
                continue;
            };
            claimed[index] = true;

            let window = &windows[index];
            match self.accessibility.set_window_frame(window.window_id, entry.frame) {
                Ok(()) => report.applied += 1,
                Err(err) => {
                    warn!(window = %window.identity(), error = %err, "Failed to restore window frame");
                    report.failed += 1;
                }
            }
        }

        if let Err(err) = self.store.upsert_layout(layout.clone().with_last_used(Utc::now())) {
            warn!(%id, error = %err, "Failed to record layout use");
        }

        info!(
            name = %layout.name,
            applied = report.applied,
            missing = report.missing,
            failed = report.failed,
            "Restored layout"
        );
        Ok(report)
    }

    pub async fn layouts(&self) -> Vec<WindowLayout> {
        self.store.layouts()
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        self.store
            .remove_layout(id)
            .map_err(|err| GridSnapError::PersistenceError(err.to_string()).into())
    }
}

fn match_entry(entry: &LayoutEntry, windows: &[AXWindow], claimed: &[bool]) -> Option<usize> {
    let free = |index: &usize| !claimed[*index];
    let same_app = |window: &AXWindow| window.application_name == entry.application_name;

    (0..windows.len())
        .filter(free)
        .find(|&index| same_app(&windows[index]) && windows[index].title == entry.title)
        .or_else(|| {
            (0..windows.len())
                .filter(free)
                .find(|&index| same_app(&windows[index]))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::persistence::{JsonStore, PersistenceConfig};
    use crate::macos::accessibility::InMemoryAccessibilityProvider;
    use crate::models::Rect;
    use tempfile::TempDir;

    fn window(id: u32, app: &str, title: &str, frame: Rect) -> AXWindow {
        AXWindow::new(id, id as i32 * 10, title, app, frame)
    }

    fn entry(app: &str, title: &str, frame: Rect) -> LayoutEntry {
        LayoutEntry {
            application_name: app.into(),
            title: title.into(),
            frame,
        }
    }

    #[test]
    fn exact_title_beats_list_order() {
        let frame = Rect::from_xywh(0.0, 0.0, 10.0, 10.0);
        let windows = vec![
            window(1, "Terminal", "build", frame),
            window(2, "Terminal", "logs", frame),
        ];

        let logs = entry("Terminal", "logs", frame);
        assert_eq!(match_entry(&logs, &windows, &[false, false]), Some(1));

        let renamed = entry("Terminal", "shell", frame);
        assert_eq!(match_entry(&renamed, &windows, &[true, false]), Some(1));
        assert_eq!(match_entry(&renamed, &windows, &[true, true]), None);
    }

    #[tokio::test]
    async fn capture_then_restore_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonStore::open(&PersistenceConfig::in_dir(dir.path())).unwrap());
        let layouts = Arc::new(LayoutStore::new(store));

        let left = Rect::from_xywh(0.0, 0.0, 720.0, 900.0);
        let right = Rect::from_xywh(720.0, 0.0, 720.0, 900.0);
        let accessibility = Arc::new(InMemoryAccessibilityProvider::new_with(vec![
            window(1, "Safari", "Docs", left),
            window(2, "Notes", "Todo", right),
        ]));
        let manager = LayoutManager::new(accessibility.clone(), layouts);

        let layout = manager.capture("Desk").await.unwrap();
        assert_eq!(layout.windows.len(), 2);

        accessibility
            .set_window_frame(1, Rect::from_xywh(5.0, 5.0, 100.0, 100.0))
            .unwrap();
        accessibility.remove_window(2);

        let report = manager.restore(layout.id).await.unwrap();
        assert_eq!(
            report,
            RestoreReport {
                applied: 1,
                missing: 1,
                failed: 0
            }
        );
        assert_eq!(accessibility.get_window(1).unwrap().unwrap().frame, left);
        assert!(manager.layouts().await[0].last_used.is_some());
    }

    #[tokio::test]
    async fn failed_writes_are_counted() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(JsonStore::open(&PersistenceConfig::in_dir(dir.path())).unwrap());
        let accessibility = Arc::new(InMemoryAccessibilityProvider::new_with(vec![window(
            1,
            "Safari",
            "Docs",
            Rect::from_xywh(0.0, 0.0, 10.0, 10.0),
        )]));
        let manager = LayoutManager::new(accessibility.clone(), Arc::new(LayoutStore::new(store)));

        let layout = manager.capture("One").await.unwrap();
        accessibility.set_fail_frame_writes(true);

        let report = manager.restore(layout.id).await.unwrap();
        assert_eq!(report.failed, 1);
        assert!(!report.is_complete());
        assert!(manager.restore(Uuid::new_v4()).await.is_err());
        assert!(manager.capture("  ").await.is_err());
    }
}
