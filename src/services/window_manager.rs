use crate::config::persistence::CustomPositionStore;
use crate::config::settings::Settings;
use crate::macos::accessibility::{AXWindow, AccessibilityProvider};
use crate::macos::core_graphics::{DisplayProvider, ScreenInfo};
use crate::models::{CustomPosition, GridPosition, Rect, RuleBook, WindowIdentity, WindowState};
use crate::services::action_history::WindowActionHistory;
use crate::services::coordinate_converter::{from_accessibility_space, to_accessibility_space};
use crate::services::grid_calculator::GridCalculator;
use crate::services::screen_locator::{next_screen, primary_screen, screen_for_window};
use crate::{GridSnapError, Result};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Telemetry for window operations
#[derive(Debug, Default, Clone)]
pub struct WindowManagerMetrics {
    pub snap_count: u64,
    pub undo_count: u64,
    pub redo_count: u64,
    pub screen_moves: u64,
    pub custom_positions_applied: u64,
    pub rules_applied: u64,
    pub error_count: u64,
}

/// A rule that placed a window
#[derive(Debug, Clone, PartialEq)]
pub struct RuleApplication {
    pub rule_id: Uuid,
    pub window_id: u32,
    pub position: GridPosition,
}

/// Displays as seen at the start of one operation
struct ScreenSnapshot {
    screens: Vec<ScreenInfo>,
    /// Reference frame for every coordinate flip
    primary: Rect,
}

/// Service that moves windows onto grid positions and keeps their history
pub struct WindowManager {
    accessibility: Arc<dyn AccessibilityProvider>,
    displays: Arc<dyn DisplayProvider>,
    history: Arc<RwLock<WindowActionHistory>>,
    calculator: GridCalculator,
    respect_visible_frame: bool,
    positions: Option<Arc<CustomPositionStore>>,
    metrics: Arc<RwLock<WindowManagerMetrics>>,
}

impl WindowManager {
    pub fn new(
        accessibility: Arc<dyn AccessibilityProvider>,
        displays: Arc<dyn DisplayProvider>,
        settings: &Settings,
    ) -> Self {
        let cooldown = i64::try_from(settings.cycle_cooldown_ms).unwrap_or(i64::MAX);
        let history = WindowActionHistory::new(settings.history_capacity)
            .with_cooldown(Duration::milliseconds(cooldown))
            .with_cycling(settings.cycling_enabled);

        Self {
            accessibility,
            displays,
            history: Arc::new(RwLock::new(history)),
            calculator: settings.calculator(),
            respect_visible_frame: settings.respect_visible_frame,
            positions: None,
            metrics: Arc::new(RwLock::new(WindowManagerMetrics::default())),
        }
    }

    pub fn with_default_settings(
        accessibility: Arc<dyn AccessibilityProvider>,
        displays: Arc<dyn DisplayProvider>,
    ) -> Self {
        Self::new(accessibility, displays, &Settings::default())
    }

    /// Attach the store custom positions are read from
    pub fn with_position_store(mut self, store: Arc<CustomPositionStore>) -> Self {
        self.positions = Some(store);
        self
    }

    /// Ensure the service has permission to manage windows
    pub async fn ensure_permissions(&self) -> Result<()> {
        match self.accessibility.ensure_permissions() {
            Ok(()) => Ok(()),
            Err(err) => {
                self.increment_error().await;
                Err(err)
            }
        }
    }

    pub async fn focused_window(&self) -> Result<Option<AXWindow>> {
        self.accessibility.focused_window()
    }

    /// Visible (non-minimized) windows
    pub async fn list_windows(&self) -> Result<Vec<AXWindow>> {
        self.accessibility.list_windows(false)
    }

    pub async fn screens(&self) -> Result<Vec<ScreenInfo>> {
        self.displays.list_screens()
    }

    /// Snap the focused window to `requested`, advancing the cycle when the
    /// same shortcut is repeated. Returns the position actually applied.
    pub async fn snap_focused(&self, requested: GridPosition) -> Result<GridPosition> {
        let window = self.require_focused().await?;
        let position = self
            .history
            .write()
            .await
            .record_action(requested, &window.identity(), Utc::now());

        self.snap_window(&window, position).await?;
        self.metrics.write().await.snap_count += 1;
        info!(window = %window.identity(), position = %position, "Snapped window");
        Ok(position)
    }

    /// Place `window` at `position` on the screen it currently occupies and
    /// return the frame written, in accessibility space
    pub async fn snap_window(&self, window: &AXWindow, position: GridPosition) -> Result<Rect> {
        let snapshot = self.snapshot_screens().await?;
        let screen = snapshot.screen_for(window)?;

        let target = self
            .calculator
            .frame_for(position, screen.layout_frame(self.respect_visible_frame));
        let frame = to_accessibility_space(target, snapshot.primary);
        self.apply_frame(window, frame, position.as_str()).await
    }

    /// Restore the frame recorded before the most recent action
    pub async fn undo(&self) -> Result<Option<WindowState>> {
        let focused = self.accessibility.focused_window()?;
        let identity = focused.as_ref().map(AXWindow::identity);

        let state = {
            let mut history = self.history.write().await;
            history.reset_cycle();
            history.undo(identity.as_ref())
        };
        let Some(state) = state else {
            return Ok(None);
        };

        let window = self.find_window(&state.window).await?;
        self.write_frame(&window, state.rect).await?;
        self.metrics.write().await.undo_count += 1;
        debug!(window = %state.window, action = %state.action, "Undid window action");
        Ok(Some(state))
    }

    /// Re-apply the most recently undone action
    pub async fn redo(&self) -> Result<Option<WindowState>> {
        let focused = self.accessibility.focused_window()?;
        let identity = focused.as_ref().map(AXWindow::identity);

        let state = {
            let mut history = self.history.write().await;
            history.reset_cycle();
            history.redo(identity.as_ref())
        };
        let Some(state) = state else {
            return Ok(None);
        };

        let Some(applied) = state.applied else {
            debug!(action = %state.action, "Record has no applied frame; nothing to re-apply");
            return Ok(Some(state));
        };

        let window = self.find_window(&state.window).await?;
        self.write_frame(&window, applied).await?;
        self.metrics.write().await.redo_count += 1;
        debug!(window = %state.window, action = %state.action, "Redid window action");
        Ok(Some(state))
    }

    /// Move the focused window to the next display, keeping its position and
    /// size relative to the layout area. Returns the destination screen.
    pub async fn move_to_next_screen(&self) -> Result<ScreenInfo> {
        let window = self.require_focused().await?;
        let snapshot = self.snapshot_screens().await?;
        let current = snapshot.screen_for(&window)?.clone();
        let destination = next_screen(&current, &snapshot.screens)
            .cloned()
            .ok_or_else(|| GridSnapError::ScreenNotFound(current.id.clone()))?;

        if destination.id == current.id {
            debug!(screen = %current.id, "Only one screen attached; nothing to move");
            return Ok(current);
        }

        let window_frame = from_accessibility_space(window.frame, snapshot.primary);
        let target = relocate(
            window_frame,
            current.layout_frame(self.respect_visible_frame),
            destination.layout_frame(self.respect_visible_frame),
        );
        let frame = to_accessibility_space(target, snapshot.primary);

        self.apply_frame(&window, frame, "nextScreen").await?;
        self.history.write().await.reset_cycle();
        self.metrics.write().await.screen_moves += 1;
        info!(from = %current.id, to = %destination.id, "Moved window to next screen");
        Ok(destination)
    }

    /// Place the focused window at a stored custom position
    pub async fn apply_custom_position(&self, id: Uuid) -> Result<CustomPosition> {
        let store = self.position_store()?;
        let position = store
            .position(id)
            .ok_or_else(|| GridSnapError::ConfigurationError(format!("Unknown custom position {id}")))?;

        let window = self.require_focused().await?;
        let snapshot = self.snapshot_screens().await?;
        let screen = snapshot.screen_for(&window)?;

        let target = position.frame_on(screen.layout_frame(self.respect_visible_frame));
        let frame = to_accessibility_space(target, snapshot.primary);
        self.apply_frame(&window, frame, &format!("customPosition:{id}"))
            .await?;
        self.history.write().await.reset_cycle();
        self.metrics.write().await.custom_positions_applied += 1;

        match store.mark_position_used(id, Utc::now()) {
            Ok(updated) => Ok(updated),
            Err(err) => {
                warn!(%id, error = %err, "Failed to record custom position use");
                Ok(position)
            }
        }
    }

    /// Save the focused window's current frame as a new custom position
    pub async fn capture_custom_position(&self, name: &str) -> Result<CustomPosition> {
        let store = self.position_store()?;
        let window = self.require_focused().await?;
        let snapshot = self.snapshot_screens().await?;
        let screen = snapshot.screen_for(&window)?;

        let frame = from_accessibility_space(window.frame, snapshot.primary);
        let position = CustomPosition::from_frame(
            name,
            frame,
            screen.layout_frame(self.respect_visible_frame),
        )
        .map_err(|err| GridSnapError::ValidationError(err.to_string()))?;

        store
            .upsert_position(position.clone())
            .map_err(|err| GridSnapError::PersistenceError(err.to_string()))?;
        info!(id = %position.id, name = %position.name, "Captured custom position");
        Ok(position)
    }

    /// Snap every visible window whose application matches an enabled rule.
    /// Failures are logged and skipped.
    pub async fn apply_app_rules(&self, rules: &RuleBook) -> Result<Vec<RuleApplication>> {
        let mut applied = Vec::new();

        for window in self.accessibility.list_windows(false)? {
            let Some(rule) = rules.position_for(&window.application_name) else {
                continue;
            };

            match self.snap_window(&window, rule.position).await {
                Ok(_) => applied.push(RuleApplication {
                    rule_id: rule.id,
                    window_id: window.window_id,
                    position: rule.position,
                }),
                Err(err) => warn!(
                    window = %window.identity(),
                    pattern = %rule.application_pattern,
                    error = %err,
                    "Failed to apply app rule"
                ),
            }
        }

        self.metrics.write().await.rules_applied += applied.len() as u64;
        Ok(applied)
    }

    /// Write `frame` (accessibility space) to `window` without touching the
    /// history
    pub async fn write_frame(&self, window: &AXWindow, frame: Rect) -> Result<()> {
        if let Err(err) = self.accessibility.set_window_frame(window.window_id, frame) {
            warn!(window = %window.identity(), error = %err, "Frame write failed");
            self.increment_error().await;
            return Err(err);
        }
        Ok(())
    }

    pub async fn can_undo(&self) -> bool {
        self.history.read().await.can_undo()
    }

    pub async fn can_redo(&self) -> bool {
        self.history.read().await.can_redo()
    }

    /// Snapshot of the undo stack, oldest first
    pub async fn undo_entries(&self) -> Vec<WindowState> {
        self.history.read().await.undo_entries().cloned().collect()
    }

    pub async fn clear_history(&self) {
        self.history.write().await.clear();
    }

    pub async fn metrics(&self) -> WindowManagerMetrics {
        self.metrics.read().await.clone()
    }

    /// Write the frame, then record it. A rejected write leaves the history
    /// untouched.
    async fn apply_frame(&self, window: &AXWindow, frame: Rect, label: &str) -> Result<Rect> {
        self.write_frame(window, frame).await?;
        self.history.write().await.record_applied_action(
            label,
            window.identity(),
            window.frame,
            frame,
            Utc::now(),
        );
        Ok(frame)
    }

    async fn require_focused(&self) -> Result<AXWindow> {
        match self.accessibility.focused_window()? {
            Some(window) => Ok(window),
            None => {
                debug!("No focused window; ignoring request");
                Err(GridSnapError::NoTargetWindow("no window has keyboard focus".into()).into())
            }
        }
    }

    /// Live window for a recorded identity. Falls back to the same process and
    /// application when the title has changed since the record was made.
    async fn find_window(&self, identity: &WindowIdentity) -> Result<AXWindow> {
        let windows = self.accessibility.list_windows(true)?;
        let exact = windows.iter().position(|window| window.identity() == *identity);
        let fallback = || {
            windows.iter().position(|window| {
                window.pid == identity.pid && window.application_name == identity.application_name
            })
        };

        match exact.or_else(fallback) {
            Some(index) => Ok(windows[index].clone()),
            None => {
                warn!(window = %identity, "Recorded window no longer exists");
                self.increment_error().await;
                Err(GridSnapError::NoTargetWindow(format!("{identity} is gone")).into())
            }
        }
    }

    fn position_store(&self) -> Result<&Arc<CustomPositionStore>> {
        self.positions.as_ref().ok_or_else(|| {
            GridSnapError::ConfigurationError("No custom position store configured".into()).into()
        })
    }

    async fn snapshot_screens(&self) -> Result<ScreenSnapshot> {
        let screens = match self.displays.list_screens() {
            Ok(screens) => screens,
            Err(err) => {
                self.increment_error().await;
                return Err(err);
            }
        };
        let primary = primary_screen(&screens)
            .map(|screen| screen.frame)
            .ok_or_else(|| GridSnapError::ScreenNotFound("no displays attached".into()))?;

        Ok(ScreenSnapshot { screens, primary })
    }

    async fn increment_error(&self) {
        self.metrics.write().await.error_count += 1;
    }
}

impl ScreenSnapshot {
    /// Screen owning a window whose frame is in accessibility space
    fn screen_for(&self, window: &AXWindow) -> Result<&ScreenInfo> {
        let frame = from_accessibility_space(window.frame, self.primary);
        screen_for_window(frame, &self.screens).ok_or_else(|| {
            GridSnapError::ScreenNotFound(format!("no screen for {}", window.identity())).into()
        })
    }
}

/// Map `frame` from one layout area onto another, preserving its relative
/// offset and size, and clamp it inside the destination
fn relocate(frame: Rect, from: Rect, to: Rect) -> Rect {
    if from.is_degenerate() {
        return Rect::from_xywh(to.min_x(), to.min_y(), frame.size.width, frame.size.height);
    }

    let scale_x = to.size.width / from.size.width;
    let scale_y = to.size.height / from.size.height;
    let width = (frame.size.width * scale_x).min(to.size.width);
    let height = (frame.size.height * scale_y).min(to.size.height);

    let x = (to.min_x() + (frame.min_x() - from.min_x()) * scale_x)
        .clamp(to.min_x(), to.max_x() - width);
    let y = (to.min_y() + (frame.min_y() - from.min_y()) * scale_y)
        .clamp(to.min_y(), to.max_y() - height);
    Rect::from_xywh(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macos::accessibility::InMemoryAccessibilityProvider;
    use crate::macos::core_graphics::InMemoryDisplayProvider;

    fn primary() -> ScreenInfo {
        ScreenInfo::primary("main", Rect::from_xywh(0.0, 0.0, 1440.0, 900.0))
    }

    fn editor() -> AXWindow {
        AXWindow::new(1, 42, "main.rs", "Editor", Rect::from_xywh(100.0, 100.0, 800.0, 600.0))
            .focused(true)
    }

    fn manager_with(
        windows: Vec<AXWindow>,
        screens: Vec<ScreenInfo>,
    ) -> (WindowManager, Arc<InMemoryAccessibilityProvider>) {
        let accessibility = Arc::new(InMemoryAccessibilityProvider::new_with(windows));
        let displays = Arc::new(InMemoryDisplayProvider::new_with(screens));
        let manager = WindowManager::with_default_settings(accessibility.clone(), displays);
        (manager, accessibility)
    }

    #[tokio::test]
    async fn snap_focused_writes_accessibility_frame() {
        let (manager, accessibility) = manager_with(vec![editor()], vec![primary()]);

        let applied = manager.snap_focused(GridPosition::TopHalf).await.unwrap();
        assert_eq!(applied, GridPosition::TopHalf);

        // Top half in screen space starts at y=450; in AX space it is y=0
        let window = accessibility.get_window(1).unwrap().unwrap();
        assert_eq!(window.frame, Rect::from_xywh(0.0, 0.0, 1440.0, 450.0));
        assert!(manager.can_undo().await);
    }

    #[tokio::test]
    async fn snap_without_focus_is_no_target() {
        let unfocused = editor().focused(false);
        let (manager, _) = manager_with(vec![unfocused], vec![primary()]);

        let error = manager.snap_focused(GridPosition::LeftHalf).await.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<GridSnapError>(),
            Some(GridSnapError::NoTargetWindow(_))
        ));
        assert!(!manager.can_undo().await);
    }

    #[tokio::test]
    async fn rejected_write_records_nothing() {
        let (manager, accessibility) = manager_with(vec![editor()], vec![primary()]);
        accessibility.set_fail_frame_writes(true);

        assert!(manager.snap_focused(GridPosition::LeftHalf).await.is_err());
        assert!(!manager.can_undo().await);
        assert_eq!(manager.metrics().await.error_count, 1);
    }

    #[tokio::test]
    async fn rejected_write_still_advances_cycle() {
        let (manager, accessibility) = manager_with(vec![editor()], vec![primary()]);
        accessibility.set_fail_frame_writes(true);
        assert!(manager.snap_focused(GridPosition::LeftHalf).await.is_err());

        accessibility.set_fail_frame_writes(false);
        let applied = manager.snap_focused(GridPosition::LeftHalf).await.unwrap();
        assert_eq!(applied, GridPosition::LeftTwoThirds);
        assert_eq!(manager.undo_entries().await.len(), 1);
    }

    #[tokio::test]
    async fn capture_clips_window_hanging_off_screen() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Arc::new(
            crate::config::persistence::JsonStore::open(
                &crate::config::persistence::PersistenceConfig::in_dir(dir.path()),
            )
            .unwrap(),
        );
        let positions = Arc::new(CustomPositionStore::new(store));

        let straddling =
            AXWindow::new(1, 42, "main.rs", "Editor", Rect::from_xywh(1000.0, 100.0, 800.0, 600.0))
                .focused(true);
        let (manager, _) = manager_with(vec![straddling], vec![primary()]);
        let manager = manager.with_position_store(positions.clone());

        let position = manager.capture_custom_position("Edge").await.unwrap();
        assert!(position.x + position.width <= 1.0);
        assert!(position
            .frame_on(primary().frame)
            .approx_eq(&Rect::from_xywh(1000.0, 200.0, 440.0, 600.0), 1e-9));
        assert_eq!(positions.positions().len(), 1);
    }

    #[tokio::test]
    async fn undo_restores_and_redo_reapplies() {
        let original = editor().frame;
        let (manager, accessibility) = manager_with(vec![editor()], vec![primary()]);

        manager.snap_focused(GridPosition::LeftHalf).await.unwrap();
        let snapped = accessibility.get_window(1).unwrap().unwrap().frame;

        let undone = manager.undo().await.unwrap().unwrap();
        assert_eq!(undone.rect, original);
        assert_eq!(accessibility.get_window(1).unwrap().unwrap().frame, original);

        manager.redo().await.unwrap().unwrap();
        assert_eq!(accessibility.get_window(1).unwrap().unwrap().frame, snapped);
        assert!(manager.undo().await.unwrap().is_some());
        assert!(manager.undo().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn next_screen_keeps_relative_placement() {
        let secondary = ScreenInfo::new("side", Rect::from_xywh(1440.0, 0.0, 2880.0, 1800.0));
        let (manager, accessibility) = manager_with(vec![editor()], vec![primary(), secondary]);

        manager.snap_focused(GridPosition::LeftHalf).await.unwrap();
        let destination = manager.move_to_next_screen().await.unwrap();
        assert_eq!(destination.id, "side");

        // Left half of the secondary display; AX y = 900 - 1800 = -900
        let window = accessibility.get_window(1).unwrap().unwrap();
        assert!(window
            .frame
            .approx_eq(&Rect::from_xywh(1440.0, -900.0, 1440.0, 1800.0), 1e-9));
    }

    #[tokio::test]
    async fn rules_snap_matching_windows() {
        let browser = AXWindow::new(2, 7, "Docs", "Safari", Rect::from_xywh(0.0, 0.0, 300.0, 300.0));
        let (manager, accessibility) = manager_with(vec![editor(), browser], vec![primary()]);
        let rules = RuleBook::new(vec![
            crate::models::AppRule::new("Saf*", GridPosition::RightHalf).unwrap()
        ]);

        let applied = manager.apply_app_rules(&rules).await.unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].window_id, 2);
        assert_eq!(
            accessibility.get_window(2).unwrap().unwrap().frame,
            Rect::from_xywh(720.0, 0.0, 720.0, 900.0)
        );
    }

    #[test]
    fn relocate_scales_and_clamps() {
        let from = Rect::from_xywh(0.0, 0.0, 1000.0, 1000.0);
        let to = Rect::from_xywh(1000.0, 0.0, 500.0, 500.0);
        let frame = Rect::from_xywh(500.0, 0.0, 500.0, 1000.0);
        assert_eq!(relocate(frame, from, to), Rect::from_xywh(1250.0, 0.0, 250.0, 500.0));
    }
}
