use crate::models::{Shortcut, WindowAction};
use crate::services::{
    keyboard_handler::KeyboardHandler, layout_manager::LayoutManager,
    window_manager::WindowManager,
};
use crate::{GridSnapError, Result};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Metrics for the snap orchestrator
#[derive(Debug, Default, Clone)]
pub struct OrchestratorMetrics {
    pub actions_dispatched: u64,
    pub actions_failed: u64,
}

/// Routes window actions, whether from shortcuts or the menu, to the service
/// that performs them
pub struct SnapOrchestrator {
    window_manager: Arc<WindowManager>,
    keyboard_handler: Arc<KeyboardHandler>,
    layout_manager: Option<Arc<LayoutManager>>,
    metrics: Arc<RwLock<OrchestratorMetrics>>,
}

impl SnapOrchestrator {
    pub fn new(
        window_manager: Arc<WindowManager>,
        keyboard_handler: Arc<KeyboardHandler>,
        layout_manager: Option<Arc<LayoutManager>>,
    ) -> Self {
        Self {
            window_manager,
            keyboard_handler,
            layout_manager,
            metrics: Arc::new(RwLock::new(OrchestratorMetrics::default())),
        }
    }

    /// Resolve a pressed shortcut and perform its action. Returns the action
    /// performed, or `None` when the shortcut is unbound.
    pub async fn handle_shortcut(&self, shortcut: &Shortcut) -> Result<Option<WindowAction>> {
        let Some(event) = self.keyboard_handler.handle_shortcut(shortcut).await else {
            return Ok(None);
        };

        self.perform(event.action).await?;
        Ok(Some(event.action))
    }

    /// Perform an action. Failures are counted and returned; callers in the
    /// event loop log them and carry on.
    pub async fn perform(&self, action: WindowAction) -> Result<()> {
        debug!(action = %action.label(), "Dispatching window action");
        let result = self.dispatch(action).await;

        let mut metrics = self.metrics.write().await;
        metrics.actions_dispatched += 1;
        if let Err(err) = &result {
            metrics.actions_failed += 1;
            warn!(action = %action.label(), error = %err, "Window action failed");
        }
        result
    }

    async fn dispatch(&self, action: WindowAction) -> Result<()> {
        match action {
            WindowAction::Snap(position) => {
                self.window_manager.snap_focused(position).await?;
            }
            WindowAction::Undo => {
                if self.window_manager.undo().await?.is_none() {
                    info!("Nothing to undo");
                }
            }
            WindowAction::Redo => {
                if self.window_manager.redo().await?.is_none() {
                    info!("Nothing to redo");
                }
            }
            WindowAction::NextScreen => {
                self.window_manager.move_to_next_screen().await?;
            }
            WindowAction::CustomPosition(id) => {
                self.window_manager.apply_custom_position(id).await?;
            }
            WindowAction::RestoreLayout(id) => {
                let layouts = self.layout_manager.as_ref().ok_or_else(|| {
                    GridSnapError::ConfigurationError("Layout manager is not configured".into())
                })?;
                layouts.restore(id).await?;
            }
        }
        Ok(())
    }

    pub async fn metrics(&self) -> OrchestratorMetrics {
        self.metrics.read().await.clone()
    }
}

/// Builder for creating a snap orchestrator
#[derive(Default)]
pub struct SnapOrchestratorBuilder {
    window_manager: Option<Arc<WindowManager>>,
    keyboard_handler: Option<Arc<KeyboardHandler>>,
    layout_manager: Option<Arc<LayoutManager>>,
}

impl SnapOrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window_manager(mut self, manager: Arc<WindowManager>) -> Self {
        self.window_manager = Some(manager);
        self
    }

    pub fn keyboard_handler(mut self, handler: Arc<KeyboardHandler>) -> Self {
        self.keyboard_handler = Some(handler);
        self
    }

    pub fn layout_manager(mut self, manager: Arc<LayoutManager>) -> Self {
        self.layout_manager = Some(manager);
        self
    }

    pub fn build(self) -> Result<SnapOrchestrator> {
        let window_manager = self.window_manager.ok_or_else(|| {
            GridSnapError::ConfigurationError("WindowManager is required".to_string())
        })?;
        let keyboard_handler = self.keyboard_handler.ok_or_else(|| {
            GridSnapError::ConfigurationError("KeyboardHandler is required".to_string())
        })?;

        Ok(SnapOrchestrator::new(
            window_manager,
            keyboard_handler,
            self.layout_manager,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macos::accessibility::{AXWindow, AccessibilityProvider, InMemoryAccessibilityProvider};
    use crate::macos::core_graphics::{InMemoryDisplayProvider, ScreenInfo};
    use crate::models::{GridPosition, Rect};
    use uuid::Uuid;

    async fn orchestrator() -> (SnapOrchestrator, Arc<InMemoryAccessibilityProvider>) {
        let accessibility = Arc::new(InMemoryAccessibilityProvider::new_with(vec![AXWindow::new(
            1,
            9,
            "Inbox",
            "Mail",
            Rect::from_xywh(200.0, 200.0, 400.0, 300.0),
        )
        .focused(true)]));
        let displays = Arc::new(InMemoryDisplayProvider::new_with(vec![ScreenInfo::primary(
            "main",
            Rect::from_xywh(0.0, 0.0, 1440.0, 900.0),
        )]));
        let window_manager = Arc::new(WindowManager::with_default_settings(
            accessibility.clone(),
            displays,
        ));
        let keyboard_handler = Arc::new(KeyboardHandler::with_default_bindings().await.unwrap());

        let orchestrator = SnapOrchestratorBuilder::new()
            .window_manager(window_manager)
            .keyboard_handler(keyboard_handler)
            .build()
            .unwrap();
        (orchestrator, accessibility)
    }

    #[tokio::test]
    async fn builder_requires_services() {
        assert!(SnapOrchestratorBuilder::new().build().is_err());
    }

    #[tokio::test]
    async fn shortcut_snaps_focused_window() {
        let (orchestrator, accessibility) = orchestrator().await;

        let action = orchestrator
            .handle_shortcut(&Shortcut::parse("ctrl+opt+return").unwrap())
            .await
            .unwrap();
        assert_eq!(action, Some(WindowAction::Snap(GridPosition::Maximize)));
        assert_eq!(
            accessibility.get_window(1).unwrap().unwrap().frame,
            Rect::from_xywh(0.0, 0.0, 1440.0, 900.0)
        );

        let unbound = orchestrator
            .handle_shortcut(&Shortcut::parse("cmd+opt+p").unwrap())
            .await
            .unwrap();
        assert!(unbound.is_none());
    }

    #[tokio::test]
    async fn failures_are_counted() {
        let (orchestrator, _) = orchestrator().await;

        assert!(orchestrator
            .perform(WindowAction::RestoreLayout(Uuid::new_v4()))
            .await
            .is_err());
        orchestrator.perform(WindowAction::Undo).await.unwrap();

        let metrics = orchestrator.metrics().await;
        assert_eq!(metrics.actions_dispatched, 2);
        assert_eq!(metrics.actions_failed, 1);
    }
}
