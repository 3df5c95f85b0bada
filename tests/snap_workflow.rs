//! End-to-end window actions against in-memory providers

use chrono::{Duration, Utc};
use gridsnap::config::Settings;
use gridsnap::macos::{
    AXWindow, AccessibilityProvider, InMemoryAccessibilityProvider, InMemoryDisplayProvider,
    ScreenInfo,
};
use gridsnap::services::{KeyboardHandler, SnapOrchestratorBuilder, WindowManager};
use gridsnap::{GridPosition, Rect, Shortcut, WindowAction, WindowActionHistory, WindowIdentity};
use std::sync::Arc;

const EDITOR: u32 = 1;

fn editor() -> AXWindow {
    AXWindow::new(
        EDITOR,
        42,
        "main.rs",
        "Editor",
        Rect::from_xywh(300.0, 200.0, 640.0, 480.0),
    )
    .focused(true)
}

fn main_screen() -> ScreenInfo {
    ScreenInfo::primary("main", Rect::from_xywh(0.0, 0.0, 1440.0, 900.0))
}

fn setup(
    screens: Vec<ScreenInfo>,
) -> (WindowManager, Arc<InMemoryAccessibilityProvider>) {
    let accessibility = Arc::new(InMemoryAccessibilityProvider::new_with(vec![editor()]));
    let displays = Arc::new(InMemoryDisplayProvider::new_with(screens));
    let manager = WindowManager::new(accessibility.clone(), displays, &Settings::default());
    (manager, accessibility)
}

fn frame_of(accessibility: &InMemoryAccessibilityProvider) -> Rect {
    accessibility.get_window(EDITOR).unwrap().unwrap().frame
}

#[tokio::test]
async fn repeated_snaps_cycle_through_the_group() {
    let (manager, accessibility) = setup(vec![main_screen()]);

    let emitted = [
        manager.snap_focused(GridPosition::LeftHalf).await.unwrap(),
        manager.snap_focused(GridPosition::LeftHalf).await.unwrap(),
        manager.snap_focused(GridPosition::LeftHalf).await.unwrap(),
    ];
    assert_eq!(
        emitted,
        [
            GridPosition::LeftHalf,
            GridPosition::LeftTwoThirds,
            GridPosition::LeftHalf
        ]
    );
    assert_eq!(frame_of(&accessibility), Rect::from_xywh(0.0, 0.0, 720.0, 900.0));
    assert_eq!(manager.undo_entries().await.len(), 3);
}

#[tokio::test]
async fn undo_and_redo_move_the_window() {
    let (manager, accessibility) = setup(vec![main_screen()]);
    let original = frame_of(&accessibility);

    manager.snap_focused(GridPosition::TopHalf).await.unwrap();
    let top = frame_of(&accessibility);
    assert_eq!(top, Rect::from_xywh(0.0, 0.0, 1440.0, 450.0));

    let undone = manager.undo().await.unwrap().unwrap();
    assert_eq!(undone.rect, original);
    assert_eq!(frame_of(&accessibility), original);
    assert!(manager.can_redo().await);

    manager.redo().await.unwrap().unwrap();
    assert_eq!(frame_of(&accessibility), top);
    assert!(!manager.can_redo().await);
}

#[tokio::test]
async fn rejected_write_leaves_history_untouched() {
    let (manager, accessibility) = setup(vec![main_screen()]);
    accessibility.set_fail_frame_writes(true);

    assert!(manager.snap_focused(GridPosition::Maximize).await.is_err());
    assert!(!manager.can_undo().await);
    assert_eq!(manager.metrics().await.error_count, 1);

    accessibility.set_fail_frame_writes(false);
    manager.snap_focused(GridPosition::Maximize).await.unwrap();
    assert!(manager.can_undo().await);
}

#[tokio::test]
async fn nothing_focused_is_an_error_without_side_effects() {
    let accessibility = Arc::new(InMemoryAccessibilityProvider::new_with(vec![
        editor().focused(false)
    ]));
    let displays = Arc::new(InMemoryDisplayProvider::new_with(vec![main_screen()]));
    let manager = WindowManager::with_default_settings(accessibility.clone(), displays);

    assert!(manager.snap_focused(GridPosition::Center).await.is_err());
    assert_eq!(accessibility.frame_write_count(), 0);
    assert!(manager.undo().await.unwrap().is_none());
}

#[tokio::test]
async fn next_screen_keeps_relative_placement() {
    let side = ScreenInfo::new("side", Rect::from_xywh(1440.0, 0.0, 1440.0, 900.0));
    let (manager, accessibility) = setup(vec![main_screen(), side]);

    manager.snap_focused(GridPosition::LeftHalf).await.unwrap();
    let destination = manager.move_to_next_screen().await.unwrap();

    assert_eq!(destination.id, "side");
    assert_eq!(
        frame_of(&accessibility),
        Rect::from_xywh(1440.0, 0.0, 720.0, 900.0)
    );

    // wraps back to the primary display
    let back = manager.move_to_next_screen().await.unwrap();
    assert_eq!(back.id, "main");
    assert_eq!(frame_of(&accessibility), Rect::from_xywh(0.0, 0.0, 720.0, 900.0));
}

#[tokio::test]
async fn shortcuts_drive_the_manager() {
    let (manager, accessibility) = setup(vec![main_screen()]);
    let handler = Arc::new(KeyboardHandler::with_default_bindings().await.unwrap());
    let orchestrator = SnapOrchestratorBuilder::new()
        .window_manager(Arc::new(manager))
        .keyboard_handler(handler)
        .build()
        .unwrap();

    let press = |text: &str| Shortcut::parse(text).unwrap();

    assert_eq!(
        orchestrator.handle_shortcut(&press("ctrl+opt+right")).await.unwrap(),
        Some(WindowAction::Snap(GridPosition::RightHalf))
    );
    assert_eq!(frame_of(&accessibility), Rect::from_xywh(720.0, 0.0, 720.0, 900.0));

    orchestrator.handle_shortcut(&press("ctrl+opt+z")).await.unwrap();
    assert_eq!(frame_of(&accessibility), editor().frame);

    orchestrator.handle_shortcut(&press("ctrl+opt+shift+z")).await.unwrap();
    assert_eq!(frame_of(&accessibility), Rect::from_xywh(720.0, 0.0, 720.0, 900.0));
}

#[test]
fn undo_redo_stack_order() {
    let window = WindowIdentity::new("Editor", "main.rs", 42);
    let now = Utc::now();
    let mut history = WindowActionHistory::new(50);

    for (step, label) in ["A", "B", "C"].into_iter().enumerate() {
        let offset = step as f64 * 10.0;
        history.record_before_action(
            label,
            window.clone(),
            Rect::from_xywh(offset, offset, 100.0, 100.0),
            now + Duration::seconds(step as i64),
        );
    }

    assert_eq!(history.undo(Some(&window)).unwrap().action, "C");
    assert_eq!(history.undo(Some(&window)).unwrap().action, "B");
    assert_eq!(history.redo(Some(&window)).unwrap().action, "B");

    history.record_before_action("D", window.clone(), Rect::from_xywh(0.0, 0.0, 1.0, 1.0), now);
    assert!(history.redo(Some(&window)).is_none());
}

#[test]
fn history_is_bounded_fifo() {
    let window = WindowIdentity::new("Editor", "main.rs", 42);
    let now = Utc::now();
    let mut history = WindowActionHistory::new(50);

    for step in 0..60 {
        history.record_before_action(
            format!("step-{step}"),
            window.clone(),
            Rect::from_xywh(step as f64, 0.0, 10.0, 10.0),
            now,
        );
    }

    assert_eq!(history.undo_len(), 50);
    assert_eq!(history.undo_entries().next().unwrap().action, "step-10");
    assert_eq!(history.peek_undo().unwrap().action, "step-59");
}
