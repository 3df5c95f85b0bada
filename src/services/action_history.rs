//! Repeated-shortcut cycling and undo/redo of window frames.
//!
//! Plain synchronous state; the window manager owns one instance behind a
//! lock and is the only writer.

use crate::models::geometry::Rect;
use crate::models::grid_position::{CycleGroup, GridPosition};
use crate::models::window_state::{WindowIdentity, WindowState};
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Window in which a repeated press advances the cycle
pub const CYCLE_COOLDOWN_MS: i64 = 2_000;
/// Maximum number of undo records kept
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Cycling state machine
#[derive(Debug, Clone, PartialEq)]
pub enum CycleState {
    Idle,
    Cycling {
        window: WindowIdentity,
        group: CycleGroup,
        count: usize,
        last_timestamp: DateTime<Utc>,
    },
}

/// Cycling state plus bounded undo/redo stacks
#[derive(Debug, Clone)]
pub struct WindowActionHistory {
    cycle: CycleState,
    cooldown: Duration,
    cycling_enabled: bool,
    capacity: usize,
    undo_stack: VecDeque<WindowState>,
    redo_stack: Vec<WindowState>,
}

impl Default for WindowActionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl WindowActionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            cycle: CycleState::Idle,
            cooldown: Duration::milliseconds(CYCLE_COOLDOWN_MS),
            cycling_enabled: true,
            capacity: capacity.max(1),
            undo_stack: VecDeque::with_capacity(capacity.max(1)),
            redo_stack: Vec::new(),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_cycling(mut self, enabled: bool) -> Self {
        self.cycling_enabled = enabled;
        self
    }

    pub fn cycle_state(&self) -> &CycleState {
        &self.cycle
    }

    /// Resolve which position a snap request should apply.
    ///
    /// A request for the same window and cycle group within the cooldown
    /// emits `sequence[count % len]` of the group, whichever member started
    /// the cycle; anything else starts over at the requested position.
    pub fn record_action(
        &mut self,
        requested: GridPosition,
        window: &WindowIdentity,
        now: DateTime<Utc>,
    ) -> GridPosition {
        let group = requested.cycle_group();
        let sequence = requested.cycle_sequence();

        if self.cycling_enabled && sequence.len() > 1 {
            if let CycleState::Cycling {
                window: last_window,
                group: last_group,
                count,
                last_timestamp,
            } = &mut self.cycle
            {
                let elapsed = now.signed_duration_since(*last_timestamp);
                if *last_window == *window
                    && *last_group == group
                    && elapsed >= Duration::zero()
                    && elapsed < self.cooldown
                {
                    *count += 1;
                    *last_timestamp = now;

                    let emitted = sequence[*count % sequence.len()];
                    debug!(
                        window = %window,
                        requested = %requested,
                        emitted = %emitted,
                        count = *count,
                        "Advanced snap cycle"
                    );
                    return emitted;
                }
            }
        }

        self.cycle = CycleState::Cycling {
            window: window.clone(),
            group,
            count: 0,
            last_timestamp: now,
        };
        trace!(window = %window, position = %requested, "Started snap cycle");
        requested
    }

    /// Forget the current cycle
    pub fn reset_cycle(&mut self) {
        self.cycle = CycleState::Idle;
    }

    /// Push the frame a window had before an action. Clears the redo stack.
    pub fn record_before_action(
        &mut self,
        action: impl Into<String>,
        window: WindowIdentity,
        rect: Rect,
        now: DateTime<Utc>,
    ) {
        self.push_new(WindowState::new(action, window, rect, now));
    }

    /// Push a record holding both the frame before the action and the frame
    /// it applied, so redo can re-apply it
    pub fn record_applied_action(
        &mut self,
        action: impl Into<String>,
        window: WindowIdentity,
        before: Rect,
        after: Rect,
        now: DateTime<Utc>,
    ) {
        self.push_new(WindowState::new(action, window, before, now).with_applied(after));
    }

    fn push_new(&mut self, state: WindowState) {
        debug!(
            window = %state.window,
            action = %state.action,
            depth = self.undo_stack.len() + 1,
            "Recorded window state"
        );
        self.push_undo(state);
        self.redo_stack.clear();
    }

    fn push_undo(&mut self, state: WindowState) {
        while self.undo_stack.len() >= self.capacity {
            if let Some(evicted) = self.undo_stack.pop_front() {
                trace!(action = %evicted.action, "Evicted oldest undo record");
            }
        }
        self.undo_stack.push_back(state);
    }

    /// Pop the newest record.
    ///
    /// The record moves to the redo stack only when `focused` is the window it
    /// belongs to; otherwise redo is skipped for it.
    pub fn undo(&mut self, focused: Option<&WindowIdentity>) -> Option<WindowState> {
        let Some(state) = self.undo_stack.pop_back() else {
            debug!("Nothing to undo");
            return None;
        };

        if focused == Some(&state.window) {
            self.redo_stack.push(state.clone());
        } else {
            debug!(window = %state.window, "Focused window changed; no redo entry captured");
        }

        Some(state)
    }

    /// Pop the newest redo record, returning it to the undo stack when
    /// `focused` is the window it belongs to
    pub fn redo(&mut self, focused: Option<&WindowIdentity>) -> Option<WindowState> {
        let Some(state) = self.redo_stack.pop() else {
            debug!("Nothing to redo");
            return None;
        };

        if focused == Some(&state.window) {
            self.push_undo(state.clone());
        }

        Some(state)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn peek_undo(&self) -> Option<&WindowState> {
        self.undo_stack.back()
    }

    /// Undo records, oldest first
    pub fn undo_entries(&self) -> impl Iterator<Item = &WindowState> {
        self.undo_stack.iter()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.cycle = CycleState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> WindowIdentity {
        WindowIdentity::new("Code", "main.rs", 100)
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn ms(value: i64) -> Duration {
        Duration::milliseconds(value)
    }

    fn rect(x: f64) -> Rect {
        Rect::from_xywh(x, 0.0, 100.0, 100.0)
    }

    #[test]
    fn repeated_press_cycles_left_side() {
        let mut history = WindowActionHistory::default();
        let id = window();

        let emitted: Vec<_> = [0, 100, 200]
            .into_iter()
            .map(|offset| history.record_action(GridPosition::LeftHalf, &id, t0() + ms(offset)))
            .collect();

        assert_eq!(
            emitted,
            vec![GridPosition::LeftHalf, GridPosition::LeftTwoThirds, GridPosition::LeftHalf]
        );
    }

    #[test]
    fn cooldown_expiry_resets_cycle() {
        let mut history = WindowActionHistory::default();
        let id = window();

        let first = history.record_action(GridPosition::LeftHalf, &id, t0());
        let second = history.record_action(GridPosition::LeftHalf, &id, t0() + ms(3_000));
        assert_eq!(first, GridPosition::LeftHalf);
        assert_eq!(second, GridPosition::LeftHalf);
    }

    #[test]
    fn cooldown_boundary_is_exclusive() {
        let mut history = WindowActionHistory::default();
        let id = window();

        history.record_action(GridPosition::RightHalf, &id, t0());
        let at_boundary = history.record_action(GridPosition::RightHalf, &id, t0() + ms(2_000));
        assert_eq!(at_boundary, GridPosition::RightHalf);
    }

    #[test]
    fn thirds_walk_all_three() {
        let mut history = WindowActionHistory::default();
        let id = window();

        let emitted: Vec<_> = (0..4)
            .map(|i| history.record_action(GridPosition::LeftThird, &id, t0() + ms(i * 300)))
            .collect();
        assert_eq!(
            emitted,
            vec![
                GridPosition::LeftThird,
                GridPosition::CenterThird,
                GridPosition::RightThird,
                GridPosition::LeftThird
            ]
        );
    }

    #[test]
    fn cycle_index_ignores_starting_member() {
        let mut history = WindowActionHistory::default();
        let id = window();

        let thirds: Vec<_> = [0, 100, 200]
            .into_iter()
            .map(|offset| history.record_action(GridPosition::RightThird, &id, t0() + ms(offset)))
            .collect();
        assert_eq!(
            thirds,
            vec![GridPosition::RightThird, GridPosition::CenterThird, GridPosition::RightThird]
        );

        let other = WindowIdentity::new("Code", "lib.rs", 100);
        let start = t0() + ms(10_000);
        assert_eq!(
            history.record_action(GridPosition::RightTwoThirds, &other, start),
            GridPosition::RightTwoThirds
        );
        assert_eq!(
            history.record_action(GridPosition::RightTwoThirds, &other, start + ms(100)),
            GridPosition::RightTwoThirds
        );
        assert_eq!(
            history.record_action(GridPosition::RightTwoThirds, &other, start + ms(200)),
            GridPosition::RightHalf
        );
    }

    #[test]
    fn top_half_cycles_through_maximize() {
        let mut history = WindowActionHistory::default();
        let id = window();

        assert_eq!(history.record_action(GridPosition::TopHalf, &id, t0()), GridPosition::TopHalf);
        assert_eq!(
            history.record_action(GridPosition::TopHalf, &id, t0() + ms(500)),
            GridPosition::Maximize
        );
    }

    #[test]
    fn different_window_starts_over() {
        let mut history = WindowActionHistory::default();
        let other = WindowIdentity::new("Code", "lib.rs", 100);

        history.record_action(GridPosition::LeftHalf, &window(), t0());
        let emitted = history.record_action(GridPosition::LeftHalf, &other, t0() + ms(100));
        assert_eq!(emitted, GridPosition::LeftHalf);
    }

    #[test]
    fn different_group_starts_over() {
        let mut history = WindowActionHistory::default();
        let id = window();

        history.record_action(GridPosition::LeftHalf, &id, t0());
        let emitted = history.record_action(GridPosition::RightHalf, &id, t0() + ms(100));
        assert_eq!(emitted, GridPosition::RightHalf);
        let again = history.record_action(GridPosition::RightHalf, &id, t0() + ms(200));
        assert_eq!(again, GridPosition::RightTwoThirds);
    }

    #[test]
    fn corners_never_advance() {
        let mut history = WindowActionHistory::default();
        let id = window();

        for i in 0..3 {
            let emitted = history.record_action(GridPosition::TopLeft, &id, t0() + ms(i * 100));
            assert_eq!(emitted, GridPosition::TopLeft);
        }
        let other_corner = history.record_action(GridPosition::BottomRight, &id, t0() + ms(400));
        assert_eq!(other_corner, GridPosition::BottomRight);
        assert_eq!(
            history.record_action(GridPosition::Maximize, &id, t0() + ms(500)),
            GridPosition::Maximize
        );
    }

    #[test]
    fn disabled_cycling_always_emits_request() {
        let mut history = WindowActionHistory::default().with_cycling(false);
        let id = window();

        history.record_action(GridPosition::LeftHalf, &id, t0());
        let emitted = history.record_action(GridPosition::LeftHalf, &id, t0() + ms(100));
        assert_eq!(emitted, GridPosition::LeftHalf);
        assert!(matches!(history.cycle_state(), CycleState::Cycling { .. }));
    }

    #[test]
    fn undo_redo_sequence() {
        let mut history = WindowActionHistory::default();
        let id = window();

        history.record_before_action("A", id.clone(), rect(1.0), t0());
        history.record_before_action("B", id.clone(), rect(2.0), t0() + ms(10));
        history.record_before_action("C", id.clone(), rect(3.0), t0() + ms(20));

        assert_eq!(history.undo(Some(&id)).unwrap().action, "C");
        assert_eq!(history.undo(Some(&id)).unwrap().action, "B");
        assert_eq!(history.redo(Some(&id)).unwrap().action, "B");

        history.record_before_action("D", id.clone(), rect(4.0), t0() + ms(30));
        assert!(history.redo(Some(&id)).is_none());
        assert!(!history.can_redo());
    }

    #[test]
    fn undo_for_unfocused_window_skips_redo() {
        let mut history = WindowActionHistory::default();
        let id = window();
        let other = WindowIdentity::new("Mail", "Inbox", 7);

        history.record_before_action("A", id.clone(), rect(1.0), t0());
        let undone = history.undo(Some(&other)).unwrap();
        assert_eq!(undone.action, "A");
        assert_eq!(history.redo_len(), 0);

        history.record_before_action("B", id, rect(2.0), t0());
        history.undo(None);
        assert_eq!(history.redo_len(), 0);
    }

    #[test]
    fn empty_stacks_return_none() {
        let mut history = WindowActionHistory::default();
        assert!(history.undo(Some(&window())).is_none());
        assert!(history.redo(Some(&window())).is_none());
    }

    #[test]
    fn capacity_evicts_oldest_first() {
        let mut history = WindowActionHistory::default();
        let id = window();

        for i in 0..60 {
            history.record_before_action(format!("action-{i}"), id.clone(), rect(i as f64), t0());
        }

        assert_eq!(history.undo_len(), 50);
        let oldest = history.undo_entries().next().unwrap();
        assert_eq!(oldest.action, "action-10");
        assert_eq!(history.peek_undo().unwrap().action, "action-59");
    }

    #[test]
    fn applied_frame_is_kept_for_redo() {
        let mut history = WindowActionHistory::default();
        let id = window();

        history.record_applied_action("leftHalf", id.clone(), rect(5.0), rect(0.0), t0());
        let undone = history.undo(Some(&id)).unwrap();
        assert_eq!(undone.rect, rect(5.0));
        let redone = history.redo(Some(&id)).unwrap();
        assert_eq!(redone.applied, Some(rect(0.0)));
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn clear_resets_everything() {
        let mut history = WindowActionHistory::new(3);
        let id = window();
        history.record_action(GridPosition::Center, &id, t0());
        history.record_before_action("A", id, rect(0.0), t0());

        history.clear();
        assert_eq!(history.cycle_state(), &CycleState::Idle);
        assert!(!history.can_undo());
        assert_eq!(history.capacity(), 3);
    }
}
