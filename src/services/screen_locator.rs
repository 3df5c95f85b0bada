//! Picks the display a window belongs to.
//!
//! Everything here works in screen space; callers convert accessibility frames
//! first.

use crate::macos::core_graphics::ScreenInfo;
use crate::models::geometry::{Point, Rect};

/// Index of the screen owning `window`.
///
/// The screen containing the window's center wins; failing that, the screen
/// with the largest intersection (first in list order on ties); failing that,
/// `primary`. Returns `None` only for an empty screen list.
pub fn screen_index_for_rect(window: Rect, screens: &[Rect], primary: usize) -> Option<usize> {
    if screens.is_empty() {
        return None;
    }

    let center = window.center();
    if let Some(index) = screen_index_for_point(center, screens) {
        return Some(index);
    }

    let mut best: Option<(usize, f64)> = None;
    for (index, screen) in screens.iter().enumerate() {
        let area = screen.intersection_area(&window);
        if area > 0.0 && best.map_or(true, |(_, best_area)| area > best_area) {
            best = Some((index, area));
        }
    }

    match best {
        Some((index, _)) => Some(index),
        None => Some(primary.min(screens.len() - 1)),
    }
}

/// Index of the screen containing `point`, if any
pub fn screen_index_for_point(point: Point, screens: &[Rect]) -> Option<usize> {
    screens.iter().position(|screen| screen.contains_point(point))
}

/// Index of the primary display: the one flagged primary, else the one whose
/// frame starts at the origin, else the first
pub fn primary_index(screens: &[ScreenInfo]) -> Option<usize> {
    if screens.is_empty() {
        return None;
    }

    screens
        .iter()
        .position(|screen| screen.is_primary)
        .or_else(|| {
            screens
                .iter()
                .position(|screen| screen.frame.origin == Point::new(0.0, 0.0))
        })
        .or(Some(0))
}

pub fn primary_screen(screens: &[ScreenInfo]) -> Option<&ScreenInfo> {
    primary_index(screens).map(|index| &screens[index])
}

/// Screen owning a screen-space window frame
pub fn screen_for_window(window: Rect, screens: &[ScreenInfo]) -> Option<&ScreenInfo> {
    let primary = primary_index(screens)?;
    let frames: Vec<Rect> = screens.iter().map(|screen| screen.frame).collect();
    screen_index_for_rect(window, &frames, primary).map(|index| &screens[index])
}

/// Screen following `current` in left-to-right, then bottom-to-top order,
/// wrapping around
pub fn next_screen<'a>(current: &ScreenInfo, screens: &'a [ScreenInfo]) -> Option<&'a ScreenInfo> {
    let mut ordered: Vec<&ScreenInfo> = screens.iter().collect();
    ordered.sort_by(|a, b| {
        a.frame
            .min_x()
            .total_cmp(&b.frame.min_x())
            .then(a.frame.min_y().total_cmp(&b.frame.min_y()))
    });

    let position = ordered.iter().position(|screen| screen.id == current.id)?;
    ordered.get((position + 1) % ordered.len()).copied()
}
