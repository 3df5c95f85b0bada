//! Conversion between screen space and accessibility space.
//!
//! Screen space has its origin at the bottom-left of the primary display with
//! y growing upward. Accessibility space has its origin at the top-left of the
//! primary display with y growing downward. Both are global across displays,
//! so every conversion flips against the primary screen's frame, never the
//! frame of the display the window happens to sit on.
//!
//! Points and rects flip differently: a rect's origin is its min corner in
//! both spaces, so after flipping the height must be subtracted.

use crate::models::geometry::{Point, Rect};

/// Screen-space point to accessibility space: `y' = primary.max_y - y`
pub fn point_to_accessibility_space(point: Point, primary: Rect) -> Point {
    Point::new(point.x, primary.max_y() - point.y)
}

/// Accessibility-space point to screen space. The flip is its own inverse.
pub fn point_from_accessibility_space(point: Point, primary: Rect) -> Point {
    Point::new(point.x, primary.max_y() - point.y)
}

/// Screen-space rect to accessibility space:
/// `y' = (primary.max_y - rect.y) - rect.height`
pub fn to_accessibility_space(rect: Rect, primary: Rect) -> Rect {
    Rect::from_xywh(
        rect.origin.x,
        (primary.max_y() - rect.origin.y) - rect.size.height,
        rect.size.width,
        rect.size.height,
    )
}

/// Accessibility-space rect to screen space
pub fn from_accessibility_space(rect: Rect, primary: Rect) -> Rect {
    Rect::from_xywh(
        rect.origin.x,
        (primary.max_y() - rect.origin.y) - rect.size.height,
        rect.size.width,
        rect.size.height,
    )
}
