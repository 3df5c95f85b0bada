//! Grid geometry: maps a named grid position onto a screen rectangle.
//!
//! All frames are computed in screen space (origin bottom-left, y up), so the
//! "top" positions sit at `min_y + height / 2`. Frames must be converted with
//! `coordinate_converter` before being handed to the accessibility layer.

use crate::models::geometry::{Rect, FRAME_EPSILON};
use crate::models::grid_position::GridPosition;

/// Largest frame produced by `GridPosition::Center`
pub const CENTER_MAX_WIDTH: f64 = 800.0;
pub const CENTER_MAX_HEIGHT: f64 = 600.0;
/// Fraction of the screen used by `GridPosition::Center` on small displays
pub const CENTER_SCREEN_FRACTION: f64 = 0.8;

/// Target frame for `position` on `screen`. Total and pure.
pub fn calculate_frame(position: GridPosition, screen: Rect) -> Rect {
    let x = screen.min_x();
    let y = screen.min_y();
    let w = screen.size.width;
    let h = screen.size.height;

    let half_w = w / 2.0;
    let half_h = h / 2.0;
    let third = w / 3.0;
    let two_thirds = 2.0 * w / 3.0;

    match position {
        GridPosition::LeftHalf => Rect::from_xywh(x, y, half_w, h),
        GridPosition::RightHalf => Rect::from_xywh(x + half_w, y, w - half_w, h),
        GridPosition::TopHalf => Rect::from_xywh(x, y + half_h, w, h - half_h),
        GridPosition::BottomHalf => Rect::from_xywh(x, y, w, half_h),
        GridPosition::TopLeft => Rect::from_xywh(x, y + half_h, half_w, h - half_h),
        GridPosition::TopRight => Rect::from_xywh(x + half_w, y + half_h, w - half_w, h - half_h),
        GridPosition::BottomLeft => Rect::from_xywh(x, y, half_w, half_h),
        GridPosition::BottomRight => Rect::from_xywh(x + half_w, y, w - half_w, half_h),
        GridPosition::LeftThird => Rect::from_xywh(x, y, third, h),
        GridPosition::CenterThird => Rect::from_xywh(x + third, y, two_thirds - third, h),
        GridPosition::RightThird => Rect::from_xywh(x + two_thirds, y, w - two_thirds, h),
        GridPosition::LeftTwoThirds => Rect::from_xywh(x, y, two_thirds, h),
        GridPosition::RightTwoThirds => Rect::from_xywh(x + third, y, w - third, h),
        GridPosition::Maximize => screen,
        GridPosition::Center => {
            let width = CENTER_MAX_WIDTH.min(w * CENTER_SCREEN_FRACTION);
            let height = CENTER_MAX_HEIGHT.min(h * CENTER_SCREEN_FRACTION);
            Rect::from_xywh(x + (w - width) / 2.0, y + (h - height) / 2.0, width, height)
        }
    }
}

/// Shrink `rect` by `amount` on every edge, keeping it centered.
///
/// Sizes clamp at zero; negative amounts are treated as zero.
pub fn inset(rect: Rect, amount: f64) -> Rect {
    let amount = amount.max(0.0);
    let width = (rect.size.width - 2.0 * amount).max(0.0);
    let height = (rect.size.height - 2.0 * amount).max(0.0);
    Rect::from_xywh(
        rect.mid_x() - width / 2.0,
        rect.mid_y() - height / 2.0,
        width,
        height,
    )
}

/// Round origin and size to the nearest multiple of `unit`
pub fn snap_to_grid(rect: Rect, unit: f64) -> Rect {
    if !unit.is_finite() || unit <= 0.0 {
        return rect;
    }

    let snap = |value: f64| (value / unit).round() * unit;
    Rect::from_xywh(
        snap(rect.origin.x),
        snap(rect.origin.y),
        snap(rect.size.width),
        snap(rect.size.height),
    )
}

/// Frame with `gap / 2` removed from each edge so neighbouring frames are
/// separated by `gap`
pub fn calculate_frame_with_gap(position: GridPosition, screen: Rect, gap: f64) -> Rect {
    let frame = calculate_frame(position, screen);
    if gap <= 0.0 {
        return frame;
    }
    inset(frame, gap / 2.0)
}

/// Grid calculator configured with the user's padding and snapping settings
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GridCalculator {
    pub gap: f64,
    pub snap_unit: f64,
}

impl GridCalculator {
    pub fn new(gap: f64, snap_unit: f64) -> Self {
        Self { gap, snap_unit }
    }

    /// Frame for `position` on `screen` with gap and grid snapping applied.
    ///
    /// `Maximize` ignores the gap; snapping is applied last and never lets
    /// the frame leave the screen.
    pub fn frame_for(&self, position: GridPosition, screen: Rect) -> Rect {
        let frame = match position {
            GridPosition::Maximize => screen,
            other => calculate_frame_with_gap(other, screen, self.gap),
        };

        let snapped = snap_to_grid(frame, self.snap_unit);
        if snapped.is_degenerate() || !screen.contains_rect(&snapped, FRAME_EPSILON) {
            frame
        } else {
            snapped
        }
    }
}
