use crate::{GridSnapError, Result};
use serde::{Deserialize, Serialize};

/// Tolerance used when comparing frames produced by floating point math
pub const FRAME_EPSILON: f64 = 1e-6;

/// Two-dimensional point used for window positioning
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Window or screen size in display points
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Result<Self> {
        if width <= 0.0 || height <= 0.0 {
            return Err(GridSnapError::ValidationError(
                "Frame dimensions must be positive".to_string(),
            )
            .into());
        }

        Ok(Self { width, height })
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Rectangle in either screen space (origin bottom-left, y up) or
/// accessibility space (origin top-left of the primary display, y down).
///
/// The value carries no tag for its space; callers name the space through the
/// conversion functions in `services::coordinate_converter`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    /// Build a rect without validating the size
    pub const fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point { x, y },
            size: Size { width, height },
        }
    }

    pub fn min_x(&self) -> f64 {
        self.origin.x
    }

    pub fn min_y(&self) -> f64 {
        self.origin.y
    }

    pub fn max_x(&self) -> f64 {
        self.origin.x + self.size.width
    }

    pub fn max_y(&self) -> f64 {
        self.origin.y + self.size.height
    }

    pub fn mid_x(&self) -> f64 {
        self.origin.x + self.size.width / 2.0
    }

    pub fn mid_y(&self) -> f64 {
        self.origin.y + self.size.height / 2.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.mid_x(), self.mid_y())
    }

    pub fn area(&self) -> f64 {
        self.size.area()
    }

    /// True when either dimension is zero or negative
    pub fn is_degenerate(&self) -> bool {
        self.size.width <= 0.0 || self.size.height <= 0.0
    }

    /// Half-open containment: the max edges belong to the neighbouring rect
    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x < self.max_x()
            && point.y >= self.min_y()
            && point.y < self.max_y()
    }

    /// Whether `other` lies entirely within this rect, allowing `tolerance`
    /// on every edge
    pub fn contains_rect(&self, other: &Rect, tolerance: f64) -> bool {
        other.min_x() >= self.min_x() - tolerance
            && other.min_y() >= self.min_y() - tolerance
            && other.max_x() <= self.max_x() + tolerance
            && other.max_y() <= self.max_y() + tolerance
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x1 = self.min_x().max(other.min_x());
        let y1 = self.min_y().max(other.min_y());
        let x2 = self.max_x().min(other.max_x());
        let y2 = self.max_y().min(other.max_y());

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        Some(Rect::from_xywh(x1, y1, x2 - x1, y2 - y1))
    }

    pub fn intersection_area(&self, other: &Rect) -> f64 {
        self.intersection(other).map_or(0.0, |rect| rect.area())
    }

    pub fn approx_eq(&self, other: &Rect, tolerance: f64) -> bool {
        (self.origin.x - other.origin.x).abs() <= tolerance
            && (self.origin.y - other.origin.y).abs() <= tolerance
            && (self.size.width - other.size.width).abs() <= tolerance
            && (self.size.height - other.size.height).abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_validation_rejects_non_positive() {
        assert!(Size::new(0.0, 10.0).is_err());
        assert!(Size::new(10.0, -1.0).is_err());
        assert!(Size::new(10.0, 10.0).is_ok());
    }

    #[test]
    fn intersection_of_overlapping_rects() {
        let a = Rect::from_xywh(0.0, 0.0, 100.0, 100.0);
        let b = Rect::from_xywh(50.0, 25.0, 100.0, 100.0);

        let overlap = a.intersection(&b).unwrap();
        assert_eq!(overlap, Rect::from_xywh(50.0, 25.0, 50.0, 75.0));
        assert_eq!(a.intersection_area(&b), 3750.0);
    }

    #[test]
    fn touching_rects_do_not_intersect() {
        let a = Rect::from_xywh(0.0, 0.0, 100.0, 100.0);
        let b = Rect::from_xywh(100.0, 0.0, 100.0, 100.0);
        assert!(a.intersection(&b).is_none());
        assert_eq!(a.intersection_area(&b), 0.0);
    }

    #[test]
    fn contains_point_is_half_open() {
        let rect = Rect::from_xywh(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains_point(Point::new(0.0, 0.0)));
        assert!(!rect.contains_point(Point::new(10.0, 5.0)));
    }

    #[test]
    fn rect_serializes_as_nested_json() {
        let rect = Rect::from_xywh(1.0, 2.0, 3.0, 4.0);
        let json = serde_json::to_value(rect).unwrap();
        assert_eq!(json["origin"]["x"], 1.0);
        assert_eq!(json["size"]["height"], 4.0);
    }
}
