use crate::models::geometry::Rect;
use crate::models::shortcut::Shortcut;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// User-defined placement stored as fractions of a screen's visible frame so
/// the same position works on displays of any size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPosition {
    pub id: Uuid,
    pub name: String,
    /// Fraction of the visible frame width from its left edge
    pub x: f64,
    /// Fraction of the visible frame height from its bottom edge
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<Shortcut>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CustomPositionError {
    #[error("Custom position name cannot be empty")]
    EmptyName,
    #[error("Fraction {field}={value} must lie within 0..=1")]
    FractionOutOfRange { field: &'static str, value: f64 },
    #[error("Custom position must have a non-zero width and height")]
    ZeroSize,
    #[error("Custom position extends past the screen edge")]
    Overflow,
}

impl CustomPosition {
    /// Create a new custom position with validation
    pub fn new(
        name: impl Into<String>,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        shortcut: Option<Shortcut>,
    ) -> Result<Self, CustomPositionError> {
        let position = CustomPosition {
            id: Uuid::new_v4(),
            name: name.into(),
            x,
            y,
            width,
            height,
            shortcut,
            created_at: Utc::now(),
            last_used: None,
        };

        position.validate()?;
        Ok(position)
    }

    /// Capture a window frame as fractions of `screen`. Only the part of
    /// the frame on the screen is kept.
    pub fn from_frame(
        name: impl Into<String>,
        frame: Rect,
        screen: Rect,
    ) -> Result<Self, CustomPositionError> {
        if screen.is_degenerate() {
            return Err(CustomPositionError::ZeroSize);
        }
        let visible = frame
            .intersection(&screen)
            .ok_or(CustomPositionError::ZeroSize)?;

        let x = ((visible.min_x() - screen.min_x()) / screen.size.width).clamp(0.0, 1.0);
        let y = ((visible.min_y() - screen.min_y()) / screen.size.height).clamp(0.0, 1.0);
        let width = (visible.size.width / screen.size.width).clamp(0.0, 1.0 - x);
        let height = (visible.size.height / screen.size.height).clamp(0.0, 1.0 - y);
        Self::new(name, x, y, width, height, None)
    }

    pub fn validate(&self) -> Result<(), CustomPositionError> {
        if self.name.trim().is_empty() {
            return Err(CustomPositionError::EmptyName);
        }

        for (field, value) in [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CustomPositionError::FractionOutOfRange { field, value });
            }
        }

        if self.width == 0.0 || self.height == 0.0 {
            return Err(CustomPositionError::ZeroSize);
        }

        if self.x + self.width > 1.0 + 1e-9 || self.y + self.height > 1.0 + 1e-9 {
            return Err(CustomPositionError::Overflow);
        }

        Ok(())
    }

    /// Resolve the fractional placement on a screen-space frame
    pub fn frame_on(&self, screen: Rect) -> Rect {
        Rect::from_xywh(
            screen.min_x() + self.x * screen.size.width,
            screen.min_y() + self.y * screen.size.height,
            self.width * screen.size.width,
            self.height * screen.size.height,
        )
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

    pub fn with_shortcut(self, shortcut: Option<Shortcut>) -> Self {
        Self { shortcut, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_fractions() {
        let error = CustomPosition::new("Wide", 0.0, 0.0, 1.2, 0.5, None).unwrap_err();
        assert_eq!(
            error,
            CustomPositionError::FractionOutOfRange {
                field: "width",
                value: 1.2
            }
        );
        assert_eq!(
            CustomPosition::new("Off", 0.6, 0.0, 0.5, 0.5, None).unwrap_err(),
            CustomPositionError::Overflow
        );
        assert_eq!(
            CustomPosition::new(" ", 0.0, 0.0, 0.5, 0.5, None).unwrap_err(),
            CustomPositionError::EmptyName
        );
    }

    #[test]
    fn frame_on_scales_to_screen() {
        let position = CustomPosition::new("Reading", 0.25, 0.0, 0.5, 1.0, None).unwrap();
        let frame = position.frame_on(Rect::from_xywh(100.0, 50.0, 2000.0, 1000.0));
        assert_eq!(frame, Rect::from_xywh(600.0, 50.0, 1000.0, 1000.0));
    }

    #[test]
    fn from_frame_inverts_frame_on() {
        let screen = Rect::from_xywh(0.0, 0.0, 1600.0, 900.0);
        let frame = Rect::from_xywh(400.0, 225.0, 800.0, 450.0);
        let position = CustomPosition::from_frame("Middle", frame, screen).unwrap();
        assert!(position.frame_on(screen).approx_eq(&frame, 1e-9));
    }

    #[test]
    fn from_frame_keeps_only_the_on_screen_part() {
        let screen = Rect::from_xywh(0.0, 0.0, 1440.0, 900.0);
        let straddling = Rect::from_xywh(1000.0, 100.0, 800.0, 600.0);

        let position = CustomPosition::from_frame("Edge", straddling, screen).unwrap();
        assert!(position.x + position.width <= 1.0);
        assert!(position
            .frame_on(screen)
            .approx_eq(&Rect::from_xywh(1000.0, 100.0, 440.0, 600.0), 1e-9));

        let off_screen = Rect::from_xywh(2000.0, 100.0, 400.0, 300.0);
        assert_eq!(
            CustomPosition::from_frame("Gone", off_screen, screen).unwrap_err(),
            CustomPositionError::ZeroSize
        );
    }

    #[test]
    fn with_last_used_keeps_other_fields() {
        let position = CustomPosition::new("Side", 0.0, 0.0, 0.3, 1.0, None).unwrap();
        let now = Utc::now();
        let used = position.clone().with_last_used(now);
        assert_eq!(used.last_used, Some(now));
        assert_eq!(used.id, position.id);
        assert_eq!(used.name, position.name);
    }
}
