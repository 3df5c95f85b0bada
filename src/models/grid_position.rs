use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Named screen-relative placement a window can be snapped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GridPosition {
    LeftHalf,
    RightHalf,
    TopHalf,
    BottomHalf,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    LeftThird,
    CenterThird,
    RightThird,
    LeftTwoThirds,
    RightTwoThirds,
    Maximize,
    Center,
}

/// Set of positions a repeated shortcut press advances through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CycleGroup {
    LeftSide,
    RightSide,
    Thirds,
    TopSide,
    BottomSide,
    /// The four corners never advance
    Corners,
    Center,
    /// Positions that never advance (maximize)
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown grid position: {0}")]
pub struct UnknownGridPosition(pub String);

impl GridPosition {
    pub const ALL: [GridPosition; 15] = [
        GridPosition::LeftHalf,
        GridPosition::RightHalf,
        GridPosition::TopHalf,
        GridPosition::BottomHalf,
        GridPosition::TopLeft,
        GridPosition::TopRight,
        GridPosition::BottomLeft,
        GridPosition::BottomRight,
        GridPosition::LeftThird,
        GridPosition::CenterThird,
        GridPosition::RightThird,
        GridPosition::LeftTwoThirds,
        GridPosition::RightTwoThirds,
        GridPosition::Maximize,
        GridPosition::Center,
    ];

    /// Identifier used in persisted records and settings
    pub fn as_str(self) -> &'static str {
        match self {
            GridPosition::LeftHalf => "leftHalf",
            GridPosition::RightHalf => "rightHalf",
            GridPosition::TopHalf => "topHalf",
            GridPosition::BottomHalf => "bottomHalf",
            GridPosition::TopLeft => "topLeft",
            GridPosition::TopRight => "topRight",
            GridPosition::BottomLeft => "bottomLeft",
            GridPosition::BottomRight => "bottomRight",
            GridPosition::LeftThird => "leftThird",
            GridPosition::CenterThird => "centerThird",
            GridPosition::RightThird => "rightThird",
            GridPosition::LeftTwoThirds => "leftTwoThirds",
            GridPosition::RightTwoThirds => "rightTwoThirds",
            GridPosition::Maximize => "maximize",
            GridPosition::Center => "center",
        }
    }

    /// Label shown in menus and logs
    pub fn display_name(self) -> &'static str {
        match self {
            GridPosition::LeftHalf => "Left Half",
            GridPosition::RightHalf => "Right Half",
            GridPosition::TopHalf => "Top Half",
            GridPosition::BottomHalf => "Bottom Half",
            GridPosition::TopLeft => "Top Left",
            GridPosition::TopRight => "Top Right",
            GridPosition::BottomLeft => "Bottom Left",
            GridPosition::BottomRight => "Bottom Right",
            GridPosition::LeftThird => "Left Third",
            GridPosition::CenterThird => "Center Third",
            GridPosition::RightThird => "Right Third",
            GridPosition::LeftTwoThirds => "Left Two Thirds",
            GridPosition::RightTwoThirds => "Right Two Thirds",
            GridPosition::Maximize => "Maximize",
            GridPosition::Center => "Center",
        }
    }

    pub fn cycle_group(self) -> CycleGroup {
        match self {
            GridPosition::LeftHalf | GridPosition::LeftTwoThirds => CycleGroup::LeftSide,
            GridPosition::RightHalf | GridPosition::RightTwoThirds => CycleGroup::RightSide,
            GridPosition::LeftThird | GridPosition::CenterThird | GridPosition::RightThird => {
                CycleGroup::Thirds
            }
            GridPosition::TopHalf => CycleGroup::TopSide,
            GridPosition::BottomHalf => CycleGroup::BottomSide,
            GridPosition::TopLeft
            | GridPosition::TopRight
            | GridPosition::BottomLeft
            | GridPosition::BottomRight => CycleGroup::Corners,
            GridPosition::Center => CycleGroup::Center,
            GridPosition::Maximize => CycleGroup::None,
        }
    }

    /// Ordered positions of `self`'s cycle group; a repeated press emits
    /// the entry at the repeat count.
    ///
    /// Corners and maximize yield a single-element sequence so repeated
    /// presses re-emit the same position.
    pub fn cycle_sequence(self) -> &'static [GridPosition] {
        match self {
            GridPosition::TopLeft => &[GridPosition::TopLeft],
            GridPosition::TopRight => &[GridPosition::TopRight],
            GridPosition::BottomLeft => &[GridPosition::BottomLeft],
            GridPosition::BottomRight => &[GridPosition::BottomRight],
            GridPosition::Maximize => &[GridPosition::Maximize],
            other => other.cycle_group().sequence(),
        }
    }
}

impl CycleGroup {
    /// Positions of the group in cycling order. Corners has no shared
    /// sequence; use `GridPosition::cycle_sequence` for a specific corner.
    pub fn sequence(self) -> &'static [GridPosition] {
        match self {
            CycleGroup::LeftSide => &[GridPosition::LeftHalf, GridPosition::LeftTwoThirds],
            CycleGroup::RightSide => &[GridPosition::RightHalf, GridPosition::RightTwoThirds],
            CycleGroup::Thirds => &[
                GridPosition::LeftThird,
                GridPosition::CenterThird,
                GridPosition::RightThird,
            ],
            CycleGroup::TopSide => &[GridPosition::TopHalf, GridPosition::Maximize],
            CycleGroup::BottomSide => &[GridPosition::BottomHalf, GridPosition::Maximize],
            CycleGroup::Corners => &[],
            CycleGroup::Center => &[GridPosition::Center, GridPosition::Maximize],
            CycleGroup::None => &[GridPosition::Maximize],
        }
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GridPosition {
    type Err = UnknownGridPosition;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        GridPosition::ALL
            .iter()
            .copied()
            .find(|position| {
                position.as_str().eq_ignore_ascii_case(wanted)
                    || position.display_name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| UnknownGridPosition(s.to_string()))
    }
}
