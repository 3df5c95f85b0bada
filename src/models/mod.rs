//! Data models for GridSnap

pub mod app_rule;
pub mod custom_position;
pub mod geometry;
pub mod grid_position;
pub mod shortcut;
pub mod window_layout;
pub mod window_state;

pub use app_rule::*;
pub use custom_position::*;
pub use geometry::*;
pub use grid_position::*;
pub use shortcut::*;
pub use window_layout::*;
pub use window_state::*;
