//! Core services for GridSnap

pub mod action_history;
pub mod coordinate_converter;
pub mod grid_calculator;
pub mod keyboard_handler;
pub mod layout_manager;
pub mod screen_locator;
pub mod snap_orchestrator;
pub mod window_manager;

pub use action_history::{CycleState, WindowActionHistory};
pub use grid_calculator::GridCalculator;
pub use keyboard_handler::*;
pub use layout_manager::*;
pub use snap_orchestrator::*;
pub use window_manager::*;
