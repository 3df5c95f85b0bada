//! macOS integration layer for GridSnap
//!
//! Safe, testable wrappers over the Accessibility API, AppKit's screen
//! enumeration and Quartz event taps. Every system-backed provider has an in-memory counterpart so
//! the window services can run without a window server.

pub mod accessibility;
pub mod core_graphics;
pub mod hotkeys;
pub mod permissions;

pub use accessibility::*;
pub use core_graphics::*;
pub use hotkeys::{shortcut_from_event, spawn_listener};
pub use permissions::*;
