use crate::models::geometry::Rect;
use crate::{GridSnapError, Result};
use std::sync::{PoisonError, RwLock};

/// A display as reported by AppKit, in screen space
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenInfo {
    pub id: String,
    pub name: String,
    /// Full display bounds
    pub frame: Rect,
    /// Bounds minus menu bar and Dock
    pub visible_frame: Rect,
    pub scale_factor: f64,
    pub is_primary: bool,
}

impl ScreenInfo {
    pub fn new(id: impl Into<String>, frame: Rect) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            frame,
            visible_frame: frame,
            scale_factor: 1.0,
            is_primary: false,
        }
    }

    pub fn primary(id: impl Into<String>, frame: Rect) -> Self {
        Self {
            name: "Primary".to_string(),
            is_primary: true,
            ..Self::new(id, frame)
        }
    }

    pub fn with_visible_frame(mut self, visible_frame: Rect) -> Self {
        self.visible_frame = visible_frame;
        self
    }

    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Area windows are laid out in
    pub fn layout_frame(&self, respect_visible_frame: bool) -> Rect {
        if respect_visible_frame && !self.visible_frame.is_degenerate() {
            self.visible_frame
        } else {
            self.frame
        }
    }
}

/// Abstraction over display enumeration
pub trait DisplayProvider: Send + Sync {
    /// Snapshot all screens currently attached
    fn list_screens(&self) -> Result<Vec<ScreenInfo>>;

    /// Query a screen by identifier
    fn get_screen(&self, id: &str) -> Result<Option<ScreenInfo>> {
        Ok(self
            .list_screens()?
            .into_iter()
            .find(|screen| screen.id == id))
    }
}

/// Display provider backed by `NSScreen`
#[derive(Debug, Default)]
pub struct SystemDisplayProvider;

impl SystemDisplayProvider {
    pub fn new() -> Self {
        Self
    }
}

impl DisplayProvider for SystemDisplayProvider {
    #[cfg(target_os = "macos")]
    fn list_screens(&self) -> Result<Vec<ScreenInfo>> {
        let screens = platform::ns_screens();
        if !screens.is_empty() {
            return Ok(screens);
        }

        tracing::debug!("NSScreen returned no displays, falling back to CGDisplay");
        platform::cg_displays()
    }

    #[cfg(not(target_os = "macos"))]
    fn list_screens(&self) -> Result<Vec<ScreenInfo>> {
        Err(GridSnapError::MacOSAPIError(
            "SystemDisplayProvider is not available on this platform".into(),
        )
        .into())
    }
}

/// In-memory display provider for tests and headless runs
#[derive(Debug, Default)]
pub struct InMemoryDisplayProvider {
    screens: RwLock<Vec<ScreenInfo>>,
}

impl InMemoryDisplayProvider {
    pub fn new_with(screens: Vec<ScreenInfo>) -> Self {
        Self {
            screens: RwLock::new(screens),
        }
    }

    /// Replace the attached displays, e.g. to simulate unplugging a monitor
    pub fn set_screens(&self, screens: Vec<ScreenInfo>) {
        *self.screens.write().unwrap_or_else(PoisonError::into_inner) = screens;
    }
}

impl DisplayProvider for InMemoryDisplayProvider {
    fn list_screens(&self) -> Result<Vec<ScreenInfo>> {
        let screens = self
            .screens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if screens.is_empty() {
            return Err(GridSnapError::ScreenNotFound("no displays attached".into()).into());
        }
        Ok(screens)
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use super::ScreenInfo;
    use crate::models::geometry::Rect;
    use crate::{GridSnapError, Result};
    use cocoa::base::{id, nil};
    use cocoa::foundation::{NSAutoreleasePool, NSRect, NSString};
    use core_graphics::display::CGDisplay;
    use objc::runtime::Class;
    use objc::{msg_send, sel, sel_impl};
    use std::ffi::CStr;
    use std::os::raw::c_char;

    fn to_rect(rect: NSRect) -> Rect {
        Rect::from_xywh(rect.origin.x, rect.origin.y, rect.size.width, rect.size.height)
    }

    unsafe fn to_string(string: id) -> Option<String> {
        if string == nil {
            return None;
        }
        let utf8: *const c_char = msg_send![string, UTF8String];
        (!utf8.is_null()).then(|| CStr::from_ptr(utf8).to_string_lossy().into_owned())
    }

    /// Screens in `NSScreen.screens` order; the first one carries the menu
    /// bar and anchors the global coordinate space.
    pub fn ns_screens() -> Vec<ScreenInfo> {
        let mut result = Vec::new();
        let Some(class) = Class::get("NSScreen") else {
            return result;
        };

        unsafe {
            let pool = NSAutoreleasePool::new(nil);
            let screens: id = msg_send![class, screens];
            let count: usize = if screens == nil { 0 } else { msg_send![screens, count] };
            let number_key = NSString::alloc(nil).init_str("NSScreenNumber");

            for index in 0..count {
                let screen: id = msg_send![screens, objectAtIndex: index];
                let frame: NSRect = msg_send![screen, frame];
                let visible: NSRect = msg_send![screen, visibleFrame];
                let scale: f64 = msg_send![screen, backingScaleFactor];

                let description: id = msg_send![screen, deviceDescription];
                let number: id = msg_send![description, objectForKey: number_key];
                let display_id: u32 = if number == nil {
                    index as u32
                } else {
                    msg_send![number, unsignedIntValue]
                };

                let responds: bool = msg_send![screen, respondsToSelector: sel!(localizedName)];
                let name = if responds {
                    let name: id = msg_send![screen, localizedName];
                    to_string(name)
                } else {
                    None
                };

                result.push(ScreenInfo {
                    id: display_id.to_string(),
                    name: name.unwrap_or_else(|| format!("Display {display_id}")),
                    frame: to_rect(frame),
                    visible_frame: to_rect(visible),
                    scale_factor: scale,
                    is_primary: index == 0,
                });
            }

            let _: () = msg_send![number_key, release];
            pool.drain();
        }

        result
    }

    /// Core Graphics reports bounds with a top-left origin; flip them into
    /// screen space against the main display.
    pub fn cg_displays() -> Result<Vec<ScreenInfo>> {
        let ids = CGDisplay::active_displays().map_err(|error| {
            GridSnapError::MacOSAPIError(format!("CGGetActiveDisplayList failed: {error}"))
        })?;

        let main_height = CGDisplay::main().bounds().size.height;
        Ok(ids
            .into_iter()
            .map(|display_id| {
                let display = CGDisplay::new(display_id);
                let bounds = display.bounds();
                let frame = Rect::from_xywh(
                    bounds.origin.x,
                    main_height - bounds.origin.y - bounds.size.height,
                    bounds.size.width,
                    bounds.size.height,
                );
                let scale = display
                    .display_mode()
                    .map(|mode| mode.pixel_width() as f64 / mode.width().max(1) as f64)
                    .unwrap_or(1.0);

                ScreenInfo {
                    id: display_id.to_string(),
                    name: format!("Display {display_id}"),
                    frame,
                    visible_frame: frame,
                    scale_factor: scale,
                    is_primary: display.is_main(),
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_frame_prefers_visible_frame() {
        let frame = Rect::from_xywh(0.0, 0.0, 1440.0, 900.0);
        let visible = Rect::from_xywh(0.0, 70.0, 1440.0, 805.0);
        let screen = ScreenInfo::primary("main", frame).with_visible_frame(visible);

        assert_eq!(screen.layout_frame(true), visible);
        assert_eq!(screen.layout_frame(false), frame);
    }

    #[test]
    fn in_memory_provider_keeps_order_and_lookup() {
        let provider = InMemoryDisplayProvider::new_with(vec![
            ScreenInfo::primary("a", Rect::from_xywh(0.0, 0.0, 1440.0, 900.0)),
            ScreenInfo::new("b", Rect::from_xywh(1440.0, 0.0, 1920.0, 1080.0))
                .with_scale_factor(2.0),
        ]);

        let screens = provider.list_screens().unwrap();
        assert_eq!(screens[0].id, "a");
        assert_eq!(screens[1].id, "b");
        assert_eq!(provider.get_screen("b").unwrap().unwrap().scale_factor, 2.0);
        assert!(provider.get_screen("c").unwrap().is_none());
    }

    #[test]
    fn empty_provider_reports_missing_screens() {
        let provider = InMemoryDisplayProvider::default();
        let error = provider.list_screens().unwrap_err();
        assert!(matches!(
            error.downcast_ref::<GridSnapError>(),
            Some(GridSnapError::ScreenNotFound(_))
        ));
    }
}
