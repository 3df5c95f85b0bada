use crate::macos::permissions;
use crate::models::geometry::Rect;
use crate::models::window_state::WindowIdentity;
use crate::{GridSnapError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Accessibility-derived window metadata used by higher level services
#[derive(Debug, Clone, PartialEq)]
pub struct AXWindow {
    pub window_id: u32,
    pub pid: i32,
    pub title: String,
    pub application_name: String,
    pub bundle_id: String,
    /// Frame in accessibility space
    pub frame: Rect,
    pub is_minimized: bool,
    pub is_focused: bool,
}

impl AXWindow {
    pub fn new(
        window_id: u32,
        pid: i32,
        title: impl Into<String>,
        application_name: impl Into<String>,
        frame: Rect,
    ) -> Self {
        Self {
            window_id,
            pid,
            title: title.into(),
            application_name: application_name.into(),
            bundle_id: String::new(),
            frame,
            is_minimized: false,
            is_focused: false,
        }
    }

    pub fn with_bundle_id(mut self, bundle_id: impl Into<String>) -> Self {
        self.bundle_id = bundle_id.into();
        self
    }

    pub fn focused(mut self, is_focused: bool) -> Self {
        self.is_focused = is_focused;
        self
    }

    pub fn minimized(mut self, is_minimized: bool) -> Self {
        self.is_minimized = is_minimized;
        self
    }

    pub fn identity(&self) -> WindowIdentity {
        WindowIdentity::new(&self.application_name, &self.title, self.pid)
    }
}

/// Tracks accessibility permission state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Unknown,
    Granted,
    Denied,
}

/// Abstraction for interacting with macOS Accessibility APIs
pub trait AccessibilityProvider: Send + Sync {
    /// Ensure accessibility permissions are granted
    fn ensure_permissions(&self) -> Result<()>;

    /// Retrieve permission status without prompting the user
    fn permission_status(&self) -> PermissionStatus;

    /// Snapshot all available windows
    fn list_windows(&self, include_minimized: bool) -> Result<Vec<AXWindow>>;

    /// The window that currently has keyboard focus, if any
    fn focused_window(&self) -> Result<Option<AXWindow>>;

    /// Retrieve a single window by ID
    fn get_window(&self, window_id: u32) -> Result<Option<AXWindow>>;

    /// Focus the specified window
    fn focus_window(&self, window_id: u32) -> Result<()>;

    /// Move / resize a window to a frame given in accessibility space
    fn set_window_frame(&self, window_id: u32, frame: Rect) -> Result<()>;
}

/// Provider backed by the real Accessibility API
#[derive(Debug, Default)]
pub struct SystemAccessibilityProvider {
    #[cfg(target_os = "macos")]
    elements: std::sync::Mutex<HashMap<u32, platform::AxElement>>,
}

impl SystemAccessibilityProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

fn status_from_flag(granted: bool) -> PermissionStatus {
    if granted {
        PermissionStatus::Granted
    } else {
        PermissionStatus::Denied
    }
}

#[cfg(target_os = "macos")]
impl AccessibilityProvider for SystemAccessibilityProvider {
    fn ensure_permissions(&self) -> Result<()> {
        match self.permission_status() {
            PermissionStatus::Granted => Ok(()),
            PermissionStatus::Unknown | PermissionStatus::Denied => {
                Err(GridSnapError::PermissionDenied(
                    "Accessibility permission is required for window management".into(),
                )
                .into())
            }
        }
    }

    fn permission_status(&self) -> PermissionStatus {
        permissions::is_accessibility_permission_granted()
            .map(status_from_flag)
            .unwrap_or(PermissionStatus::Unknown)
    }

    fn list_windows(&self, include_minimized: bool) -> Result<Vec<AXWindow>> {
        self.ensure_permissions()?;
        let focused = platform::focused_window_element();
        let mut elements = self.elements.lock().unwrap_or_else(PoisonError::into_inner);
        elements.clear();

        let mut windows = Vec::new();
        for (mut window, element) in platform::enumerate_windows() {
            if let Some(focused) = focused.as_ref() {
                window.is_focused = element.same_as(focused);
            }
            if include_minimized || !window.is_minimized {
                windows.push(window.clone());
            }
            elements.insert(window.window_id, element);
        }

        windows.sort_by_key(|window| window.window_id);
        Ok(windows)
    }

    fn focused_window(&self) -> Result<Option<AXWindow>> {
        Ok(self
            .list_windows(false)?
            .into_iter()
            .find(|window| window.is_focused))
    }

    fn get_window(&self, window_id: u32) -> Result<Option<AXWindow>> {
        Ok(self
            .list_windows(true)?
            .into_iter()
            .find(|window| window.window_id == window_id))
    }

    fn focus_window(&self, window_id: u32) -> Result<()> {
        let elements = self.elements.lock().unwrap_or_else(PoisonError::into_inner);
        let element = elements
            .get(&window_id)
            .ok_or(GridSnapError::WindowNotFound(window_id))?;
        element.raise()
    }

    fn set_window_frame(&self, window_id: u32, frame: Rect) -> Result<()> {
        let elements = self.elements.lock().unwrap_or_else(PoisonError::into_inner);
        let element = elements
            .get(&window_id)
            .ok_or(GridSnapError::WindowNotFound(window_id))?;
        element.set_frame(frame)
    }
}

#[cfg(not(target_os = "macos"))]
impl AccessibilityProvider for SystemAccessibilityProvider {
    fn ensure_permissions(&self) -> Result<()> {
        match self.permission_status() {
            PermissionStatus::Granted => Ok(()),
            PermissionStatus::Unknown | PermissionStatus::Denied => {
                Err(GridSnapError::PermissionDenied(
                    "Accessibility permission is required for window management".into(),
                )
                .into())
            }
        }
    }

    fn permission_status(&self) -> PermissionStatus {
        permissions::is_accessibility_permission_granted()
            .map(status_from_flag)
            .unwrap_or(PermissionStatus::Unknown)
    }

    fn list_windows(&self, _include_minimized: bool) -> Result<Vec<AXWindow>> {
        Err(unsupported())
    }

    fn focused_window(&self) -> Result<Option<AXWindow>> {
        Err(unsupported())
    }

    fn get_window(&self, _window_id: u32) -> Result<Option<AXWindow>> {
        Err(unsupported())
    }

    fn focus_window(&self, _window_id: u32) -> Result<()> {
        Err(unsupported())
    }

    fn set_window_frame(&self, _window_id: u32, _frame: Rect) -> Result<()> {
        Err(unsupported())
    }
}

#[cfg(not(target_os = "macos"))]
fn unsupported() -> anyhow::Error {
    GridSnapError::MacOSAPIError(
        "SystemAccessibilityProvider is not available on this platform".into(),
    )
    .into()
}

/// Simple in-memory provider used for testing the higher level services
#[derive(Debug)]
pub struct InMemoryAccessibilityProvider {
    windows: RwLock<HashMap<u32, AXWindow>>,
    status: RwLock<PermissionStatus>,
    fail_frame_writes: AtomicBool,
    frame_writes: AtomicU64,
}

impl InMemoryAccessibilityProvider {
    pub fn new_with(windows: Vec<AXWindow>) -> Self {
        let map = windows
            .into_iter()
            .map(|window| (window.window_id, window))
            .collect();

        Self {
            windows: RwLock::new(map),
            status: RwLock::new(PermissionStatus::Granted),
            fail_frame_writes: AtomicBool::new(false),
            frame_writes: AtomicU64::new(0),
        }
    }

    pub fn set_permission_status(&self, status: PermissionStatus) {
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// Make every subsequent `set_window_frame` call fail, the way the OS
    /// rejects writes to non-resizable windows
    pub fn set_fail_frame_writes(&self, fail: bool) {
        self.fail_frame_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful frame writes
    pub fn frame_write_count(&self) -> u64 {
        self.frame_writes.load(Ordering::SeqCst)
    }

    pub fn insert_window(&self, window: AXWindow) {
        let mut windows = self.windows.write().unwrap_or_else(PoisonError::into_inner);
        if window.is_focused {
            Self::clear_focus(&mut windows);
        }
        windows.insert(window.window_id, window);
    }

    pub fn remove_window(&self, window_id: u32) -> Option<AXWindow> {
        self.windows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&window_id)
    }

    fn clear_focus(entries: &mut HashMap<u32, AXWindow>) {
        for window in entries.values_mut() {
            window.is_focused = false;
        }
    }
}

impl AccessibilityProvider for InMemoryAccessibilityProvider {
    fn ensure_permissions(&self) -> Result<()> {
        match self.permission_status() {
            PermissionStatus::Granted => Ok(()),
            PermissionStatus::Unknown | PermissionStatus::Denied => {
                Err(GridSnapError::PermissionDenied(
                    "Accessibility permission denied in in-memory provider".to_string(),
                )
                .into())
            }
        }
    }

    fn permission_status(&self) -> PermissionStatus {
        *self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn list_windows(&self, include_minimized: bool) -> Result<Vec<AXWindow>> {
        self.ensure_permissions()?;
        let windows = self.windows.read().unwrap_or_else(PoisonError::into_inner);
        let mut result: Vec<AXWindow> = windows
            .values()
            .filter(|window| include_minimized || !window.is_minimized)
            .cloned()
            .collect();
        result.sort_by_key(|w| w.window_id);
        Ok(result)
    }

    fn focused_window(&self) -> Result<Option<AXWindow>> {
        self.ensure_permissions()?;
        let windows = self.windows.read().unwrap_or_else(PoisonError::into_inner);
        Ok(windows.values().find(|window| window.is_focused).cloned())
    }

    fn get_window(&self, window_id: u32) -> Result<Option<AXWindow>> {
        Ok(self
            .windows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&window_id)
            .cloned())
    }

    fn focus_window(&self, window_id: u32) -> Result<()> {
        let mut windows = self.windows.write().unwrap_or_else(PoisonError::into_inner);
        if !windows.contains_key(&window_id) {
            return Err(GridSnapError::WindowNotFound(window_id).into());
        }

        Self::clear_focus(&mut windows);
        if let Some(window) = windows.get_mut(&window_id) {
            window.is_focused = true;
        }
        Ok(())
    }

    fn set_window_frame(&self, window_id: u32, frame: Rect) -> Result<()> {
        if self.fail_frame_writes.load(Ordering::SeqCst) {
            return Err(GridSnapError::MacOSAPIError(format!(
                "Frame write rejected for window {window_id}"
            ))
            .into());
        }

        let mut windows = self.windows.write().unwrap_or_else(PoisonError::into_inner);
        match windows.get_mut(&window_id) {
            Some(window) => {
                window.frame = frame;
                self.frame_writes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            None => Err(GridSnapError::WindowNotFound(window_id).into()),
        }
    }
}

impl Default for InMemoryAccessibilityProvider {
    fn default() -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            status: RwLock::new(PermissionStatus::Unknown),
            fail_frame_writes: AtomicBool::new(false),
            frame_writes: AtomicU64::new(0),
        }
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use super::AXWindow;
    use crate::models::geometry::Rect;
    use crate::{GridSnapError, Result};
    use core_foundation::base::{CFType, TCFType};
    use core_foundation::boolean::CFBoolean;
    use core_foundation::string::CFString;
    use core_foundation_sys::array::{CFArrayGetCount, CFArrayGetValueAtIndex, CFArrayRef};
    use core_foundation_sys::base::{CFEqual, CFRelease, CFRetain, CFTypeRef};
    use core_foundation_sys::string::CFStringRef;
    use core_graphics::geometry::{CGPoint, CGSize};
    use objc::runtime::{Class, Object};
    use objc::{msg_send, sel, sel_impl};
    use std::ffi::{c_void, CStr};
    use std::os::raw::c_char;
    use std::ptr;

    type AXUIElementRef = *const c_void;
    type AXError = i32;

    const K_AX_ERROR_SUCCESS: AXError = 0;
    const K_AX_ERROR_API_DISABLED: AXError = -25211;
    const K_AX_VALUE_TYPE_CG_POINT: i32 = 1;
    const K_AX_VALUE_TYPE_CG_SIZE: i32 = 2;
    /// NSApplicationActivationPolicyRegular
    const ACTIVATION_POLICY_REGULAR: i64 = 0;

    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        fn AXUIElementCreateApplication(pid: i32) -> AXUIElementRef;
        fn AXUIElementCopyAttributeValue(
            element: AXUIElementRef,
            attribute: CFStringRef,
            value: *mut CFTypeRef,
        ) -> AXError;
        fn AXUIElementSetAttributeValue(
            element: AXUIElementRef,
            attribute: CFStringRef,
            value: CFTypeRef,
        ) -> AXError;
        fn AXUIElementPerformAction(element: AXUIElementRef, action: CFStringRef) -> AXError;
        fn AXValueCreate(value_type: i32, value: *const c_void) -> CFTypeRef;
        fn AXValueGetValue(value: CFTypeRef, value_type: i32, value_out: *mut c_void) -> bool;
    }

    /// Retained `AXUIElementRef`, released on drop
    #[derive(Debug)]
    pub struct AxElement(AXUIElementRef);

    // AX elements may be used from any thread; the API serializes internally.
    unsafe impl Send for AxElement {}
    unsafe impl Sync for AxElement {}

    impl Drop for AxElement {
        fn drop(&mut self) {
            if !self.0.is_null() {
                unsafe { CFRelease(self.0) };
            }
        }
    }

    impl AxElement {
        /// Take ownership of a reference returned by a Create/Copy call
        fn owned(raw: AXUIElementRef) -> Option<Self> {
            (!raw.is_null()).then_some(Self(raw))
        }

        /// Retain a borrowed reference
        fn retained(raw: AXUIElementRef) -> Option<Self> {
            if raw.is_null() {
                return None;
            }
            Some(Self(unsafe { CFRetain(raw) }))
        }

        pub fn same_as(&self, other: &AxElement) -> bool {
            unsafe { CFEqual(self.0, other.0) != 0 }
        }

        fn copy_attribute(&self, attribute: &str) -> Option<CFType> {
            let name = CFString::new(attribute);
            let mut value: CFTypeRef = ptr::null();
            let error =
                unsafe { AXUIElementCopyAttributeValue(self.0, name.as_concrete_TypeRef(), &mut value) };
            if error != K_AX_ERROR_SUCCESS || value.is_null() {
                return None;
            }
            Some(unsafe { CFType::wrap_under_create_rule(value) })
        }

        fn set_attribute(&self, attribute: &str, value: CFTypeRef) -> Result<()> {
            let name = CFString::new(attribute);
            let error =
                unsafe { AXUIElementSetAttributeValue(self.0, name.as_concrete_TypeRef(), value) };
            check(error, attribute)
        }

        fn string_attribute(&self, attribute: &str) -> Option<String> {
            self.copy_attribute(attribute)?
                .downcast::<CFString>()
                .map(|value| value.to_string())
        }

        fn bool_attribute(&self, attribute: &str) -> bool {
            self.copy_attribute(attribute)
                .and_then(|value| value.downcast::<CFBoolean>())
                .map(bool::from)
                .unwrap_or(false)
        }

        fn element_attribute(&self, attribute: &str) -> Option<AxElement> {
            let value = self.copy_attribute(attribute)?;
            AxElement::retained(value.as_CFTypeRef())
        }

        pub fn frame(&self) -> Option<Rect> {
            let mut point = CGPoint::new(0.0, 0.0);
            let mut size = CGSize::new(0.0, 0.0);

            let position = self.copy_attribute("AXPosition")?;
            let extent = self.copy_attribute("AXSize")?;
            let ok = unsafe {
                AXValueGetValue(
                    position.as_CFTypeRef(),
                    K_AX_VALUE_TYPE_CG_POINT,
                    &mut point as *mut CGPoint as *mut c_void,
                ) && AXValueGetValue(
                    extent.as_CFTypeRef(),
                    K_AX_VALUE_TYPE_CG_SIZE,
                    &mut size as *mut CGSize as *mut c_void,
                )
            };

            ok.then(|| Rect::from_xywh(point.x, point.y, size.width, size.height))
        }

        /// Position, size, then position again: moving first lets the size
        /// apply on the destination display, and the second move corrects
        /// any clamp the window server applied while resizing
        pub fn set_frame(&self, frame: Rect) -> Result<()> {
            let point = CGPoint::new(frame.origin.x, frame.origin.y);
            let size = CGSize::new(frame.size.width, frame.size.height);

            let position = ax_value(K_AX_VALUE_TYPE_CG_POINT, &point as *const CGPoint as *const c_void)?;
            let extent = ax_value(K_AX_VALUE_TYPE_CG_SIZE, &size as *const CGSize as *const c_void)?;

            self.set_attribute("AXPosition", position.as_CFTypeRef())?;
            self.set_attribute("AXSize", extent.as_CFTypeRef())?;
            self.set_attribute("AXPosition", position.as_CFTypeRef())
        }

        pub fn raise(&self) -> Result<()> {
            let action = CFString::new("AXRaise");
            let error = unsafe { AXUIElementPerformAction(self.0, action.as_concrete_TypeRef()) };
            check(error, "AXRaise")?;
            self.set_attribute("AXMain", CFBoolean::true_value().as_CFTypeRef())
        }
    }

    fn ax_value(value_type: i32, value: *const c_void) -> Result<CFType> {
        let raw = unsafe { AXValueCreate(value_type, value) };
        if raw.is_null() {
            return Err(GridSnapError::MacOSAPIError("AXValueCreate returned null".into()).into());
        }
        Ok(unsafe { CFType::wrap_under_create_rule(raw) })
    }

    fn check(error: AXError, attribute: &str) -> Result<()> {
        match error {
            K_AX_ERROR_SUCCESS => Ok(()),
            K_AX_ERROR_API_DISABLED => Err(GridSnapError::PermissionDenied(
                "Accessibility API is disabled".into(),
            )
            .into()),
            other => Err(GridSnapError::MacOSAPIError(format!(
                "Setting {attribute} failed with AXError {other}"
            ))
            .into()),
        }
    }

    struct RunningApp {
        pid: i32,
        name: String,
        bundle_id: String,
    }

    unsafe fn nsstring_to_string(string: *mut Object) -> String {
        if string.is_null() {
            return String::new();
        }
        let utf8: *const c_char = msg_send![string, UTF8String];
        if utf8.is_null() {
            return String::new();
        }
        CStr::from_ptr(utf8).to_string_lossy().into_owned()
    }

    fn regular_applications() -> Vec<RunningApp> {
        let mut apps = Vec::new();
        unsafe {
            let Some(class) = Class::get("NSWorkspace") else {
                return apps;
            };
            let workspace: *mut Object = msg_send![class, sharedWorkspace];
            let running: *mut Object = msg_send![workspace, runningApplications];
            let count: usize = msg_send![running, count];

            for index in 0..count {
                let app: *mut Object = msg_send![running, objectAtIndex: index];
                let policy: i64 = msg_send![app, activationPolicy];
                if policy != ACTIVATION_POLICY_REGULAR {
                    continue;
                }

                let pid: i32 = msg_send![app, processIdentifier];
                let name: *mut Object = msg_send![app, localizedName];
                let bundle: *mut Object = msg_send![app, bundleIdentifier];
                apps.push(RunningApp {
                    pid,
                    name: nsstring_to_string(name),
                    bundle_id: nsstring_to_string(bundle),
                });
            }
        }
        apps
    }

    fn frontmost_pid() -> Option<i32> {
        unsafe {
            let class = Class::get("NSWorkspace")?;
            let workspace: *mut Object = msg_send![class, sharedWorkspace];
            let app: *mut Object = msg_send![workspace, frontmostApplication];
            if app.is_null() {
                return None;
            }
            let pid: i32 = msg_send![app, processIdentifier];
            Some(pid)
        }
    }

    pub fn focused_window_element() -> Option<AxElement> {
        let pid = frontmost_pid()?;
        let app = AxElement::owned(unsafe { AXUIElementCreateApplication(pid) })?;
        app.element_attribute("AXFocusedWindow")
    }

    /// Every standard window of every regular application. Window ids are
    /// `(pid << 16) | index` and are only stable until the next enumeration.
    pub fn enumerate_windows() -> Vec<(AXWindow, AxElement)> {
        let mut result = Vec::new();

        for app in regular_applications() {
            let Some(element) = AxElement::owned(unsafe { AXUIElementCreateApplication(app.pid) })
            else {
                continue;
            };
            let Some(windows) = element.copy_attribute("AXWindows") else {
                continue;
            };

            let array = windows.as_CFTypeRef() as CFArrayRef;
            let count = unsafe { CFArrayGetCount(array) };
            for index in 0..count {
                let raw = unsafe { CFArrayGetValueAtIndex(array, index) };
                let Some(window) = AxElement::retained(raw) else {
                    continue;
                };

                let title = window.string_attribute("AXTitle").unwrap_or_default();
                let Some(frame) = window.frame() else {
                    continue;
                };

                let window_id = ((app.pid as u32) << 16) | (index as u32 & 0xFFFF);
                let info = AXWindow::new(window_id, app.pid, title, app.name.clone(), frame)
                    .with_bundle_id(app.bundle_id.clone())
                    .minimized(window.bool_attribute("AXMinimized"));

                result.push((info, window));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_window(window_id: u32, minimized: bool) -> AXWindow {
        AXWindow::new(
            window_id,
            400 + window_id as i32,
            format!("Window {window_id}"),
            "App",
            Rect::from_xywh(0.0, 25.0, 1280.0, 720.0),
        )
        .with_bundle_id("com.example.app")
        .minimized(minimized)
    }

    #[test]
    fn in_memory_provider_list_filters_minimized() {
        let provider = InMemoryAccessibilityProvider::new_with(vec![
            sample_window(1, false),
            sample_window(2, true),
        ]);

        let visible = provider.list_windows(false).unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].window_id, 1);

        let all = provider.list_windows(true).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn in_memory_provider_focus_updates_state() {
        let provider = InMemoryAccessibilityProvider::new_with(vec![
            sample_window(1, false).focused(true),
            sample_window(2, false),
        ]);

        provider.focus_window(2).unwrap();

        let focused = provider.focused_window().unwrap().unwrap();
        assert_eq!(focused.window_id, 2);
        assert!(!provider.get_window(1).unwrap().unwrap().is_focused);
    }

    #[test]
    fn in_memory_provider_respects_permission_status() {
        let provider = InMemoryAccessibilityProvider::default();
        provider.set_permission_status(PermissionStatus::Denied);

        assert!(provider.ensure_permissions().is_err());
        assert!(provider.list_windows(false).is_err());
    }

    #[test]
    fn failing_frame_writes_leave_window_untouched() {
        let provider = InMemoryAccessibilityProvider::new_with(vec![sample_window(1, false)]);
        provider.set_fail_frame_writes(true);

        let target = Rect::from_xywh(0.0, 0.0, 10.0, 10.0);
        assert!(provider.set_window_frame(1, target).is_err());
        assert_eq!(provider.frame_write_count(), 0);
        assert_ne!(provider.get_window(1).unwrap().unwrap().frame, target);

        provider.set_fail_frame_writes(false);
        provider.set_window_frame(1, target).unwrap();
        assert_eq!(provider.frame_write_count(), 1);
    }

    #[test]
    fn identity_is_composite_key() {
        let window = sample_window(3, false);
        assert_eq!(window.identity(), WindowIdentity::new("App", "Window 3", 403));
    }
}
