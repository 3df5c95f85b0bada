use crate::Result;
use anyhow::{anyhow, Context};
use std::process::Command;

const ACCESSIBILITY_PANE_URL: &str =
    "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility";

/// Open System Settings at the Accessibility privacy pane so the user can
/// grant access manually.
pub fn open_accessibility_settings() -> Result<()> {
    if cfg!(not(target_os = "macos")) {
        return Err(anyhow!(
            "opening System Settings is not supported on this platform"
        ));
    }

    let status = Command::new("open")
        .arg(ACCESSIBILITY_PANE_URL)
        .status()
        .context("failed to open System Settings")?;

    if status.success() {
        Ok(())
    } else {
        Err(anyhow!("open command returned non-zero status: {status}"))
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use crate::Result;
    use core_foundation::base::TCFType;
    use core_foundation::boolean::CFBoolean;
    use core_foundation::dictionary::CFMutableDictionary;
    use core_foundation::string::CFString;
    use core_foundation_sys::dictionary::CFDictionaryRef;
    use core_foundation_sys::string::CFStringRef;

    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        fn AXIsProcessTrusted() -> bool;
        fn AXIsProcessTrustedWithOptions(options: CFDictionaryRef) -> bool;
        static kAXTrustedCheckOptionPrompt: CFStringRef;
    }

    pub fn is_accessibility_permission_granted() -> Result<bool> {
        Ok(unsafe { AXIsProcessTrusted() })
    }

    /// Ask the system to show its accessibility prompt. Returns the current
    /// trust state; the user's answer only takes effect after a restart.
    pub fn prompt_accessibility_permission() -> Result<bool> {
        unsafe {
            let mut options = CFMutableDictionary::new();
            let key = CFString::wrap_under_get_rule(kAXTrustedCheckOptionPrompt);
            options.set(key, CFBoolean::true_value());

            Ok(AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef()))
        }
    }
}

#[cfg(not(target_os = "macos"))]
mod platform {
    use crate::Result;

    pub(super) const ACCESSIBILITY_ENV: &str = "GRIDSNAP_PERMISSION_ACCESSIBILITY";

    fn env_flag(name: &str) -> bool {
        std::env::var(name)
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn is_accessibility_permission_granted() -> Result<bool> {
        Ok(env_flag(ACCESSIBILITY_ENV))
    }

    pub fn prompt_accessibility_permission() -> Result<bool> {
        Ok(env_flag(ACCESSIBILITY_ENV))
    }
}

pub use platform::{is_accessibility_permission_granted, prompt_accessibility_permission};
