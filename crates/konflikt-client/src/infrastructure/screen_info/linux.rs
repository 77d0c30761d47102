//! Linux screen enumeration via the X11 Xlib API.
//!
//! `XDisplayWidth`/`XDisplayHeight` on the default screen already report the
//! combined size of the composite X screen Xrandr presents to clients (the
//! bounding box of all attached monitors), so no per-monitor walk is needed.
//!
//! # `DISPLAY` environment variable
//!
//! When running as a desktop application `DISPLAY` is set automatically by
//! the session (e.g. `DISPLAY=:0`). In headless environments (CI, SSH
//! without X forwarding) it is unset and `XOpenDisplay` fails — the expected
//! failure mode here.

use super::ScreenEnumerator;
use crate::application::report_screens::ScreenError;
use konflikt_core::protocol::messages::ScreenGeometry;

/// Linux X11 implementation of [`ScreenEnumerator`].
pub struct LinuxScreenEnumerator;

impl LinuxScreenEnumerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LinuxScreenEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenEnumerator for LinuxScreenEnumerator {
    fn enumerate_screen(&self) -> Result<ScreenGeometry, ScreenError> {
        enumerate_via_xlib()
    }
}

#[cfg(target_os = "linux")]
fn enumerate_via_xlib() -> Result<ScreenGeometry, ScreenError> {
    use x11::xlib;

    // SAFETY: XOpenDisplay is called with a null display name, meaning "use
    // the DISPLAY environment variable". The returned pointer is freed by
    // XCloseDisplay below before returning.
    let display = unsafe { xlib::XOpenDisplay(std::ptr::null()) };
    if display.is_null() {
        let display_env = std::env::var("DISPLAY").unwrap_or_else(|_| "<unset>".to_string());
        return Err(ScreenError::Platform(format!("XOpenDisplay failed; DISPLAY={display_env}")));
    }

    // SAFETY: `display` is a valid non-null pointer returned by XOpenDisplay.
    let screen_num = unsafe { xlib::XDefaultScreen(display) };
    let width = unsafe { xlib::XDisplayWidth(display, screen_num) };
    let height = unsafe { xlib::XDisplayHeight(display, screen_num) };

    // SAFETY: `display` was successfully opened above and is not used after this.
    unsafe { xlib::XCloseDisplay(display) };

    if width <= 0 || height <= 0 {
        return Err(ScreenError::Platform("X11 reported a non-positive screen size".to_string()));
    }
    Ok(ScreenGeometry { width: width as u32, height: height as u32 })
}

#[cfg(not(target_os = "linux"))]
fn enumerate_via_xlib() -> Result<ScreenGeometry, ScreenError> {
    Err(ScreenError::Platform("Xlib is only available on linux builds".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Smoke-test: if a DISPLAY is available this must succeed and return a
    /// positive geometry; if unset, the error is expected.
    #[test]
    fn linux_screen_enumerator_smoke() {
        let enumerator = LinuxScreenEnumerator::new();
        let result = enumerator.enumerate_screen();

        if std::env::var("DISPLAY").is_ok() {
            assert!(result.is_ok(), "enumerate must succeed when DISPLAY is set");
            let geometry = result.unwrap();
            assert!(geometry.width > 0 && geometry.height > 0);
        } else {
            assert!(result.is_err(), "enumerate must fail when DISPLAY is not set");
        }
    }
}
