//! [`PlatformIo`] implementations: hiding and restoring the local cursor
//! while a client has activated control, driven entirely by what
//! [`crate::application::coordinator::ServerCoordinator`] decides, never by
//! this module.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::application::coordinator::PlatformIo;

/// Windows implementation: toggles cursor visibility via `ShowCursor`,
/// which maintains an internal display count rather than a boolean, so a
/// local flag tracks whether we are the ones currently suppressing it.
#[cfg(target_os = "windows")]
pub struct WindowsPlatformIo {
    hidden: AtomicBool,
}

#[cfg(target_os = "windows")]
impl WindowsPlatformIo {
    pub fn new() -> Self {
        Self { hidden: AtomicBool::new(false) }
    }
}

#[cfg(target_os = "windows")]
impl Default for WindowsPlatformIo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "windows")]
impl PlatformIo for WindowsPlatformIo {
    fn hide_cursor(&self) {
        use windows::Win32::UI::WindowsAndMessaging::ShowCursor;
        if self.hidden.swap(true, Ordering::SeqCst) {
            return;
        }
        // SAFETY: ShowCursor(false) is a plain counted API call, no pointers involved.
        unsafe {
            while ShowCursor(false) >= 0 {}
        }
    }

    fn show_cursor(&self) {
        use windows::Win32::UI::WindowsAndMessaging::ShowCursor;
        if !self.hidden.swap(false, Ordering::SeqCst) {
            return;
        }
        // SAFETY: ShowCursor(true) is a plain counted API call, no pointers involved.
        unsafe {
            while ShowCursor(true) < 0 {}
        }
    }

    fn is_cursor_visible(&self) -> bool {
        !self.hidden.load(Ordering::SeqCst)
    }
}

/// Fallback for platforms this build does not have a native cursor-hook for.
/// Tracks the requested visibility state so the coordinator's logic is still
/// exercised; a build targeting a new platform replaces this with a real
/// implementation rather than calling the coordinator with this stub forever.
pub struct NoopPlatformIo {
    hidden: AtomicBool,
}

impl NoopPlatformIo {
    pub fn new() -> Self {
        Self { hidden: AtomicBool::new(false) }
    }
}

impl Default for NoopPlatformIo {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformIo for NoopPlatformIo {
    fn hide_cursor(&self) {
        self.hidden.store(true, Ordering::SeqCst);
    }

    fn show_cursor(&self) {
        self.hidden.store(false, Ordering::SeqCst);
    }

    fn is_cursor_visible(&self) -> bool {
        !self.hidden.load(Ordering::SeqCst)
    }
}

/// Reads the local virtual screen's combined width and height, used once at
/// startup to populate this instance's own [`konflikt_core::domain::layout::ScreenEntry`].
#[cfg(target_os = "windows")]
pub fn screen_geometry() -> (u32, u32) {
    use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN};
    // SAFETY: GetSystemMetrics takes a plain integer index, no pointers involved.
    let width = unsafe { GetSystemMetrics(SM_CXVIRTUALSCREEN) };
    let height = unsafe { GetSystemMetrics(SM_CYVIRTUALSCREEN) };
    (width.max(0) as u32, height.max(0) as u32)
}

/// Non-Windows builds have no native screen-geometry query wired up yet; this
/// is a documented placeholder, not a guess at a real display size.
#[cfg(not(target_os = "windows"))]
pub fn screen_geometry() -> (u32, u32) {
    (1920, 1080)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_platform_io_starts_with_cursor_visible() {
        let io = NoopPlatformIo::new();
        assert!(io.is_cursor_visible());
    }

    #[test]
    fn noop_platform_io_tracks_hide_and_show() {
        let io = NoopPlatformIo::new();
        io.hide_cursor();
        assert!(!io.is_cursor_visible());
        io.show_cursor();
        assert!(io.is_cursor_visible());
    }
}
