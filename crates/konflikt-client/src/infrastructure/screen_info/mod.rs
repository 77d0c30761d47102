//! Platform-specific screen enumeration.
//!
//! Detects the combined size of the client's virtual desktop (the union of
//! all attached monitors) so the client can report accurate
//! [`ScreenGeometry`] at handshake time and whenever it changes.
//!
//! # Platform implementations
//!
//! Each platform implements [`PlatformScreenEnumerator`]; the correct one is
//! selected at compile time via `#[cfg(target_os = ...)]` and re-exported as
//! `NativeScreenEnumerator`:
//!
//! | Module    | OS      | API used                                          |
//! |-----------|---------|----------------------------------------------------|
//! | `windows` | Windows | `GetSystemMetrics(SM_CXVIRTUALSCREEN/SM_CYVIRTUALSCREEN)` |
//! | `linux`   | Linux   | `XDisplayWidth`/`XDisplayHeight` (Xlib)            |
//! | `macos`   | macOS   | `CGGetActiveDisplayList` + `CGDisplayBounds` union |
//!
//! A [`MockScreenEnumerator`] is always compiled (not guarded by `#[cfg]`) so
//! tests on any platform can use it without a physical display.

use konflikt_core::protocol::messages::ScreenGeometry;

use crate::application::report_screens::{ScreenEnumerator, ScreenError};

// ── Windows implementation ────────────────────────────────────────────────────

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(target_os = "windows")]
pub use windows::WindowsScreenEnumerator as NativeScreenEnumerator;

// ── Linux implementation ──────────────────────────────────────────────────────

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use linux::LinuxScreenEnumerator as NativeScreenEnumerator;

// ── macOS implementation ──────────────────────────────────────────────────────

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "macos")]
pub use macos::MacosScreenEnumerator as NativeScreenEnumerator;

// ── Mock implementation (always compiled for tests) ───────────────────────────

/// A mock screen enumerator that always reports a fixed geometry. Used in
/// unit tests and on unsupported platforms — makes no OS calls.
pub struct MockScreenEnumerator {
    pub geometry: ScreenGeometry,
}

impl MockScreenEnumerator {
    pub fn single_1080p() -> Self {
        Self { geometry: ScreenGeometry { width: 1920, height: 1080 } }
    }

    pub fn wide_1440p() -> Self {
        Self { geometry: ScreenGeometry { width: 5120, height: 1440 } }
    }
}

impl ScreenEnumerator for MockScreenEnumerator {
    fn enumerate_screen(&self) -> Result<ScreenGeometry, ScreenError> {
        Ok(self.geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_single_1080p_reports_1920x1080() {
        let enumerator = MockScreenEnumerator::single_1080p();
        let geometry = enumerator.enumerate_screen().expect("enumerate");
        assert_eq!(geometry, ScreenGeometry { width: 1920, height: 1080 });
    }

    #[test]
    fn mock_wide_1440p_reports_the_combined_width() {
        let enumerator = MockScreenEnumerator::wide_1440p();
        let geometry = enumerator.enumerate_screen().expect("enumerate");
        assert_eq!(geometry.width, 5120);
    }
}
