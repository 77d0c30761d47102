//! Windows screen enumeration via `GetSystemMetrics`.
//!
//! Reads the combined virtual-screen bounds — the bounding box of every
//! attached monitor — rather than walking individual monitors, matching the
//! single-rectangle geometry the protocol reports.

use super::ScreenEnumerator;
use crate::application::report_screens::ScreenError;
use konflikt_core::protocol::messages::ScreenGeometry;

#[cfg(target_os = "windows")]
use windows::Win32::UI::WindowsAndMessaging::{
    GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN,
};

/// Windows implementation of [`ScreenEnumerator`] using `GetSystemMetrics`.
pub struct WindowsScreenEnumerator;

impl WindowsScreenEnumerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsScreenEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenEnumerator for WindowsScreenEnumerator {
    fn enumerate_screen(&self) -> Result<ScreenGeometry, ScreenError> {
        // SAFETY: GetSystemMetrics takes a plain integer index, no pointers involved.
        let width = unsafe { GetSystemMetrics(SM_CXVIRTUALSCREEN) };
        let height = unsafe { GetSystemMetrics(SM_CYVIRTUALSCREEN) };
        if width <= 0 || height <= 0 {
            return Err(ScreenError::Platform(
                "GetSystemMetrics(SM_CXVIRTUALSCREEN/SM_CYVIRTUALSCREEN) returned a non-positive size"
                    .to_string(),
            ));
        }
        Ok(ScreenGeometry { width: width as u32, height: height as u32 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_screen_enumerator_returns_a_positive_geometry() {
        let enumerator = WindowsScreenEnumerator::new();
        let result = enumerator.enumerate_screen();
        assert!(result.is_ok(), "enumerate_screen must succeed: {:?}", result.err());
        let geometry = result.unwrap();
        assert!(geometry.width > 0 && geometry.height > 0);
    }
}
