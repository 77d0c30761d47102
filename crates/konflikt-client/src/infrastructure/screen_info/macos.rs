//! macOS screen enumeration via Core Graphics (`CGDisplay`).
//!
//! Computes the bounding box of every active display's `CGDisplayBounds`
//! rather than walking individual monitors, matching the single-rectangle
//! geometry the protocol reports.

use super::ScreenEnumerator;
use crate::application::report_screens::ScreenError;
use konflikt_core::protocol::messages::ScreenGeometry;

/// macOS implementation of [`ScreenEnumerator`] via Core Graphics.
pub struct MacosScreenEnumerator;

impl MacosScreenEnumerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MacosScreenEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ScreenEnumerator for MacosScreenEnumerator {
    fn enumerate_screen(&self) -> Result<ScreenGeometry, ScreenError> {
        enumerate_via_core_graphics()
    }
}

#[cfg(target_os = "macos")]
fn enumerate_via_core_graphics() -> Result<ScreenGeometry, ScreenError> {
    use core_graphics::display::{CGDisplay, CGDisplayBounds};

    let active_displays =
        CGDisplay::active_displays().map_err(|e| ScreenError::Platform(e.to_string()))?;
    if active_displays.is_empty() {
        return Err(ScreenError::Platform("CGGetActiveDisplayList returned zero displays".to_string()));
    }

    let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
    let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
    for &display_id in &active_displays {
        let bounds = CGDisplayBounds(display_id);
        min_x = min_x.min(bounds.origin.x);
        min_y = min_y.min(bounds.origin.y);
        max_x = max_x.max(bounds.origin.x + bounds.size.width);
        max_y = max_y.max(bounds.origin.y + bounds.size.height);
    }

    let width = (max_x - min_x) as u32;
    let height = (max_y - min_y) as u32;
    if width == 0 || height == 0 {
        return Err(ScreenError::Platform("computed a zero-sized display bounding box".to_string()));
    }
    Ok(ScreenGeometry { width, height })
}

#[cfg(not(target_os = "macos"))]
fn enumerate_via_core_graphics() -> Result<ScreenGeometry, ScreenError> {
    Err(ScreenError::Platform("Core Graphics is only available on macos builds".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Smoke-test: on a macOS machine with at least one display this must succeed.
    #[test]
    fn macos_screen_enumerator_returns_a_positive_geometry() {
        let enumerator = MacosScreenEnumerator::new();
        let result = enumerator.enumerate_screen();
        assert!(result.is_ok(), "enumerate_screen must succeed on macOS: {:?}", result.err());
        let geometry = result.unwrap();
        assert!(geometry.width > 0 && geometry.height > 0);
    }
}
