//! ReportScreensUseCase: enumerates the client's display geometry for the
//! handshake and `client_registration` messages.
//!
//! Konflikt addresses a client by a single combined desktop rectangle, not a
//! per-monitor list: multi-monitor clients are expected to report the bounds
//! of their virtual screen (the union of all attached monitors).

use konflikt_core::protocol::messages::ScreenGeometry;
use thiserror::Error;

/// Error type for screen enumeration.
#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("platform error: {0}")]
    Platform(String),
}

/// Trait for enumerating the local display geometry on the current platform.
pub trait ScreenEnumerator: Send + Sync {
    /// Returns the combined width/height of the client's virtual desktop.
    ///
    /// # Errors
    ///
    /// Returns [`ScreenError`] if the platform cannot report display geometry.
    fn enumerate_screen(&self) -> Result<ScreenGeometry, ScreenError>;
}

/// Detects whether the client's reported geometry has changed since the last
/// handshake, warranting a fresh `client_registration`.
pub fn screen_geometry_changed(old: &ScreenGeometry, new: &ScreenGeometry) -> bool {
    old != new
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_geometry_changed_returns_false_for_identical_configurations() {
        let a = ScreenGeometry { width: 1920, height: 1080 };
        let b = ScreenGeometry { width: 1920, height: 1080 };
        assert!(!screen_geometry_changed(&a, &b));
    }

    #[test]
    fn screen_geometry_changed_returns_true_when_resolution_differs() {
        let a = ScreenGeometry { width: 1920, height: 1080 };
        let b = ScreenGeometry { width: 2560, height: 1440 };
        assert!(screen_geometry_changed(&a, &b));
    }
}
