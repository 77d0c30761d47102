//! Mock platform input emulator for unit testing.

use std::sync::Mutex;

use konflikt_core::keymap::hid::HidKeyCode;

use crate::application::emulate_input::{EmulationError, MouseButton, PlatformInputEmulator};

/// A mock emulator that records all calls without performing OS API calls.
#[derive(Default)]
pub struct MockInputEmulator {
    pub key_presses: Mutex<Vec<HidKeyCode>>,
    pub key_releases: Mutex<Vec<HidKeyCode>>,
    pub mouse_moves: Mutex<Vec<(i32, i32)>>,
    pub mouse_presses: Mutex<Vec<MouseButton>>,
    pub mouse_releases: Mutex<Vec<MouseButton>>,
    pub should_fail: bool,
}

impl MockInputEmulator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlatformInputEmulator for MockInputEmulator {
    fn emit_key_press(&self, key: HidKeyCode) -> Result<(), EmulationError> {
        if self.should_fail {
            return Err(EmulationError::Platform("mock failure".into()));
        }
        self.key_presses.lock().unwrap().push(key);
        Ok(())
    }

    fn emit_key_release(&self, key: HidKeyCode) -> Result<(), EmulationError> {
        if self.should_fail {
            return Err(EmulationError::Platform("mock failure".into()));
        }
        self.key_releases.lock().unwrap().push(key);
        Ok(())
    }

    fn emit_mouse_move(&self, x: i32, y: i32) -> Result<(), EmulationError> {
        if self.should_fail {
            return Err(EmulationError::Platform("mock failure".into()));
        }
        self.mouse_moves.lock().unwrap().push((x, y));
        Ok(())
    }

    fn emit_mouse_press(&self, button: MouseButton) -> Result<(), EmulationError> {
        if self.should_fail {
            return Err(EmulationError::Platform("mock failure".into()));
        }
        self.mouse_presses.lock().unwrap().push(button);
        Ok(())
    }

    fn emit_mouse_release(&self, button: MouseButton) -> Result<(), EmulationError> {
        if self.should_fail {
            return Err(EmulationError::Platform("mock failure".into()));
        }
        self.mouse_releases.lock().unwrap().push(button);
        Ok(())
    }

    fn cursor_position(&self) -> Result<(i32, i32), EmulationError> {
        Ok(self.mouse_moves.lock().unwrap().last().copied().unwrap_or((0, 0)))
    }
}
