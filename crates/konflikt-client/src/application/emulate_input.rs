//! EmulateInputUseCase: translates received `input_event` messages to OS
//! input calls.
//!
//! This use case sits at the application layer and delegates to a
//! [`PlatformInputEmulator`] trait object for OS-level event injection. The
//! platform-specific implementations are in the infrastructure layer.

use konflikt_core::keymap::hid::HidKeyCode;
use konflikt_core::protocol::messages::{InputEventData, InputEventType};
use thiserror::Error;

/// Error type for input emulation operations.
#[derive(Debug, Error)]
pub enum EmulationError {
    #[error("platform error: {0}")]
    Platform(String),
    #[error("input_event carried no keycode")]
    MissingKeyCode,
    #[error("invalid mouse button: {0:?}")]
    InvalidMouseButton(String),
}

/// A mouse button as named on the wire (`input_event.eventData.button`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "left" => Some(MouseButton::Left),
            "middle" => Some(MouseButton::Middle),
            "right" => Some(MouseButton::Right),
            _ => None,
        }
    }
}

/// Platform-agnostic input emulation trait.
///
/// Each supported OS provides an implementation in the infrastructure layer.
pub trait PlatformInputEmulator: Send + Sync {
    /// Emulates a key press (key-down event).
    fn emit_key_press(&self, key: HidKeyCode) -> Result<(), EmulationError>;

    /// Emulates a key release (key-up event).
    fn emit_key_release(&self, key: HidKeyCode) -> Result<(), EmulationError>;

    /// Moves the cursor to an absolute position in the client's coordinate space.
    fn emit_mouse_move(&self, x: i32, y: i32) -> Result<(), EmulationError>;

    /// Emulates a mouse button press.
    fn emit_mouse_press(&self, button: MouseButton) -> Result<(), EmulationError>;

    /// Emulates a mouse button release.
    fn emit_mouse_release(&self, button: MouseButton) -> Result<(), EmulationError>;

    /// Reads back the OS cursor's current position, so the coordinator can
    /// detect it landed at the screen edge after an injected move (OS
    /// clamping and high-DPI scaling mean the position actually reached
    /// can differ from the one requested).
    fn cursor_position(&self) -> Result<(i32, i32), EmulationError>;
}

/// Filters duplicate consecutive mouse positions to avoid injecting the
/// same move twice.
#[derive(Default)]
struct DedupFilter {
    last_mouse_pos: Option<(i32, i32)>,
}

impl DedupFilter {
    fn should_send_mouse_move(&mut self, x: i32, y: i32) -> bool {
        if self.last_mouse_pos == Some((x, y)) {
            return false;
        }
        self.last_mouse_pos = Some((x, y));
        true
    }

    fn reset(&mut self) {
        self.last_mouse_pos = None;
    }
}

/// The Emulate Input use case.
///
/// Receives a decoded `input_event` payload and dispatches it to the
/// platform emulator.
pub struct EmulateInputUseCase {
    emulator: std::sync::Arc<dyn PlatformInputEmulator>,
    dedup: DedupFilter,
}

impl EmulateInputUseCase {
    /// Creates a new use case with the given platform emulator.
    pub fn new(emulator: std::sync::Arc<dyn PlatformInputEmulator>) -> Self {
        Self { emulator, dedup: DedupFilter::default() }
    }

    /// Handles one `input_event` message's payload.
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError`] if the payload is missing a field its
    /// `event_type` requires, or if the OS event injection fails.
    pub fn handle_input_event(
        &mut self,
        event_type: InputEventType,
        data: &InputEventData,
    ) -> Result<(), EmulationError> {
        match event_type {
            InputEventType::KeyPress => {
                let code = data.keycode.ok_or(EmulationError::MissingKeyCode)?;
                self.emulator.emit_key_press(HidKeyCode::from_u16(code))
            }
            InputEventType::KeyRelease => {
                let code = data.keycode.ok_or(EmulationError::MissingKeyCode)?;
                self.emulator.emit_key_release(HidKeyCode::from_u16(code))
            }
            InputEventType::MouseMove => {
                if self.dedup.should_send_mouse_move(data.x, data.y) {
                    self.emulator.emit_mouse_move(data.x, data.y)?;
                }
                Ok(())
            }
            InputEventType::MousePress => self.emulator.emit_mouse_press(self.parse_button(data)?),
            InputEventType::MouseRelease => {
                self.emulator.emit_mouse_release(self.parse_button(data)?)
            }
        }
    }

    fn parse_button(&self, data: &InputEventData) -> Result<MouseButton, EmulationError> {
        let raw = data.button.as_deref().unwrap_or("");
        MouseButton::parse(raw).ok_or_else(|| EmulationError::InvalidMouseButton(raw.to_string()))
    }

    /// Resets internal state (e.g., on reconnect).
    pub fn reset(&mut self) {
        self.dedup.reset();
    }

    /// Reads back the real cursor position from the platform emulator.
    pub fn cursor_position(&self) -> Result<(i32, i32), EmulationError> {
        self.emulator.cursor_position()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn data(x: i32, y: i32) -> InputEventData {
        InputEventData {
            x,
            y,
            dx: None,
            dy: None,
            timestamp: 0,
            keyboard_modifiers: 0,
            mouse_buttons: 0,
            keycode: None,
            text: None,
            button: None,
        }
    }

    #[derive(Default)]
    struct RecordingEmulator {
        key_presses: Mutex<Vec<HidKeyCode>>,
        key_releases: Mutex<Vec<HidKeyCode>>,
        mouse_moves: Mutex<Vec<(i32, i32)>>,
        mouse_presses: Mutex<Vec<MouseButton>>,
        mouse_releases: Mutex<Vec<MouseButton>>,
        should_fail: bool,
    }

    impl PlatformInputEmulator for RecordingEmulator {
        fn emit_key_press(&self, key: HidKeyCode) -> Result<(), EmulationError> {
            if self.should_fail {
                return Err(EmulationError::Platform("injected failure".to_string()));
            }
            self.key_presses.lock().unwrap().push(key);
            Ok(())
        }

        fn emit_key_release(&self, key: HidKeyCode) -> Result<(), EmulationError> {
            if self.should_fail {
                return Err(EmulationError::Platform("injected failure".to_string()));
            }
            self.key_releases.lock().unwrap().push(key);
            Ok(())
        }

        fn emit_mouse_move(&self, x: i32, y: i32) -> Result<(), EmulationError> {
            if self.should_fail {
                return Err(EmulationError::Platform("injected failure".to_string()));
            }
            self.mouse_moves.lock().unwrap().push((x, y));
            Ok(())
        }

        fn emit_mouse_press(&self, button: MouseButton) -> Result<(), EmulationError> {
            self.mouse_presses.lock().unwrap().push(button);
            Ok(())
        }

        fn emit_mouse_release(&self, button: MouseButton) -> Result<(), EmulationError> {
            self.mouse_releases.lock().unwrap().push(button);
            Ok(())
        }

        fn cursor_position(&self) -> Result<(i32, i32), EmulationError> {
            Ok(self.mouse_moves.lock().unwrap().last().copied().unwrap_or((0, 0)))
        }
    }

    fn make_use_case() -> (EmulateInputUseCase, Arc<RecordingEmulator>) {
        let emulator = Arc::new(RecordingEmulator::default());
        let uc = EmulateInputUseCase::new(Arc::clone(&emulator) as Arc<dyn PlatformInputEmulator>);
        (uc, emulator)
    }

    #[test]
    fn key_press_with_a_keycode_calls_emit_key_press() {
        let (mut uc, em) = make_use_case();
        let mut event = data(0, 0);
        event.keycode = Some(HidKeyCode::KeyA.as_u16());

        uc.handle_input_event(InputEventType::KeyPress, &event).unwrap();

        assert_eq!(*em.key_presses.lock().unwrap(), vec![HidKeyCode::KeyA]);
        assert!(em.key_releases.lock().unwrap().is_empty());
    }

    #[test]
    fn key_press_without_a_keycode_is_rejected() {
        let (mut uc, _em) = make_use_case();
        let err = uc.handle_input_event(InputEventType::KeyPress, &data(0, 0)).unwrap_err();
        assert!(matches!(err, EmulationError::MissingKeyCode));
    }

    #[test]
    fn mouse_move_deduplicates_identical_consecutive_positions() {
        let (mut uc, em) = make_use_case();
        let event = data(100, 200);

        uc.handle_input_event(InputEventType::MouseMove, &event).unwrap();
        uc.handle_input_event(InputEventType::MouseMove, &event).unwrap();

        assert_eq!(em.mouse_moves.lock().unwrap().len(), 1);
    }

    #[test]
    fn mouse_move_does_not_deduplicate_different_positions() {
        let (mut uc, em) = make_use_case();

        uc.handle_input_event(InputEventType::MouseMove, &data(100, 200)).unwrap();
        uc.handle_input_event(InputEventType::MouseMove, &data(101, 200)).unwrap();

        assert_eq!(em.mouse_moves.lock().unwrap().len(), 2);
    }

    #[test]
    fn reset_clears_dedup_state() {
        let (mut uc, em) = make_use_case();
        let event = data(100, 200);
        uc.handle_input_event(InputEventType::MouseMove, &event).unwrap();

        uc.reset();
        uc.handle_input_event(InputEventType::MouseMove, &event).unwrap();

        assert_eq!(em.mouse_moves.lock().unwrap().len(), 2);
    }

    #[test]
    fn mouse_press_parses_the_named_button() {
        let (mut uc, em) = make_use_case();
        let mut event = data(500, 400);
        event.button = Some("left".to_string());

        uc.handle_input_event(InputEventType::MousePress, &event).unwrap();

        assert_eq!(*em.mouse_presses.lock().unwrap(), vec![MouseButton::Left]);
    }

    #[test]
    fn mouse_release_rejects_an_unrecognized_button_name() {
        let (mut uc, _em) = make_use_case();
        let mut event = data(0, 0);
        event.button = Some("stylus".to_string());

        let err = uc.handle_input_event(InputEventType::MouseRelease, &event).unwrap_err();
        assert!(matches!(err, EmulationError::InvalidMouseButton(_)));
    }
}
