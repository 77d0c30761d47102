//! Windows input emulation via the SendInput API.
//!
//! Translates HID Usage IDs to Windows Virtual Key codes and injects
//! events using SendInput. Mouse coordinates are normalized to the
//! Windows virtual screen space [0, 65535].

#![cfg(target_os = "windows")]

use konflikt_core::keymap::hid::HidKeyCode;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYEVENTF_EXTENDEDKEY,
    KEYEVENTF_KEYUP, KEYEVENTF_SCANCODE, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_MOVE,
    MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEINPUT, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN};

use crate::application::emulate_input::{EmulationError, MouseButton, PlatformInputEmulator};

/// Windows implementation of [`PlatformInputEmulator`] using SendInput.
pub struct WindowsInputEmulator;

impl WindowsInputEmulator {
    pub fn new() -> Self {
        Self
    }

    /// Translates a HID usage id to a Windows virtual-key code. `None` for
    /// a code with no Windows equivalent.
    fn hid_to_windows_vk(key: HidKeyCode) -> Option<u8> {
        use HidKeyCode::*;
        Some(match key {
            KeyA => 0x41,
            KeyB => 0x42,
            KeyC => 0x43,
            KeyD => 0x44,
            KeyE => 0x45,
            KeyF => 0x46,
            KeyG => 0x47,
            KeyH => 0x48,
            KeyI => 0x49,
            KeyJ => 0x4A,
            KeyK => 0x4B,
            KeyL => 0x4C,
            KeyM => 0x4D,
            KeyN => 0x4E,
            KeyO => 0x4F,
            KeyP => 0x50,
            KeyQ => 0x51,
            KeyR => 0x52,
            KeyS => 0x53,
            KeyT => 0x54,
            KeyU => 0x55,
            KeyV => 0x56,
            KeyW => 0x57,
            KeyX => 0x58,
            KeyY => 0x59,
            KeyZ => 0x5A,
            Digit0 => 0x30,
            Digit1 => 0x31,
            Digit2 => 0x32,
            Digit3 => 0x33,
            Digit4 => 0x34,
            Digit5 => 0x35,
            Digit6 => 0x36,
            Digit7 => 0x37,
            Digit8 => 0x38,
            Digit9 => 0x39,
            Enter => 0x0D,
            Escape => 0x1B,
            Backspace => 0x08,
            Tab => 0x09,
            Space => 0x20,
            ArrowLeft => 0x25,
            ArrowUp => 0x26,
            ArrowRight => 0x27,
            ArrowDown => 0x28,
            ControlLeft | ControlRight => 0x11,
            ShiftLeft | ShiftRight => 0x10,
            AltLeft | AltRight => 0x12,
            MetaLeft | MetaRight => 0x5B,
            Unknown => return None,
        })
    }
}

impl Default for WindowsInputEmulator {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformInputEmulator for WindowsInputEmulator {
    fn emit_key_press(&self, key: HidKeyCode) -> Result<(), EmulationError> {
        let vk = Self::hid_to_windows_vk(key)
            .ok_or_else(|| EmulationError::Platform(format!("no Windows VK for {key:?}")))?;
        send_key(vk, false)
    }

    fn emit_key_release(&self, key: HidKeyCode) -> Result<(), EmulationError> {
        let vk = Self::hid_to_windows_vk(key)
            .ok_or_else(|| EmulationError::Platform(format!("no Windows VK for {key:?}")))?;
        send_key(vk, true)
    }

    fn emit_mouse_move(&self, x: i32, y: i32) -> Result<(), EmulationError> {
        let (norm_x, norm_y) = normalize_coords(x, y);
        let input = INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx: norm_x,
                    dy: norm_y,
                    mouseData: 0,
                    // SAFETY: MOUSEEVENTF_ABSOLUTE uses normalized coords [0, 65535]
                    dwFlags: MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_MOVE,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };
        // SAFETY: input is a valid INPUT structure on the stack
        unsafe {
            windows::Win32::UI::Input::KeyboardAndMouse::SendInput(
                &[input],
                std::mem::size_of::<INPUT>() as i32,
            );
        }
        Ok(())
    }

    fn emit_mouse_press(&self, button: MouseButton) -> Result<(), EmulationError> {
        send_mouse_button(button, true)
    }

    fn emit_mouse_release(&self, button: MouseButton) -> Result<(), EmulationError> {
        send_mouse_button(button, false)
    }

    fn cursor_position(&self) -> Result<(i32, i32), EmulationError> {
        let mut point = windows::Win32::Foundation::POINT::default();
        // SAFETY: `point` is a valid, stack-allocated POINT.
        let ok = unsafe { windows::Win32::UI::WindowsAndMessaging::GetCursorPos(&mut point) };
        ok.map(|_| (point.x, point.y)).map_err(|e| EmulationError::Platform(e.to_string()))
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Normalizes pixel coordinates to Windows' [0, 65535] virtual screen range.
fn normalize_coords(x: i32, y: i32) -> (i32, i32) {
    // SAFETY: GetSystemMetrics is always safe to call
    let screen_w = unsafe { GetSystemMetrics(SM_CXVIRTUALSCREEN) };
    let screen_h = unsafe { GetSystemMetrics(SM_CYVIRTUALSCREEN) };

    let norm_x = if screen_w > 0 { (x * 65535 / screen_w).clamp(0, 65535) } else { 0 };
    let norm_y = if screen_h > 0 { (y * 65535 / screen_h).clamp(0, 65535) } else { 0 };
    (norm_x, norm_y)
}

fn send_key(vk: u8, key_up: bool) -> Result<(), EmulationError> {
    let mut flags = KEYEVENTF_SCANCODE;
    if key_up {
        flags |= KEYEVENTF_KEYUP;
    }

    // Extended keys need the EXTENDEDKEY flag
    let extended_vks: &[u8] = &[
        0x21, 0x22, 0x23, 0x24, 0x25, 0x26, 0x27, 0x28, // nav
        0x2D, 0x2E, // Insert, Delete
        0x5B, 0x5C, // Win keys
    ];
    if extended_vks.contains(&vk) {
        flags |= KEYEVENTF_EXTENDEDKEY;
    }

    let input = INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT { wVk: VIRTUAL_KEY(vk as u16), wScan: 0, dwFlags: flags, time: 0, dwExtraInfo: 0 },
        },
    };
    // SAFETY: input is a valid KEYBDINPUT structure
    unsafe {
        windows::Win32::UI::Input::KeyboardAndMouse::SendInput(
            &[input],
            std::mem::size_of::<INPUT>() as i32,
        );
    }
    Ok(())
}

fn send_mouse_button(button: MouseButton, pressed: bool) -> Result<(), EmulationError> {
    let flags = match (button, pressed) {
        (MouseButton::Left, true) => MOUSEEVENTF_LEFTDOWN,
        (MouseButton::Left, false) => MOUSEEVENTF_LEFTUP,
        (MouseButton::Right, true) => MOUSEEVENTF_RIGHTDOWN,
        (MouseButton::Right, false) => MOUSEEVENTF_RIGHTUP,
        (MouseButton::Middle, true) => MOUSEEVENTF_MIDDLEDOWN,
        (MouseButton::Middle, false) => MOUSEEVENTF_MIDDLEUP,
    };

    let input = INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT { dx: 0, dy: 0, mouseData: 0, dwFlags: flags, time: 0, dwExtraInfo: 0 },
        },
    };
    // SAFETY: input is a valid INPUT structure
    unsafe {
        windows::Win32::UI::Input::KeyboardAndMouse::SendInput(
            &[input],
            std::mem::size_of::<INPUT>() as i32,
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #[test]
    fn normalize_coords_clamps_to_valid_range() {
        // We can only test the clamping logic; actual screen metrics require a display.
        let result_x = (500i32 * 65535 / 1920).clamp(0, 65535);
        let result_y = (300i32 * 65535 / 1080).clamp(0, 65535);
        assert!((0..=65535).contains(&result_x));
        assert!((0..=65535).contains(&result_y));
    }

    #[test]
    fn normalize_coords_zero_gives_zero() {
        let result_x = (0i32 * 65535 / 1920).clamp(0, 65535);
        assert_eq!(result_x, 0);
    }

    #[test]
    fn normalize_coords_full_width_gives_max() {
        let result_x = (1920i32 * 65535 / 1920).clamp(0, 65535);
        assert_eq!(result_x, 65535);
    }
}
