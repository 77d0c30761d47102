//! Windows Virtual-Key code to [`HidKeyCode`] translation.
//!
//! Kept separate from `windows.rs` so it compiles (and is testable) on every
//! platform — useful for the low-level hook module, which is Windows-only,
//! but the mapping table itself has no OS dependency.

use konflikt_core::HidKeyCode;

/// Translates a Win32 virtual-key code to its HID Usage ID equivalent.
/// Keys with no HID mapping in [`HidKeyCode`] (most notably numpad-specific
/// VKs not distinguished from their main-block counterparts by `vkCode`
/// alone) fall back to [`HidKeyCode::Unknown`].
pub fn vk_to_hid(vk_code: u8) -> HidKeyCode {
    use HidKeyCode::*;
    match vk_code {
        0x41 => KeyA,
        0x42 => KeyB,
        0x43 => KeyC,
        0x44 => KeyD,
        0x45 => KeyE,
        0x46 => KeyF,
        0x47 => KeyG,
        0x48 => KeyH,
        0x49 => KeyI,
        0x4A => KeyJ,
        0x4B => KeyK,
        0x4C => KeyL,
        0x4D => KeyM,
        0x4E => KeyN,
        0x4F => KeyO,
        0x50 => KeyP,
        0x51 => KeyQ,
        0x52 => KeyR,
        0x53 => KeyS,
        0x54 => KeyT,
        0x55 => KeyU,
        0x56 => KeyV,
        0x57 => KeyW,
        0x58 => KeyX,
        0x59 => KeyY,
        0x5A => KeyZ,
        0x30 => Digit0,
        0x31 => Digit1,
        0x32 => Digit2,
        0x33 => Digit3,
        0x34 => Digit4,
        0x35 => Digit5,
        0x36 => Digit6,
        0x37 => Digit7,
        0x38 => Digit8,
        0x39 => Digit9,
        0x0D => Enter,
        0x1B => Escape,
        0x08 => Backspace,
        0x09 => Tab,
        0x20 => Space,
        0xBD => Minus,
        0xBB => Equal,
        0xDB => BracketLeft,
        0xDD => BracketRight,
        0xDC => Backslash,
        0xBA => Semicolon,
        0xDE => Quote,
        0xC0 => Backquote,
        0xBC => Comma,
        0xBE => Period,
        0xBF => Slash,
        0x14 => CapsLock,
        0x70 => F1,
        0x71 => F2,
        0x72 => F3,
        0x73 => F4,
        0x74 => F5,
        0x75 => F6,
        0x76 => F7,
        0x77 => F8,
        0x78 => F9,
        0x79 => F10,
        0x7A => F11,
        0x7B => F12,
        0x2C => PrintScreen,
        0x91 => ScrollLock,
        0x13 => Pause,
        0x2D => Insert,
        0x24 => Home,
        0x21 => PageUp,
        0x2E => Delete,
        0x23 => End,
        0x22 => PageDown,
        0x27 => ArrowRight,
        0x25 => ArrowLeft,
        0x28 => ArrowDown,
        0x26 => ArrowUp,
        0x5D => ContextMenu,
        0xA2 => ControlLeft,
        0xA0 => ShiftLeft,
        0xA4 => AltLeft,
        0x5B => MetaLeft,
        0xA3 => ControlRight,
        0xA1 => ShiftRight,
        0xA5 => AltRight,
        0x5C => MetaRight,
        _ => Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_a_maps_to_key_a() {
        assert_eq!(vk_to_hid(0x41), HidKeyCode::KeyA);
    }

    #[test]
    fn unrecognized_vk_code_maps_to_unknown() {
        assert_eq!(vk_to_hid(0xFE), HidKeyCode::Unknown);
    }

    #[test]
    fn left_and_right_shift_are_distinguished() {
        assert_eq!(vk_to_hid(0xA0), HidKeyCode::ShiftLeft);
        assert_eq!(vk_to_hid(0xA1), HidKeyCode::ShiftRight);
    }
}
