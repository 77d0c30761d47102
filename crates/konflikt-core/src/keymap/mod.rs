//! Key code translation tables for cross-platform keyboard event mapping.
//!
//! The canonical representation on the wire is USB HID Usage IDs (page 0x07,
//! Keyboard/Keypad). Platform-specific codes are translated to/from HID at
//! the capture/emulation boundary in each binary crate's infrastructure
//! layer; this module only carries the shared [`HidKeyCode`] type and a
//! small set of conversions used by more than one platform.

pub mod hid;

pub use hid::HidKeyCode;

/// Translates a [`HidKeyCode`] to the DOM `KeyboardEvent.code` string used by
/// the layout-editor web UI's diagnostic key display.
///
/// Returns `None` if the HID code has no DOM code equivalent.
pub fn hid_to_dom_code(hid: HidKeyCode) -> Option<&'static str> {
    use HidKeyCode::*;
    Some(match hid {
        KeyA => "KeyA",
        KeyB => "KeyB",
        KeyC => "KeyC",
        KeyD => "KeyD",
        KeyE => "KeyE",
        KeyF => "KeyF",
        KeyG => "KeyG",
        KeyH => "KeyH",
        KeyI => "KeyI",
        KeyJ => "KeyJ",
        KeyK => "KeyK",
        KeyL => "KeyL",
        KeyM => "KeyM",
        KeyN => "KeyN",
        KeyO => "KeyO",
        KeyP => "KeyP",
        KeyQ => "KeyQ",
        KeyR => "KeyR",
        KeyS => "KeyS",
        KeyT => "KeyT",
        KeyU => "KeyU",
        KeyV => "KeyV",
        KeyW => "KeyW",
        KeyX => "KeyX",
        KeyY => "KeyY",
        KeyZ => "KeyZ",
        Digit0 => "Digit0",
        Digit1 => "Digit1",
        Digit2 => "Digit2",
        Digit3 => "Digit3",
        Digit4 => "Digit4",
        Digit5 => "Digit5",
        Digit6 => "Digit6",
        Digit7 => "Digit7",
        Digit8 => "Digit8",
        Digit9 => "Digit9",
        Enter => "Enter",
        Escape => "Escape",
        Backspace => "Backspace",
        Tab => "Tab",
        Space => "Space",
        ArrowLeft => "ArrowLeft",
        ArrowRight => "ArrowRight",
        ArrowUp => "ArrowUp",
        ArrowDown => "ArrowDown",
        ControlLeft => "ControlLeft",
        ControlRight => "ControlRight",
        ShiftLeft => "ShiftLeft",
        ShiftRight => "ShiftRight",
        AltLeft => "AltLeft",
        AltRight => "AltRight",
        MetaLeft => "MetaLeft",
        MetaRight => "MetaRight",
        Unknown => return None,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys_map_to_dom_codes() {
        assert_eq!(hid_to_dom_code(HidKeyCode::KeyA), Some("KeyA"));
        assert_eq!(hid_to_dom_code(HidKeyCode::Enter), Some("Enter"));
    }

    #[test]
    fn unknown_key_has_no_dom_code() {
        assert_eq!(hid_to_dom_code(HidKeyCode::Unknown), None);
    }
}
