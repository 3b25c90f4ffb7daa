//! USB HID Usage IDs (page 0x07, Keyboard/Keypad page).
//!
//! These are the scancodes that travel in byte 1 of every frame. The capture
//! layer reports positional scancodes that coincide with HID usages, and the
//! peripheral passes them straight to its USB HID stack, so no translation
//! happens anywhere along the relay.
//!
//! Reference: USB HID Usage Tables 1.3, Section 10 (Keyboard/Keypad page 0x07).
//!
//! # What is a HID Usage ID? (for beginners)
//!
//! The **USB Human Interface Device (HID)** standard assigns a unique number to
//! every key on a keyboard. These numbers are called *Usage IDs* and they are
//! grouped by *Usage Page*. All keyboard keys are on page 0x07.
//!
//! | Key          | HID Usage ID |
//! |--------------|-------------|
//! | Letter A     | 0x04        |
//! | Letter B     | 0x05        |
//! | Enter        | 0x28        |
//! | Left Ctrl    | 0xE0        |
//!
//! HID codes represent **physical key positions**, not characters. The
//! character a key produces depends on the layout configured on the target
//! machine, which is exactly what a keyboard proxy wants.
//!
//! # Names
//!
//! [`HidKeyCode::name`] returns the short upper-case label shown in the status
//! overlay (`A`, `RETURN`, `LSHIFT`, ...).

use serde::{Deserialize, Serialize};

/// USB HID Usage ID for keyboard keys (page 0x07).
///
/// The numeric value of each variant is its HID Usage ID on the keyboard/keypad page.
/// [`HidKeyCode::Unknown`] represents any key that has no mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum HidKeyCode {
    // Letters (HID 0x04–0x1D)
    KeyA = 0x04,
    KeyB = 0x05,
    KeyC = 0x06,
    KeyD = 0x07,
    KeyE = 0x08,
    KeyF = 0x09,
    KeyG = 0x0A,
    KeyH = 0x0B,
    KeyI = 0x0C,
    KeyJ = 0x0D,
    KeyK = 0x0E,
    KeyL = 0x0F,
    KeyM = 0x10,
    KeyN = 0x11,
    KeyO = 0x12,
    KeyP = 0x13,
    KeyQ = 0x14,
    KeyR = 0x15,
    KeyS = 0x16,
    KeyT = 0x17,
    KeyU = 0x18,
    KeyV = 0x19,
    KeyW = 0x1A,
    KeyX = 0x1B,
    KeyY = 0x1C,
    KeyZ = 0x1D,

    // Digits (HID 0x1E–0x27)
    Digit1 = 0x1E,
    Digit2 = 0x1F,
    Digit3 = 0x20,
    Digit4 = 0x21,
    Digit5 = 0x22,
    Digit6 = 0x23,
    Digit7 = 0x24,
    Digit8 = 0x25,
    Digit9 = 0x26,
    Digit0 = 0x27,

    // Control and punctuation keys (HID 0x28–0x38)
    Enter = 0x28,
    Escape = 0x29,
    Backspace = 0x2A,
    Tab = 0x2B,
    Space = 0x2C,
    Minus = 0x2D,
    Equal = 0x2E,
    BracketLeft = 0x2F,
    BracketRight = 0x30,
    Backslash = 0x31,
    NonUsHash = 0x32,
    Semicolon = 0x33,
    Quote = 0x34,
    Backquote = 0x35,
    Comma = 0x36,
    Period = 0x37,
    Slash = 0x38,

    // Lock keys
    CapsLock = 0x39,

    // Function keys (HID 0x3A–0x45)
    F1 = 0x3A,
    F2 = 0x3B,
    F3 = 0x3C,
    F4 = 0x3D,
    F5 = 0x3E,
    F6 = 0x3F,
    F7 = 0x40,
    F8 = 0x41,
    F9 = 0x42,
    F10 = 0x43,
    F11 = 0x44,
    F12 = 0x45,

    // Navigation cluster (HID 0x46–0x52)
    PrintScreen = 0x46,
    ScrollLock = 0x47,
    Pause = 0x48,
    Insert = 0x49,
    Home = 0x4A,
    PageUp = 0x4B,
    Delete = 0x4C,
    End = 0x4D,
    PageDown = 0x4E,
    ArrowRight = 0x4F,
    ArrowLeft = 0x50,
    ArrowDown = 0x51,
    ArrowUp = 0x52,

    // Numpad (HID 0x53–0x63)
    NumLock = 0x53,
    NumpadDivide = 0x54,
    NumpadMultiply = 0x55,
    NumpadSubtract = 0x56,
    NumpadAdd = 0x57,
    NumpadEnter = 0x58,
    Numpad1 = 0x59,
    Numpad2 = 0x5A,
    Numpad3 = 0x5B,
    Numpad4 = 0x5C,
    Numpad5 = 0x5D,
    Numpad6 = 0x5E,
    Numpad7 = 0x5F,
    Numpad8 = 0x60,
    Numpad9 = 0x61,
    Numpad0 = 0x62,
    NumpadDecimal = 0x63,

    // International and application keys
    IntlBackslash = 0x64,
    ContextMenu = 0x65,

    // Extended function keys (HID 0x68–0x73)
    F13 = 0x68,
    F14 = 0x69,
    F15 = 0x6A,
    F16 = 0x6B,
    F17 = 0x6C,
    F18 = 0x6D,
    F19 = 0x6E,
    F20 = 0x6F,
    F21 = 0x70,
    F22 = 0x71,
    F23 = 0x72,
    F24 = 0x73,

    // Volume
    Mute = 0x7F,
    VolumeUp = 0x80,
    VolumeDown = 0x81,

    // Modifier keys (HID 0xE0–0xE7)
    ControlLeft = 0xE0,
    ShiftLeft = 0xE1,
    AltLeft = 0xE2,
    MetaLeft = 0xE3,
    ControlRight = 0xE4,
    ShiftRight = 0xE5,
    AltRight = 0xE6,
    MetaRight = 0xE7,

    /// Sentinel for keys with no HID mapping.
    Unknown = 0x00,
}

impl HidKeyCode {
    /// Converts a raw HID Usage ID to a [`HidKeyCode`].
    ///
    /// Returns [`HidKeyCode::Unknown`] if the value does not correspond to a
    /// known key code variant.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x04 => HidKeyCode::KeyA,
            0x05 => HidKeyCode::KeyB,
            0x06 => HidKeyCode::KeyC,
            0x07 => HidKeyCode::KeyD,
            0x08 => HidKeyCode::KeyE,
            0x09 => HidKeyCode::KeyF,
            0x0A => HidKeyCode::KeyG,
            0x0B => HidKeyCode::KeyH,
            0x0C => HidKeyCode::KeyI,
            0x0D => HidKeyCode::KeyJ,
            0x0E => HidKeyCode::KeyK,
            0x0F => HidKeyCode::KeyL,
            0x10 => HidKeyCode::KeyM,
            0x11 => HidKeyCode::KeyN,
            0x12 => HidKeyCode::KeyO,
            0x13 => HidKeyCode::KeyP,
            0x14 => HidKeyCode::KeyQ,
            0x15 => HidKeyCode::KeyR,
            0x16 => HidKeyCode::KeyS,
            0x17 => HidKeyCode::KeyT,
            0x18 => HidKeyCode::KeyU,
            0x19 => HidKeyCode::KeyV,
            0x1A => HidKeyCode::KeyW,
            0x1B => HidKeyCode::KeyX,
            0x1C => HidKeyCode::KeyY,
            0x1D => HidKeyCode::KeyZ,
            0x1E => HidKeyCode::Digit1,
            0x1F => HidKeyCode::Digit2,
            0x20 => HidKeyCode::Digit3,
            0x21 => HidKeyCode::Digit4,
            0x22 => HidKeyCode::Digit5,
            0x23 => HidKeyCode::Digit6,
            0x24 => HidKeyCode::Digit7,
            0x25 => HidKeyCode::Digit8,
            0x26 => HidKeyCode::Digit9,
            0x27 => HidKeyCode::Digit0,
            0x28 => HidKeyCode::Enter,
            0x29 => HidKeyCode::Escape,
            0x2A => HidKeyCode::Backspace,
            0x2B => HidKeyCode::Tab,
            0x2C => HidKeyCode::Space,
            0x2D => HidKeyCode::Minus,
            0x2E => HidKeyCode::Equal,
            0x2F => HidKeyCode::BracketLeft,
            0x30 => HidKeyCode::BracketRight,
            0x31 => HidKeyCode::Backslash,
            0x32 => HidKeyCode::NonUsHash,
            0x33 => HidKeyCode::Semicolon,
            0x34 => HidKeyCode::Quote,
            0x35 => HidKeyCode::Backquote,
            0x36 => HidKeyCode::Comma,
            0x37 => HidKeyCode::Period,
            0x38 => HidKeyCode::Slash,
            0x39 => HidKeyCode::CapsLock,
            0x3A => HidKeyCode::F1,
            0x3B => HidKeyCode::F2,
            0x3C => HidKeyCode::F3,
            0x3D => HidKeyCode::F4,
            0x3E => HidKeyCode::F5,
            0x3F => HidKeyCode::F6,
            0x40 => HidKeyCode::F7,
            0x41 => HidKeyCode::F8,
            0x42 => HidKeyCode::F9,
            0x43 => HidKeyCode::F10,
            0x44 => HidKeyCode::F11,
            0x45 => HidKeyCode::F12,
            0x46 => HidKeyCode::PrintScreen,
            0x47 => HidKeyCode::ScrollLock,
            0x48 => HidKeyCode::Pause,
            0x49 => HidKeyCode::Insert,
            0x4A => HidKeyCode::Home,
            0x4B => HidKeyCode::PageUp,
            0x4C => HidKeyCode::Delete,
            0x4D => HidKeyCode::End,
            0x4E => HidKeyCode::PageDown,
            0x4F => HidKeyCode::ArrowRight,
            0x50 => HidKeyCode::ArrowLeft,
            0x51 => HidKeyCode::ArrowDown,
            0x52 => HidKeyCode::ArrowUp,
            0x53 => HidKeyCode::NumLock,
            0x54 => HidKeyCode::NumpadDivide,
            0x55 => HidKeyCode::NumpadMultiply,
            0x56 => HidKeyCode::NumpadSubtract,
            0x57 => HidKeyCode::NumpadAdd,
            0x58 => HidKeyCode::NumpadEnter,
            0x59 => HidKeyCode::Numpad1,
            0x5A => HidKeyCode::Numpad2,
            0x5B => HidKeyCode::Numpad3,
            0x5C => HidKeyCode::Numpad4,
            0x5D => HidKeyCode::Numpad5,
            0x5E => HidKeyCode::Numpad6,
            0x5F => HidKeyCode::Numpad7,
            0x60 => HidKeyCode::Numpad8,
            0x61 => HidKeyCode::Numpad9,
            0x62 => HidKeyCode::Numpad0,
            0x63 => HidKeyCode::NumpadDecimal,
            0x64 => HidKeyCode::IntlBackslash,
            0x65 => HidKeyCode::ContextMenu,
            0x68 => HidKeyCode::F13,
            0x69 => HidKeyCode::F14,
            0x6A => HidKeyCode::F15,
            0x6B => HidKeyCode::F16,
            0x6C => HidKeyCode::F17,
            0x6D => HidKeyCode::F18,
            0x6E => HidKeyCode::F19,
            0x6F => HidKeyCode::F20,
            0x70 => HidKeyCode::F21,
            0x71 => HidKeyCode::F22,
            0x72 => HidKeyCode::F23,
            0x73 => HidKeyCode::F24,
            0x7F => HidKeyCode::Mute,
            0x80 => HidKeyCode::VolumeUp,
            0x81 => HidKeyCode::VolumeDown,
            0xE0 => HidKeyCode::ControlLeft,
            0xE1 => HidKeyCode::ShiftLeft,
            0xE2 => HidKeyCode::AltLeft,
            0xE3 => HidKeyCode::MetaLeft,
            0xE4 => HidKeyCode::ControlRight,
            0xE5 => HidKeyCode::ShiftRight,
            0xE6 => HidKeyCode::AltRight,
            0xE7 => HidKeyCode::MetaRight,
            _ => HidKeyCode::Unknown,
        }
    }

    /// Returns the raw USB HID Usage ID value for this key code.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns `true` if this is a modifier key.
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            HidKeyCode::ControlLeft
                | HidKeyCode::ControlRight
                | HidKeyCode::ShiftLeft
                | HidKeyCode::ShiftRight
                | HidKeyCode::AltLeft
                | HidKeyCode::AltRight
                | HidKeyCode::MetaLeft
                | HidKeyCode::MetaRight
        )
    }

    /// Short upper-case label for the status overlay.
    pub fn name(self) -> &'static str {
        match self {
            HidKeyCode::KeyA => "A",
            HidKeyCode::KeyB => "B",
            HidKeyCode::KeyC => "C",
            HidKeyCode::KeyD => "D",
            HidKeyCode::KeyE => "E",
            HidKeyCode::KeyF => "F",
            HidKeyCode::KeyG => "G",
            HidKeyCode::KeyH => "H",
            HidKeyCode::KeyI => "I",
            HidKeyCode::KeyJ => "J",
            HidKeyCode::KeyK => "K",
            HidKeyCode::KeyL => "L",
            HidKeyCode::KeyM => "M",
            HidKeyCode::KeyN => "N",
            HidKeyCode::KeyO => "O",
            HidKeyCode::KeyP => "P",
            HidKeyCode::KeyQ => "Q",
            HidKeyCode::KeyR => "R",
            HidKeyCode::KeyS => "S",
            HidKeyCode::KeyT => "T",
            HidKeyCode::KeyU => "U",
            HidKeyCode::KeyV => "V",
            HidKeyCode::KeyW => "W",
            HidKeyCode::KeyX => "X",
            HidKeyCode::KeyY => "Y",
            HidKeyCode::KeyZ => "Z",
            HidKeyCode::Digit1 => "1",
            HidKeyCode::Digit2 => "2",
            HidKeyCode::Digit3 => "3",
            HidKeyCode::Digit4 => "4",
            HidKeyCode::Digit5 => "5",
            HidKeyCode::Digit6 => "6",
            HidKeyCode::Digit7 => "7",
            HidKeyCode::Digit8 => "8",
            HidKeyCode::Digit9 => "9",
            HidKeyCode::Digit0 => "0",
            HidKeyCode::Enter => "RETURN",
            HidKeyCode::Escape => "ESCAPE",
            HidKeyCode::Backspace => "BACKSPACE",
            HidKeyCode::Tab => "TAB",
            HidKeyCode::Space => "SPACE",
            HidKeyCode::Minus => "MINUS",
            HidKeyCode::Equal => "EQUALS",
            HidKeyCode::BracketLeft => "LEFTBRACKET",
            HidKeyCode::BracketRight => "RIGHTBRACKET",
            HidKeyCode::Backslash => "BACKSLASH",
            HidKeyCode::NonUsHash => "NONUSHASH",
            HidKeyCode::Semicolon => "SEMICOLON",
            HidKeyCode::Quote => "APOSTROPHE",
            HidKeyCode::Backquote => "GRAVE",
            HidKeyCode::Comma => "COMMA",
            HidKeyCode::Period => "PERIOD",
            HidKeyCode::Slash => "SLASH",
            HidKeyCode::CapsLock => "CAPSLOCK",
            HidKeyCode::F1 => "F1",
            HidKeyCode::F2 => "F2",
            HidKeyCode::F3 => "F3",
            HidKeyCode::F4 => "F4",
            HidKeyCode::F5 => "F5",
            HidKeyCode::F6 => "F6",
            HidKeyCode::F7 => "F7",
            HidKeyCode::F8 => "F8",
            HidKeyCode::F9 => "F9",
            HidKeyCode::F10 => "F10",
            HidKeyCode::F11 => "F11",
            HidKeyCode::F12 => "F12",
            HidKeyCode::PrintScreen => "PRINTSCREEN",
            HidKeyCode::ScrollLock => "SCROLLLOCK",
            HidKeyCode::Pause => "PAUSE",
            HidKeyCode::Insert => "INSERT",
            HidKeyCode::Home => "HOME",
            HidKeyCode::PageUp => "PAGEUP",
            HidKeyCode::Delete => "DELETE",
            HidKeyCode::End => "END",
            HidKeyCode::PageDown => "PAGEDOWN",
            HidKeyCode::ArrowRight => "RIGHT",
            HidKeyCode::ArrowLeft => "LEFT",
            HidKeyCode::ArrowDown => "DOWN",
            HidKeyCode::ArrowUp => "UP",
            HidKeyCode::NumLock => "NUMLOCKCLEAR",
            HidKeyCode::NumpadDivide => "KP_DIVIDE",
            HidKeyCode::NumpadMultiply => "KP_MULTIPLY",
            HidKeyCode::NumpadSubtract => "KP_MINUS",
            HidKeyCode::NumpadAdd => "KP_PLUS",
            HidKeyCode::NumpadEnter => "KP_ENTER",
            HidKeyCode::Numpad1 => "KP_1",
            HidKeyCode::Numpad2 => "KP_2",
            HidKeyCode::Numpad3 => "KP_3",
            HidKeyCode::Numpad4 => "KP_4",
            HidKeyCode::Numpad5 => "KP_5",
            HidKeyCode::Numpad6 => "KP_6",
            HidKeyCode::Numpad7 => "KP_7",
            HidKeyCode::Numpad8 => "KP_8",
            HidKeyCode::Numpad9 => "KP_9",
            HidKeyCode::Numpad0 => "KP_0",
            HidKeyCode::NumpadDecimal => "KP_PERIOD",
            HidKeyCode::IntlBackslash => "NONUSBACKSLASH",
            HidKeyCode::ContextMenu => "APPLICATION",
            HidKeyCode::F13 => "F13",
            HidKeyCode::F14 => "F14",
            HidKeyCode::F15 => "F15",
            HidKeyCode::F16 => "F16",
            HidKeyCode::F17 => "F17",
            HidKeyCode::F18 => "F18",
            HidKeyCode::F19 => "F19",
            HidKeyCode::F20 => "F20",
            HidKeyCode::F21 => "F21",
            HidKeyCode::F22 => "F22",
            HidKeyCode::F23 => "F23",
            HidKeyCode::F24 => "F24",
            HidKeyCode::Mute => "MUTE",
            HidKeyCode::VolumeUp => "VOLUMEUP",
            HidKeyCode::VolumeDown => "VOLUMEDOWN",
            HidKeyCode::ControlLeft => "LCTRL",
            HidKeyCode::ShiftLeft => "LSHIFT",
            HidKeyCode::AltLeft => "LALT",
            HidKeyCode::MetaLeft => "LGUI",
            HidKeyCode::ControlRight => "RCTRL",
            HidKeyCode::ShiftRight => "RSHIFT",
            HidKeyCode::AltRight => "RALT",
            HidKeyCode::MetaRight => "RGUI",
            HidKeyCode::Unknown => "UNKNOWN",
        }
    }
}

/// Returns the overlay label for a raw scancode.
///
/// Modifier keys and unknown usages return `None`: the overlay lists held
/// modifiers separately, so repeating them as "the pressed key" is noise.
pub fn scancode_name(scancode: u8) -> Option<&'static str> {
    match HidKeyCode::from_u8(scancode) {
        HidKeyCode::Unknown => None,
        code if code.is_modifier() => None,
        code => Some(code.name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Standard HID key codes that must have valid from_u8/as_u8 round-trips.
    const STANDARD_KEYS: &[(u8, HidKeyCode)] = &[
        (0x04, HidKeyCode::KeyA),
        (0x05, HidKeyCode::KeyB),
        (0x1E, HidKeyCode::Digit1),
        (0x27, HidKeyCode::Digit0),
        (0x28, HidKeyCode::Enter),
        (0x29, HidKeyCode::Escape),
        (0x2A, HidKeyCode::Backspace),
        (0x2B, HidKeyCode::Tab),
        (0x2C, HidKeyCode::Space),
        (0x39, HidKeyCode::CapsLock),
        (0x3A, HidKeyCode::F1),
        (0x45, HidKeyCode::F12),
        (0x46, HidKeyCode::PrintScreen),
        (0x4A, HidKeyCode::Home),
        (0x4F, HidKeyCode::ArrowRight),
        (0x52, HidKeyCode::ArrowUp),
        (0x53, HidKeyCode::NumLock),
        (0x58, HidKeyCode::NumpadEnter),
        (0x62, HidKeyCode::Numpad0),
        (0x65, HidKeyCode::ContextMenu),
        (0x73, HidKeyCode::F24),
        (0xE0, HidKeyCode::ControlLeft),
        (0xE1, HidKeyCode::ShiftLeft),
        (0xE2, HidKeyCode::AltLeft),
        (0xE3, HidKeyCode::MetaLeft),
        (0xE4, HidKeyCode::ControlRight),
        (0xE5, HidKeyCode::ShiftRight),
        (0xE6, HidKeyCode::AltRight),
        (0xE7, HidKeyCode::MetaRight),
    ];

    #[test]
    fn test_from_u8_produces_correct_key_codes_for_all_standard_keys() {
        for &(raw, expected) in STANDARD_KEYS {
            let result = HidKeyCode::from_u8(raw);
            assert_eq!(result, expected, "from_u8(0x{raw:02X}) should produce {expected:?}");
        }
    }

    #[test]
    fn test_every_known_code_round_trips() {
        for raw in 0..=u8::MAX {
            let code = HidKeyCode::from_u8(raw);
            if code != HidKeyCode::Unknown {
                assert_eq!(code.as_u8(), raw, "round-trip for 0x{raw:02X} failed");
            }
        }
    }

    #[test]
    fn test_unassigned_values_return_unknown() {
        for unassigned in [0x00, 0x01, 0x02, 0x03, 0x66, 0xA0, 0xE8, 0xFF] {
            assert_eq!(
                HidKeyCode::from_u8(unassigned),
                HidKeyCode::Unknown,
                "0x{unassigned:02X} should map to Unknown"
            );
        }
    }

    #[test]
    fn test_modifier_keys_are_identified_correctly() {
        for raw in 0xE0..=0xE7u8 {
            assert!(HidKeyCode::from_u8(raw).is_modifier(), "0x{raw:02X} is a modifier");
        }
        for k in [HidKeyCode::KeyA, HidKeyCode::Enter, HidKeyCode::F1, HidKeyCode::Unknown] {
            assert!(!k.is_modifier(), "{k:?} should NOT be a modifier key");
        }
    }

    #[test]
    fn test_names_match_overlay_labels() {
        assert_eq!(HidKeyCode::KeyA.name(), "A");
        assert_eq!(HidKeyCode::Digit0.name(), "0");
        assert_eq!(HidKeyCode::Enter.name(), "RETURN");
        assert_eq!(HidKeyCode::ArrowLeft.name(), "LEFT");
        assert_eq!(HidKeyCode::ShiftLeft.name(), "LSHIFT");
    }

    #[test]
    fn test_scancode_name_skips_modifiers_and_unknown() {
        assert_eq!(scancode_name(0x04), Some("A"));
        assert_eq!(scancode_name(0x2C), Some("SPACE"));
        assert_eq!(scancode_name(0xE1), None);
        assert_eq!(scancode_name(0x00), None);
    }

    #[test]
    fn test_all_letter_keys_are_contiguous() {
        for (i, raw) in (0x04u8..=0x1D).enumerate() {
            let expected = (b'A' + i as u8) as char;
            assert_eq!(HidKeyCode::from_u8(raw).name(), expected.to_string());
        }
    }
}
