//! The [`KeyEvent`] value relayed from the host keyboard to the peripheral.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

/// Canonical 8-bit modifier mask, one bit per modifier key.
///
/// The bit layout is the USB HID boot-keyboard modifier byte, which the
/// peripheral feeds straight into its HID stack. It is independent of the
/// capture layer's own modifier encoding; the capture side translates into
/// this mask through a lookup table.
///
/// | bit | key         |
/// |-----|-------------|
/// | 0   | Left Ctrl   |
/// | 1   | Left Shift  |
/// | 2   | Left Alt    |
/// | 3   | Left Meta   |
/// | 4   | Right Ctrl  |
/// | 5   | Right Shift |
/// | 6   | Right Alt   |
/// | 7   | Right Meta  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ModifierMask(pub u8);

impl ModifierMask {
    pub const LEFT_CTRL: u8 = 0x01;
    pub const LEFT_SHIFT: u8 = 0x02;
    pub const LEFT_ALT: u8 = 0x04;
    pub const LEFT_META: u8 = 0x08;
    pub const RIGHT_CTRL: u8 = 0x10;
    pub const RIGHT_SHIFT: u8 = 0x20;
    pub const RIGHT_ALT: u8 = 0x40;
    pub const RIGHT_META: u8 = 0x80;

    /// The mask with no modifier held.
    pub const NONE: ModifierMask = ModifierMask(0);

    /// Returns the raw mask byte.
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` if no modifier bit is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every bit in `bits` is set.
    pub fn contains(self, bits: u8) -> bool {
        self.0 & bits == bits
    }

    /// Returns `true` if either Ctrl modifier is active.
    pub fn ctrl(self) -> bool {
        self.0 & (Self::LEFT_CTRL | Self::RIGHT_CTRL) != 0
    }

    /// Returns `true` if either Shift modifier is active.
    pub fn shift(self) -> bool {
        self.0 & (Self::LEFT_SHIFT | Self::RIGHT_SHIFT) != 0
    }

    /// Returns `true` if either Alt modifier is active.
    pub fn alt(self) -> bool {
        self.0 & (Self::LEFT_ALT | Self::RIGHT_ALT) != 0
    }

    /// Returns `true` if either Meta (Win/Cmd/Super) modifier is active.
    pub fn meta(self) -> bool {
        self.0 & (Self::LEFT_META | Self::RIGHT_META) != 0
    }
}

impl BitOr<u8> for ModifierMask {
    type Output = ModifierMask;

    fn bitor(self, rhs: u8) -> ModifierMask {
        ModifierMask(self.0 | rhs)
    }
}

impl BitOr for ModifierMask {
    type Output = ModifierMask;

    fn bitor(self, rhs: ModifierMask) -> ModifierMask {
        ModifierMask(self.0 | rhs.0)
    }
}

impl fmt::Display for ModifierMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// A single key-down or key-up observed on the host keyboard.
///
/// Created by the capture loop on every key transition, consumed by the sender
/// and then discarded. Never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyEvent {
    /// `true` for key-down, `false` for key-up.
    pub pressed: bool,
    /// USB HID Usage ID (keyboard page 0x07) of the physical key.
    pub scancode: u8,
    /// Modifiers held at the time of the transition.
    pub modifiers: ModifierMask,
}

impl KeyEvent {
    /// Creates a key-down event.
    pub fn down(scancode: u8, modifiers: ModifierMask) -> Self {
        Self {
            pressed: true,
            scancode,
            modifiers,
        }
    }

    /// Creates a key-up event.
    pub fn up(scancode: u8, modifiers: ModifierMask) -> Self {
        Self {
            pressed: false,
            scancode,
            modifiers,
        }
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} 0x{:02X} mods={}",
            if self.pressed { "down" } else { "up" },
            self.scancode,
            self.modifiers
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_mask_side_agnostic_queries() {
        let mask = ModifierMask(ModifierMask::RIGHT_CTRL | ModifierMask::LEFT_SHIFT);
        assert!(mask.ctrl());
        assert!(mask.shift());
        assert!(!mask.alt());
        assert!(!mask.meta());
    }

    #[test]
    fn test_modifier_mask_bits_are_distinct() {
        let all = [
            ModifierMask::LEFT_CTRL,
            ModifierMask::LEFT_SHIFT,
            ModifierMask::LEFT_ALT,
            ModifierMask::LEFT_META,
            ModifierMask::RIGHT_CTRL,
            ModifierMask::RIGHT_SHIFT,
            ModifierMask::RIGHT_ALT,
            ModifierMask::RIGHT_META,
        ];
        let combined = all.iter().fold(0u8, |acc, b| {
            assert_eq!(acc & b, 0, "bit 0x{b:02X} overlaps another modifier");
            acc | b
        });
        assert_eq!(combined, 0xFF);
    }

    #[test]
    fn test_bitor_accumulates_bits() {
        let mask = ModifierMask::NONE | ModifierMask::LEFT_ALT | ModifierMask::RIGHT_META;
        assert!(mask.contains(ModifierMask::LEFT_ALT | ModifierMask::RIGHT_META));
        assert!(!mask.is_empty());
        assert!(ModifierMask::default().is_empty());
    }

    #[test]
    fn test_constructors_set_pressed_flag() {
        let down = KeyEvent::down(0x04, ModifierMask::NONE);
        let up = KeyEvent::up(0x04, ModifierMask::NONE);
        assert!(down.pressed);
        assert!(!up.pressed);
        assert_eq!(down.scancode, up.scancode);
    }

    #[test]
    fn test_display_is_compact() {
        let ev = KeyEvent::down(0x04, ModifierMask(ModifierMask::LEFT_SHIFT));
        assert_eq!(ev.to_string(), "down 0x04 mods=0x02");
    }
}
