//! Keyboard capture infrastructure.
//!
//! The capture loop reads key presses from an [`InputSource`] and shows what
//! was last pressed on a small overlay. The source owns both halves: it is the
//! thing the user types into and the thing that displays the status text.
//!
//! # Two modifier encodings (for beginners)
//!
//! Capture backends report held modifiers in their own bit layout. Ours is
//! [`RawModifiers`], which uses one bit per side of each modifier key plus the
//! lock keys. The peripheral expects the USB HID modifier byte instead
//! ([`ModifierMask`]). [`RawModifiers::to_mask`] translates between the two
//! through a fixed table; bits with no HID counterpart (the lock keys) are
//! dropped.
//!
//! # Testability
//!
//! The [`InputSource`] trait allows unit tests to script key presses with
//! [`mock::MockInputSource`] instead of a real terminal.

use std::fmt;

use keyproxy_core::ModifierMask;

pub mod mock;
pub mod terminal;

// ── Raw modifiers ─────────────────────────────────────────────────────────────

/// Modifier state as reported by the capture backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawModifiers(pub u16);

impl RawModifiers {
    pub const LSHIFT: u16 = 0x0001;
    pub const RSHIFT: u16 = 0x0002;
    pub const LCTRL: u16 = 0x0040;
    pub const RCTRL: u16 = 0x0080;
    pub const LALT: u16 = 0x0100;
    pub const RALT: u16 = 0x0200;
    pub const LGUI: u16 = 0x0400;
    pub const RGUI: u16 = 0x0800;
    pub const NUM: u16 = 0x1000;
    pub const CAPS: u16 = 0x2000;

    pub const NONE: RawModifiers = RawModifiers(0);

    /// Returns `true` if no modifier bit is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every bit in `bits` is set.
    pub fn contains(self, bits: u16) -> bool {
        self.0 & bits == bits
    }

    /// Returns a copy with `bits` set or cleared.
    pub fn with(self, bits: u16, set: bool) -> Self {
        if set {
            RawModifiers(self.0 | bits)
        } else {
            RawModifiers(self.0 & !bits)
        }
    }

    /// Translates to the HID modifier byte sent to the peripheral.
    pub fn to_mask(self) -> ModifierMask {
        RAW_TO_HID
            .iter()
            .filter(|(raw, _)| self.contains(*raw))
            .fold(ModifierMask::NONE, |mask, (_, hid)| mask | *hid)
    }

    /// Names of the set bits, in display order.
    pub fn names(self) -> Vec<&'static str> {
        MODIFIER_NAMES
            .iter()
            .filter(|(raw, _)| self.contains(*raw))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl fmt::Display for RawModifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// Capture-layer modifier bit to HID modifier bit.
const RAW_TO_HID: [(u16, u8); 8] = [
    (RawModifiers::LSHIFT, ModifierMask::LEFT_SHIFT),
    (RawModifiers::RSHIFT, ModifierMask::RIGHT_SHIFT),
    (RawModifiers::LCTRL, ModifierMask::LEFT_CTRL),
    (RawModifiers::RCTRL, ModifierMask::RIGHT_CTRL),
    (RawModifiers::LALT, ModifierMask::LEFT_ALT),
    (RawModifiers::RALT, ModifierMask::RIGHT_ALT),
    (RawModifiers::LGUI, ModifierMask::LEFT_META),
    (RawModifiers::RGUI, ModifierMask::RIGHT_META),
];

const MODIFIER_NAMES: [(u16, &str); 10] = [
    (RawModifiers::LSHIFT, "LSHIFT"),
    (RawModifiers::RSHIFT, "RSHIFT"),
    (RawModifiers::LCTRL, "LCTRL"),
    (RawModifiers::RCTRL, "RCTRL"),
    (RawModifiers::LALT, "LALT"),
    (RawModifiers::RALT, "RALT"),
    (RawModifiers::LGUI, "LGUI"),
    (RawModifiers::RGUI, "RGUI"),
    (RawModifiers::NUM, "NUM"),
    (RawModifiers::CAPS, "CAPS"),
];

// ── Events and errors ─────────────────────────────────────────────────────────

/// A raw input event produced by an [`InputSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInputEvent {
    /// A key was pressed down.
    KeyDown {
        /// USB HID usage ID of the key.
        scancode: u8,
        /// Modifiers held at the time of the event.
        modifiers: RawModifiers,
    },
    /// A key was released.
    KeyUp { scancode: u8, modifiers: RawModifiers },
    /// The user closed the capture window.
    Quit,
}

/// Error type for input capture operations.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("terminal I/O failed: {0}")]
    Terminal(#[from] std::io::Error),
    #[error("input source is not a terminal")]
    NotATerminal,
    #[error("input source failed: {0}")]
    Failed(String),
}

/// Trait abstracting the capture window.
///
/// The production implementation is [`terminal::TerminalInput`]; tests use
/// [`mock::MockInputSource`]. No method may block: the capture loop calls
/// them from an async task on a fixed tick.
pub trait InputSource: Send {
    /// Makes the window visible and ready to receive keys.
    fn show(&mut self) -> Result<(), CaptureError>;
    /// Drains every event that arrived since the last call.
    fn poll_events(&mut self) -> Result<Vec<RawInputEvent>, CaptureError>;
    /// Replaces the overlay text. An empty string clears it.
    fn render(&mut self, text: &str) -> Result<(), CaptureError>;
    /// Pushes pending drawing to the screen.
    fn refresh(&mut self) -> Result<(), CaptureError>;
}
