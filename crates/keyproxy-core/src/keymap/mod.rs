//! Key code tables.
//!
//! The canonical representation is USB HID Usage IDs (page 0x07,
//! Keyboard/Keypad). Capture backends translate into HID at the capture
//! boundary; nothing downstream ever sees a platform key code.

pub mod hid;

pub use hid::{scancode_name, HidKeyCode};
