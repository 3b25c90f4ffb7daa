//! # keyproxy-core
//!
//! Shared library for keyproxy containing the key event model, the 3-byte
//! wire codec, the cross-task event queue, the sender liveness flag, and the
//! USB HID usage table.
//!
//! This crate is used by both the capture side (`keyproxy`) and the BLE sender
//! (`keyproxy-sender`). It has zero dependencies on OS APIs, terminal
//! libraries, or Bluetooth stacks.
//!
//! # Architecture overview (for beginners)
//!
//! keyproxy turns the host keyboard into a wireless keyboard for another
//! machine. A small BLE peripheral (for example a Flipper-class gadget plugged
//! into the target machine over USB) advertises one writable GATT
//! characteristic. Every key press or release on the host is written to that
//! characteristic as three bytes, and the peripheral replays it as a USB HID
//! report.
//!
//! This crate (`keyproxy-core`) is the shared foundation. It defines:
//!
//! - **`domain`** – The [`KeyEvent`] value and the canonical 8-bit
//!   [`ModifierMask`].
//!
//! - **`protocol`** – How a [`KeyEvent`] becomes three bytes on the wire, and
//!   the all-zero keepalive frame.
//!
//! - **`queue`** – The unbounded FIFO that carries events from the capture
//!   loop to the sender. It is the only buffer in the system.
//!
//! - **`liveness`** – The boolean the capture loop watches to learn that the
//!   sender has died.
//!
//! - **`keymap`** – USB HID Usage IDs (the scancodes on the wire) and their
//!   symbolic names for the status overlay.

pub mod domain;
pub mod keymap;
pub mod liveness;
pub mod protocol;
pub mod queue;

// Re-export the most-used types at the crate root so callers can write
// `keyproxy_core::KeyEvent` instead of `keyproxy_core::domain::key_event::KeyEvent`.
pub use domain::key_event::{KeyEvent, ModifierMask};
pub use keymap::hid::HidKeyCode;
pub use liveness::{LivenessGuard, SenderLiveness};
pub use protocol::codec::{decode_key_event, encode_key_event, ProtocolError};
pub use queue::{event_queue, EventQueueConsumer, EventQueueProducer, QueueError};
