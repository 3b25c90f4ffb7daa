//! Domain entities for keyproxy.
//!
//! This module contains pure values with no infrastructure dependencies.
//!
//! # What is "domain" in Clean Architecture? (for beginners)
//!
//! Clean Architecture organises code into concentric layers. The innermost
//! layer is called the **domain**. Domain code has **no** imports from OS
//! APIs, Bluetooth stacks, or terminal libraries, and can be compiled and
//! tested on any platform without any external setup.
//!
//! For keyproxy the domain is tiny: a key event and the modifier bitmask that
//! travels with it. Everything else (capture, queueing, BLE) depends on these
//! types, never the other way round.

/// The key event value and canonical modifier mask.
///
/// See [`key_event::KeyEvent`] for the main type.
pub mod key_event;
