//! Application layer use cases for the sender.
//!
//! # What use cases does the sender have?
//!
//! - **`find_device`** – Scans until a peripheral with the configured name
//!   shows up, rescanning forever on timeout.
//!
//! - **`connect_device`** – The connection state machine: connect, discover
//!   services and characteristics, reconnect on loss, and decide when the link
//!   is ready for writes.
//!
//! - **`send_events`** – The two periodic duties: drain one queued event per
//!   transmit tick, and write a keepalive frame every second.
//!
//! - **`run_sender`** – The loop that wires the three together on one task and
//!   the helpers that spawn it.

pub mod connect_device;
pub mod find_device;
pub mod run_sender;
pub mod send_events;
