//! keyproxy-sender library entry point.
//!
//! # What does the sender do? (for beginners)
//!
//! The sender is the half of keyproxy that owns the radio. It runs as a single
//! tokio task next to the capture loop and:
//!
//! 1. Scans for a BLE peripheral whose advertised name matches the configured
//!    one, rescanning every time a scan window runs out.
//! 2. Connects to it, discovers its services and picks the first
//!    characteristic of the last service reported.
//! 3. Every 10 ms, takes at most one key event from the queue and writes it to
//!    that characteristic as a 3-byte frame.
//! 4. Every second, writes a 3-byte all-zero keepalive frame so the link does
//!    not idle out.
//! 5. Reconnects immediately whenever the link drops. Events typed meanwhile
//!    wait in the queue and are sent in order once the link is back.
//!
//! The task never stops on its own except on a fatal scan error. The
//! supervisor ends it by aborting the task.

/// Application layer: discovery, connection state machine and transmission.
pub mod application;

/// Infrastructure layer: BLE adapters.
pub mod infrastructure;

pub use application::run_sender::{
    run_sender, spawn_sender, spawn_sender_with, SenderConfig, SenderError,
};
