//! Application layer use cases for the keyproxy binary.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure data and rules, here in `keyproxy_core`) and the infrastructure
//! (terminal, Bluetooth, files). Use cases here depend on traits such as
//! [`crate::infrastructure::input_capture::InputSource`] rather than on a
//! concrete terminal, so tests can drive them with mocks.
//!
//! # Sub-modules
//!
//! - **`capture_keys`** – The foreground loop that reads key presses, queues
//!   them for the sender and updates the overlay.
//!
//! - **`supervise`** – Starts the sender, runs the capture loop against an
//!   external interrupt and stops the sender afterwards.

pub mod capture_keys;
pub mod supervise;
