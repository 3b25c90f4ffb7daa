//! Infrastructure layer for the sender.
//!
//! Contains the adapters that talk to the outside world. For the sender that
//! is only the Bluetooth stack.
//!
//! **Dependency rule**: this layer may depend on `keyproxy_core`, but MUST NOT
//! be imported by the domain layer. The application layer sees it only through
//! the [`ble::BleCentral`] trait.
//!
//! # Sub-modules
//!
//! - **`ble`** – The `BleCentral` capability, its request / notification
//!   types, the `btleplug` adapter and a scriptable `MockCentral` for tests.

pub mod ble;
