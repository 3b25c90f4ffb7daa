//! Infrastructure layer for the keyproxy binary.
//!
//! Contains OS-facing adapters: terminal key capture and the configuration
//! file.
//!
//! **Dependency rule**: this layer may depend on `keyproxy_core` and
//! `keyproxy_sender`, but MUST NOT import from `application`.

pub mod input_capture;
pub mod storage;
