//! Storage infrastructure: the optional TOML configuration file.
//!
//! The `config` sub-module reads the file, layers command-line overrides on
//! top and validates the result into an [`config::AppConfig`].

pub mod config;
