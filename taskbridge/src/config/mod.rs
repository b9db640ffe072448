//! Configuration for the bridge runtime.
//!
//! TOML-based, with defaults for every field so a missing or partial file
//! still yields a runnable configuration.

pub mod types;

pub use types::*;
