//! fsxup library exports.
//!
//! The binary in `main.rs` is a thin CLI over these modules; they are
//! public so integration tests can exercise the pipeline directly.

pub mod commands;
pub mod config;
pub mod error;
pub mod plan;
pub mod preflight;
pub mod process;
pub mod provision;
pub mod system;

/// Fake capability implementations, exposed for integration tests.
pub mod testing;
