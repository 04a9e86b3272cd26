//! Fleet Telemetry Core Library
//!
//! Support code for the `ft-core` binary:
//! - Exit codes for CLI operations
//! - Structured logging setup
//!
//! The binary entry point is in `main.rs`.

pub mod exit_codes;
pub mod logging;
