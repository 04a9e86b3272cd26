//! Fleet telemetry common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the workspace:
//! - Device and data-point-type identifiers
//! - The `Reading` record and the raw value coercion policy
//! - Common error types
//! - Output format specifications

pub mod error;
pub mod id;
pub mod output;
pub mod reading;

pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use id::{DataPointTypeId, DeviceId};
pub use output::OutputFormat;
pub use reading::{coerce_value, Reading};

/// Schema version for serialized readings and CLI payloads.
pub const SCHEMA_VERSION: &str = "1.0.0";
