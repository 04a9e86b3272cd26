//! Error types for fleet telemetry.
//!
//! Errors carry:
//! - Stable error codes for machine parsing
//! - Category classification for grouping
//! - Recoverability hints for automation
//!
//! Lookup problems (`TypeNotFound`, `UnsupportedAggregation`) exist as
//! variants so internal code can name them, but the public telemetry
//! operations never return them: they log and degrade to an empty result.
//! Store and cache failures do propagate.
//!
//! # Agent-Facing Output
//!
//! Errors serialize to structured JSON:
//! ```json
//! {
//!   "code": 50,
//!   "category": "storage",
//!   "message": "data point store error: connection reset",
//!   "recoverable": true
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::id::{DataPointTypeId, DeviceId};

/// Result type alias for fleet telemetry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Catalogue and settings errors.
    Config,
    /// Data-point type lookup errors.
    Lookup,
    /// Aggregation request errors.
    Aggregation,
    /// Raw value ingestion errors.
    Ingest,
    /// Store and cache transport errors.
    Storage,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Lookup => write!(f, "lookup"),
            ErrorCategory::Aggregation => write!(f, "aggregation"),
            ErrorCategory::Ingest => write!(f, "ingest"),
            ErrorCategory::Storage => write!(f, "storage"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for fleet telemetry.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid catalogue: {0}")]
    InvalidCatalogue(String),

    // Lookup errors (20-29)
    #[error("data point type {type_id} not found")]
    TypeNotFound { type_id: DataPointTypeId },

    #[error("data point type {type_id} is composite; period queries need an atomic type")]
    CompositePeriodQuery { type_id: DataPointTypeId },

    // Aggregation errors (30-39)
    #[error("unsupported aggregation type: {0}")]
    UnsupportedAggregation(String),

    #[error("range needs {requested} buckets; at most {max} are allowed")]
    TooManyBuckets { requested: usize, max: usize },

    // Ingest errors (40-49)
    #[error("non-numeric value for device {device_id} type {type_id}: {reason}")]
    NonNumericValue {
        device_id: DeviceId,
        type_id: DataPointTypeId,
        reason: String,
    },

    #[error("malformed reading record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("cannot read readings file {path}: {reason}")]
    ReadingsUnavailable { path: String, reason: String },

    // Storage errors (50-59)
    #[error("data point store error: {0}")]
    Store(String),

    #[error("reading cache error: {0}")]
    Cache(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Lookup errors
    /// - 30-39: Aggregation errors
    /// - 40-49: Ingest errors
    /// - 50-59: Storage errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidCatalogue(_) => 11,
            Error::TypeNotFound { .. } => 20,
            Error::CompositePeriodQuery { .. } => 21,
            Error::UnsupportedAggregation(_) => 30,
            Error::TooManyBuckets { .. } => 31,
            Error::NonNumericValue { .. } => 40,
            Error::MalformedRecord { .. } => 41,
            Error::ReadingsUnavailable { .. } => 42,
            Error::Store(_) => 50,
            Error::Cache(_) => 51,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidCatalogue(_) => ErrorCategory::Config,
            Error::TypeNotFound { .. } | Error::CompositePeriodQuery { .. } => {
                ErrorCategory::Lookup
            }
            Error::UnsupportedAggregation(_) | Error::TooManyBuckets { .. } => {
                ErrorCategory::Aggregation
            }
            Error::NonNumericValue { .. }
            | Error::MalformedRecord { .. }
            | Error::ReadingsUnavailable { .. } => ErrorCategory::Ingest,
            Error::Store(_) | Error::Cache(_) => ErrorCategory::Storage,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether retrying (or fixing input) may resolve the error.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::InvalidCatalogue(_) => true,
            Error::TypeNotFound { .. } => false,
            Error::CompositePeriodQuery { .. } => false,
            Error::UnsupportedAggregation(_) => false,
            Error::TooManyBuckets { .. } => true, // narrow the range or widen the bucket
            Error::NonNumericValue { .. } => false, // the payload will not change
            Error::MalformedRecord { .. } => true,
            Error::ReadingsUnavailable { .. } => true,
            Error::Store(_) => true, // transport failures are usually transient
            Error::Cache(_) => true,
            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    /// Returns a short headline for human-facing output.
    pub fn headline(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Config => "Configuration Error",
            ErrorCategory::Lookup => "Unknown Data Point Type",
            ErrorCategory::Aggregation => "Unsupported Aggregation",
            ErrorCategory::Ingest => "Invalid Reading",
            ErrorCategory::Storage => "Storage Error",
            ErrorCategory::Io => "I/O Error",
        }
    }
}

/// Structured error for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    pub code: u32,
    pub category: ErrorCategory,
    pub message: String,
    pub recoverable: bool,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::TypeNotFound { type_id } | Error::CompositePeriodQuery { type_id } => {
                context.insert("type_id".to_string(), serde_json::json!(type_id.0));
            }
            Error::NonNumericValue {
                device_id, type_id, ..
            } => {
                context.insert("device_id".to_string(), serde_json::json!(device_id.0));
                context.insert("type_id".to_string(), serde_json::json!(type_id.0));
            }
            Error::MalformedRecord { line, .. } => {
                context.insert("line".to_string(), serde_json::json!(line));
            }
            Error::TooManyBuckets { requested, max } => {
                context.insert("requested".to_string(), serde_json::json!(requested));
                context.insert("max".to_string(), serde_json::json!(max));
            }
            Error::ReadingsUnavailable { path, .. } => {
                context.insert("path".to_string(), serde_json::json!(path));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Add context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"message":"serialization failed"}}"#, self.code)
        })
    }
}

/// Format an error for human consumption.
pub fn format_error_human(err: &Error) -> String {
    format!("✗ {}\n  Reason: {}", err.headline(), err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(Error::Config("x".into()).code(), 10);
        assert_eq!(
            Error::TypeNotFound {
                type_id: DataPointTypeId(5)
            }
            .code(),
            20
        );
        assert_eq!(Error::Store("down".into()).code(), 50);
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            Error::UnsupportedAggregation("MEDIAN".into()).category(),
            ErrorCategory::Aggregation
        );
        assert_eq!(Error::Cache("x".into()).category(), ErrorCategory::Storage);
        assert_eq!(
            Error::MalformedRecord {
                line: 3,
                reason: "x".into()
            }
            .category(),
            ErrorCategory::Ingest
        );
    }

    #[test]
    fn test_error_recoverable() {
        assert!(Error::Store("timeout".into()).is_recoverable());
        assert!(!Error::TypeNotFound {
            type_id: DataPointTypeId(1)
        }
        .is_recoverable());
        assert!(!Error::UnsupportedAggregation("P95".into()).is_recoverable());
    }

    #[test]
    fn test_structured_error_from_error() {
        let err = Error::NonNumericValue {
            device_id: DeviceId(12),
            type_id: DataPointTypeId(3),
            reason: "null value".into(),
        };
        let structured = StructuredError::from(&err);

        assert_eq!(structured.code, 40);
        assert_eq!(structured.category, ErrorCategory::Ingest);
        assert!(!structured.recoverable);
        assert_eq!(structured.context.get("device_id"), Some(&serde_json::json!(12)));
        assert_eq!(structured.context.get("type_id"), Some(&serde_json::json!(3)));
    }

    #[test]
    fn test_structured_error_json() {
        let err = Error::Store("connection reset".into());
        let json = StructuredError::from(&err)
            .with_context("device_id", 7)
            .to_json();

        assert!(json.contains(r#""code":50"#));
        assert!(json.contains(r#""category":"storage""#));
        assert!(json.contains(r#""recoverable":true"#));
        assert!(json.contains(r#""device_id":7"#));
    }

    #[test]
    fn test_unreadable_readings_file_is_ingest_error() {
        let err = Error::ReadingsUnavailable {
            path: "/data/missing.jsonl".into(),
            reason: "No such file or directory".into(),
        };
        let structured = StructuredError::from(&err);
        assert_eq!(structured.code, 42);
        assert_eq!(structured.category, ErrorCategory::Ingest);
        assert!(structured.recoverable);
        assert_eq!(
            structured.context.get("path"),
            Some(&serde_json::json!("/data/missing.jsonl"))
        );
    }

    #[test]
    fn test_format_error_human() {
        let err = Error::InvalidCatalogue("duplicate id 4".into());
        let formatted = format_error_human(&err);
        assert!(formatted.contains("Configuration Error"));
        assert!(formatted.contains("duplicate id 4"));
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Lookup.to_string(), "lookup");
        assert_eq!(ErrorCategory::Storage.to_string(), "storage");
    }
}
