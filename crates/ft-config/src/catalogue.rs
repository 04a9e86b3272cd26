//! Data point catalogue file types.
//!
//! These types mirror the on-disk catalogue (JSON, or TOML when the file
//! extension is `.toml`). Structural problems are caught by
//! [`crate::validate::validate_catalogue`]; the validated form lives in
//! [`crate::registry`].

use std::path::Path;

use ft_common::DataPointTypeId;
use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

/// Built-in catalogue used when no catalogue file is configured.
pub const DEFAULT_CATALOGUE_JSON: &str = include_str!("../data/default_catalogue.json");

/// Complete catalogue file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogueFile {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub data_point_types: Vec<DataPointTypeDef>,
}

/// One data point type as written in the catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPointTypeDef {
    pub id: DataPointTypeId,

    pub name: String,

    #[serde(default)]
    pub unit: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    pub category: Category,

    #[serde(default)]
    pub processing_steps: Vec<ProcessingStep>,
}

/// How a data point type is sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// Read directly from one raw device field.
    Atomic,
    /// Picked among several atomic sources by priority.
    Composite,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Atomic => write!(f, "ATOMIC"),
            Category::Composite => write!(f, "COMPOSITE"),
        }
    }
}

/// A single processing step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessingStep {
    /// Use the raw field value unchanged.
    AtomicPassthrough,
    /// Use the first source (lowest priority number) that has a reading.
    PriorityPick { sources: Vec<PrioritySource> },
}

impl ProcessingStep {
    pub fn name(&self) -> &'static str {
        match self {
            ProcessingStep::AtomicPassthrough => "atomic_passthrough",
            ProcessingStep::PriorityPick { .. } => "priority_pick",
        }
    }
}

/// A candidate source of a composite type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrioritySource {
    pub source_type_id: DataPointTypeId,

    /// Lower is preferred.
    pub priority: u32,
}

impl CatalogueFile {
    /// Load a catalogue from disk. `.toml` files are parsed as TOML, anything
    /// else as JSON.
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Parse a catalogue from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(json)
            .map_err(|e| ValidationError::ParseError(format!("Invalid JSON: {}", e)))
    }

    /// Parse a catalogue from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ValidationError> {
        toml::from_str(content)
            .map_err(|e| ValidationError::ParseError(format!("Invalid TOML: {}", e)))
    }

    /// The embedded default catalogue.
    pub fn builtin() -> Result<Self, ValidationError> {
        Self::from_json_str(DEFAULT_CATALOGUE_JSON)
    }
}
