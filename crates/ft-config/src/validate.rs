//! Configuration validation errors and semantic validation.

use std::collections::{HashMap, HashSet};

use ft_common::DataPointTypeId;
use thiserror::Error;

use crate::catalogue::{CatalogueFile, Category, DataPointTypeDef, ProcessingStep};
use crate::settings::{EngineSettings, MAX_CACHE_TTL_SECS};

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Duplicate data point type id {0}")]
    DuplicateTypeId(DataPointTypeId),

    #[error("Composite type {composite} references unknown source {source_id}")]
    UnknownSource {
        composite: DataPointTypeId,
        source_id: DataPointTypeId,
    },

    #[error("Composite type {composite} references composite source {source_id}; nested composites are not supported")]
    NestedComposite {
        composite: DataPointTypeId,
        source_id: DataPointTypeId,
    },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::DuplicateTypeId(_) => 67,
            ValidationError::UnknownSource { .. } => 68,
            ValidationError::NestedComposite { .. } => 69,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

impl From<ValidationError> for ft_common::Error {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::IoError(msg) => ft_common::Error::Config(msg),
            other => ft_common::Error::InvalidCatalogue(other.to_string()),
        }
    }
}

/// Validate a catalogue semantically.
///
/// Rules:
/// - the schema version matches [`crate::CONFIG_SCHEMA_VERSION`]
/// - ids are unique and names non-empty
/// - atomic types carry at most one `atomic_passthrough` step and no sources
/// - composite types carry exactly one `priority_pick` step with at least one
///   source, unique source ids, and unique priorities
/// - every composite source exists and is itself atomic
pub fn validate_catalogue(catalogue: &CatalogueFile) -> ValidationResult<()> {
    if catalogue.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: catalogue.schema_version.clone(),
        });
    }

    let mut categories: HashMap<DataPointTypeId, Category> = HashMap::new();
    for def in &catalogue.data_point_types {
        if categories.insert(def.id, def.category).is_some() {
            return Err(ValidationError::DuplicateTypeId(def.id));
        }
        if def.name.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("data_point_types.{}.name", def.id),
                message: "Must not be empty".to_string(),
            });
        }
    }

    for def in &catalogue.data_point_types {
        match def.category {
            Category::Atomic => validate_atomic(def)?,
            Category::Composite => validate_composite(def, &categories)?,
        }
    }

    Ok(())
}

fn validate_atomic(def: &DataPointTypeDef) -> ValidationResult<()> {
    let field = format!("data_point_types.{}.processing_steps", def.id);

    if def.processing_steps.len() > 1 {
        return Err(ValidationError::InvalidValue {
            field,
            message: format!(
                "Atomic types take at most one step, got {}",
                def.processing_steps.len()
            ),
        });
    }

    if let Some(step) = def.processing_steps.first() {
        if *step != ProcessingStep::AtomicPassthrough {
            return Err(ValidationError::InvalidValue {
                field,
                message: format!("Atomic types cannot use {}", step.name()),
            });
        }
    }

    Ok(())
}

fn validate_composite(
    def: &DataPointTypeDef,
    categories: &HashMap<DataPointTypeId, Category>,
) -> ValidationResult<()> {
    let field = format!("data_point_types.{}.processing_steps", def.id);

    let sources = match def.processing_steps.as_slice() {
        [ProcessingStep::PriorityPick { sources }] => sources,
        steps => {
            return Err(ValidationError::InvalidValue {
                field,
                message: format!(
                    "Composite types need exactly one priority_pick step, got [{}]",
                    steps
                        .iter()
                        .map(ProcessingStep::name)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            });
        }
    };

    if sources.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: format!("{}.sources", field),
            message: "Must contain at least one source".to_string(),
        });
    }

    let mut seen_ids = HashSet::new();
    let mut seen_priorities = HashSet::new();
    for source in sources {
        if !seen_ids.insert(source.source_type_id) {
            return Err(ValidationError::InvalidValue {
                field: format!("{}.sources", field),
                message: format!("Source {} listed twice", source.source_type_id),
            });
        }
        if !seen_priorities.insert(source.priority) {
            return Err(ValidationError::InvalidValue {
                field: format!("{}.sources", field),
                message: format!(
                    "Priority {} used by more than one source",
                    source.priority
                ),
            });
        }

        match categories.get(&source.source_type_id) {
            None => {
                return Err(ValidationError::UnknownSource {
                    composite: def.id,
                    source_id: source.source_type_id,
                });
            }
            Some(Category::Composite) => {
                return Err(ValidationError::NestedComposite {
                    composite: def.id,
                    source_id: source.source_type_id,
                });
            }
            Some(Category::Atomic) => {}
        }
    }

    Ok(())
}

/// Validate engine settings.
pub fn validate_settings(settings: &EngineSettings) -> ValidationResult<()> {
    if settings.cache_enabled && settings.cache_ttl_secs == 0 {
        return Err(ValidationError::InvalidValue {
            field: "cache_ttl_secs".to_string(),
            message: "Must be > 0 when the cache is enabled".to_string(),
        });
    }

    if settings.cache_ttl_secs > MAX_CACHE_TTL_SECS {
        return Err(ValidationError::InvalidValue {
            field: "cache_ttl_secs".to_string(),
            message: format!("Must be <= {}", MAX_CACHE_TTL_SECS),
        });
    }

    if settings.hourly_bucket_max_hours == 0 {
        return Err(ValidationError::InvalidValue {
            field: "hourly_bucket_max_hours".to_string(),
            message: "Must be > 0".to_string(),
        });
    }

    Ok(())
}
