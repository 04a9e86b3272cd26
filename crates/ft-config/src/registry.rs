//! Validated data point type registry.
//!
//! The registry is built once from a [`CatalogueFile`] and is read-only
//! afterwards. Composite sources are stored sorted by ascending priority so
//! resolution can walk them in order without re-sorting per call.

use std::collections::BTreeMap;

use ft_common::{DataPointTypeId, Error};
use serde::Serialize;

use crate::catalogue::{CatalogueFile, Category, ProcessingStep, PrioritySource};
use crate::validate::{validate_catalogue, ValidationResult};

/// A validated data point type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataPointType {
    pub id: DataPointTypeId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: TypeKind,
}

/// Resolution strategy of a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "category", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeKind {
    Atomic,
    /// Sources sorted by ascending priority; never empty, all atomic.
    Composite { sources: Vec<PrioritySource> },
}

impl DataPointType {
    pub fn category(&self) -> Category {
        match self.kind {
            TypeKind::Atomic => Category::Atomic,
            TypeKind::Composite { .. } => Category::Composite,
        }
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self.kind, TypeKind::Atomic)
    }

    /// Composite sources in preference order; empty for atomic types.
    pub fn sources(&self) -> &[PrioritySource] {
        match &self.kind {
            TypeKind::Atomic => &[],
            TypeKind::Composite { sources } => sources,
        }
    }
}

/// Catalogue of data point types keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    types: BTreeMap<DataPointTypeId, DataPointType>,
}

impl Registry {
    /// Validate a catalogue and build the registry from it.
    pub fn from_catalogue(catalogue: &CatalogueFile) -> ValidationResult<Self> {
        validate_catalogue(catalogue)?;

        let types = catalogue
            .data_point_types
            .iter()
            .map(|def| {
                let kind = match def.category {
                    Category::Atomic => TypeKind::Atomic,
                    Category::Composite => {
                        let mut sources: Vec<PrioritySource> = def
                            .processing_steps
                            .iter()
                            .flat_map(|step| match step {
                                ProcessingStep::PriorityPick { sources } => sources.clone(),
                                ProcessingStep::AtomicPassthrough => Vec::new(),
                            })
                            .collect();
                        sources.sort_by_key(|s| s.priority);
                        TypeKind::Composite { sources }
                    }
                };

                let ty = DataPointType {
                    id: def.id,
                    name: def.name.clone(),
                    unit: def.unit.clone(),
                    description: def.description.clone(),
                    kind,
                };
                (def.id, ty)
            })
            .collect();

        Ok(Registry { types })
    }

    /// Registry over the embedded default catalogue.
    pub fn builtin() -> ValidationResult<Self> {
        Self::from_catalogue(&CatalogueFile::builtin()?)
    }

    /// Resolve a type id.
    pub fn lookup(&self, id: DataPointTypeId) -> Result<&DataPointType, Error> {
        self.types
            .get(&id)
            .ok_or(Error::TypeNotFound { type_id: id })
    }

    /// All types in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &DataPointType> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
