//! Fleet telemetry configuration loading and validation.
//!
//! This crate provides:
//! - Typed catalogue files (JSON/TOML) describing data point types
//! - Semantic validation, including rejection of nested composites
//! - The read-only [`Registry`] used at evaluation time
//! - Engine settings (cache TTL, bucket heuristics)
//! - File resolution for catalogue, settings and readings (CLI → env → XDG → defaults)

pub mod catalogue;
pub mod registry;
pub mod resolve;
pub mod settings;
pub mod validate;

use std::path::PathBuf;

use tracing::debug;

pub use catalogue::{CatalogueFile, Category, DataPointTypeDef, PrioritySource, ProcessingStep};
pub use registry::{DataPointType, Registry, TypeKind};
pub use resolve::{ConfigFile, ConfigPaths, ConfigSource, Resolved, SearchPath};
pub use settings::EngineSettings;
pub use validate::{ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";

/// Explicit configuration locations, usually from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    pub catalogue_path: Option<PathBuf>,
    pub settings_path: Option<PathBuf>,
    pub readings_path: Option<PathBuf>,
}

/// Fully loaded and validated configuration.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub registry: Registry,
    pub settings: EngineSettings,
    pub paths: ConfigPaths,
}

/// Resolve, load, and validate the catalogue and settings. The readings
/// file is only located here; loading it is up to the reading store.
pub fn load_config(options: &ConfigOptions) -> ValidationResult<LoadedConfig> {
    load_config_from(options, &SearchPath::from_env())
}

/// [`load_config`] against an explicit search path.
pub fn load_config_from(options: &ConfigOptions, search: &SearchPath) -> ValidationResult<LoadedConfig> {
    let paths = ConfigPaths {
        catalogue: search.resolve(ConfigFile::Catalogue, options.catalogue_path.as_deref()),
        settings: search.resolve(ConfigFile::Settings, options.settings_path.as_deref()),
        readings: search.resolve(ConfigFile::Readings, options.readings_path.as_deref()),
    };

    let catalogue = match &paths.catalogue.path {
        Some(path) => CatalogueFile::from_file(path)?,
        None => CatalogueFile::builtin()?,
    };
    let registry = Registry::from_catalogue(&catalogue)?;

    let settings = match &paths.settings.path {
        Some(path) => EngineSettings::from_file(path)?,
        None => EngineSettings::default(),
    };
    validate::validate_settings(&settings)?;

    debug!(
        catalogue_source = %paths.catalogue.source,
        settings_source = %paths.settings.source,
        readings_source = %paths.readings.source,
        types = registry.len(),
        "configuration loaded"
    );

    Ok(LoadedConfig {
        registry,
        settings,
        paths,
    })
}
