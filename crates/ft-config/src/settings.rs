//! Engine settings (`settings.toml`).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::validate::ValidationError;

/// Default lifetime of a cached latest reading.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Longest accepted cache TTL (one day).
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

/// Default longest range that still aggregates into hourly buckets.
pub const DEFAULT_HOURLY_BUCKET_MAX_HOURS: u32 = 24;

/// Tunables for the telemetry engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Time-to-live of cached latest readings, in seconds.
    pub cache_ttl_secs: u64,

    /// Disable to bypass the latest-reading cache entirely.
    pub cache_enabled: bool,

    /// Ranges up to this many hours are bucketed hourly, longer ones daily.
    pub hourly_bucket_max_hours: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            cache_enabled: true,
            hourly_bucket_max_hours: DEFAULT_HOURLY_BUCKET_MAX_HOURS,
        }
    }
}

impl EngineSettings {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ValidationError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse settings from a TOML string. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ValidationError> {
        toml::from_str(content)
            .map_err(|e| ValidationError::ParseError(format!("Invalid TOML: {}", e)))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
