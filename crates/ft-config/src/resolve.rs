//! Locating the catalogue, settings and readings files.
//!
//! Each [`ConfigFile`] is looked up independently. A path given on the
//! command line always wins, even when it does not exist, so a typo
//! surfaces as a load error instead of silently falling through. Otherwise
//! the first existing candidate is taken from:
//!
//! 1. the file's own variable (`FT_CATALOGUE`, `FT_SETTINGS`, `FT_READINGS`)
//! 2. `$FT_CONFIG_DIR/<file name>`
//! 3. the user config dir (`~/.config/fleet-telemetry/<file name>`)
//! 4. `/etc/fleet-telemetry/<file name>`
//!
//! When nothing matches the caller falls back: the builtin catalogue,
//! default settings, or an empty reading store.

use std::fmt;
use std::path::{Path, PathBuf};

pub const ENV_CATALOGUE_PATH: &str = "FT_CATALOGUE";
pub const ENV_SETTINGS_PATH: &str = "FT_SETTINGS";
pub const ENV_READINGS_PATH: &str = "FT_READINGS";
pub const ENV_CONFIG_DIR: &str = "FT_CONFIG_DIR";

const APP_DIR: &str = "fleet-telemetry";

/// A file the engine can pick up from the search path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigFile {
    Catalogue,
    Settings,
    Readings,
}

impl ConfigFile {
    pub const ALL: [ConfigFile; 3] = [ConfigFile::Catalogue, ConfigFile::Settings, ConfigFile::Readings];

    /// Variable naming this file directly.
    pub fn env_var(self) -> &'static str {
        match self {
            ConfigFile::Catalogue => ENV_CATALOGUE_PATH,
            ConfigFile::Settings => ENV_SETTINGS_PATH,
            ConfigFile::Readings => ENV_READINGS_PATH,
        }
    }

    /// File name looked for inside config directories.
    pub fn file_name(self) -> &'static str {
        match self {
            ConfigFile::Catalogue => "catalogue.json",
            ConfigFile::Settings => "settings.toml",
            ConfigFile::Readings => "readings.jsonl",
        }
    }
}

impl fmt::Display for ConfigFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigFile::Catalogue => "catalogue",
            ConfigFile::Settings => "settings",
            ConfigFile::Readings => "readings",
        };
        f.write_str(name)
    }
}

/// Where a resolved file came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    CliArgument,
    /// The file's own variable, e.g. `FT_CATALOGUE`.
    Environment,
    /// `FT_CONFIG_DIR`.
    ConfigDir,
    UserConfig,
    SystemConfig,
    /// Nothing found; the caller's fallback applies.
    #[default]
    BuiltinDefault,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConfigSource::CliArgument => "command line",
            ConfigSource::Environment => "environment",
            ConfigSource::ConfigDir => "FT_CONFIG_DIR",
            ConfigSource::UserConfig => "user config dir",
            ConfigSource::SystemConfig => "system config dir",
            ConfigSource::BuiltinDefault => "builtin default",
        };
        f.write_str(label)
    }
}

/// Outcome of resolving one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
}

/// Resolved locations of every file the engine reads.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    pub catalogue: Resolved,
    pub settings: Resolved,
    pub readings: Resolved,
}

/// Candidate locations, captured once from the environment.
#[derive(Debug, Clone, Default)]
pub struct SearchPath {
    direct: Vec<(ConfigFile, PathBuf)>,
    dirs: Vec<(PathBuf, ConfigSource)>,
}

impl SearchPath {
    /// Search path from the process environment and the platform config dir.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok(), dirs::config_dir())
    }

    /// Search path from an arbitrary variable lookup, so tests need not
    /// touch the process environment.
    pub fn from_lookup<F>(lookup: F, user_config_dir: Option<PathBuf>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let direct = ConfigFile::ALL
            .iter()
            .filter_map(|&file| lookup(file.env_var()).map(|v| (file, PathBuf::from(v))))
            .collect();

        let mut dirs = Vec::new();
        if let Some(dir) = lookup(ENV_CONFIG_DIR) {
            dirs.push((PathBuf::from(dir), ConfigSource::ConfigDir));
        }
        if let Some(dir) = user_config_dir {
            dirs.push((dir.join(APP_DIR), ConfigSource::UserConfig));
        }
        dirs.push((system_config_dir(), ConfigSource::SystemConfig));

        SearchPath { direct, dirs }
    }

    pub fn resolve(&self, file: ConfigFile, cli_path: Option<&Path>) -> Resolved {
        if let Some(path) = cli_path {
            return Resolved {
                path: Some(path.to_path_buf()),
                source: ConfigSource::CliArgument,
            };
        }

        let direct = self
            .direct
            .iter()
            .filter(|(f, _)| *f == file)
            .map(|(_, path)| (path.clone(), ConfigSource::Environment));
        let in_dirs = self
            .dirs
            .iter()
            .map(|(dir, source)| (dir.join(file.file_name()), *source));

        direct
            .chain(in_dirs)
            .find(|(path, _)| path.exists())
            .map(|(path, source)| Resolved {
                path: Some(path),
                source,
            })
            .unwrap_or_default()
    }
}

/// `/etc/fleet-telemetry`.
pub fn system_config_dir() -> PathBuf {
    Path::new("/etc").join(APP_DIR)
}
