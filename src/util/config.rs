//! Configuration file support.
//!
//! Three configuration layers feed one effective configuration:
//! - Global: `config.toml` in the per-user configuration directory
//! - Project: `poetry.toml` next to the manifest
//! - Credentials: `auth.toml` in the per-user configuration directory
//!
//! Layers are overlaid in that order, later layers win key by key.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

/// Per-user configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Per-user credentials file name.
pub const AUTH_FILE_NAME: &str = "auth.toml";

/// Project-local configuration file name.
pub const LOCAL_CONFIG_NAME: &str = "poetry.toml";

/// Error while reading a configuration layer.
///
/// A missing file is not an error (the layer is skipped); an unreadable
/// or unparseable file is.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file: {}", .path.display())]
    #[diagnostic(code(stanza::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {}", .path.display())]
    #[diagnostic(code(stanza::config::parse))]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// The configuration files contributing to one effective configuration.
///
/// Paths are explicit so callers can point layers anywhere; `None` drops
/// the layer entirely.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Per-user config.toml
    pub global_config: Option<PathBuf>,

    /// Project-local poetry.toml
    pub local_config: Option<PathBuf>,

    /// Per-user auth.toml
    pub global_auth: Option<PathBuf>,
}

impl ConfigSources {
    /// Standard layout for a project directory: per-user files from the
    /// platform configuration directory, `poetry.toml` next to the
    /// manifest.
    pub fn for_project(project_dir: &Path) -> Self {
        let global = global_config_dir();

        ConfigSources {
            global_config: global.as_ref().map(|dir| dir.join(CONFIG_FILE_NAME)),
            local_config: Some(project_dir.join(LOCAL_CONFIG_NAME)),
            global_auth: global.map(|dir| dir.join(AUTH_FILE_NAME)),
        }
    }

    /// No layers at all. The composed configuration is empty.
    pub fn none() -> Self {
        ConfigSources::default()
    }
}

/// The effective configuration: every layer merged into one tree.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: toml::Table,
}

impl Config {
    /// Compose the effective configuration from the given sources.
    ///
    /// Layer order is fixed: global config, then project config, then
    /// credentials. Missing files are skipped.
    pub fn compose(sources: &ConfigSources) -> Result<Self, ConfigError> {
        let mut values = toml::Table::new();

        let layers = [
            &sources.global_config,
            &sources.local_config,
            &sources.global_auth,
        ];
        for path in layers.into_iter().flatten() {
            if !path.exists() {
                tracing::debug!("skipping absent config layer: {}", path.display());
                continue;
            }

            let layer = read_table(path)?;
            tracing::debug!("loaded config layer: {}", path.display());
            values = merge_tables(&values, &layer);
        }

        Ok(Config { values })
    }

    /// Build a configuration directly from a value tree.
    pub fn from_table(values: toml::Table) -> Self {
        Config { values }
    }

    /// Look up a value by dotted path, e.g. `http-basic.my-repo`.
    pub fn get(&self, path: &str) -> Option<&toml::Value> {
        let mut parts = path.split('.');
        let mut value = self.values.get(parts.next()?)?;
        for part in parts {
            value = value.as_table()?.get(part)?;
        }
        Some(value)
    }

    /// Look up a string value by dotted path.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path)?.as_str()
    }

    /// The merged value tree.
    pub fn values(&self) -> &toml::Table {
        &self.values
    }
}

/// Merge two TOML tables without mutating either input.
///
/// Nested tables merge key by key; for any other value kind the overlay
/// replaces the base wholesale.
pub fn merge_tables(base: &toml::Table, overlay: &toml::Table) -> toml::Table {
    let mut merged = base.clone();

    for (key, value) in overlay {
        match (base.get(key), value) {
            (Some(toml::Value::Table(below)), toml::Value::Table(above)) => {
                merged.insert(key.clone(), toml::Value::Table(merge_tables(below, above)));
            }
            _ => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }

    merged
}

fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Get the per-user configuration directory, if the platform has one.
pub fn global_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "pypoetry")
        .map(|dirs| dirs.config_dir().to_path_buf())
}
