//! Project facade.
//!
//! A Project ties together everything a resolver or builder needs:
//! the located manifest, the package model built from it, the lock file
//! handle, the effective configuration and an initially empty repository
//! pool. Construction is all-or-nothing; no partially assembled project
//! is ever returned.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::core::manifest::{Manifest, ManifestError};
use crate::core::package::Package;
use crate::ops::locker::{self, Locker, LEGACY_LOCK_FILE_NAME, LOCK_FILE_NAME};
use crate::sources::pool::Pool;
use crate::sources::repository::{Repository, SourceConfig, SourceError};
use crate::util::config::{Config, ConfigError, ConfigSources};
use crate::util::env::{EnvError, MarkerEnvironment};

/// Error while assembling a project.
#[derive(Debug, Error, Diagnostic)]
pub enum ProjectError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Env(#[from] EnvError),

    #[error("failed to migrate legacy lock file {} -> {}", .from.display(), .to.display())]
    #[diagnostic(code(stanza::project::lock_migration))]
    LockMigration {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to prepare lock file handle")]
    #[diagnostic(code(stanza::project::locker))]
    Locker {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Knobs for project assembly. The defaults probe the real machine;
/// tests usually inject both.
#[derive(Debug, Default)]
pub struct DiscoverOptions {
    /// Configuration layers to compose; defaults to the standard layout
    /// around the discovered manifest
    pub config_sources: Option<ConfigSources>,

    /// Interpreter environment for dev dependency gates; defaults to
    /// probing PATH when a gate is present
    pub marker_env: Option<MarkerEnvironment>,
}

/// A fully assembled project.
#[derive(Debug)]
pub struct Project {
    manifest: Manifest,
    package: Package,
    locker: Locker,
    config: Config,
    pool: Pool,
}

impl Project {
    /// Find the manifest governing `cwd`.
    pub fn locate(cwd: &Path) -> Result<PathBuf, ManifestError> {
        Manifest::find(cwd)
    }

    /// Discover and assemble the project governing `cwd`.
    pub fn discover(cwd: &Path) -> Result<Self, ProjectError> {
        Self::discover_with(cwd, DiscoverOptions::default())
    }

    /// Discover with explicit configuration and environment seams.
    pub fn discover_with(cwd: &Path, options: DiscoverOptions) -> Result<Self, ProjectError> {
        let manifest_path = Manifest::find(cwd)?;
        Self::load_with(&manifest_path, options)
    }

    /// Assemble the project for a known manifest path.
    pub fn load(manifest_path: &Path) -> Result<Self, ProjectError> {
        Self::load_with(manifest_path, DiscoverOptions::default())
    }

    fn load_with(manifest_path: &Path, options: DiscoverOptions) -> Result<Self, ProjectError> {
        let manifest = Manifest::load(manifest_path)?;

        // The interpreter is only consulted when a dev dependency is
        // actually gated on it.
        let env = match options.marker_env {
            Some(env) => Some(env),
            None if needs_marker_env(&manifest.section().dev_dependencies) => {
                Some(MarkerEnvironment::detect()?)
            }
            None => None,
        };

        let package = Package::from_manifest(&manifest, env.as_ref())?;

        let config_sources = options
            .config_sources
            .unwrap_or_else(|| ConfigSources::for_project(manifest.dir()));
        let config = Config::compose(&config_sources)?;

        locker::migrate_legacy_lockfile(manifest.dir()).map_err(|source| {
            ProjectError::LockMigration {
                from: manifest.dir().join(LEGACY_LOCK_FILE_NAME),
                to: manifest.dir().join(LOCK_FILE_NAME),
                source,
            }
        })?;
        let locker = Locker::new(manifest.dir().join(LOCK_FILE_NAME), manifest.raw_section())
            .map_err(|err| ProjectError::Locker { source: err.into() })?;

        tracing::debug!(
            "assembled project `{}` from {}",
            package.name(),
            manifest_path.display()
        );

        Ok(Project {
            manifest,
            package,
            locker,
            config,
            pool: Pool::new(),
        })
    }

    /// Get the manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Get the manifest path.
    pub fn manifest_path(&self) -> &Path {
        self.manifest.path()
    }

    /// Get the raw `[tool.poetry]` table.
    pub fn local_config(&self) -> &toml::Table {
        self.manifest.raw_section()
    }

    /// Get the package model.
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Get the lock file handle.
    pub fn locker(&self) -> &Locker {
        &self.locker
    }

    /// Get the effective configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the repository pool.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Get the repository pool for the resolver to fill.
    pub fn pool_mut(&mut self) -> &mut Pool {
        &mut self.pool
    }

    /// The `[[tool.poetry.source]]` entries declared in the manifest.
    pub fn declared_sources(&self) -> Result<Vec<SourceConfig>, ManifestError> {
        self.manifest
            .section()
            .source
            .iter()
            .map(|table| {
                toml::Value::Table(table.clone()).try_into().map_err(
                    |err: toml::de::Error| ManifestError::Invalid {
                        errors: vec![err.message().to_string()],
                    },
                )
            })
            .collect()
    }

    /// Register a source entry against this project's configuration.
    ///
    /// Failure affects that source only; the project stays usable.
    pub fn create_repository(&self, source: &SourceConfig) -> Result<Repository, SourceError> {
        Repository::from_source(source, &self.config)
    }
}

/// True when any dev dependency entry carries an interpreter gate.
fn needs_marker_env(dev_dependencies: &toml::Table) -> bool {
    fn has_python_gate(value: &toml::Value) -> bool {
        match value {
            toml::Value::Table(table) => table.contains_key("python"),
            toml::Value::Array(items) => items.iter().any(has_python_gate),
            _ => false,
        }
    }

    dev_dependencies.values().any(has_python_gate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
[tool.poetry]
name = "demo"
version = "0.1.0"
authors = ["Your Name <you@example.com>"]

[tool.poetry.dependencies]
python = "^3.8"
requests = "^2.20"
"#;

    fn options() -> DiscoverOptions {
        DiscoverOptions {
            config_sources: Some(ConfigSources::none()),
            marker_env: Some(MarkerEnvironment::with_python_version(Version::new(3, 9, 0))),
        }
    }

    fn write_manifest(dir: &Path, content: &str) {
        std::fs::write(dir.join("pyproject.toml"), content).unwrap();
    }

    #[test]
    fn test_discover_from_nested_directory() {
        let tmp = TempDir::new().unwrap();
        write_manifest(tmp.path(), MANIFEST);
        let nested = tmp.path().join("src").join("demo");
        std::fs::create_dir_all(&nested).unwrap();

        let project = Project::discover_with(&nested, options()).unwrap();

        assert_eq!(project.package().name(), "demo");
        assert_eq!(project.manifest_path(), tmp.path().join("pyproject.toml"));
        assert!(project.pool().is_empty());
        assert_eq!(project.locker().path(), tmp.path().join(LOCK_FILE_NAME));
    }

    #[test]
    fn test_discover_without_manifest() {
        let tmp = TempDir::new().unwrap();

        let err = Project::discover_with(tmp.path(), options()).unwrap_err();
        assert!(matches!(
            err,
            ProjectError::Manifest(ManifestError::NotFound { .. })
        ));
    }

    #[test]
    fn test_facade_migrates_legacy_lock() {
        let tmp = TempDir::new().unwrap();
        write_manifest(tmp.path(), MANIFEST);
        std::fs::write(
            tmp.path().join(LEGACY_LOCK_FILE_NAME),
            "[[package]]\nname = \"requests\"\nversion = \"2.25.1\"\n",
        )
        .unwrap();

        let _project = Project::discover_with(tmp.path(), options()).unwrap();

        assert!(tmp.path().join(LOCK_FILE_NAME).exists());
        assert!(!tmp.path().join(LEGACY_LOCK_FILE_NAME).exists());
    }

    #[test]
    fn test_facade_keeps_canonical_lock() {
        let tmp = TempDir::new().unwrap();
        write_manifest(tmp.path(), MANIFEST);
        std::fs::write(tmp.path().join(LOCK_FILE_NAME), "canonical").unwrap();
        std::fs::write(tmp.path().join(LEGACY_LOCK_FILE_NAME), "legacy").unwrap();

        let _project = Project::discover_with(tmp.path(), options()).unwrap();

        assert_eq!(
            std::fs::read_to_string(tmp.path().join(LOCK_FILE_NAME)).unwrap(),
            "canonical"
        );
        assert!(tmp.path().join(LEGACY_LOCK_FILE_NAME).exists());
    }

    #[test]
    fn test_project_config_feeds_repositories() {
        let tmp = TempDir::new().unwrap();
        write_manifest(
            tmp.path(),
            r#"
[tool.poetry]
name = "demo"
version = "0.1.0"
authors = ["Your Name <you@example.com>"]

[[tool.poetry.source]]
name = "private"
url = "https://foo.bar/simple/"
"#,
        );
        let auth = tmp.path().join("auth.toml");
        std::fs::write(
            &auth,
            "[http-basic.private]\nusername = \"bar\"\npassword = \"baz\"\n",
        )
        .unwrap();

        let mut opts = options();
        opts.config_sources = Some(ConfigSources {
            global_config: None,
            local_config: None,
            global_auth: Some(auth),
        });
        let project = Project::discover_with(tmp.path(), opts).unwrap();

        let sources = project.declared_sources().unwrap();
        assert_eq!(sources.len(), 1);

        let repository = project.create_repository(&sources[0]).unwrap();
        assert_eq!(repository.name(), "private");
        assert_eq!(repository.auth().unwrap().username, "bar");
    }

    #[test]
    fn test_injected_environment_gates_dev_dependencies() {
        let tmp = TempDir::new().unwrap();
        write_manifest(
            tmp.path(),
            r#"
[tool.poetry]
name = "demo"
version = "0.1.0"
authors = ["Your Name <you@example.com>"]

[tool.poetry.dev-dependencies]
pytest = "^3.0"
mock = { version = "^2.0", python = "<3.0" }
"#,
        );

        let project = Project::discover_with(tmp.path(), options()).unwrap();

        let names: Vec<&str> = project
            .package()
            .requires()
            .iter()
            .map(|dep| dep.name())
            .collect();
        assert_eq!(names, ["pytest"]);
    }

    #[test]
    fn test_needs_marker_env() {
        let ungated: toml::Table = toml::from_str("pytest = \"^3.0\"").unwrap();
        assert!(!needs_marker_env(&ungated));

        let gated: toml::Table =
            toml::from_str("mock = { version = \"^2.0\", python = \"<3.0\" }").unwrap();
        assert!(needs_marker_env(&gated));

        let gated_list: toml::Table =
            toml::from_str("mock = [{ version = \"^2.0\", python = \"<3.0\" }]").unwrap();
        assert!(needs_marker_env(&gated_list));
    }
}
