//! pyproject.toml manifest parsing and schema.
//!
//! The manifest is the central configuration file for a project. All
//! project metadata lives under the `[tool.poetry]` section; the rest of
//! the document belongs to other tools and is ignored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use crate::core::spdx::license_by_id;

/// Canonical manifest file name.
pub const MANIFEST_NAME: &str = "pyproject.toml";

/// Error while locating, parsing or validating a manifest.
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    #[error("could not find {MANIFEST_NAME} in {} or its parents", .dir.display())]
    #[diagnostic(
        code(stanza::manifest::not_found),
        help("run inside a project directory, or pass an explicit path")
    )]
    NotFound { dir: PathBuf },

    #[error("failed to read {}", .path.display())]
    #[diagnostic(code(stanza::manifest::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid TOML", .path.display())]
    #[diagnostic(code(stanza::manifest::parse))]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("[tool.poetry] section not found in {}", .path.display())]
    #[diagnostic(code(stanza::manifest::section_missing))]
    SectionMissing { path: PathBuf },

    #[error("the manifest is invalid:\n{}", bullet_list(.errors))]
    #[diagnostic(code(stanza::manifest::invalid))]
    Invalid { errors: Vec<String> },

    #[error("could not parse version `{value}`")]
    #[diagnostic(code(stanza::manifest::invalid_version))]
    InvalidVersion { value: String },

    #[error("invalid constraint `{constraint}` for `{name}`")]
    #[diagnostic(code(stanza::manifest::invalid_constraint))]
    InvalidConstraint {
        name: String,
        constraint: String,
        #[source]
        source: semver::Error,
    },

    #[error("invalid specification for dependency `{name}`: {message}")]
    #[diagnostic(code(stanza::manifest::invalid_dependency))]
    InvalidDependency { name: String, message: String },
}

fn bullet_list(errors: &[String]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Outcome of schema validation: every violation found, not just the first.
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    /// Violations that make the manifest unusable
    pub errors: Vec<String>,

    /// Advisory findings (strict mode only)
    pub warnings: Vec<String>,
}

impl CheckReport {
    /// True when no errors were found (warnings are allowed).
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The `[tool.poetry]` section, typed.
///
/// Dependency tables and extras stay raw here: their declared order is
/// meaningful and they are decoded entry by entry while the package model
/// is built.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoetrySection {
    /// Package name
    pub name: String,

    /// Package version, verbatim
    pub version: String,

    /// One-line description
    #[serde(default)]
    pub description: Option<String>,

    /// Authors, `Name <email>` format
    #[serde(default)]
    pub authors: Vec<String>,

    /// Maintainers, same format as authors
    #[serde(default)]
    pub maintainers: Vec<String>,

    /// License identifier
    #[serde(default)]
    pub license: Option<String>,

    /// Path to the readme file
    #[serde(default)]
    pub readme: Option<String>,

    /// Target platform restriction
    #[serde(default)]
    pub platform: Option<String>,

    /// Build script, passed through to build tooling
    #[serde(default)]
    pub build: Option<String>,

    /// Homepage URL
    #[serde(default)]
    pub homepage: Option<String>,

    /// Repository URL
    #[serde(default)]
    pub repository: Option<String>,

    /// Documentation URL
    #[serde(default)]
    pub documentation: Option<String>,

    /// Keywords for index searches
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Trove classifiers
    #[serde(default)]
    pub classifiers: Vec<String>,

    /// Custom URLs (label to URL)
    #[serde(default)]
    pub urls: BTreeMap<String, String>,

    /// Source layout entries, passed through to build tooling
    #[serde(default)]
    pub packages: Vec<toml::Value>,

    /// Extra files to include in distributions
    #[serde(default)]
    pub include: Vec<toml::Value>,

    /// Files to exclude from distributions
    #[serde(default)]
    pub exclude: Vec<toml::Value>,

    /// Runtime dependencies, in declared order
    #[serde(default)]
    pub dependencies: toml::Table,

    /// Development dependencies, in declared order
    #[serde(default, rename = "dev-dependencies")]
    pub dev_dependencies: toml::Table,

    /// Extras: named groups of optional dependencies, in declared order
    #[serde(default)]
    pub extras: toml::Table,

    /// Alternative package sources
    #[serde(default)]
    pub source: Vec<toml::Table>,
}

/// A parsed pyproject.toml.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Path of the manifest file
    path: PathBuf,

    /// Directory containing the manifest
    dir: PathBuf,

    /// Raw `[tool.poetry]` table, declared order preserved
    raw_section: toml::Table,

    /// Typed view of the same section
    section: PoetrySection,
}

impl Manifest {
    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content, path)
    }

    /// Parse manifest content.
    ///
    /// The document must carry a `[tool.poetry]` section that passes
    /// schema validation; every violation is reported at once.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ManifestError> {
        let document: toml::Table =
            toml::from_str(content).map_err(|source| ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let raw_section = match document.get("tool").and_then(|tool| tool.get("poetry")) {
            Some(toml::Value::Table(table)) => table.clone(),
            _ => {
                return Err(ManifestError::SectionMissing {
                    path: path.to_path_buf(),
                })
            }
        };

        let report = Self::check(&raw_section);
        if !report.is_ok() {
            return Err(ManifestError::Invalid {
                errors: report.errors,
            });
        }

        // Residual shape problems the schema pass does not cover surface
        // here (e.g. a list where a scalar belongs inside a nested table).
        let section: PoetrySection = toml::Value::Table(raw_section.clone())
            .try_into()
            .map_err(|err: toml::de::Error| ManifestError::Invalid {
                errors: vec![err.message().to_string()],
            })?;

        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();

        Ok(Manifest {
            path: path.to_path_buf(),
            dir,
            raw_section,
            section,
        })
    }

    /// Walk from `start` upward until a directory contains a manifest.
    pub fn find(start: &Path) -> Result<PathBuf, ManifestError> {
        for dir in start.ancestors() {
            let candidate = dir.join(MANIFEST_NAME);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        Err(ManifestError::NotFound {
            dir: start.to_path_buf(),
        })
    }

    /// Validate a raw `[tool.poetry]` table against the schema.
    ///
    /// Collects every violation instead of failing at the first one.
    pub fn check(section: &toml::Table) -> CheckReport {
        let mut report = CheckReport::default();

        for field in ["name", "version"] {
            match section.get(field) {
                None => report.errors.push(format!("{} is required", field)),
                Some(value) if !value.is_str() => {
                    report.errors.push(format!("{} must be a string", field))
                }
                _ => {}
            }
        }

        match section.get("authors") {
            None => report.errors.push("authors is required".to_string()),
            Some(value) => match value.as_array() {
                Some(items) if items.iter().all(toml::Value::is_str) => {
                    if items.is_empty() {
                        report.errors.push("authors must not be empty".to_string());
                    }
                }
                _ => report
                    .errors
                    .push("authors must be an array of strings".to_string()),
            },
        }

        for field in [
            "description",
            "license",
            "readme",
            "homepage",
            "repository",
            "documentation",
            "platform",
            "build",
        ] {
            if let Some(value) = section.get(field) {
                if !value.is_str() {
                    report.errors.push(format!("{} must be a string", field));
                }
            }
        }

        for field in ["maintainers", "keywords", "classifiers"] {
            if let Some(value) = section.get(field) {
                let ok = value
                    .as_array()
                    .is_some_and(|items| items.iter().all(toml::Value::is_str));
                if !ok {
                    report
                        .errors
                        .push(format!("{} must be an array of strings", field));
                }
            }
        }

        for field in ["packages", "include", "exclude"] {
            if let Some(value) = section.get(field) {
                if !value.is_array() {
                    report.errors.push(format!("{} must be an array", field));
                }
            }
        }

        for field in ["dependencies", "dev-dependencies"] {
            if let Some(value) = section.get(field) {
                if !value.is_table() {
                    report.errors.push(format!("{} must be a table", field));
                }
            }
        }

        if let Some(value) = section.get("urls") {
            let ok = value
                .as_table()
                .is_some_and(|table| table.values().all(toml::Value::is_str));
            if !ok {
                report
                    .errors
                    .push("urls must be a table of strings".to_string());
            }
        }

        match section.get("extras") {
            Some(toml::Value::Table(extras)) => {
                for (name, packages) in extras {
                    let ok = packages
                        .as_array()
                        .is_some_and(|items| items.iter().all(toml::Value::is_str));
                    if !ok {
                        report.errors.push(format!(
                            "extras.{} must be an array of package names",
                            name
                        ));
                    }
                }
            }
            Some(_) => report.errors.push("extras must be a table".to_string()),
            None => {}
        }

        if let Some(value) = section.get("source") {
            let ok = value
                .as_array()
                .is_some_and(|items| items.iter().all(toml::Value::is_table));
            if !ok {
                report
                    .errors
                    .push("source must be an array of tables".to_string());
            }
        }

        report
    }

    /// Validate more thoroughly than [`Manifest::check`].
    ///
    /// On top of the schema pass this flags ambiguous interpreter
    /// constraints and unknown license identifiers.
    pub fn check_strict(section: &toml::Table) -> CheckReport {
        let mut report = Self::check(section);

        let python = section
            .get("dependencies")
            .and_then(|deps| deps.get("python"))
            .and_then(|value| value.as_str());
        if python == Some("*") {
            report.warnings.push(
                "a wildcard python dependency is ambiguous, consider a more explicit constraint"
                    .to_string(),
            );
        }

        if let Some(license) = section.get("license").and_then(|value| value.as_str()) {
            if !license.is_empty() && license_by_id(license).is_none() {
                report
                    .errors
                    .push(format!("{} is not a valid license", license));
            }
        }

        report
    }

    /// Get the manifest file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the directory containing the manifest.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the typed `[tool.poetry]` section.
    pub fn section(&self) -> &PoetrySection {
        &self.section
    }

    /// Get the raw `[tool.poetry]` table.
    pub fn raw_section(&self) -> &toml::Table {
        &self.raw_section
    }

    /// Get the package name.
    pub fn name(&self) -> &str {
        &self.section.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BASIC: &str = r#"
[tool.poetry]
name = "my-package"
version = "1.2.3"
description = "Some description."
authors = ["Your Name <you@example.com>"]
license = "MIT"

[tool.poetry.dependencies]
python = "^3.8"
requests = "^2.20"
"#;

    #[test]
    fn test_parse_basic_manifest() {
        let manifest = Manifest::parse(BASIC, Path::new("pyproject.toml")).unwrap();

        assert_eq!(manifest.name(), "my-package");
        assert_eq!(manifest.section().version, "1.2.3");
        assert_eq!(manifest.section().license.as_deref(), Some("MIT"));
        assert_eq!(manifest.section().dependencies.len(), 2);
    }

    #[test]
    fn test_parse_preserves_dependency_order() {
        let content = r#"
[tool.poetry]
name = "ordered"
version = "0.1.0"
authors = ["Your Name <you@example.com>"]

[tool.poetry.dependencies]
zlib = "^1.0"
aiohttp = "^3.0"
marshmallow = "^3.5"
"#;
        let manifest = Manifest::parse(content, Path::new("pyproject.toml")).unwrap();
        let names: Vec<&str> = manifest
            .section()
            .dependencies
            .keys()
            .map(String::as_str)
            .collect();

        assert_eq!(names, ["zlib", "aiohttp", "marshmallow"]);
    }

    #[test]
    fn test_missing_section() {
        let content = r#"
[build-system]
requires = ["setuptools"]
"#;
        let err = Manifest::parse(content, Path::new("pyproject.toml")).unwrap_err();
        assert!(matches!(err, ManifestError::SectionMissing { .. }));
        assert!(err.to_string().contains("[tool.poetry]"));
    }

    #[test]
    fn test_invalid_toml() {
        let err = Manifest::parse("not = toml = at all", Path::new("pyproject.toml")).unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
    }

    #[test]
    fn test_check_collects_all_errors() {
        let content = r#"
[tool.poetry]
description = "no name, no version"
"#;
        let err = Manifest::parse(content, Path::new("pyproject.toml")).unwrap_err();
        match err {
            ManifestError::Invalid { errors } => {
                assert_eq!(errors.len(), 3);
                assert!(errors.contains(&"name is required".to_string()));
                assert!(errors.contains(&"version is required".to_string()));
                assert!(errors.contains(&"authors is required".to_string()));
            }
            other => panic!("expected invalid manifest, got {:?}", other),
        }
    }

    #[test]
    fn test_check_rejects_empty_authors() {
        let content = r#"
[tool.poetry]
name = "empty-authors"
version = "0.1.0"
authors = []
"#;
        let err = Manifest::parse(content, Path::new("pyproject.toml")).unwrap_err();
        match err {
            ManifestError::Invalid { errors } => {
                assert_eq!(errors, ["authors must not be empty"]);
            }
            other => panic!("expected invalid manifest, got {:?}", other),
        }
    }

    #[test]
    fn test_check_type_errors() {
        let content = r#"
[tool.poetry]
name = "typed"
version = 1.2
authors = "not a list"
"#;
        let document: toml::Table = toml::from_str(content).unwrap();
        let section = document["tool"]["poetry"].as_table().unwrap();

        let report = Manifest::check(section);
        assert!(!report.is_ok());
        assert!(report
            .errors
            .contains(&"version must be a string".to_string()));
        assert!(report
            .errors
            .contains(&"authors must be an array of strings".to_string()));
    }

    #[test]
    fn test_check_strict_wildcard_python() {
        let content = r#"
[tool.poetry]
name = "loose"
version = "0.1.0"
authors = ["Your Name <you@example.com>"]

[tool.poetry.dependencies]
python = "*"
"#;
        let document: toml::Table = toml::from_str(content).unwrap();
        let section = document["tool"]["poetry"].as_table().unwrap();

        let report = Manifest::check_strict(section);
        assert!(report.is_ok());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("wildcard python dependency"));
    }

    #[test]
    fn test_check_strict_unknown_license() {
        let content = r#"
[tool.poetry]
name = "licensed"
version = "0.1.0"
authors = ["Your Name <you@example.com>"]
license = "NOT-A-REAL-LICENSE"
"#;
        let document: toml::Table = toml::from_str(content).unwrap();
        let section = document["tool"]["poetry"].as_table().unwrap();

        let report = Manifest::check_strict(section);
        assert!(!report.is_ok());
        assert!(report.errors[0].contains("is not a valid license"));
    }

    #[test]
    fn test_find_walks_parents() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(tmp.path().join(MANIFEST_NAME), BASIC).unwrap();

        let found = Manifest::find(&nested).unwrap();
        assert_eq!(found, tmp.path().join(MANIFEST_NAME));
    }

    #[test]
    fn test_find_reports_missing() {
        let tmp = TempDir::new().unwrap();
        let err = Manifest::find(tmp.path()).unwrap_err();

        assert!(matches!(err, ManifestError::NotFound { .. }));
        assert!(err.to_string().contains("or its parents"));
    }

    #[test]
    fn test_load_from_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(MANIFEST_NAME);
        std::fs::write(&path, BASIC).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.dir(), tmp.path());
        assert_eq!(manifest.name(), "my-package");
    }
}
