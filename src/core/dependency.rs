//! Dependency declarations.
//!
//! A Dependency describes what a package requires from another package:
//! a version constraint, the category it was declared under (main or
//! dev), and the extras that reference it. The same name may appear in
//! several Dependency entries with different constraints, so identity is
//! the (name, constraint) pair and never the name alone.

use std::fmt;

use semver::{Version, VersionReq};
use serde::Deserialize;

/// The dependency table a requirement was declared in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Category {
    /// Regular runtime dependency (`[tool.poetry.dependencies]`).
    #[default]
    Main,

    /// Development-only dependency (`[tool.poetry.dev-dependencies]`).
    Dev,
}

impl Category {
    /// Category name as it appears in lock files and exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Main => "main",
            Category::Dev => "dev",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared requirement on another package.
#[derive(Debug, Clone)]
pub struct Dependency {
    /// Package name
    name: String,

    /// Version requirement (`*` when unconstrained)
    req: VersionReq,

    /// Declaring table
    category: Category,

    /// Names of extras that reference this dependency (back-references,
    /// populated while extras are decoded; not ownership)
    in_extras: Vec<String>,
}

impl Dependency {
    /// Create a new main-category dependency.
    pub fn new(name: impl Into<String>, req: VersionReq) -> Self {
        Dependency {
            name: name.into(),
            req,
            category: Category::Main,
            in_extras: Vec::new(),
        }
    }

    /// Set the category.
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    /// Get the package name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the version requirement.
    pub fn version_req(&self) -> &VersionReq {
        &self.req
    }

    /// Get the category.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Check if this is a development dependency.
    pub fn is_dev(&self) -> bool {
        self.category == Category::Dev
    }

    /// Names of the extras referencing this dependency.
    pub fn in_extras(&self) -> &[String] {
        &self.in_extras
    }

    /// Check if a concrete version satisfies this dependency.
    pub fn matches_version(&self, version: &Version) -> bool {
        self.req.matches(version)
    }

    /// Record that an extra references this dependency.
    pub(crate) fn add_extra(&mut self, extra: impl Into<String>) {
        self.in_extras.push(extra.into());
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.req != VersionReq::STAR {
            write!(f, " {}", self.req)?;
        }
        Ok(())
    }
}

/// Dependencies compare by identity: the (name, constraint) pair.
impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.req == other.req
    }
}

impl Eq for Dependency {}

/// Dependency specification as it appears in the manifest.
///
/// A table entry is either a bare constraint string, a detailed table, or
/// a list of alternatives (e.g. platform- or interpreter-specific
/// variants).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    /// Bare constraint: `requests = "^2.20"`
    Simple(String),

    /// Detailed table: `requests = { version = "^2.20", python = "<3.8" }`
    Detailed(DetailedDependencySpec),

    /// Alternatives: `requests = [{ version = "^1.0", python = "<3.6" }, ...]`
    Multiple(Vec<DependencySpec>),
}

/// Detailed dependency specification.
///
/// Source-selection keys (git, path, ...) belong to the downstream
/// resolver and are ignored here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetailedDependencySpec {
    /// Version constraint; absent means `*`
    #[serde(default)]
    pub version: Option<String>,

    /// Interpreter constraint gating inclusion of dev dependencies
    #[serde(default)]
    pub python: Option<String>,

    /// Target platform restriction (passed through)
    #[serde(default)]
    pub platform: Option<String>,

    /// Whether this dependency is optional
    #[serde(default)]
    pub optional: Option<bool>,

    /// Extras to enable on the target package
    #[serde(default)]
    pub extras: Option<Vec<String>>,
}

impl DetailedDependencySpec {
    /// The version constraint expression, defaulting to `*`.
    pub fn constraint(&self) -> &str {
        self.version.as_deref().unwrap_or("*")
    }
}
