//! Package model and build pipeline.
//!
//! A Package is the structured, in-memory form of a project: identity,
//! metadata, dependency declarations and extras. It is assembled from a
//! validated manifest section by an ordered pipeline of steps, so a
//! partially built package never escapes on error, and is treated as
//! immutable afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use semver::{Version, VersionReq};

use crate::core::dependency::{Category, Dependency, DependencySpec};
use crate::core::manifest::{Manifest, ManifestError, PoetrySection};
use crate::core::spdx::{license_by_id, License};
use crate::util::env::MarkerEnvironment;
use crate::util::version::parse_lenient;

/// A fully populated package.
#[derive(Debug, Clone)]
pub struct Package {
    /// Package name
    name: String,

    /// Pinned version (parsed)
    version: Version,

    /// Declared version, verbatim
    pretty_version: String,

    /// Directory the manifest was read from
    root_dir: Option<PathBuf>,

    /// One-line description (empty when absent)
    description: String,

    /// Authors, declared order
    authors: Vec<String>,

    /// Maintainers, declared order
    maintainers: Vec<String>,

    /// Resolved license; unknown identifiers resolve to None
    license: Option<License>,

    /// Keywords for index searches
    keywords: Vec<String>,

    /// Trove classifiers
    classifiers: Vec<String>,

    /// Homepage URL
    homepage: Option<String>,

    /// Repository URL
    repository_url: Option<String>,

    /// Documentation URL
    documentation_url: Option<String>,

    /// Custom URLs (label to URL)
    custom_urls: BTreeMap<String, String>,

    /// Readme path, resolved against the root directory
    readme: Option<PathBuf>,

    /// Target platform restriction
    platform: Option<String>,

    /// Build script, passed through to build tooling
    build: Option<String>,

    /// Source layout entries, passed through
    packages: Vec<toml::Value>,

    /// Extra files to include in distributions
    include: Vec<toml::Value>,

    /// Files to exclude from distributions
    exclude: Vec<toml::Value>,

    /// Interpreter constraint, verbatim (`*` when unconstrained)
    python_versions: String,

    /// Parsed form of `python_versions`
    python_constraint: VersionReq,

    /// Declared dependencies: main entries first, then dev, each in
    /// manifest order
    requires: Vec<Dependency>,

    /// Extras as an association table: extra name to indices into
    /// `requires`, in declared order. Neither side owns the other.
    extras: Vec<(String, Vec<usize>)>,
}

impl Package {
    /// Create a bare package with name and version only.
    ///
    /// The declared version is kept verbatim; the pinned version is its
    /// parsed form. Both start out equal.
    pub fn new(name: impl Into<String>, version: &str) -> Result<Self, ManifestError> {
        let pretty_version = version.to_string();
        let parsed = parse_lenient(version).ok_or_else(|| ManifestError::InvalidVersion {
            value: pretty_version.clone(),
        })?;

        Ok(Package {
            name: name.into(),
            version: parsed,
            pretty_version,
            root_dir: None,
            description: String::new(),
            authors: Vec::new(),
            maintainers: Vec::new(),
            license: None,
            keywords: Vec::new(),
            classifiers: Vec::new(),
            homepage: None,
            repository_url: None,
            documentation_url: None,
            custom_urls: BTreeMap::new(),
            readme: None,
            platform: None,
            build: None,
            packages: Vec::new(),
            include: Vec::new(),
            exclude: Vec::new(),
            python_versions: "*".to_string(),
            python_constraint: VersionReq::STAR,
            requires: Vec::new(),
            extras: Vec::new(),
        })
    }

    /// Build a package from a parsed manifest.
    ///
    /// `env` gates development dependencies carrying an interpreter
    /// constraint; without an environment such gates are not evaluated
    /// and the entries are kept.
    pub fn from_manifest(
        manifest: &Manifest,
        env: Option<&MarkerEnvironment>,
    ) -> Result<Self, ManifestError> {
        Self::from_section(manifest.section(), Some(manifest.dir()), env)
    }

    /// Build a package from a `[tool.poetry]` section.
    ///
    /// Steps run in a fixed order because later ones depend on earlier
    /// ones: base identity, metadata, main dependencies, dev
    /// dependencies, extras, pass-through fields.
    pub fn from_section(
        section: &PoetrySection,
        root_dir: Option<&Path>,
        env: Option<&MarkerEnvironment>,
    ) -> Result<Self, ManifestError> {
        let builder = PackageBuilder::new(&section.name, &section.version)?
            .root(root_dir)
            .metadata(section)
            .dependencies(&section.dependencies)?
            .dev_dependencies(&section.dev_dependencies, env)?
            .extras(&section.extras)
            .passthrough(section);

        Ok(builder.finish())
    }

    /// Get the package name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the pinned version.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Get the declared version, verbatim.
    pub fn pretty_version(&self) -> &str {
        &self.pretty_version
    }

    /// Get the directory the manifest was read from.
    pub fn root_dir(&self) -> Option<&Path> {
        self.root_dir.as_deref()
    }

    /// Get the description (empty when the manifest has none).
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Get the authors.
    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    /// Get the maintainers.
    pub fn maintainers(&self) -> &[String] {
        &self.maintainers
    }

    /// Get the resolved license, if the identifier was recognized.
    pub fn license(&self) -> Option<License> {
        self.license
    }

    /// Get the keywords.
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Get the trove classifiers.
    pub fn classifiers(&self) -> &[String] {
        &self.classifiers
    }

    /// Get the homepage URL.
    pub fn homepage(&self) -> Option<&str> {
        self.homepage.as_deref()
    }

    /// Get the repository URL.
    pub fn repository_url(&self) -> Option<&str> {
        self.repository_url.as_deref()
    }

    /// Get the documentation URL.
    pub fn documentation_url(&self) -> Option<&str> {
        self.documentation_url.as_deref()
    }

    /// Get the custom URLs.
    pub fn custom_urls(&self) -> &BTreeMap<String, String> {
        &self.custom_urls
    }

    /// Get the readme path.
    pub fn readme(&self) -> Option<&Path> {
        self.readme.as_deref()
    }

    /// Get the platform restriction.
    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    /// Get the build script name.
    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    /// Get the source layout entries.
    pub fn packages(&self) -> &[toml::Value] {
        &self.packages
    }

    /// Get the include patterns.
    pub fn include(&self) -> &[toml::Value] {
        &self.include
    }

    /// Get the exclude patterns.
    pub fn exclude(&self) -> &[toml::Value] {
        &self.exclude
    }

    /// Get the interpreter constraint, verbatim.
    pub fn python_versions(&self) -> &str {
        &self.python_versions
    }

    /// Get the parsed interpreter constraint.
    pub fn python_constraint(&self) -> &VersionReq {
        &self.python_constraint
    }

    /// Get every declared dependency, main entries before dev entries.
    pub fn requires(&self) -> &[Dependency] {
        &self.requires
    }

    /// Get the extras association table.
    pub fn extras(&self) -> &[(String, Vec<usize>)] {
        &self.extras
    }

    /// Resolve the dependencies referenced by an extra, in declared order.
    pub fn extra_dependencies(&self, extra: &str) -> Vec<&Dependency> {
        self.extras
            .iter()
            .find(|(name, _)| name == extra)
            .map(|(_, indices)| indices.iter().map(|&i| &self.requires[i]).collect())
            .unwrap_or_default()
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version
    }
}

impl Eq for Package {}

impl std::hash::Hash for Package {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
    }
}

/// Accumulator for the build pipeline.
///
/// Every step consumes and returns the builder, so failing in the middle
/// drops the half-built package instead of leaking it.
#[derive(Debug)]
struct PackageBuilder {
    package: Package,
}

impl PackageBuilder {
    fn new(name: &str, version: &str) -> Result<Self, ManifestError> {
        Ok(PackageBuilder {
            package: Package::new(name, version)?,
        })
    }

    fn root(mut self, root_dir: Option<&Path>) -> Self {
        self.package.root_dir = root_dir.map(Path::to_path_buf);
        self
    }

    /// Scalar and list metadata. Absent fields keep their empty
    /// defaults; an unknown license identifier resolves to None rather
    /// than failing.
    fn metadata(mut self, section: &PoetrySection) -> Self {
        let package = &mut self.package;

        package.description = section.description.clone().unwrap_or_default();
        package.authors = section.authors.clone();
        package.maintainers = section.maintainers.clone();
        package.keywords = section.keywords.clone();
        package.classifiers = section.classifiers.clone();
        package.homepage = section.homepage.clone();
        package.repository_url = section.repository.clone();
        package.documentation_url = section.documentation.clone();
        package.platform = section.platform.clone();
        package.license = section.license.as_deref().and_then(license_by_id);

        // Path arithmetic only; whether the file exists is checked by
        // packaging, not here.
        package.readme = match (&package.root_dir, &section.readme) {
            (Some(root), Some(readme)) => Some(root.join(readme)),
            (None, Some(readme)) => Some(PathBuf::from(readme)),
            _ => None,
        };

        self
    }

    /// Main dependency table, in declared order.
    ///
    /// The reserved name `python` (case-insensitive) sets the package's
    /// interpreter constraint and never becomes a dependency.
    fn dependencies(mut self, table: &toml::Table) -> Result<Self, ManifestError> {
        for (name, value) in table {
            if name.eq_ignore_ascii_case("python") {
                let constraint =
                    value
                        .as_str()
                        .ok_or_else(|| ManifestError::InvalidDependency {
                            name: name.clone(),
                            message: "interpreter constraint must be a string".to_string(),
                        })?;
                self.package.python_constraint = parse_req(name, constraint)?;
                self.package.python_versions = constraint.to_string();
                continue;
            }

            let spec = decode_spec(name, value)?;
            push_dependency(
                &mut self.package.requires,
                name,
                &spec,
                Category::Main,
                None,
            )?;
        }

        Ok(self)
    }

    /// Dev dependency table. Entries carrying an interpreter gate the
    /// host does not satisfy are skipped silently.
    fn dev_dependencies(
        mut self,
        table: &toml::Table,
        env: Option<&MarkerEnvironment>,
    ) -> Result<Self, ManifestError> {
        for (name, value) in table {
            let spec = decode_spec(name, value)?;
            push_dependency(&mut self.package.requires, name, &spec, Category::Dev, env)?;
        }

        Ok(self)
    }

    /// Extras, synchronized with `requires` in one pass: every
    /// dependency matching a listed name gains a back-reference, and the
    /// extra records each matched index. Names with no matching
    /// dependency are dropped.
    fn extras(mut self, table: &toml::Table) -> Self {
        for (extra_name, value) in table {
            let mut indices = Vec::new();

            let names = value
                .as_array()
                .map(|items| items.iter().filter_map(toml::Value::as_str))
                .into_iter()
                .flatten();
            for dep_name in names {
                let before = indices.len();
                for (index, dep) in self.package.requires.iter_mut().enumerate() {
                    if dep.name() == dep_name {
                        dep.add_extra(extra_name.clone());
                        indices.push(index);
                    }
                }
                if indices.len() == before {
                    tracing::debug!(
                        "extra `{}` references `{}` which is not a declared dependency",
                        extra_name,
                        dep_name
                    );
                }
            }

            self.package.extras.push((extra_name.clone(), indices));
        }

        self
    }

    /// Fields copied through verbatim for downstream tooling.
    fn passthrough(mut self, section: &PoetrySection) -> Self {
        let package = &mut self.package;

        package.build = section.build.clone();
        package.packages = section.packages.clone();
        package.include = section.include.clone();
        package.exclude = section.exclude.clone();
        package.custom_urls = section.urls.clone();

        self
    }

    fn finish(self) -> Package {
        self.package
    }
}

fn decode_spec(name: &str, value: &toml::Value) -> Result<DependencySpec, ManifestError> {
    value
        .clone()
        .try_into()
        .map_err(|err: toml::de::Error| ManifestError::InvalidDependency {
            name: name.to_string(),
            message: err.message().to_string(),
        })
}

fn parse_req(name: &str, constraint: &str) -> Result<VersionReq, ManifestError> {
    constraint
        .parse()
        .map_err(|source| ManifestError::InvalidConstraint {
            name: name.to_string(),
            constraint: constraint.to_string(),
            source,
        })
}

/// Expand one spec into dependencies, recursing through list-valued
/// entries. Dev entries are filtered by their interpreter gate when an
/// environment is available.
fn push_dependency(
    requires: &mut Vec<Dependency>,
    name: &str,
    spec: &DependencySpec,
    category: Category,
    env: Option<&MarkerEnvironment>,
) -> Result<(), ManifestError> {
    match spec {
        DependencySpec::Simple(constraint) => {
            requires.push(Dependency::new(name, parse_req(name, constraint)?).with_category(category));
        }
        DependencySpec::Detailed(detailed) => {
            if category == Category::Dev {
                if let (Some(env), Some(gate)) = (env, detailed.python.as_deref()) {
                    if !env.satisfies(&parse_req(name, gate)?) {
                        tracing::debug!(
                            "skipping dev dependency `{}`: requires python {}",
                            name,
                            gate
                        );
                        return Ok(());
                    }
                }
            }
            requires.push(
                Dependency::new(name, parse_req(name, detailed.constraint())?)
                    .with_category(category),
            );
        }
        DependencySpec::Multiple(entries) => {
            for entry in entries {
                push_dependency(requires, name, entry, category, env)?;
            }
        }
    }

    Ok(())
}
