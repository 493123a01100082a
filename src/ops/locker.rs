//! Lock file handle and freshness checks.
//!
//! The locker does not write lock data; resolving and locking belong to
//! the downstream solver. It answers two questions: is the project
//! locked, and does the lock still match the manifest? Freshness is
//! content-based: a hash of the manifest's resolution-affecting fields
//! is compared against the hash recorded in the lock file, which is more
//! reliable than timestamps (git checkout, unzip and clock skew all lie).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Canonical lock file name.
pub const LOCK_FILE_NAME: &str = "poetry.lock";

/// Lock file name used by early releases, recognized for migration only.
pub const LEGACY_LOCK_FILE_NAME: &str = "pyproject.lock";

/// Manifest keys that affect resolution and therefore the content hash.
const RELEVANT_KEYS: [&str; 4] = ["dependencies", "dev-dependencies", "source", "extras"];

/// Handle on a project's lock file.
#[derive(Debug, Clone)]
pub struct Locker {
    /// Lock file location
    path: PathBuf,

    /// Hash of the manifest's resolution-affecting content
    content_hash: String,
}

impl Locker {
    /// Create a locker for a lock file path and the manifest section it
    /// locks.
    pub fn new(path: impl Into<PathBuf>, section: &toml::Table) -> Result<Self> {
        Ok(Locker {
            path: path.into(),
            content_hash: compute_content_hash(section)?,
        })
    }

    /// Get the lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hash of the manifest content this locker validates against.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Check whether lock data exists for this project.
    pub fn is_locked(&self) -> bool {
        matches!(self.read(), Ok(Some(data)) if data.contains_key("package"))
    }

    /// Check whether the lock file still matches the manifest.
    ///
    /// A missing lock file, or one recorded against different manifest
    /// content, is stale.
    pub fn is_fresh(&self) -> Result<bool> {
        let Some(data) = self.read()? else {
            return Ok(false);
        };

        let recorded = data
            .get("metadata")
            .and_then(|metadata| metadata.get("content-hash"))
            .and_then(|value| value.as_str());

        Ok(recorded == Some(self.content_hash.as_str()))
    }

    /// Read the lock file contents, or None if it does not exist.
    pub fn read(&self) -> Result<Option<toml::Table>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read lock file: {}", self.path.display()))?;
        let data = toml::from_str(&content)
            .with_context(|| format!("failed to parse lock file: {}", self.path.display()))?;

        Ok(Some(data))
    }
}

/// Move a legacy-named lock file to the canonical name.
///
/// Idempotent: nothing happens when the canonical file already exists
/// (it always wins, never overwritten) or when there is no legacy file.
/// Returns true when a rename took place.
pub fn migrate_legacy_lockfile(dir: &Path) -> std::io::Result<bool> {
    let canonical = dir.join(LOCK_FILE_NAME);
    let legacy = dir.join(LEGACY_LOCK_FILE_NAME);

    if canonical.exists() || !legacy.exists() {
        return Ok(false);
    }

    tracing::debug!(
        "migrating lock file {} -> {}",
        legacy.display(),
        canonical.display()
    );
    std::fs::rename(&legacy, &canonical)?;

    Ok(true)
}

/// Hash the manifest's resolution-affecting fields.
///
/// Fields are normalized through JSON with sorted keys, so declaration
/// order and formatting do not disturb the hash. Absent keys hash as
/// null, which keeps `dependencies = {}` distinct from no table at all.
pub fn compute_content_hash(section: &toml::Table) -> Result<String> {
    let mut relevant = serde_json::Map::new();
    for key in RELEVANT_KEYS {
        let json = match section.get(key) {
            Some(value) => serde_json::to_value(value)
                .with_context(|| format!("failed to normalize manifest key `{}`", key))?,
            None => serde_json::Value::Null,
        };
        relevant.insert(key.to_string(), json);
    }

    let bytes = serde_json::to_vec(&serde_json::Value::Object(relevant))
        .context("failed to serialize normalized manifest content")?;
    let hash = Sha256::digest(&bytes);

    Ok(hex::encode(hash))
}
