//! Core data structures for Stanza.
//!
//! This module contains the foundational types used throughout Stanza:
//! - Manifests and dependencies
//! - The package model built from them
//! - Project assembly

pub mod dependency;
pub mod manifest;
pub mod package;
pub mod project;
pub mod spdx;

pub use dependency::{Category, Dependency};
pub use manifest::{Manifest, ManifestError, MANIFEST_NAME};
pub use package::Package;
pub use project::{DiscoverOptions, Project, ProjectError};
pub use spdx::{license_by_id, License};
