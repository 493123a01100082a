//! Stanza - Manifest loading and project composition for Poetry projects
//!
//! This crate provides the core library functionality for Stanza,
//! including manifest location and validation, package model
//! construction, configuration composition and lock file handling.

pub mod core;
pub mod ops;
pub mod sources;
pub mod util;

pub use crate::core::{
    dependency::Dependency, manifest::Manifest, package::Package, project::Project,
};

pub use crate::sources::pool::Pool;
pub use crate::util::config::Config;
