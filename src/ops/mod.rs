//! High-level operations.
//!
//! This module contains operations that read and write project state
//! on disk.

pub mod locker;

pub use locker::{migrate_legacy_lockfile, Locker, LEGACY_LOCK_FILE_NAME, LOCK_FILE_NAME};
