//! Package sources.
//!
//! Sources describe where release artifacts come from: the repositories
//! a project declares in its manifest and the pool a resolver draws
//! from.

pub mod pool;
pub mod repository;

pub use pool::Pool;
pub use repository::{HttpBasicAuth, Repository, SourceConfig};
