//! Repository pool.
//!
//! An ordered collection of registered repositories. The facade hands it
//! out empty; the downstream resolver fills it and decides precedence.

use crate::sources::repository::Repository;

/// An ordered set of repositories.
#[derive(Debug, Clone, Default)]
pub struct Pool {
    repositories: Vec<Repository>,
}

impl Pool {
    /// Create a new empty pool.
    pub fn new() -> Self {
        Pool {
            repositories: Vec::new(),
        }
    }

    /// Add a repository. Insertion order is preserved.
    pub fn add_repository(&mut self, repository: Repository) {
        self.repositories.push(repository);
    }

    /// All repositories in insertion order.
    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    /// Look up a repository by name.
    pub fn repository(&self, name: &str) -> Option<&Repository> {
        self.repositories
            .iter()
            .find(|repository| repository.name() == name)
    }

    /// Check whether a repository with the given name is registered.
    pub fn has_repository(&self, name: &str) -> bool {
        self.repository(name).is_some()
    }

    /// Number of registered repositories.
    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    /// Check whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }
}
