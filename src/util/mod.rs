//! Shared utilities

pub mod config;
pub mod env;
pub mod version;

pub use config::{Config, ConfigSources};
pub use env::MarkerEnvironment;
