//! Infrastructure layer: storage adapters, configuration, bootstrap data.

pub mod config;
pub mod directory;
pub mod seed;

pub use config::{AppConfig, BootstrapAdmin, ConfigError};
pub use directory::{Directory, DirectoryCounts, InMemoryDirectory, PostgresDirectory};
pub use seed::{bootstrap, BootstrapReport};
