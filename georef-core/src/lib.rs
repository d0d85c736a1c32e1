//! Core library for georef, the geolocation reference table migration.
//!
//! georef reads free-text administrative location names (province, city,
//! district, sub-district) from a fact table, resolves them to canonical
//! identifiers in a master geolocation database, and writes the matches
//! into a destination reference table.
//!
//! # Security Guarantees
//! - No password is ever logged or put in an error message
//! - Credentials are zeroed from memory on drop
//! - Table and column names are validated before they reach SQL; values are
//!   always bound parameters
//! - The master database session is read-only
//!
//! # Architecture
//! - [`validation`]: hierarchy completeness and identifier rules, checked
//!   before any connection is opened
//! - [`query`]: pure SQL builders for dynamic column lists
//! - [`adapters`]: PostgreSQL pools, fact source, master lookup, writer
//! - [`migration`]: the end-to-end pipeline

pub mod adapters;
pub mod error;
pub mod logging;
pub mod migration;
pub mod models;
pub mod query;
pub mod security;
pub mod validation;

// Re-export commonly used types
pub use adapters::{ConnectionConfig, PostgresAdapter};
pub use error::{GeoRefError, Result};
pub use logging::init_logging;
pub use migration::{MigrationRequest, run_migration};
pub use models::{
    HierarchyLevel, LevelSource, LocationCandidate, LocationMapping, MigrationSummary,
    ResolvedLocation,
};
pub use validation::{HierarchyInput, TableName, validate_hierarchy};
