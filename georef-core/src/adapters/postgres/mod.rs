//! PostgreSQL adapter used for both the fact and the master database.
//!
//! # Module Structure
//! - `connection`: Pool creation, URI validation and connectivity check
//! - `fact_source`: Schema check and distinct location fetch on the fact table
//! - `lookup`: Case-insensitive resolution against the master table
//! - `writer`: Destination table creation and transactional insert
//!
//! # Security Guarantees
//! - Connection strings are redacted in every error message
//! - Identifiers are validated and quoted, values are always bound
//! - The master database session is read-only

mod connection;
mod fact_source;
mod lookup;
mod writer;


use super::ConnectionConfig;
use sqlx::PgPool;

pub use connection::{split_connection_options, validate_connection_string};
pub use fact_source::FactColumns;
pub use lookup::LookupOutcome;

/// PostgreSQL connection pool plus the settings it was created with.
pub struct PostgresAdapter {
    pool: PgPool,
    config: ConnectionConfig,
    description: String,
}

impl std::fmt::Debug for PostgresAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresAdapter")
            .field("target", &self.description)
            .field("config", &self.config)
            .field("pool_size", &self.pool.size())
            .field("pool_idle", &self.pool.num_idle())
            .finish()
    }
}

impl PostgresAdapter {
    /// Underlying pool.
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Settings the pool was created with.
    pub const fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Credential-free description of the target, e.g.
    /// `postgres://localhost:5432/db`.
    pub fn safe_description(&self) -> &str {
        &self.description
    }
}
