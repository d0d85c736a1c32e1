//! Database access for georef.
//!
//! Both the fact database and the master geolocation database are
//! PostgreSQL, so there is a single adapter type; each database gets its own
//! [`PostgresAdapter`] with its own [`ConnectionConfig`].
//!
//! # Module Structure
//! - `config`: Pool and session tuning
//! - `helpers`: Row decoding and SQLSTATE helpers
//! - `postgres`: Connection, fact source, master lookup and table writer

mod config;
pub mod helpers;
pub mod postgres;

pub use crate::error::redact_database_url;
pub use config::{ConnectionConfig, MAX_TIMEOUT};
pub use postgres::PostgresAdapter;
