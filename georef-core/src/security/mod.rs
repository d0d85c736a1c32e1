//! Credential protection and connection targets.
//!
//! # Module Structure
//! - `credentials`: Username/password container zeroed on drop
//! - `connection`: Fact/master targets, URI assembly and safe descriptions

mod connection;
mod credentials;

pub use connection::{ConnectionTarget, DEFAULT_POSTGRES_PORT};
pub use credentials::Credentials;
