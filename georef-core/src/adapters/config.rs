//! Database connection configuration.

use std::time::Duration;

/// Upper bound for the connect and statement timeouts.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(300);

/// Tuning for one database connection pool.
///
/// # Security
/// This struct does NOT store passwords or credentials.
///
/// # Example
/// ```rust
/// use georef_core::adapters::ConnectionConfig;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::new()
///     .with_read_only(true)
///     .with_connect_timeout(Duration::from_secs(5));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Connection (and pool acquire) timeout
    pub connect_timeout: Duration,
    /// Per-statement timeout set on every session
    pub statement_timeout: Duration,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Whether sessions default to read-only transactions
    pub read_only: bool,
    /// `application_name` reported to the server
    pub application_name: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            statement_timeout: Duration::from_secs(120),
            max_connections: 2,
            read_only: false,
            application_name: format!("georef-{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ConnectionConfig {
    /// Creates a config with the defaults above.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates configuration values.
    ///
    /// # Errors
    /// Returns a configuration error for zero or oversized values.
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_connections == 0 {
            return Err(crate::error::GeoRefError::configuration(
                "max_connections must be greater than 0",
            ));
        }

        if self.max_connections > 10 {
            return Err(crate::error::GeoRefError::configuration(
                "max_connections should not exceed 10 for a one-shot migration",
            ));
        }

        if self.connect_timeout.is_zero() || self.connect_timeout > MAX_TIMEOUT {
            return Err(crate::error::GeoRefError::configuration(
                "connect_timeout must be between 1 and 300 seconds",
            ));
        }

        if self.statement_timeout.is_zero() || self.statement_timeout > MAX_TIMEOUT {
            return Err(crate::error::GeoRefError::configuration(
                "statement_timeout must be between 1 and 300 seconds",
            ));
        }

        if self.application_name.contains('\'') {
            return Err(crate::error::GeoRefError::configuration(
                "application_name cannot contain quotes",
            ));
        }

        Ok(())
    }

    /// Builder method to set read-only sessions.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Builder method to set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Builder method to set the statement timeout.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }

    /// Builder method to set the pool size.
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.max_connections, 2);
        assert!(!config.read_only);
        assert!(config.application_name.starts_with("georef-"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_connection_config_validation() {
        assert!(ConnectionConfig::new().with_max_connections(0).validate().is_err());
        assert!(ConnectionConfig::new().with_max_connections(11).validate().is_err());
        assert!(
            ConnectionConfig::new()
                .with_connect_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            ConnectionConfig::new()
                .with_statement_timeout(Duration::from_secs(301))
                .validate()
                .is_err()
        );

        let config = ConnectionConfig {
            application_name: "it's".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_connection_config_builder() {
        let config = ConnectionConfig::new()
            .with_read_only(true)
            .with_connect_timeout(Duration::from_secs(5))
            .with_statement_timeout(Duration::from_secs(60))
            .with_max_connections(1);

        assert!(config.read_only);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.statement_timeout, Duration::from_secs(60));
        assert_eq!(config.max_connections, 1);
    }
}
