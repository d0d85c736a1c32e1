//! PostgreSQL connection pool management and validation.
//!
//! # Security Features
//! - Validates connection string format before handing it to the driver
//! - Sets statement timeout, application name and UTC on every session
//! - Optionally forces read-only transactions
//! - Sanitizes connection strings in all error messages

use super::{ConnectionConfig, PostgresAdapter};
use crate::Result;
use crate::adapters::MAX_TIMEOUT;
use crate::error::{GeoRefError, redact_database_url};
use crate::security::ConnectionTarget;
use sqlx::PgPool;
use std::time::Duration;
use url::Url;

/// Query parameters handled here instead of by the driver.
const LOCAL_OPTIONS: &[&str] = &["connect_timeout"];

/// Removes georef-specific query parameters from a connection URI.
///
/// Returns the cleaned URI and `config` updated with any recognized
/// options. `connect_timeout` is in seconds and capped at 300; out-of-range
/// values are ignored with a warning.
///
/// # Errors
/// Returns [`GeoRefError::Connection`] when the URI cannot be parsed.
///
/// # Example
/// ```rust
/// use georef_core::adapters::ConnectionConfig;
/// use georef_core::adapters::postgres::split_connection_options;
/// use std::time::Duration;
///
/// let (uri, config) = split_connection_options(
///     "postgres://localhost/db?connect_timeout=5&sslmode=require",
///     ConnectionConfig::default(),
/// )?;
/// assert_eq!(uri, "postgres://localhost/db?sslmode=require");
/// assert_eq!(config.connect_timeout, Duration::from_secs(5));
/// # Ok::<(), georef_core::GeoRefError>(())
/// ```
pub fn split_connection_options(
    connection_string: &str,
    mut config: ConnectionConfig,
) -> Result<(String, ConnectionConfig)> {
    let mut url = Url::parse(connection_string).map_err(|e| {
        GeoRefError::connection_failed("Invalid PostgreSQL connection string format", e)
    })?;

    let mut kept: Vec<(String, String)> = Vec::new();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "connect_timeout" => match value.parse::<u64>() {
                Ok(secs) if secs > 0 && Duration::from_secs(secs) <= MAX_TIMEOUT => {
                    config.connect_timeout = Duration::from_secs(secs);
                }
                _ => tracing::warn!(
                    "Ignoring connect_timeout={} (expected 1-{} seconds)",
                    value,
                    MAX_TIMEOUT.as_secs()
                ),
            },
            _ => kept.push((key.into_owned(), value.into_owned())),
        }
    }

    if url
        .query_pairs()
        .any(|(key, _)| LOCAL_OPTIONS.contains(&key.as_ref()))
    {
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    Ok((url.to_string(), config))
}

/// Validates connection string format.
///
/// # Errors
/// Returns [`GeoRefError::Connection`] if the string is not a URL, uses a
/// scheme other than `postgres`/`postgresql`, or has no host.
pub fn validate_connection_string(connection_string: &str) -> Result<()> {
    let url = Url::parse(connection_string).map_err(|e| {
        GeoRefError::connection_failed("Invalid PostgreSQL connection string format", e)
    })?;

    if !matches!(url.scheme(), "postgres" | "postgresql") {
        return Err(GeoRefError::connection(
            "Connection string must use postgres:// or postgresql:// scheme",
        ));
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(GeoRefError::connection(
            "Connection string must specify a host",
        ));
    }

    Ok(())
}

/// Session statements applied to every pooled connection.
pub(super) fn session_statements(config: &ConnectionConfig) -> Vec<String> {
    let mut statements = vec![
        format!(
            "SET statement_timeout = '{}s'",
            config.statement_timeout.as_secs()
        ),
        format!("SET application_name = '{}'", config.application_name),
        "SET timezone = 'UTC'".to_string(),
    ];
    if config.read_only {
        statements.push("SET default_transaction_read_only = on".to_string());
    }
    statements
}

impl PostgresAdapter {
    /// Connects to `target` and verifies the session with `SELECT 1`.
    ///
    /// The pool is created eagerly so that unreachable hosts and
    /// authentication failures surface here rather than at the first query.
    ///
    /// # Errors
    /// Returns [`GeoRefError::Connection`] for malformed URIs, unreachable
    /// hosts and authentication failures, and [`GeoRefError::Configuration`]
    /// for an invalid `config`.
    pub async fn connect(target: &ConnectionTarget, config: ConnectionConfig) -> Result<Self> {
        let connection_string = target.connection_string()?;
        validate_connection_string(&connection_string)?;

        let (connection_string, config) = split_connection_options(&connection_string, config)?;
        config.validate()?;

        let description = target.safe_description();
        tracing::debug!("Connecting to {}", description);

        let pool = Self::create_connection_pool(&connection_string, &config).await?;
        let adapter = Self {
            pool,
            config,
            description,
        };
        adapter.test_connection().await?;

        tracing::debug!("Connected to {}", adapter.description);
        Ok(adapter)
    }

    /// Creates the pool and applies session settings to every connection.
    async fn create_connection_pool(
        connection_string: &str,
        config: &ConnectionConfig,
    ) -> Result<PgPool> {
        use sqlx::Executor;

        let statements = session_statements(config);

        sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(0)
            .acquire_timeout(config.connect_timeout)
            .test_before_acquire(true)
            .after_connect(move |conn, _meta| {
                let statements = statements.clone();
                Box::pin(async move {
                    for statement in &statements {
                        conn.execute(statement.as_str()).await?;
                    }
                    Ok(())
                })
            })
            .connect(connection_string)
            .await
            .map_err(|e| {
                GeoRefError::connection_failed(
                    format!(
                        "Failed to connect to {}",
                        redact_database_url(connection_string)
                    ),
                    e,
                )
            })
    }

    /// Runs `SELECT 1` against the pool.
    ///
    /// # Errors
    /// Returns [`GeoRefError::Connection`] if the connectivity check fails or returns an
    /// unexpected value.
    pub async fn test_connection(&self) -> Result<()> {
        let result: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                GeoRefError::connection_failed(
                    format!("Connectivity check failed for {}", self.description),
                    e,
                )
            })?;

        if result != 1 {
            return Err(GeoRefError::connection(format!(
                "Connectivity check returned {} for {}",
                result, self.description
            )));
        }

        Ok(())
    }

    /// Closes the connection pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
