//! Fact and master database targets.
//!
//! A target is either a full URI or discrete host/port/database/user
//! parameters. For discrete parameters the password stays inside
//! [`Credentials`] until the driver URI is assembled.

use super::credentials::Credentials;
use crate::Result;
use crate::error::GeoRefError;
use std::fmt;
use url::Url;

/// Default PostgreSQL port used when none is given.
pub const DEFAULT_POSTGRES_PORT: u16 = 5432;

const REDACTED: &str = "<redacted>";

/// Where a database connection should go.
///
/// `Debug` prints [`ConnectionTarget::safe_description`], never the raw URI.
#[derive(Clone)]
pub enum ConnectionTarget {
    /// Full `postgres://` URI, used as given
    Uri(String),
    /// Discrete parameters assembled into a URI on demand
    Parts {
        /// Database host
        host: String,
        /// Port, 5432 when absent
        port: Option<u16>,
        /// Database name
        database: String,
        /// User and (prompted or environment) password
        credentials: Credentials,
    },
}

impl ConnectionTarget {
    /// Builds the URI handed to the driver.
    ///
    /// Username and password are percent-encoded by `url`, so passwords with
    /// `@`, `/` or `:` survive the round trip.
    ///
    /// # Errors
    /// Returns [`GeoRefError::Configuration`] if the host is not a valid URL
    /// host.
    pub fn connection_string(&self) -> Result<String> {
        let (host, port, database, credentials) = match self {
            Self::Uri(uri) => return Ok(uri.clone()),
            Self::Parts {
                host,
                port,
                database,
                credentials,
            } => (host, port, database, credentials),
        };

        let mut url = Url::parse("postgres://localhost").map_err(|e| {
            GeoRefError::configuration(format!("Failed to build connection URI: {}", e))
        })?;
        url.set_host(Some(host)).map_err(|e| {
            GeoRefError::configuration(format!("Invalid database host '{}': {}", host, e))
        })?;

        let rejected =
            |part: &str| GeoRefError::configuration(format!("Cannot set {} on connection URI", part));
        url.set_port(Some(port.unwrap_or(DEFAULT_POSTGRES_PORT)))
            .map_err(|()| rejected("port"))?;
        url.set_username(credentials.username())
            .map_err(|()| rejected("username"))?;
        url.set_password(credentials.password())
            .map_err(|()| rejected("password"))?;
        url.set_path(database);

        Ok(url.to_string())
    }

    /// `postgres://host:port/database` with user, password and query
    /// parameters left out. Unparseable URIs give `<redacted>`.
    pub fn safe_description(&self) -> String {
        match self {
            Self::Uri(uri) => describe_uri(uri),
            Self::Parts {
                host,
                port,
                database,
                ..
            } => format!(
                "postgres://{}:{}/{}",
                host,
                port.unwrap_or(DEFAULT_POSTGRES_PORT),
                database
            ),
        }
    }
}

impl fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionTarget")
            .field(&self.safe_description())
            .finish()
    }
}

fn describe_uri(uri: &str) -> String {
    let Ok(url) = Url::parse(uri) else {
        return REDACTED.to_string();
    };
    let Some(host) = url.host_str() else {
        return REDACTED.to_string();
    };

    let mut description = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        description.push_str(&format!(":{}", port));
    }
    let database = url.path().trim_start_matches('/');
    if !database.is_empty() {
        description.push('/');
        description.push_str(database);
    }
    description
}
