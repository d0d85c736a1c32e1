//! Command-line surface of `georef-migrate`.
//!
//! Turns parsed arguments into a validated [`MigrationRequest`]. Everything
//! that can be rejected without a database (hierarchy gaps, bad table or
//! column names, missing host/database/user, missing master URI) is
//! rejected here, before any password prompt or connection attempt.

use clap::{ArgAction, Parser};
use georef_core::error::GeoRefError;
use georef_core::query::{DEFAULT_MASTER_TABLE, DEFAULT_TARGET_TABLE};
use georef_core::security::{ConnectionTarget, Credentials, DEFAULT_POSTGRES_PORT};
use georef_core::{
    HierarchyInput, HierarchyLevel, MigrationRequest, Result, TableName, validate_hierarchy,
};

/// Environment variable consulted for the fact database password.
pub const PASSWORD_ENV: &str = "PGPASSWORD";

/// Fact database URI used when no connection flag is given.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// CLI argument structure
#[derive(Debug, Parser)]
#[command(name = "georef-migrate")]
#[command(about = "Build a geolocation reference table from free-text location names")]
#[command(version)]
#[command(long_about = "
georef-migrate - Geolocation reference table migration

Reads distinct province / city / district / sub-district names from a fact
table, resolves them case-insensitively against a master geolocation table,
and writes the matches with their location_id into a reference table.

Each level is either read from a fact column (--<level>-col) or fixed to a
static value (--<level>). A level may only be mapped when every higher
level is mapped too.

EXAMPLES:
  georef-migrate --connection-uri postgres://etl@localhost/warehouse \\
      --fact-table sales --province-col state_name --city-col city_name
  georef-migrate --host db.internal --database warehouse --user etl \\
      --fact-table visits --province 'JAWA BARAT' --city-col city
")]
pub struct Cli {
    /// Fact database connection URI
    #[arg(
        long,
        conflicts_with = "host",
        help = "Fact database URI (credentials are redacted in logs); \
                DATABASE_URL is used when no connection flag is given"
    )]
    pub connection_uri: Option<String>,

    /// Fact database host
    #[arg(long, help = "Fact database host (when no URI is given)")]
    pub host: Option<String>,

    /// Fact database port
    #[arg(long, default_value_t = DEFAULT_POSTGRES_PORT)]
    pub port: u16,

    /// Fact database name
    #[arg(long)]
    pub database: Option<String>,

    /// Fact database user
    #[arg(long)]
    pub user: Option<String>,

    /// Table holding the raw location names
    #[arg(long, help = "Fact table, optionally schema-qualified (schema.table)")]
    pub fact_table: String,

    /// Fact column holding province names
    #[arg(long)]
    pub province_col: Option<String>,

    /// Static province value for every row
    #[arg(long)]
    pub province: Option<String>,

    /// Fact column holding city names
    #[arg(long)]
    pub city_col: Option<String>,

    /// Static city value for every row
    #[arg(long)]
    pub city: Option<String>,

    /// Fact column holding district names
    #[arg(long)]
    pub district_col: Option<String>,

    /// Static district value for every row
    #[arg(long)]
    pub district: Option<String>,

    /// Fact column holding sub-district names
    #[arg(long)]
    pub subdistrict_col: Option<String>,

    /// Static sub-district value for every row
    #[arg(long)]
    pub subdistrict: Option<String>,

    /// Master geolocation database URI
    #[arg(
        long,
        env = "MASTER_DB_URI",
        help = "Master geolocation database URI (also read from .env)"
    )]
    pub master_db_uri: Option<String>,

    /// Master table of canonical locations
    #[arg(long, default_value = DEFAULT_MASTER_TABLE)]
    pub master_table: String,

    /// Destination reference table
    #[arg(long, default_value = DEFAULT_TARGET_TABLE)]
    pub target_table: String,

    /// Increase verbosity
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all log output except errors")]
    pub quiet: bool,
}

impl Cli {
    /// Collects the per-level flags.
    pub fn hierarchy_input(&self) -> HierarchyInput {
        let mut input = HierarchyInput::default();
        for level in HierarchyLevel::ALL {
            let (column, value) = match level {
                HierarchyLevel::Province => (&self.province_col, &self.province),
                HierarchyLevel::City => (&self.city_col, &self.city),
                HierarchyLevel::District => (&self.district_col, &self.district),
                HierarchyLevel::SubDistrict => (&self.subdistrict_col, &self.subdistrict),
            };
            input.set(level, column.clone(), value.clone());
        }
        input
    }

    /// Validates everything and builds the request.
    ///
    /// `prompt` is only called for discrete connection parameters when
    /// `PGPASSWORD` is not set, and only after every other check passed.
    ///
    /// # Errors
    /// Returns [`GeoRefError::Validation`] for bad mappings, identifiers or
    /// missing connection parameters, and [`GeoRefError::Configuration`]
    /// when the master URI is missing or the prompt fails.
    pub fn to_request<F>(&self, prompt: F) -> Result<MigrationRequest>
    where
        F: FnOnce(&str, &str) -> Result<Option<String>>,
    {
        let mapping = validate_hierarchy(&self.hierarchy_input())?;
        let fact_table = TableName::parse("fact table", &self.fact_table)?;
        let master_table = TableName::parse("master table", &self.master_table)?;
        let target_table = TableName::parse("target table", &self.target_table)?;

        let master_db = match non_empty(self.master_db_uri.as_deref()) {
            Some(uri) => ConnectionTarget::Uri(uri.to_string()),
            None => {
                return Err(GeoRefError::configuration(
                    "master database URI is required (--master-db-uri or MASTER_DB_URI)",
                ));
            }
        };

        let fact_db = self.fact_target(prompt)?;

        Ok(
            MigrationRequest::new(fact_db, master_db, fact_table, mapping)?
                .with_master_table(master_table)
                .with_target_table(target_table),
        )
    }

    fn fact_target<F>(&self, prompt: F) -> Result<ConnectionTarget>
    where
        F: FnOnce(&str, &str) -> Result<Option<String>>,
    {
        if let Some(uri) = non_empty(self.connection_uri.as_deref()) {
            return Ok(ConnectionTarget::Uri(uri.to_string()));
        }

        let no_discrete_flags = [&self.host, &self.database, &self.user]
            .iter()
            .all(|value| non_empty(value.as_deref()).is_none());
        if let Some(uri) = no_discrete_flags.then(database_url_from_env).flatten() {
            return Ok(ConnectionTarget::Uri(uri));
        }

        let missing: Vec<&str> = [
            ("--host", &self.host),
            ("--database", &self.database),
            ("--user", &self.user),
        ]
        .into_iter()
        .filter(|(_, value)| non_empty(value.as_deref()).is_none())
        .map(|(flag, _)| flag)
        .collect();

        let (Some(host), Some(database), Some(user)) = (
            non_empty(self.host.as_deref()),
            non_empty(self.database.as_deref()),
            non_empty(self.user.as_deref()),
        ) else {
            return Err(GeoRefError::validation(format!(
                "either --connection-uri or all of --host, --database and --user are required \
                 (missing {})",
                missing.join(", ")
            )));
        };

        let password = match password_from_env() {
            Some(password) => Some(password),
            None => prompt(user, host)?,
        };

        let credentials = Credentials::new(user.to_string(), password);
        if !credentials.has_password() {
            tracing::debug!("Connecting to {} as {} without a password", host, user);
        }

        Ok(ConnectionTarget::Parts {
            host: host.to_string(),
            port: Some(self.port),
            database: database.to_string(),
            credentials,
        })
    }
}

/// Password from `PGPASSWORD`, if set and non-empty.
pub fn password_from_env() -> Option<String> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|password| !password.is_empty())
}

/// Fact database URI from `DATABASE_URL`, if set and non-empty.
pub fn database_url_from_env() -> Option<String> {
    std::env::var(DATABASE_URL_ENV)
        .ok()
        .filter(|uri| !uri.trim().is_empty())
}

/// Interactive no-echo password prompt. An empty answer means no password.
///
/// # Errors
/// Returns [`GeoRefError::Configuration`] if the terminal cannot be read.
pub fn prompt_password(user: &str, host: &str) -> Result<Option<String>> {
    let password = rpassword::prompt_password(format!("Password for {}@{}: ", user, host))
        .map_err(|e| GeoRefError::configuration(format!("Failed to read password: {}", e)))?;
    Ok(Some(password).filter(|p| !p.is_empty()))
}

/// Error message for stderr: the error itself, then one `Caused by:` line
/// per underlying error.
pub fn error_report(error: &GeoRefError) -> String {
    let mut report = format!("Error: {}", error);
    let mut cause = std::error::Error::source(error);
    while let Some(inner) = cause {
        report.push_str(&format!("\n  Caused by: {}", inner));
        cause = inner.source();
    }
    report
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
