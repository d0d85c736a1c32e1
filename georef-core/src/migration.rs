//! The migration pipeline: fact table → master lookup → destination table.
//!
//! One run connects to both databases, checks the fact table schema, pulls
//! distinct location combinations, resolves them against the master table,
//! and writes the matches into the destination table inside one
//! transaction. Unmatched combinations are logged and counted, never fatal.

use crate::Result;
use crate::adapters::{ConnectionConfig, PostgresAdapter};
use crate::models::{HierarchyLevel, LocationMapping, MigrationSummary};
use crate::query::{DEFAULT_MASTER_TABLE, DEFAULT_TARGET_TABLE};
use crate::security::ConnectionTarget;
use crate::validation::TableName;
use tracing::{info, warn};

/// Everything a migration run needs, already validated.
#[derive(Debug, Clone)]
pub struct MigrationRequest {
    /// Database holding the fact table; also receives the destination table
    pub fact_db: ConnectionTarget,
    /// Master geolocation database
    pub master_db: ConnectionTarget,
    /// Table the raw location names are read from
    pub fact_table: TableName,
    /// Table of canonical locations in the master database
    pub master_table: TableName,
    /// Table the resolved rows are written to
    pub target_table: TableName,
    /// Validated level mapping
    pub mapping: LocationMapping,
    /// Pool settings shared by both connections
    pub connection: ConnectionConfig,
}

impl MigrationRequest {
    /// Creates a request with the default master and destination tables.
    ///
    /// # Errors
    /// Returns a validation error if the default table names are rejected,
    /// which cannot happen for the built-in names.
    pub fn new(
        fact_db: ConnectionTarget,
        master_db: ConnectionTarget,
        fact_table: TableName,
        mapping: LocationMapping,
    ) -> Result<Self> {
        Ok(Self {
            fact_db,
            master_db,
            fact_table,
            master_table: TableName::parse("master table", DEFAULT_MASTER_TABLE)?,
            target_table: TableName::parse("target table", DEFAULT_TARGET_TABLE)?,
            mapping,
            connection: ConnectionConfig::default(),
        })
    }

    /// Builder method to set the master table.
    pub fn with_master_table(mut self, table: TableName) -> Self {
        self.master_table = table;
        self
    }

    /// Builder method to set the destination table.
    pub fn with_target_table(mut self, table: TableName) -> Self {
        self.target_table = table;
        self
    }

    /// Builder method to set the pool settings.
    pub fn with_connection_config(mut self, config: ConnectionConfig) -> Self {
        self.connection = config;
        self
    }
}

/// Runs one migration and closes both connections before returning.
///
/// # Errors
/// Returns the first error hit: connection, schema, query or write. No step
/// is retried.
pub async fn run_migration(request: &MigrationRequest) -> Result<MigrationSummary> {
    info!(
        "Connecting to fact database {}",
        request.fact_db.safe_description()
    );
    let fact = PostgresAdapter::connect(
        &request.fact_db,
        request.connection.clone().with_read_only(false),
    )
    .await?;

    info!(
        "Connecting to master database {}",
        request.master_db.safe_description()
    );
    let master = match PostgresAdapter::connect(
        &request.master_db,
        request.connection.clone().with_read_only(true),
    )
    .await
    {
        Ok(master) => master,
        Err(e) => {
            fact.close().await;
            return Err(e);
        }
    };

    let result = migrate(&fact, &master, request).await;

    master.close().await;
    fact.close().await;
    result
}

/// Runs the pipeline over already connected adapters.
///
/// `fact` is also where the destination table is written.
///
/// # Errors
/// See [`run_migration`].
pub async fn migrate(
    fact: &PostgresAdapter,
    master: &PostgresAdapter,
    request: &MigrationRequest,
) -> Result<MigrationSummary> {
    let columns = fact
        .check_fact_columns(&request.fact_table, &request.mapping)
        .await?;
    let resolved = columns.resolved_mapping(&request.mapping);
    let mapping = &resolved;

    info!("Fetching distinct locations from {}...", request.fact_table);
    let candidates = fact.fetch_candidates(&columns, mapping).await?;
    info!("Found {} distinct location combinations", candidates.len());

    info!(
        "Looking up location IDs in {}...",
        request.master_table
    );
    let levels: Vec<HierarchyLevel> = mapping.mapped().map(|(level, _)| level).collect();
    let outcome = master
        .resolve_locations(&request.master_table, &levels, &candidates)
        .await?;

    for candidate in &outcome.unmatched {
        warn!("No location found for {}", candidate);
    }
    info!(
        "Found {} matching location IDs ({} unmatched)",
        outcome.resolved.len(),
        outcome.unmatched.len()
    );

    fact.ensure_destination_table(&request.target_table, mapping)
        .await?;

    let created_at = chrono::Utc::now().naive_utc();
    let inserted = fact
        .insert_locations(&request.target_table, mapping, &outcome.resolved, created_at)
        .await?;

    Ok(MigrationSummary {
        target_table: request.target_table.to_string(),
        candidates: candidates.len(),
        matched: outcome.resolved.len(),
        unmatched: outcome.unmatched.len(),
        inserted,
    })
}

/// Mapping summary for the start-of-run log line, e.g.
/// `province=column:state_name, city=static:Bandung`.
pub fn describe_mapping(mapping: &LocationMapping) -> String {
    mapping
        .mapped()
        .map(|(level, source)| match source {
            crate::models::LevelSource::Column(column) => format!("{}=column:{}", level, column),
            crate::models::LevelSource::Static(value) => format!("{}=static:{}", level, value),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
