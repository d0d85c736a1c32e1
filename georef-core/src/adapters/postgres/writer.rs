//! Destination table creation and transactional insert.

use super::PostgresAdapter;
use crate::Result;
use crate::error::GeoRefError;
use crate::models::{HierarchyLevel, LocationMapping, ResolvedLocation};
use crate::query::{TABLE_EXISTS_QUERY, create_table_sql, insert_prefix, rows_per_insert};
use crate::validation::TableName;
use chrono::NaiveDateTime;
use sqlx::{Postgres, QueryBuilder};

impl PostgresAdapter {
    /// Whether `table` exists in this database.
    ///
    /// # Errors
    /// Returns [`GeoRefError::Query`] if the catalog query fails.
    pub async fn table_exists(&self, table: &TableName) -> Result<bool> {
        sqlx::query_scalar(TABLE_EXISTS_QUERY)
            .bind(table.schema())
            .bind(table.name())
            .fetch_one(self.pool())
            .await
            .map_err(|e| {
                GeoRefError::query_failed(format!("Failed to look up table '{}'", table), e)
            })
    }

    /// Creates the destination table if it does not exist yet.
    ///
    /// Columns: `location_id VARCHAR(255) NOT NULL`, one `VARCHAR(255)` per
    /// mapped level (see [`LocationMapping::output_columns`]), and
    /// `created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP`. An existing table is
    /// left untouched.
    ///
    /// # Errors
    /// Returns [`GeoRefError::Query`] if the existence check fails and
    /// [`GeoRefError::Write`] if the DDL fails.
    pub async fn ensure_destination_table(
        &self,
        target: &TableName,
        mapping: &LocationMapping,
    ) -> Result<()> {
        if self.table_exists(target).await? {
            tracing::info!("Destination table '{}' already exists", target);
            return Ok(());
        }

        let sql = create_table_sql(target, &mapping.output_columns());
        tracing::debug!("Creating destination table with: {}", sql);

        sqlx::query(&sql)
            .execute(self.pool())
            .await
            .map_err(|e| {
                GeoRefError::write_failed(
                    format!("Failed to create destination table '{}'", target),
                    e,
                )
            })?;

        tracing::info!("Destination table '{}' created", target);
        Ok(())
    }

    /// Inserts resolved locations in a single transaction.
    ///
    /// Rows are sent as multi-row inserts; all of them share `created_at`.
    /// Any failure rolls the whole transaction back.
    ///
    /// # Returns
    /// Number of rows inserted.
    ///
    /// # Errors
    /// Returns [`GeoRefError::Write`] if the transaction cannot be started,
    /// an insert fails, or the commit fails.
    pub async fn insert_locations(
        &self,
        target: &TableName,
        mapping: &LocationMapping,
        rows: &[ResolvedLocation],
        created_at: NaiveDateTime,
    ) -> Result<u64> {
        if rows.is_empty() {
            tracing::info!("No locations to insert into '{}'", target);
            return Ok(0);
        }

        let output_columns = mapping.output_columns();
        let levels: Vec<HierarchyLevel> = mapping.mapped().map(|(level, _)| level).collect();
        let prefix = insert_prefix(target, &output_columns);
        let batch_size = rows_per_insert(output_columns.len().saturating_add(2));

        let mut tx = self.pool().begin().await.map_err(|e| {
            GeoRefError::write_failed(format!("Failed to start transaction on '{}'", target), e)
        })?;

        let mut inserted: u64 = 0;
        for (batch, chunk) in rows.chunks(batch_size).enumerate() {
            let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(&prefix);
            builder.push_values(chunk, |mut values, row| {
                values.push_bind(row.location_id.clone());
                for level in &levels {
                    values.push_bind(row.candidate.value(*level).map(str::to_string));
                }
                values.push_bind(created_at);
            });

            match builder.build().execute(&mut *tx).await {
                Ok(result) => {
                    inserted = inserted.saturating_add(result.rows_affected());
                    tracing::debug!("Inserted batch {} ({} rows)", batch, chunk.len());
                }
                Err(e) => {
                    if let Err(rollback_error) = tx.rollback().await {
                        tracing::error!("Rollback on '{}' failed: {}", target, rollback_error);
                    } else {
                        tracing::warn!("Rolled back inserts into '{}'", target);
                    }
                    return Err(GeoRefError::write_failed(
                        format!("Failed to insert batch {} into '{}'", batch, target),
                        e,
                    ));
                }
            }
        }

        tx.commit().await.map_err(|e| {
            GeoRefError::write_failed(format!("Failed to commit inserts into '{}'", target), e)
        })?;

        tracing::info!("Inserted {} locations into '{}'", inserted, target);
        Ok(inserted)
    }
}
