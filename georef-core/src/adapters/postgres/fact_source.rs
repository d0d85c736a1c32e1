//! Fact table access: schema check and distinct location fetch.
//!
//! Mapped column names come from the command line, so they are checked
//! against `information_schema.columns` before any SQL mentioning them is
//! built. A name that only matches case-insensitively (e.g. `State_Name`
//! for a column created unquoted as `state_name`) is resolved to the real
//! column name.

use super::PostgresAdapter;
use crate::Result;
use crate::adapters::helpers::RowExt;
use crate::error::GeoRefError;
use crate::models::{HierarchyLevel, LevelSource, LocationCandidate, LocationMapping};
use crate::query::{FACT_COLUMNS_QUERY, distinct_locations_sql};
use crate::validation::TableName;

/// Mapped fact columns resolved to their actual names in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactColumns {
    table: TableName,
    columns: Vec<(HierarchyLevel, String)>,
}

impl FactColumns {
    /// Fact table these columns belong to.
    pub const fn table(&self) -> &TableName {
        &self.table
    }

    /// `(level, actual column name)` pairs, coarsest first.
    pub fn columns(&self) -> &[(HierarchyLevel, String)] {
        &self.columns
    }

    /// `mapping` with every column source renamed to the column's actual
    /// name, so the destination table uses the fact table's spelling.
    pub fn resolved_mapping(&self, mapping: &LocationMapping) -> LocationMapping {
        let levels = HierarchyLevel::ALL.map(|level| {
            mapping.source(level).map(|source| match source {
                LevelSource::Column(requested) => self
                    .columns
                    .iter()
                    .find(|(resolved_level, _)| *resolved_level == level)
                    .map_or_else(
                        || LevelSource::Column(requested.clone()),
                        |(_, actual)| LevelSource::Column(actual.clone()),
                    ),
                LevelSource::Static(value) => LevelSource::Static(value.clone()),
            })
        });
        LocationMapping::from_levels(levels)
    }
}

/// Matches requested column names against the table's actual columns.
///
/// Exact matches win; otherwise a single case-insensitive match is used.
/// Every unresolved name is reported in one error.
pub(super) fn resolve_columns(
    table: &TableName,
    requested: &[(HierarchyLevel, &str)],
    available: &[String],
) -> Result<FactColumns> {
    let mut columns = Vec::with_capacity(requested.len());
    let mut missing = Vec::new();

    for (level, name) in requested {
        let exact = available.iter().find(|column| column.as_str() == *name);
        let resolved = exact.or_else(|| {
            let mut folded = available
                .iter()
                .filter(|column| column.eq_ignore_ascii_case(name));
            match (folded.next(), folded.next()) {
                (Some(only), None) => Some(only),
                _ => None,
            }
        });

        match resolved {
            Some(column) => {
                if column != name {
                    tracing::debug!(
                        "Resolved {} column '{}' to '{}' in {}",
                        level,
                        name,
                        column,
                        table
                    );
                }
                columns.push((*level, column.clone()));
            }
            None => missing.push(format!("'{}' ({})", name, level)),
        }
    }

    if !missing.is_empty() {
        return Err(GeoRefError::schema(format!(
            "column(s) {} not found in fact table '{}'",
            missing.join(", "),
            table
        )));
    }

    Ok(FactColumns {
        table: table.clone(),
        columns,
    })
}

/// Builds candidates for a mapping without any fact column.
pub(super) fn static_candidate(mapping: &LocationMapping) -> LocationCandidate {
    LocationCandidate::new(
        mapping
            .static_levels()
            .map(|(level, value)| (level, value.to_string()))
            .collect(),
    )
}

impl PostgresAdapter {
    /// Lists the columns of `table`, in ordinal order.
    ///
    /// # Errors
    /// Returns [`GeoRefError::Schema`] when the table does not exist (or
    /// has no visible columns) and [`GeoRefError::Query`] on SQL failure.
    pub async fn table_columns(&self, table: &TableName) -> Result<Vec<String>> {
        let rows = sqlx::query(FACT_COLUMNS_QUERY)
            .bind(table.schema())
            .bind(table.name())
            .fetch_all(self.pool())
            .await
            .map_err(|e| {
                GeoRefError::query_failed(format!("Failed to read columns of '{}'", table), e)
            })?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let column: String = row.get_field("column_name", "information_schema.columns")?;
            columns.push(column);
        }

        if columns.is_empty() {
            return Err(GeoRefError::schema(format!(
                "fact table '{}' does not exist or is not visible to this user",
                table
            )));
        }

        Ok(columns)
    }

    /// Checks that the fact table exists and holds every mapped column.
    ///
    /// # Errors
    /// Returns [`GeoRefError::Schema`] naming the missing table or columns.
    pub async fn check_fact_columns(
        &self,
        table: &TableName,
        mapping: &LocationMapping,
    ) -> Result<FactColumns> {
        let available = self.table_columns(table).await?;
        let requested: Vec<(HierarchyLevel, &str)> = mapping.column_levels().collect();
        resolve_columns(table, &requested, &available)
    }

    /// Fetches distinct location combinations from the fact table.
    ///
    /// Column-mapped levels come from the table, static levels are filled in
    /// on every candidate. Without any column-mapped level a single candidate
    /// made of the static values is returned.
    ///
    /// # Errors
    /// Returns [`GeoRefError::Query`] if the distinct query fails.
    pub async fn fetch_candidates(
        &self,
        fact: &FactColumns,
        mapping: &LocationMapping,
    ) -> Result<Vec<LocationCandidate>> {
        if fact.columns.is_empty() {
            tracing::debug!(
                "No column-mapped levels; using static values only for {}",
                fact.table
            );
            return Ok(vec![static_candidate(mapping)]);
        }

        let select: Vec<(HierarchyLevel, &str)> = fact
            .columns
            .iter()
            .map(|(level, column)| (*level, column.as_str()))
            .collect();
        let sql = distinct_locations_sql(&fact.table, &select);
        tracing::debug!("Fetching distinct locations with: {}", sql);

        let rows = sqlx::query(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(|e| {
                GeoRefError::query_failed(
                    format!("Failed to fetch distinct locations from '{}'", fact.table),
                    e,
                )
            })?;

        let statics: Vec<(HierarchyLevel, String)> = mapping
            .static_levels()
            .map(|(level, value)| (level, value.to_string()))
            .collect();

        let context = format!("distinct locations of '{}'", fact.table);
        rows.iter()
            .map(|row| {
                let mut values = statics.clone();
                for (level, _) in &fact.columns {
                    let value: String = row.get_field(level.default_column(), &context)?;
                    values.push((*level, value));
                }
                Ok(LocationCandidate::new(values))
            })
            .collect()
    }
}
