//! Helper utilities shared by the PostgreSQL adapter modules.

use crate::{Result, error::GeoRefError};
use sqlx::{Row, postgres::PgRow};

/// Extension trait for extracting typed values from database rows
/// with consistent error handling.
///
/// # Example
/// ```rust,ignore
/// use georef_core::adapters::helpers::RowExt;
///
/// let name: String = row.get_field("column_name", "sales")?;
/// ```
pub trait RowExt {
    /// Extracts a typed field, reporting `context` on failure.
    ///
    /// # Errors
    /// Returns [`GeoRefError::Query`] when the column is missing or has an
    /// unexpected type.
    fn get_field<'r, T>(&'r self, field_name: &str, context: &str) -> Result<T>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>;
}

impl RowExt for PgRow {
    fn get_field<'r, T>(&'r self, field_name: &str, context: &str) -> Result<T>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        self.try_get(field_name).map_err(|e| {
            GeoRefError::query_failed(
                format!("Failed to read field '{}' from {}", field_name, context),
                e,
            )
        })
    }
}

/// PostgreSQL SQLSTATE for a missing relation.
pub const UNDEFINED_TABLE: &str = "42P01";

/// PostgreSQL SQLSTATE for a missing column.
pub const UNDEFINED_COLUMN: &str = "42703";

/// SQLSTATE of a database error, if the driver reported one.
pub fn sqlstate(error: &sqlx::Error) -> Option<String> {
    match error {
        sqlx::Error::Database(db_err) => db_err.code().map(|code| code.into_owned()),
        _ => None,
    }
}
