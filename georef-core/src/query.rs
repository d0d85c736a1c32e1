//! SQL construction from dynamic column lists.
//!
//! Every builder here is pure: it takes already validated [`TableName`]s and
//! column names, quotes them, and returns SQL text. Values are never
//! interpolated; they are bound by the caller as `$n` parameters or through
//! `sqlx::QueryBuilder::push_bind`.
//!
//! # Lookup strategy
//! The fact and master tables live in different databases, so candidates are
//! shipped to the master database as one `text[]` array per mapped level and
//! unnested `WITH ORDINALITY`. A `LEFT JOIN` on lower-cased names keeps
//! unmatched candidates as rows with a NULL identifier, and `DISTINCT ON`
//! keeps the first master row (by identifier) per candidate.

use crate::models::HierarchyLevel;
use crate::validation::{TableName, quote_identifier};

/// Master table read when none is configured.
pub const DEFAULT_MASTER_TABLE: &str = "indonesia_boundaries";

/// Destination table written when none is configured.
pub const DEFAULT_TARGET_TABLE: &str = "geo_ref_test";

/// Identifier column of the master table.
pub const MASTER_ID_COLUMN: &str = "objectid";

/// Destination column holding the resolved identifier.
pub const LOCATION_ID_COLUMN: &str = "location_id";

/// Destination column holding the insertion timestamp.
pub const CREATED_AT_COLUMN: &str = "created_at";

/// PostgreSQL's limit on bind parameters per statement.
pub const MAX_BIND_PARAMETERS: usize = 65_535;

/// Upper bound on rows per multi-row INSERT.
pub const MAX_ROWS_PER_INSERT: usize = 1_000;

/// Candidates sent per lookup statement.
pub const LOOKUP_CHUNK_SIZE: usize = 5_000;

/// Reads the columns of a fact table.
///
/// `$1` is the schema (NULL for `current_schema()`), `$2` the table name.
pub const FACT_COLUMNS_QUERY: &str = r#"
    SELECT column_name::text AS column_name
    FROM information_schema.columns
    WHERE table_schema = COALESCE($1, current_schema())
    AND table_name = $2
    ORDER BY ordinal_position
"#;

/// Checks whether a table exists.
///
/// `$1` is the schema (NULL for `current_schema()`), `$2` the table name.
pub const TABLE_EXISTS_QUERY: &str = r#"
    SELECT EXISTS (
        SELECT 1
        FROM information_schema.tables
        WHERE table_schema = COALESCE($1, current_schema())
        AND table_name = $2
    )
"#;

/// Builds the distinct fetch over column-mapped levels.
///
/// Each column is cast to text and aliased to its level's default name so
/// rows can be read back by level. NULLs in any mapped column are skipped.
///
/// ```rust
/// use georef_core::models::HierarchyLevel;
/// use georef_core::query::distinct_locations_sql;
/// use georef_core::validation::TableName;
///
/// let table = TableName::parse("fact table", "sales")?;
/// let sql = distinct_locations_sql(
///     &table,
///     &[(HierarchyLevel::Province, "state_name"), (HierarchyLevel::City, "city_name")],
/// );
/// assert_eq!(
///     sql,
///     "SELECT DISTINCT \"state_name\"::text AS province, \"city_name\"::text AS city \
///      FROM \"sales\" WHERE \"state_name\" IS NOT NULL AND \"city_name\" IS NOT NULL"
/// );
/// # Ok::<(), georef_core::GeoRefError>(())
/// ```
pub fn distinct_locations_sql(table: &TableName, columns: &[(HierarchyLevel, &str)]) -> String {
    let select: Vec<String> = columns
        .iter()
        .map(|(level, column)| {
            format!(
                "{}::text AS {}",
                quote_identifier(column),
                level.default_column()
            )
        })
        .collect();
    let filters: Vec<String> = columns
        .iter()
        .map(|(_, column)| format!("{} IS NOT NULL", quote_identifier(column)))
        .collect();

    format!(
        "SELECT DISTINCT {} FROM {} WHERE {}",
        select.join(", "),
        table.quoted(),
        filters.join(" AND ")
    )
}

/// Builds the case-insensitive lookup of candidates against the master table.
///
/// Binds one `text[]` per level in `levels` order (`$1`, `$2`, ...), all of
/// equal length. Returns `ord` (1-based candidate position, bigint) and
/// `location_id` (text, NULL when unmatched), one row per candidate.
pub fn lookup_sql(master: &TableName, levels: &[HierarchyLevel]) -> String {
    let arrays: Vec<String> = (1..=levels.len())
        .map(|n| format!("${}::text[]", n))
        .collect();
    let aliases: Vec<&str> = levels.iter().map(|level| level.default_column()).collect();
    let conditions: Vec<String> = levels
        .iter()
        .map(|level| {
            format!(
                "LOWER(m.{}) = LOWER(c.{})",
                quote_identifier(level.master_column()),
                level.default_column()
            )
        })
        .collect();
    let id = quote_identifier(MASTER_ID_COLUMN);

    format!(
        "SELECT DISTINCT ON (c.ord) c.ord AS ord, m.{id}::text AS {location_id} \
         FROM unnest({arrays}) WITH ORDINALITY AS c({aliases}, ord) \
         LEFT JOIN {master} m ON {conditions} \
         ORDER BY c.ord, m.{id}",
        id = id,
        location_id = LOCATION_ID_COLUMN,
        arrays = arrays.join(", "),
        aliases = aliases.join(", "),
        master = master.quoted(),
        conditions = conditions.join(" AND "),
    )
}

/// Builds `CREATE TABLE IF NOT EXISTS` for the destination table.
pub fn create_table_sql(target: &TableName, output_columns: &[&str]) -> String {
    let mut definitions = vec![format!("{} VARCHAR(255) NOT NULL", LOCATION_ID_COLUMN)];
    definitions.extend(
        output_columns
            .iter()
            .map(|column| format!("{} VARCHAR(255)", quote_identifier(column))),
    );
    definitions.push(format!(
        "{} TIMESTAMP DEFAULT CURRENT_TIMESTAMP",
        CREATED_AT_COLUMN
    ));

    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        target.quoted(),
        definitions.join(", ")
    )
}

/// Builds the `INSERT INTO ... (columns) ` prefix for a multi-row insert.
///
/// The `VALUES` list is appended by the caller.
pub fn insert_prefix(target: &TableName, output_columns: &[&str]) -> String {
    let mut columns = vec![LOCATION_ID_COLUMN.to_string()];
    columns.extend(output_columns.iter().map(|column| quote_identifier(column)));
    columns.push(CREATED_AT_COLUMN.to_string());

    format!("INSERT INTO {} ({}) ", target.quoted(), columns.join(", "))
}

/// Rows per INSERT statement so binds stay under [`MAX_BIND_PARAMETERS`].
pub fn rows_per_insert(binds_per_row: usize) -> usize {
    (MAX_BIND_PARAMETERS / binds_per_row.max(1)).clamp(1, MAX_ROWS_PER_INSERT)
}
