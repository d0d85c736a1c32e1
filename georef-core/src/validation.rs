//! Input validation that runs before any database connection is opened.
//!
//! Two families of checks live here:
//! - hierarchy completeness: which levels were given and whether each one
//!   has all of its ancestors
//! - identifier safety: table and column names are interpolated into SQL,
//!   so they must follow PostgreSQL identifier rules first
//!
//! # Example
//! ```rust
//! use georef_core::models::{HierarchyLevel, LevelSource};
//! use georef_core::validation::{HierarchyInput, validate_hierarchy};
//!
//! let input = HierarchyInput::default()
//!     .with_column(HierarchyLevel::Province, "state_name")
//!     .with_column(HierarchyLevel::City, "city_name");
//!
//! let mapping = validate_hierarchy(&input)?;
//! assert_eq!(
//!     mapping.source(HierarchyLevel::City),
//!     Some(&LevelSource::Column("city_name".to_string()))
//! );
//! # Ok::<(), georef_core::GeoRefError>(())
//! ```

use crate::error::GeoRefError;
use crate::Result;
use crate::models::{HierarchyLevel, LevelSource, LocationMapping};
use crate::query::{CREATED_AT_COLUMN, LOCATION_ID_COLUMN};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;


/// Maximum identifier length accepted by PostgreSQL (NAMEDATALEN - 1).
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Raw per-level CLI input: an optional column and an optional static value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyInput {
    columns: [Option<String>; 4],
    statics: [Option<String>; 4],
}

impl HierarchyInput {
    /// Builder method to set the fact column for a level.
    pub fn with_column(mut self, level: HierarchyLevel, column: impl Into<String>) -> Self {
        self.columns[level.depth()] = Some(column.into());
        self
    }

    /// Builder method to set the static value for a level.
    pub fn with_static(mut self, level: HierarchyLevel, value: impl Into<String>) -> Self {
        self.statics[level.depth()] = Some(value.into());
        self
    }

    /// Sets both sources of a level from optional CLI values.
    pub fn set(&mut self, level: HierarchyLevel, column: Option<String>, value: Option<String>) {
        self.columns[level.depth()] = column;
        self.statics[level.depth()] = value;
    }

    /// Non-empty fact column for `level`.
    pub fn column(&self, level: HierarchyLevel) -> Option<&str> {
        non_empty(self.columns[level.depth()].as_deref())
    }

    /// Non-empty static value for `level`.
    pub fn static_value(&self, level: HierarchyLevel) -> Option<&str> {
        non_empty(self.statics[level.depth()].as_deref())
    }

    /// Whether `level` has a column or a static value.
    pub fn is_specified(&self, level: HierarchyLevel) -> bool {
        self.column(level).is_some() || self.static_value(level).is_some()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Validates hierarchy completeness and returns the resolved mapping.
///
/// Accepts iff at least one level is specified and every specified level
/// has all higher levels specified, by column or by static value. When a
/// level has both a column and a static value, the column is used.
///
/// # Errors
/// Returns [`GeoRefError::Validation`] naming the offending level, an
/// invalid column identifier, or a destination column clash.
pub fn validate_hierarchy(input: &HierarchyInput) -> Result<LocationMapping> {
    if !HierarchyLevel::ALL
        .iter()
        .any(|level| input.is_specified(*level))
    {
        return Err(GeoRefError::validation(
            "at least one location column or static value is required \
             (--province-col/--province, --city-col/--city, ...)",
        ));
    }

    for level in HierarchyLevel::ALL {
        if !input.is_specified(level) {
            continue;
        }
        if let Some(missing) = level
            .ancestors()
            .iter()
            .find(|ancestor| !input.is_specified(**ancestor))
        {
            return Err(GeoRefError::validation(format!(
                "{level} is mapped but {missing} has no column or static value \
                 (use --{missing}-col or --{missing})"
            )));
        }
    }

    let mut levels: [Option<LevelSource>; 4] = Default::default();
    for level in HierarchyLevel::ALL {
        let source = match (input.column(level), input.static_value(level)) {
            (Some(column), value) => {
                if value.is_some() {
                    tracing::warn!(
                        "Both --{level}-col and --{level} were given, using column '{column}'"
                    );
                }
                validate_identifier(&format!("{level} column"), column)?;
                Some(LevelSource::Column(column.to_string()))
            }
            (None, Some(value)) => Some(LevelSource::Static(value.to_string())),
            (None, None) => None,
        };
        levels[level.depth()] = source;
    }

    let mapping = LocationMapping::from_levels(levels);
    check_output_columns(&mapping)?;
    Ok(mapping)
}

/// Rejects destination column sets that `CREATE TABLE` would refuse.
///
/// PostgreSQL folds unquoted names, so two names differing only in case are
/// treated as a clash too.
fn check_output_columns(mapping: &LocationMapping) -> Result<()> {
    let mut seen: Vec<(String, HierarchyLevel)> = Vec::new();
    for (level, source) in mapping.mapped() {
        let column = source.output_column(level);
        let folded = column.to_ascii_lowercase();

        if folded == LOCATION_ID_COLUMN || folded == CREATED_AT_COLUMN {
            return Err(GeoRefError::validation(format!(
                "{level} would be written to '{column}', which is reserved in the destination table"
            )));
        }
        if let Some((_, other)) = seen.iter().find(|(name, _)| *name == folded) {
            return Err(GeoRefError::validation(format!(
                "{other} and {level} would both be written to destination column '{column}'"
            )));
        }
        seen.push((folded, level));
    }
    Ok(())
}

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*$").expect("Invalid identifier pattern")
    })
}

/// Checks that `name` is a plain PostgreSQL identifier.
///
/// Letters, digits, underscores and dollar signs, starting with a letter or
/// underscore, at most [`MAX_IDENTIFIER_LENGTH`] bytes.
///
/// # Errors
/// Returns [`GeoRefError::Validation`] mentioning `kind`.
pub fn validate_identifier(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(GeoRefError::validation(format!("{kind} cannot be empty")));
    }
    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(GeoRefError::validation(format!(
            "{kind} '{name}' is too long: maximum {MAX_IDENTIFIER_LENGTH} characters"
        )));
    }
    if !identifier_pattern().is_match(name) {
        return Err(GeoRefError::validation(format!(
            "{kind} '{name}' must start with a letter or underscore and contain only \
             letters, digits, underscores, and dollar signs"
        )));
    }
    Ok(())
}

/// Double-quotes an identifier for interpolation into SQL.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A table name with an optional schema, validated for interpolation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: Option<String>,
    name: String,
}

impl TableName {
    /// Parses `table` or `schema.table`.
    ///
    /// # Errors
    /// Returns [`GeoRefError::Validation`] when either part is not a valid
    /// identifier or there are more than two parts.
    pub fn parse(kind: &str, raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.trim().split('.').collect();
        match parts.as_slice() {
            [name] => {
                validate_identifier(kind, name)?;
                Ok(Self {
                    schema: None,
                    name: (*name).to_string(),
                })
            }
            [schema, name] => {
                validate_identifier(&format!("{kind} schema"), schema)?;
                validate_identifier(kind, name)?;
                Ok(Self {
                    schema: Some((*schema).to_string()),
                    name: (*name).to_string(),
                })
            }
            _ => Err(GeoRefError::validation(format!(
                "{kind} '{raw}' must be 'table' or 'schema.table'"
            ))),
        }
    }

    /// Schema part, if one was given.
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Table part.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Quoted form ready for SQL interpolation.
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_identifier(schema), quote_identifier(&self.name)),
            None => quote_identifier(&self.name),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}
