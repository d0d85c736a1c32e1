//! Data structures for location mappings and migration results.
//!
//! A migration maps up to four administrative [`HierarchyLevel`]s of a fact
//! table onto identifiers of the master geolocation table. Each level is fed
//! either by a fact column or by a fixed value ([`LevelSource`]).

use std::fmt;

/// Administrative hierarchy level, ordered coarse to fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HierarchyLevel {
    Province,
    City,
    District,
    SubDistrict,
}

impl HierarchyLevel {
    /// All levels from coarsest to finest.
    pub const ALL: [Self; 4] = [Self::Province, Self::City, Self::District, Self::SubDistrict];

    /// Name used on the command line (`--<name>` / `--<name>-col`).
    pub const fn cli_name(self) -> &'static str {
        match self {
            Self::Province => "province",
            Self::City => "city",
            Self::District => "district",
            Self::SubDistrict => "subdistrict",
        }
    }

    /// Output column name used when the level is fed by a static value.
    ///
    /// Also used as the alias of the level in generated SQL.
    pub const fn default_column(self) -> &'static str {
        match self {
            Self::Province => "province",
            Self::City => "city",
            Self::District => "district",
            Self::SubDistrict => "sub_district",
        }
    }

    /// Column holding this level's name in the master geolocation table.
    pub const fn master_column(self) -> &'static str {
        match self {
            Self::Province => "provinsi",
            Self::City => "kota_kabupaten",
            Self::District => "kecamatan",
            Self::SubDistrict => "kelurahan_desa",
        }
    }

    /// Position in the hierarchy, 0 for province.
    pub const fn depth(self) -> usize {
        match self {
            Self::Province => 0,
            Self::City => 1,
            Self::District => 2,
            Self::SubDistrict => 3,
        }
    }

    /// Levels strictly above this one, coarsest first.
    pub fn ancestors(self) -> &'static [Self] {
        &Self::ALL[..self.depth()]
    }
}

impl fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

/// Where the value of one hierarchy level comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelSource {
    /// Column of the fact table
    Column(String),
    /// Fixed value applied to every row
    Static(String),
}

impl LevelSource {
    /// Column name this level is written to in the destination table.
    pub fn output_column(&self, level: HierarchyLevel) -> &str {
        match self {
            Self::Column(column) => column,
            Self::Static(_) => level.default_column(),
        }
    }
}

/// Validated mapping of hierarchy levels to their sources.
///
/// Built through [`crate::validation::validate_hierarchy`], which guarantees
/// that at least one level is mapped and that no level is mapped without all
/// of its ancestors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocationMapping {
    levels: [Option<LevelSource>; 4],
}

impl LocationMapping {
    pub(crate) const fn from_levels(levels: [Option<LevelSource>; 4]) -> Self {
        Self { levels }
    }

    /// Source of `level`, if mapped.
    pub fn source(&self, level: HierarchyLevel) -> Option<&LevelSource> {
        self.levels[level.depth()].as_ref()
    }

    /// Mapped levels with their sources, coarsest first.
    pub fn mapped(&self) -> impl Iterator<Item = (HierarchyLevel, &LevelSource)> {
        HierarchyLevel::ALL
            .into_iter()
            .filter_map(|level| self.source(level).map(|source| (level, source)))
    }

    /// Levels read from fact-table columns, with the column names.
    pub fn column_levels(&self) -> impl Iterator<Item = (HierarchyLevel, &str)> {
        self.mapped().filter_map(|(level, source)| match source {
            LevelSource::Column(column) => Some((level, column.as_str())),
            LevelSource::Static(_) => None,
        })
    }

    /// Levels fed by static values, with the values.
    pub fn static_levels(&self) -> impl Iterator<Item = (HierarchyLevel, &str)> {
        self.mapped().filter_map(|(level, source)| match source {
            LevelSource::Static(value) => Some((level, value.as_str())),
            LevelSource::Column(_) => None,
        })
    }

    /// Destination column names in hierarchy order.
    pub fn output_columns(&self) -> Vec<&str> {
        self.mapped()
            .map(|(level, source)| source.output_column(level))
            .collect()
    }

    /// Number of mapped levels.
    pub fn depth(&self) -> usize {
        self.levels.iter().filter(|source| source.is_some()).count()
    }
}

/// One distinct combination of raw level values awaiting resolution.
///
/// Values are stored for mapped levels only, coarsest first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationCandidate {
    values: Vec<(HierarchyLevel, String)>,
}

impl LocationCandidate {
    /// Creates a candidate from `(level, value)` pairs, sorted by level.
    pub fn new(mut values: Vec<(HierarchyLevel, String)>) -> Self {
        values.sort_by_key(|(level, _)| *level);
        Self { values }
    }

    /// Raw value for `level`.
    pub fn value(&self, level: HierarchyLevel) -> Option<&str> {
        self.values
            .iter()
            .find(|(candidate_level, _)| *candidate_level == level)
            .map(|(_, value)| value.as_str())
    }

    /// All `(level, value)` pairs, coarsest first.
    pub fn values(&self) -> &[(HierarchyLevel, String)] {
        &self.values
    }
}

impl fmt::Display for LocationCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|(level, value)| format!("{}={:?}", level, value))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// A candidate that matched a master geolocation row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    /// Identifier of the matched master row
    pub location_id: String,
    /// Original values the identifier was resolved from
    pub candidate: LocationCandidate,
}

/// Outcome of a migration run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MigrationSummary {
    /// Destination table the rows went to
    pub target_table: String,
    /// Distinct candidates read from the fact table
    pub candidates: usize,
    /// Candidates that resolved to an identifier
    pub matched: usize,
    /// Candidates with no master row
    pub unmatched: usize,
    /// Rows inserted into the destination table
    pub inserted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_order_and_ancestors() {
        assert!(HierarchyLevel::Province < HierarchyLevel::City);
        assert!(HierarchyLevel::District < HierarchyLevel::SubDistrict);
        assert!(HierarchyLevel::Province.ancestors().is_empty());
        assert_eq!(
            HierarchyLevel::District.ancestors(),
            &[HierarchyLevel::Province, HierarchyLevel::City]
        );
    }

    #[test]
    fn test_level_names() {
        assert_eq!(HierarchyLevel::SubDistrict.cli_name(), "subdistrict");
        assert_eq!(HierarchyLevel::SubDistrict.default_column(), "sub_district");
        assert_eq!(HierarchyLevel::SubDistrict.master_column(), "kelurahan_desa");
        assert_eq!(HierarchyLevel::City.master_column(), "kota_kabupaten");
    }

    #[test]
    fn test_output_columns_mix_fact_and_default_names() {
        let mapping = LocationMapping::from_levels([
            Some(LevelSource::Static("Jawa Barat".to_string())),
            Some(LevelSource::Column("city_name".to_string())),
            None,
            None,
        ]);

        assert_eq!(mapping.output_columns(), vec!["province", "city_name"]);
        assert_eq!(mapping.depth(), 2);
        assert_eq!(
            mapping.column_levels().collect::<Vec<_>>(),
            vec![(HierarchyLevel::City, "city_name")]
        );
        assert_eq!(
            mapping.static_levels().collect::<Vec<_>>(),
            vec![(HierarchyLevel::Province, "Jawa Barat")]
        );
    }

    #[test]
    fn test_candidate_sorted_by_level() {
        let candidate = LocationCandidate::new(vec![
            (HierarchyLevel::City, "Bandung".to_string()),
            (HierarchyLevel::Province, "JAWA BARAT".to_string()),
        ]);

        assert_eq!(candidate.values()[0].0, HierarchyLevel::Province);
        assert_eq!(candidate.value(HierarchyLevel::City), Some("Bandung"));
        assert_eq!(candidate.value(HierarchyLevel::District), None);
        assert_eq!(
            candidate.to_string(),
            r#"{province="JAWA BARAT", city="Bandung"}"#
        );
    }
}
