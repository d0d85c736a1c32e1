//! Resolution of location candidates against the master geolocation table.

use super::PostgresAdapter;
use crate::Result;
use crate::adapters::helpers::{RowExt, UNDEFINED_COLUMN, UNDEFINED_TABLE, sqlstate};
use crate::error::GeoRefError;
use crate::models::{HierarchyLevel, LocationCandidate, ResolvedLocation};
use crate::query::{LOCATION_ID_COLUMN, LOOKUP_CHUNK_SIZE, lookup_sql};
use crate::validation::TableName;

/// Candidates split by whether a master row matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupOutcome {
    /// Candidates with a resolved identifier, in input order
    pub resolved: Vec<ResolvedLocation>,
    /// Candidates without any master row, in input order
    pub unmatched: Vec<LocationCandidate>,
}

/// One array of values per level, aligned by candidate position.
pub(super) fn level_arrays(
    candidates: &[LocationCandidate],
    levels: &[HierarchyLevel],
) -> Vec<Vec<String>> {
    levels
        .iter()
        .map(|level| {
            candidates
                .iter()
                .map(|candidate| candidate.value(*level).unwrap_or_default().to_string())
                .collect()
        })
        .collect()
}

/// Pairs lookup rows (`ord`, identifier) back with their candidates.
///
/// `ord` is the 1-based position produced by `WITH ORDINALITY`. Positions
/// that came back without a row are treated as unmatched.
pub(super) fn assign_identifiers(
    chunk: &[LocationCandidate],
    rows: Vec<(i64, Option<String>)>,
    outcome: &mut LookupOutcome,
) {
    let mut ids: Vec<Option<String>> = vec![None; chunk.len()];
    for (ord, location_id) in rows {
        let index = ord
            .checked_sub(1)
            .and_then(|i| usize::try_from(i).ok())
            .filter(|i| *i < chunk.len());
        match index {
            Some(index) => ids[index] = location_id,
            None => tracing::warn!("Lookup returned out-of-range ordinal {}", ord),
        }
    }

    for (candidate, location_id) in chunk.iter().zip(ids) {
        match location_id {
            Some(location_id) => outcome.resolved.push(ResolvedLocation {
                location_id,
                candidate: candidate.clone(),
            }),
            None => outcome.unmatched.push(candidate.clone()),
        }
    }
}

impl PostgresAdapter {
    /// Resolves candidates against `master`, matching names case-insensitively.
    ///
    /// `levels` are the mapped hierarchy levels; each candidate must carry a
    /// value for each of them. Unmatched candidates are returned rather than
    /// treated as errors. When several master rows match, the one with the
    /// lowest identifier wins.
    ///
    /// # Errors
    /// Returns [`GeoRefError::Schema`] when the master table or one of its
    /// level columns is missing and [`GeoRefError::Query`] on other SQL
    /// failures.
    pub async fn resolve_locations(
        &self,
        master: &TableName,
        levels: &[HierarchyLevel],
        candidates: &[LocationCandidate],
    ) -> Result<LookupOutcome> {
        let mut outcome = LookupOutcome::default();
        if candidates.is_empty() || levels.is_empty() {
            outcome.unmatched.extend_from_slice(candidates);
            return Ok(outcome);
        }

        let sql = lookup_sql(master, levels);
        tracing::debug!("Resolving locations with: {}", sql);
        let context = format!("lookup against '{}'", master);

        for chunk in candidates.chunks(LOOKUP_CHUNK_SIZE) {
            let mut query = sqlx::query(&sql);
            for values in level_arrays(chunk, levels) {
                query = query.bind(values);
            }

            let rows = query.fetch_all(self.pool()).await.map_err(|e| {
                match sqlstate(&e).as_deref() {
                    Some(UNDEFINED_TABLE | UNDEFINED_COLUMN) => GeoRefError::schema(format!(
                        "master table '{}' is missing or lacks the expected columns: {}",
                        master, e
                    )),
                    _ => GeoRefError::query_failed(
                        format!("Failed to look up locations in '{}'", master),
                        e,
                    ),
                }
            })?;

            let mut pairs = Vec::with_capacity(rows.len());
            for row in &rows {
                let ord: i64 = row.get_field("ord", &context)?;
                let location_id: Option<String> = row.get_field(LOCATION_ID_COLUMN, &context)?;
                pairs.push((ord, location_id));
            }
            assign_identifiers(chunk, pairs, &mut outcome);
        }

        Ok(outcome)
    }
}
