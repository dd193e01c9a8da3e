//! Inner join of the six source tables on the shared key

use super::{SourceKind, SourceTable, SourceTables};
use crate::error::{OffenseError, Result};
use crate::utils::column_names;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Joins the source tables into one row per case.
///
/// Only keys present in every source survive. Non-key column names that
/// occur in more than one source get the source suffix (`value_offender`,
/// `value_victim`), so every source column is still present afterwards.
#[derive(Debug, Clone)]
pub struct CaseMerger {
    key_column: String,
}

impl CaseMerger {
    pub fn new(key_column: impl Into<String>) -> Self {
        Self {
            key_column: key_column.into(),
        }
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    /// Merge the sources, consuming them
    pub fn merge(&self, tables: SourceTables) -> Result<DataFrame> {
        let key = self.key_column.as_str();

        if let Some(diag) = tables.missing_key(key).into_iter().next() {
            return Err(diag.into_error());
        }

        let collisions = self.colliding_columns(&tables);
        let row_counts: Vec<(SourceKind, usize)> =
            tables.iter().map(|t| (t.kind, t.frame.height())).collect();

        let mut frames = tables
            .into_tables()
            .into_iter()
            .map(|table| self.prepare(table, &collisions))
            .collect::<Result<Vec<_>>>()?
            .into_iter();

        let first = frames
            .next()
            .ok_or_else(|| OffenseError::DataError("no source tables to merge".to_string()))?;

        let joined = frames.fold(first.lazy(), |acc, next| {
            acc.join(
                next.lazy(),
                [col(key)],
                [col(key)],
                JoinArgs::new(JoinType::Inner),
            )
        });

        let merged = joined.collect()?.sort([key], SortMultipleOptions::default())?;

        let smallest = row_counts.iter().map(|(_, n)| *n).min().unwrap_or(0);
        info!(
            rows = merged.height(),
            cols = merged.width(),
            smallest_source = smallest,
            "merged sources on '{}'",
            key
        );

        Ok(merged)
    }

    /// Non-key column names present in more than one source
    fn colliding_columns(&self, tables: &SourceTables) -> HashSet<String> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        for table in tables.iter() {
            for name in column_names(&table.frame) {
                if name != self.key_column {
                    *counts.entry(name).or_insert(0) += 1;
                }
            }
        }

        counts
            .into_iter()
            .filter(|(_, n)| *n > 1)
            .map(|(name, _)| name)
            .collect()
    }

    /// Cast the key to string and suffix colliding columns
    fn prepare(&self, table: SourceTable, collisions: &HashSet<String>) -> Result<DataFrame> {
        let SourceTable { kind, mut frame } = table;

        let key_series = frame
            .column(&self.key_column)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        frame.with_column(key_series)?;

        for name in column_names(&frame) {
            if collisions.contains(&name) {
                let renamed = format!("{}{}", name, kind.suffix());
                debug!(source = %kind, "renaming '{}' to '{}'", name, renamed);
                frame.rename(&name, renamed.as_str().into())?;
            }
        }

        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(kind: SourceKind, keys: &[i64]) -> (SourceKind, DataFrame) {
        let values: Vec<String> = keys.iter().map(|k| format!("{}-{}", kind.name(), k)).collect();
        let frame = df!(
            "key" => keys,
            kind.name() => values
        )
        .unwrap();
        (kind, frame)
    }

    #[test]
    fn test_inner_join_keeps_intersection() {
        let tables = SourceTables::from_frames(vec![
            source(SourceKind::Offender, &[1, 2, 3, 4, 5]),
            source(SourceKind::Victim, &[1, 2, 3, 4]),
            source(SourceKind::Location, &[2, 3, 4, 5]),
            source(SourceKind::Relationship, &[1, 2, 3, 4, 5]),
            source(SourceKind::Weapon, &[3, 4, 5, 6]),
            source(SourceKind::Offense, &[1, 2, 3, 4, 5]),
        ])
        .unwrap();

        let merged = CaseMerger::new("key").merge(tables).unwrap();
        assert_eq!(merged.height(), 2);

        let keys: Vec<String> = merged
            .column("key")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["3", "4"]);
    }

    #[test]
    fn test_all_source_columns_survive() {
        let tables = SourceTables::from_frames(
            SourceKind::ALL.iter().map(|&k| source(k, &[1, 2])),
        )
        .unwrap();

        let merged = CaseMerger::new("key").merge(tables).unwrap();
        let names = column_names(&merged);
        assert_eq!(names.len(), 7);
        for kind in SourceKind::ALL {
            assert!(names.contains(&kind.name().to_string()), "missing {}", kind);
        }
    }

    #[test]
    fn test_colliding_columns_are_suffixed() {
        let shared = |kind: SourceKind| {
            (
                kind,
                df!("key" => &[1i64, 2], "value" => &[10i64, 20]).unwrap(),
            )
        };
        let tables = SourceTables::from_frames(vec![
            shared(SourceKind::Offender),
            shared(SourceKind::Victim),
            source(SourceKind::Location, &[1, 2]),
            source(SourceKind::Relationship, &[1, 2]),
            source(SourceKind::Weapon, &[1, 2]),
            source(SourceKind::Offense, &[1, 2]),
        ])
        .unwrap();

        let merged = CaseMerger::new("key").merge(tables).unwrap();
        let names = column_names(&merged);
        assert!(names.contains(&"value_offender".to_string()));
        assert!(names.contains(&"value_victim".to_string()));
        assert!(!names.contains(&"value".to_string()));
    }

    #[test]
    fn test_missing_key_is_schema_error() {
        let mut frames: Vec<_> = SourceKind::ALL.iter().map(|&k| source(k, &[1])).collect();
        frames[4] = (
            SourceKind::Weapon,
            df!("id" => &[1i64], "Weapon" => &["Knife"]).unwrap(),
        );
        let tables = SourceTables::from_frames(frames).unwrap();

        let err = CaseMerger::new("key").merge(tables).unwrap_err();
        assert!(matches!(err, OffenseError::Schema { ref source_name, .. } if source_name == "Weapon"));
    }

    #[test]
    fn test_mixed_key_dtypes_join() {
        let mut frames: Vec<_> = SourceKind::ALL.iter().map(|&k| source(k, &[1, 2])).collect();
        frames[2] = (
            SourceKind::Location,
            df!("key" => &["1", "2"], "Location" => &["Home", "Street"]).unwrap(),
        );
        let tables = SourceTables::from_frames(frames).unwrap();

        let merged = CaseMerger::new("key").merge(tables).unwrap();
        assert_eq!(merged.height(), 2);
    }
}
