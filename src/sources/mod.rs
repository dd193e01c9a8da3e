//! Source tables and the loader
//!
//! The six crime-record tables (offender, victim, location, relationship,
//! weapon, offense) share one join-key column. This module loads them,
//! checks that every table carries the key and hands them to the merger
//! as one owned [`SourceTables`] value.

pub mod merge;
pub mod summary;

pub use merge::CaseMerger;
pub use summary::{CategoryTotal, ColumnSummary};

use crate::error::{OffenseError, Result};
use crate::utils::{column_names, DataLoader};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One of the six crime-record sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceKind {
    Offender,
    Victim,
    Location,
    Relationship,
    Weapon,
    Offense,
}

impl SourceKind {
    /// All sources in join order
    pub const ALL: [SourceKind; 6] = [
        SourceKind::Offender,
        SourceKind::Victim,
        SourceKind::Location,
        SourceKind::Relationship,
        SourceKind::Weapon,
        SourceKind::Offense,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Offender => "Offender",
            SourceKind::Victim => "Victim",
            SourceKind::Location => "Location",
            SourceKind::Relationship => "Relationship",
            SourceKind::Weapon => "Weapon",
            SourceKind::Offense => "Offense",
        }
    }

    /// Default file name inside a data directory
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name())
    }

    /// Suffix appended to colliding column names
    pub fn suffix(&self) -> String {
        format!("_{}", self.name().to_lowercase())
    }

    fn position(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// File locations of the six sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePaths {
    pub offender: PathBuf,
    pub victim: PathBuf,
    pub location: PathBuf,
    pub relationship: PathBuf,
    pub weapon: PathBuf,
    pub offense: PathBuf,
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self::in_dir(".")
    }
}

impl SourcePaths {
    /// `<dir>/Offender.csv`, `<dir>/Victim.csv`, ...
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            offender: dir.join(SourceKind::Offender.file_name()),
            victim: dir.join(SourceKind::Victim.file_name()),
            location: dir.join(SourceKind::Location.file_name()),
            relationship: dir.join(SourceKind::Relationship.file_name()),
            weapon: dir.join(SourceKind::Weapon.file_name()),
            offense: dir.join(SourceKind::Offense.file_name()),
        }
    }

    pub fn get(&self, kind: SourceKind) -> &Path {
        match kind {
            SourceKind::Offender => &self.offender,
            SourceKind::Victim => &self.victim,
            SourceKind::Location => &self.location,
            SourceKind::Relationship => &self.relationship,
            SourceKind::Weapon => &self.weapon,
            SourceKind::Offense => &self.offense,
        }
    }
}

/// How a missing join key is treated by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaMode {
    /// Fail before merging
    Strict,
    /// Log a warning and let the merger reject the table
    Lenient,
}

impl Default for SchemaMode {
    fn default() -> Self {
        SchemaMode::Strict
    }
}

/// A source that lacks the join key, with the columns it does have
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDiagnostic {
    pub source: SourceKind,
    pub key: String,
    pub columns: Vec<String>,
}

impl SchemaDiagnostic {
    pub fn into_error(self) -> OffenseError {
        OffenseError::Schema {
            source_name: self.source.name().to_string(),
            key: self.key,
            columns: self.columns,
        }
    }
}

impl fmt::Display for SchemaDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' table is missing '{}' column. Columns are: {:?}",
            self.source, self.key, self.columns
        )
    }
}

/// A loaded source table
#[derive(Debug, Clone)]
pub struct SourceTable {
    pub kind: SourceKind,
    pub frame: DataFrame,
}

/// The six loaded source tables, always held in join order
#[derive(Debug, Clone)]
pub struct SourceTables {
    tables: Vec<SourceTable>,
}

impl SourceTables {
    /// Collect exactly one frame per source kind
    pub fn from_frames(frames: impl IntoIterator<Item = (SourceKind, DataFrame)>) -> Result<Self> {
        let mut slots: Vec<Option<DataFrame>> = vec![None; SourceKind::ALL.len()];

        for (kind, frame) in frames {
            let slot = &mut slots[kind.position()];
            if slot.is_some() {
                return Err(OffenseError::DataError(format!(
                    "source '{}' supplied more than once",
                    kind
                )));
            }
            *slot = Some(frame);
        }

        let tables = SourceKind::ALL
            .iter()
            .zip(slots)
            .map(|(&kind, frame)| {
                frame
                    .map(|frame| SourceTable { kind, frame })
                    .ok_or_else(|| OffenseError::DataError(format!("source '{}' was not supplied", kind)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { tables })
    }

    pub fn get(&self, kind: SourceKind) -> &DataFrame {
        &self.tables[kind.position()].frame
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceTable> {
        self.tables.iter()
    }

    pub fn into_tables(self) -> Vec<SourceTable> {
        self.tables
    }

    /// Sources lacking the key column
    pub fn missing_key(&self, key: &str) -> Vec<SchemaDiagnostic> {
        self.tables
            .iter()
            .filter(|t| t.frame.column(key).is_err())
            .map(|t| SchemaDiagnostic {
                source: t.kind,
                key: key.to_string(),
                columns: column_names(&t.frame),
            })
            .collect()
    }

    /// Check every source for the key column.
    ///
    /// Strict mode fails on the first missing key. Lenient mode logs each
    /// diagnostic and returns them to the caller.
    pub fn validate_key(&self, key: &str, mode: SchemaMode) -> Result<Vec<SchemaDiagnostic>> {
        let diagnostics = self.missing_key(key);

        match mode {
            SchemaMode::Strict => match diagnostics.into_iter().next() {
                Some(diag) => Err(diag.into_error()),
                None => Ok(Vec::new()),
            },
            SchemaMode::Lenient => {
                for diag in &diagnostics {
                    warn!(source = %diag.source, "{}", diag);
                }
                Ok(diagnostics)
            }
        }
    }
}

/// Loads the six sources and checks the join key
#[derive(Debug, Clone)]
pub struct SourceLoader {
    loader: DataLoader,
    key_column: String,
    mode: SchemaMode,
}

impl SourceLoader {
    pub fn new(key_column: impl Into<String>) -> Self {
        Self {
            loader: DataLoader::new(),
            key_column: key_column.into(),
            mode: SchemaMode::Strict,
        }
    }

    pub fn with_mode(mut self, mode: SchemaMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_loader(mut self, loader: DataLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Read all six files, then validate the key
    pub fn load(&self, paths: &SourcePaths) -> Result<(SourceTables, Vec<SchemaDiagnostic>)> {
        let frames = SourceKind::ALL
            .iter()
            .map(|&kind| {
                let path = paths.get(kind);
                let frame = self.loader.load_auto(path)?;
                info!(source = %kind, rows = frame.height(), cols = frame.width(), "loaded {}", path.display());
                Ok((kind, frame))
            })
            .collect::<Result<Vec<_>>>()?;

        let tables = SourceTables::from_frames(frames)?;
        let diagnostics = tables.validate_key(&self.key_column, self.mode)?;
        Ok((tables, diagnostics))
    }
}
