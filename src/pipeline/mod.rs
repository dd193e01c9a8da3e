//! End-to-end pipeline
//!
//! Loader → Merger → Preprocessor → Trainer, driven by one [`PipelineConfig`].

use crate::error::{OffenseError, Result};
use crate::preprocessing::{EncodedTable, PreprocessingConfig, Preprocessor};
use crate::sources::{CaseMerger, SchemaMode, SourceLoader, SourcePaths, SourceTables};
use crate::training::{EpochMetrics, FitHistory, Trainer, TrainingConfig, TrainingOutcome};
use crate::utils::DataLoader;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Everything needed to go from six CSV files to a trained classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Locations of the six source files
    pub sources: SourcePaths,

    /// Column shared by every source
    pub key_column: String,

    /// Treatment of a source without the key column
    pub schema_mode: SchemaMode,

    /// Field delimiter of the source files (`.tsv` files always use tabs)
    pub delimiter: char,

    pub preprocessing: PreprocessingConfig,

    pub training: TrainingConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: SourcePaths::default(),
            key_column: "key".to_string(),
            schema_mode: SchemaMode::Strict,
            delimiter: ',',
            preprocessing: PreprocessingConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON config; absent fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn with_sources(mut self, sources: SourcePaths) -> Self {
        self.sources = sources;
        self
    }

    /// Use `<dir>/Offender.csv`, `<dir>/Victim.csv`, ...
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.sources = SourcePaths::in_dir(dir);
        self
    }

    pub fn with_key_column(mut self, key: impl Into<String>) -> Self {
        self.key_column = key.into();
        self
    }

    pub fn with_schema_mode(mut self, mode: SchemaMode) -> Self {
        self.schema_mode = mode;
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_preprocessing(mut self, config: PreprocessingConfig) -> Self {
        self.preprocessing = config;
        self
    }

    pub fn with_training(mut self, config: TrainingConfig) -> Self {
        self.training = config;
        self
    }

    pub(crate) fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(OffenseError::invalid_parameter(
                "delimiter",
                self.delimiter,
                "must be a single ASCII character",
            ))
        }
    }
}

/// Result of a full pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Rows left after the inner join
    pub merged_rows: usize,
    /// Encoded table and its encoders
    pub encoded: EncodedTable,
    pub outcome: TrainingOutcome,
}

impl PipelineReport {
    pub fn accuracy(&self) -> f64 {
        self.outcome.accuracy
    }

    pub fn history(&self) -> &FitHistory {
        &self.outcome.history
    }
}

/// Runs the stages in order, each consuming the previous stage's output
#[derive(Debug, Clone, Default)]
pub struct OffensePipeline {
    config: PipelineConfig,
}

impl OffensePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read the six sources and check the key column
    pub fn load(&self) -> Result<SourceTables> {
        let loader = DataLoader::new().with_delimiter(self.config.delimiter_byte()?);
        let (tables, _diagnostics) = SourceLoader::new(self.config.key_column.as_str())
            .with_mode(self.config.schema_mode)
            .with_loader(loader)
            .load(&self.config.sources)?;
        Ok(tables)
    }

    /// Inner-join the sources on the key column
    pub fn merge(&self, tables: SourceTables) -> Result<DataFrame> {
        CaseMerger::new(self.config.key_column.as_str()).merge(tables)
    }

    fn preprocessor(&self) -> Preprocessor {
        Preprocessor::with_config(self.config.preprocessing.clone())
    }

    /// Load, merge, fill and encode without training
    pub fn encode(&self) -> Result<EncodedTable> {
        self.encode_tables(self.load()?)
    }

    pub fn encode_tables(&self, tables: SourceTables) -> Result<EncodedTable> {
        let merged = self.merge(tables)?;
        self.preprocessor().fit_transform(merged)
    }

    /// Load the configured files and run every stage
    pub fn run(&self) -> Result<PipelineReport> {
        self.run_on(self.load()?)
    }

    /// Run every stage on already loaded sources
    pub fn run_on(&self, tables: SourceTables) -> Result<PipelineReport> {
        self.run_with_callback(tables, |_| {})
    }

    pub fn run_with_callback<F>(&self, tables: SourceTables, on_epoch: F) -> Result<PipelineReport>
    where
        F: FnMut(&EpochMetrics),
    {
        let merged = self.merge(tables)?;
        let merged_rows = merged.height();

        let preprocessor = self.preprocessor();
        let encoded = preprocessor.fit_transform(merged)?;
        let dataset = preprocessor.dataset(&encoded)?;

        let outcome =
            Trainer::new(self.config.training.clone()).train_with_callback(&dataset, on_epoch)?;
        info!(merged_rows, accuracy = outcome.accuracy, "pipeline finished");

        Ok(PipelineReport {
            merged_rows,
            encoded,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.key_column, "key");
        assert_eq!(config.schema_mode, SchemaMode::Strict);
        assert_eq!(config.training.epochs, 50);
        assert_eq!(config.preprocessing.target_column, "Offense");
    }

    #[test]
    fn test_partial_json_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"key_column": "case_id", "training": {"epochs": 5}}"#).unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.key_column, "case_id");
        assert_eq!(config.training.epochs, 5);
        assert_eq!(config.training.batch_size, 32);
        assert_eq!(config.delimiter, ',');
    }

    #[test]
    fn test_config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = PipelineConfig::new()
            .with_data_dir("/data")
            .with_schema_mode(SchemaMode::Lenient)
            .with_delimiter(';');
        config.to_json_file(&path).unwrap();
        assert_eq!(PipelineConfig::from_json_file(&path).unwrap(), config);
    }

    #[test]
    fn test_non_ascii_delimiter() {
        let pipeline = OffensePipeline::new(PipelineConfig::new().with_delimiter('§'));
        assert!(matches!(
            pipeline.load(),
            Err(OffenseError::InvalidParameter { .. })
        ));
    }
}
