//! Offense predictor - crime-record merging and offense-type classification
//!
//! This crate merges six categorical crime-record tables into one
//! record-per-case table and trains a classifier that predicts the offense
//! type from the other case attributes:
//! - Loading the sources and checking the join key
//! - Inner join on the key with deterministic suffixing of shared columns
//! - Missing-value filling, label encoding and z-score scaling
//! - A feed-forward classifier trained with Adam, with per-epoch history
//!
//! # Modules
//!
//! - [`sources`] - Source tables, key validation, merging and summaries
//! - [`preprocessing`] - Filling, label encoding, scaling
//! - [`training`] - Split, classifier, history and accuracy
//! - [`reporting`] - Fit-history reporters
//! - [`pipeline`] - Stage wiring and pipeline configuration
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Data
pub mod utils;
pub mod sources;
pub mod preprocessing;

// Model
pub mod training;
pub mod reporting;
pub mod pipeline;

// Interface
pub mod cli;

pub use error::{OffenseError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{OffenseError, Result};

    // Sources
    pub use crate::sources::{
        CaseMerger, SchemaMode, SourceKind, SourceLoader, SourcePaths, SourceTables,
    };

    // Preprocessing
    pub use crate::preprocessing::{
        CategoryCodec, Dataset, EncodedTable, LabelEncoders, PreprocessingConfig, Preprocessor,
        ScalerFit, StandardScaler,
    };

    // Training
    pub use crate::training::{
        FitHistory, TrainedClassifier, Trainer, TrainingConfig, TrainingOutcome,
    };

    // Reporting
    pub use crate::reporting::{CsvReporter, HistoryReporter, JsonReporter, LogReporter};

    // Pipeline
    pub use crate::pipeline::{OffensePipeline, PipelineConfig, PipelineReport};
}
