//! Data preprocessing module
//!
//! Turns the merged case table into model input:
//! - Missing values replaced with a literal placeholder
//! - Label encoding of the categorical columns, with the encoders kept
//! - Z-score standardization of the feature matrix

mod config;
mod imputer;
mod pipeline;
pub mod encoder;
pub mod scaler;

pub use config::PreprocessingConfig;
pub use encoder::{CategoryCodec, LabelEncoders};
pub use imputer::{missing_counts, Imputer, UNKNOWN};
pub use pipeline::{Dataset, EncodedTable, Preprocessor};
pub use scaler::{ScalerFit, StandardScaler};
