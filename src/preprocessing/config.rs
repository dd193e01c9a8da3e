//! Preprocessing configuration

use super::imputer::UNKNOWN;
use serde::{Deserialize, Serialize};

/// Columns and placeholder used by the preprocessor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Literal written into absent cells before encoding
    pub missing_placeholder: String,

    /// Columns that get a label encoder
    pub encode_columns: Vec<String>,

    /// Model input columns, in matrix order
    pub feature_columns: Vec<String>,

    /// Column the classifier predicts
    pub target_column: String,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            missing_placeholder: UNKNOWN.to_string(),
            encode_columns: to_strings(&[
                "key",
                "Offender Age",
                "Victim Age",
                "Location Type",
                "Relationship",
                "Weapon",
                "Offense",
            ]),
            feature_columns: to_strings(&[
                "Offender Age",
                "Victim Age",
                "Location Type",
                "Relationship",
                "Weapon",
            ]),
            target_column: "Offense".to_string(),
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.missing_placeholder = placeholder.into();
        self
    }

    pub fn with_encode_columns(mut self, columns: &[&str]) -> Self {
        self.encode_columns = to_strings(columns);
        self
    }

    pub fn with_features(mut self, columns: &[&str]) -> Self {
        self.feature_columns = to_strings(columns);
        self
    }

    pub fn with_target(mut self, column: impl Into<String>) -> Self {
        self.target_column = column.into();
        self
    }
}

fn to_strings(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}
