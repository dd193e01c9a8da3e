//! Error types for the offense prediction pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, OffenseError>;

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum OffenseError {
    #[error("Schema error: source '{source_name}' is missing key column '{key}'; columns are {columns:?}")]
    Schema {
        source_name: String,
        key: String,
        columns: Vec<String>,
    },

    #[error("Encoding error: column '{0}' is not present in the merged table")]
    Encoding(String),

    #[error("Degenerate target: found {n_classes} distinct class(es), at least 2 are required")]
    DegenerateTarget { n_classes: usize },

    #[error(
        "Training error: {reason} (train={n_train}, validation={n_validation}, test={n_test}, features={n_features})"
    )]
    Training {
        reason: String,
        n_train: usize,
        n_validation: usize,
        n_test: usize,
        n_features: usize,
    },

    #[error("Feature '{column}' is not numeric after encoding (dtype {dtype})")]
    NonNumericFeature { column: String, dtype: String },

    #[error("Unknown category '{value}' for column '{column}'")]
    UnknownCategory { column: String, value: String },

    #[error("Code {code} is out of range for column '{column}' ({n_categories} categories)")]
    UnknownCode {
        column: String,
        code: usize,
        n_categories: usize,
    },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl OffenseError {
    /// Build a training error with partition sizes for diagnosis
    pub fn training(
        reason: impl Into<String>,
        n_train: usize,
        n_validation: usize,
        n_features: usize,
    ) -> Self {
        OffenseError::Training {
            reason: reason.into(),
            n_train,
            n_validation,
            n_test: 0,
            n_features,
        }
    }

    /// Attach the held-out partition size to a training error.
    ///
    /// The classifier only sees the training partition, so the engine fills
    /// the test size in before surfacing the error.
    pub fn with_test_size(self, test_size: usize) -> Self {
        match self {
            OffenseError::Training {
                reason,
                n_train,
                n_validation,
                n_features,
                ..
            } => OffenseError::Training {
                reason,
                n_train,
                n_validation,
                n_test: test_size,
                n_features,
            },
            other => other,
        }
    }

    pub(crate) fn invalid_parameter(
        name: &str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        OffenseError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<polars::error::PolarsError> for OffenseError {
    fn from(err: polars::error::PolarsError) -> Self {
        OffenseError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for OffenseError {
    fn from(err: serde_json::Error) -> Self {
        OffenseError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for OffenseError {
    fn from(err: ndarray::ShapeError) -> Self {
        OffenseError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OffenseError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_schema_error_names_source_and_columns() {
        let err = OffenseError::Schema {
            source_name: "Weapon".to_string(),
            key: "key".to_string(),
            columns: vec!["id".to_string(), "Weapon".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("Weapon"));
        assert!(msg.contains("\"id\""));
    }

    #[test]
    fn test_with_test_size_fills_training_error() {
        let err = OffenseError::training("loss diverged", 40, 10, 5).with_test_size(12);
        match err {
            OffenseError::Training { n_train, n_validation, n_test, n_features, .. } => {
                assert_eq!((n_train, n_validation, n_test, n_features), (40, 10, 12, 5));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_with_test_size_leaves_other_errors() {
        let err = OffenseError::ModelNotFitted.with_test_size(3);
        assert!(matches!(err, OffenseError::ModelNotFitted));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: OffenseError = io_err.into();
        assert!(matches!(err, OffenseError::IoError(_)));
    }
}
