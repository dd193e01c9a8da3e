//! Merged table → encoded table → model-ready matrix

use super::config::PreprocessingConfig;
use super::encoder::{CategoryCodec, LabelEncoders};
use super::imputer::Imputer;
use crate::error::{OffenseError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Merged table after missing-value filling and label encoding,
/// together with the encoders that produced it
#[derive(Debug, Clone)]
pub struct EncodedTable {
    frame: DataFrame,
    encoders: LabelEncoders,
}

impl EncodedTable {
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn encoders(&self) -> &LabelEncoders {
        &self.encoders
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn into_parts(self) -> (DataFrame, LabelEncoders) {
        (self.frame, self.encoders)
    }
}

/// Numeric features and integer class labels
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: Array2<f64>,
    pub target: Array1<usize>,
    pub feature_names: Vec<String>,
    pub target_name: String,
}

impl Dataset {
    pub fn new(
        features: Array2<f64>,
        target: Array1<usize>,
        feature_names: Vec<String>,
        target_name: impl Into<String>,
    ) -> Result<Self> {
        if features.nrows() != target.len() {
            return Err(OffenseError::ShapeError {
                expected: format!("{} target values", features.nrows()),
                actual: format!("{} target values", target.len()),
            });
        }
        if features.ncols() != feature_names.len() {
            return Err(OffenseError::ShapeError {
                expected: format!("{} feature names", features.ncols()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }

        Ok(Self {
            features,
            target,
            feature_names,
            target_name: target_name.into(),
        })
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Distinct labels, ascending
    pub fn classes(&self) -> Vec<usize> {
        self.target
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn n_classes(&self) -> usize {
        self.classes().len()
    }
}

/// Fills, encodes and extracts features from the merged case table
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessingConfig,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    fn imputer(&self) -> Imputer {
        Imputer::constant(self.config.missing_placeholder.as_str())
    }

    /// Fill every absent cell with the placeholder
    pub fn fill_missing(&self, df: &DataFrame) -> Result<DataFrame> {
        self.imputer().transform(df)
    }

    /// Fit one encoder per designated column on an already-filled frame
    pub fn fit_encoders(&self, filled: &DataFrame) -> Result<LabelEncoders> {
        let mut encoders = LabelEncoders::new();

        for name in &self.config.encode_columns {
            let column = filled
                .column(name)
                .map_err(|_| OffenseError::Encoding(name.clone()))?;
            let codec = CategoryCodec::fit_series(column.as_materialized_series())?;
            debug!(column = %name, categories = codec.len(), "fitted label encoder");
            encoders.insert(codec);
        }

        Ok(encoders)
    }

    /// Fill, then replace every encoded column with its codes
    pub fn transform(&self, df: &DataFrame, encoders: &LabelEncoders) -> Result<DataFrame> {
        self.encode_filled(self.fill_missing(df)?, encoders)
    }

    fn encode_filled(&self, mut frame: DataFrame, encoders: &LabelEncoders) -> Result<DataFrame> {
        for name in encoders.columns() {
            let column = frame
                .column(name)
                .map_err(|_| OffenseError::Encoding(name.to_string()))?;
            let encoded = encoders
                .codec(name)?
                .encode_series(column.as_materialized_series())?;
            frame.with_column(encoded)?;
        }

        Ok(frame)
    }

    /// Fill, fit fresh encoders and encode the merged table
    pub fn fit_transform(&self, merged: DataFrame) -> Result<EncodedTable> {
        for name in &self.config.encode_columns {
            if merged.column(name).is_err() {
                return Err(OffenseError::Encoding(name.clone()));
            }
        }

        let filled = self.fill_missing(&merged)?;
        let encoders = self.fit_encoders(&filled)?;
        let frame = self.encode_filled(filled, &encoders)?;

        info!(
            rows = frame.height(),
            encoded_columns = encoders.len(),
            "encoded merged table"
        );

        Ok(EncodedTable { frame, encoders })
    }

    /// Select the feature matrix and target labels
    pub fn dataset(&self, encoded: &EncodedTable) -> Result<Dataset> {
        let frame = encoded.frame();
        let n_rows = frame.height();

        let columns = self
            .config
            .feature_columns
            .iter()
            .map(|name| numeric_column(frame, name))
            .collect::<Result<Vec<_>>>()?;

        let features = Array2::from_shape_fn((n_rows, columns.len()), |(i, j)| columns[j][i]);
        let target = label_column(frame, &self.config.target_column)?;

        Dataset::new(
            features,
            target,
            self.config.feature_columns.clone(),
            self.config.target_column.as_str(),
        )
    }
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int32
            | DataType::Int64
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df
        .column(name)
        .map_err(|_| OffenseError::FeatureNotFound(name.to_string()))?
        .as_materialized_series();

    if !is_numeric_dtype(series.dtype()) {
        return Err(OffenseError::NonNumericFeature {
            column: name.to_string(),
            dtype: series.dtype().to_string(),
        });
    }

    let as_float = series.cast(&DataType::Float64)?;
    as_float
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                OffenseError::DataError(format!("column '{}' is missing a value at row {}", name, row))
            })
        })
        .collect()
}

fn label_column(df: &DataFrame, name: &str) -> Result<Array1<usize>> {
    let series = df
        .column(name)
        .map_err(|_| OffenseError::FeatureNotFound(name.to_string()))?
        .as_materialized_series();

    if !matches!(
        series.dtype(),
        DataType::Int32 | DataType::Int64 | DataType::UInt32 | DataType::UInt64
    ) {
        return Err(OffenseError::NonNumericFeature {
            column: name.to_string(),
            dtype: series.dtype().to_string(),
        });
    }

    let as_int = series.cast(&DataType::Int64)?;
    as_int
        .i64()?
        .into_iter()
        .map(|v| match v {
            Some(code) if code >= 0 => Ok(code as usize),
            other => Err(OffenseError::DataError(format!(
                "target '{}' holds an invalid class code {:?}",
                name, other
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merged() -> DataFrame {
        df!(
            "key" => &["1", "2", "3", "4"],
            "Offender Age" => &[Some("20-29"), None, Some("30-39"), Some("20-29")],
            "Victim Age" => &["10-19", "20-29", "20-29", "40-49"],
            "Location Type" => &["Home", "Street", "Home", "Bar"],
            "Relationship" => &["Stranger", "Family", "Stranger", "Friend"],
            "Weapon" => &["Knife", "Gun", "None", "Gun"],
            "Offense" => &["Robbery", "Assault", "Robbery", "Burglary"],
            "value_offender" => &[Some(3i64), None, Some(1), Some(2)]
        )
        .unwrap()
    }

    #[test]
    fn test_fit_transform_encodes_designated_columns() {
        let encoded = Preprocessor::new().fit_transform(merged()).unwrap();
        assert_eq!(encoded.height(), 4);
        assert_eq!(encoded.encoders().len(), 7);

        let offense: Vec<i64> = encoded
            .frame()
            .column("Offense")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(offense, vec![2, 0, 2, 1]);
    }

    #[test]
    fn test_missing_values_become_unknown() {
        let encoded = Preprocessor::new().fit_transform(merged()).unwrap();
        let codec = encoded.encoders().codec("Offender Age").unwrap();
        assert!(codec.categories().contains(&"Unknown".to_string()));

        for column in encoded.frame().get_columns() {
            assert_eq!(column.null_count(), 0, "column {} has nulls", column.name());
        }
        let untouched = encoded.frame().column("value_offender").unwrap().str().unwrap();
        assert_eq!(untouched.get(1), Some("Unknown"));
    }

    #[test]
    fn test_missing_encode_column_is_encoding_error() {
        let df = merged().drop("Weapon").unwrap();
        let err = Preprocessor::new().fit_transform(df).unwrap_err();
        assert!(matches!(err, OffenseError::Encoding(ref c) if c == "Weapon"));
    }

    #[test]
    fn test_dataset_shapes() {
        let preprocessor = Preprocessor::new();
        let encoded = preprocessor.fit_transform(merged()).unwrap();
        let dataset = preprocessor.dataset(&encoded).unwrap();

        assert_eq!(dataset.n_samples(), 4);
        assert_eq!(dataset.n_features(), 5);
        assert_eq!(dataset.classes(), vec![0, 1, 2]);
        assert_eq!(dataset.target_name, "Offense");
    }

    #[test]
    fn test_non_numeric_feature_is_rejected() {
        let config = PreprocessingConfig::default().with_features(&["Weapon", "value_offender"]);
        let preprocessor = Preprocessor::with_config(config);
        let encoded = preprocessor.fit_transform(merged()).unwrap();

        let err = preprocessor.dataset(&encoded).unwrap_err();
        assert!(matches!(err, OffenseError::NonNumericFeature { ref column, .. } if column == "value_offender"));
    }

    #[test]
    fn test_complete_numeric_column_is_a_feature() {
        let mut df = merged();
        df.with_column(Series::new("value".into(), vec![1i64, 2, 3, 4]))
            .unwrap();

        let config = PreprocessingConfig::default().with_features(&["Weapon", "value"]);
        let preprocessor = Preprocessor::with_config(config);
        let encoded = preprocessor.fit_transform(df).unwrap();
        assert_eq!(encoded.frame().column("value").unwrap().dtype(), &DataType::Int64);

        let dataset = preprocessor.dataset(&encoded).unwrap();
        assert_eq!(dataset.n_features(), 2);
        assert_eq!(dataset.features.column(1).to_vec(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_transform_reuses_encoders() {
        let preprocessor = Preprocessor::new();
        let encoded = preprocessor.fit_transform(merged()).unwrap();

        let again = preprocessor
            .transform(&merged(), encoded.encoders())
            .unwrap();
        assert!(again.equals(encoded.frame()));
    }

    #[test]
    fn test_dataset_new_checks_lengths() {
        let features = Array2::<f64>::zeros((3, 2));
        let target = Array1::from(vec![0usize, 1]);
        let names = vec!["a".to_string(), "b".to_string()];
        assert!(Dataset::new(features, target, names, "y").is_err());
    }
}
