//! Training engine implementation

use super::config::TrainingConfig;
use super::history::{EpochMetrics, FitHistory};
use super::metrics::accuracy;
use super::neural_network::MLPClassifier;
use super::split::{train_test_split, validation_size};
use crate::error::{OffenseError, Result};
use crate::preprocessing::{Dataset, LabelEncoders, ScalerFit, StandardScaler};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

/// Row counts of one training run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSizes {
    /// Rows the network was fit on
    pub n_train: usize,
    /// Trailing training rows used for per-epoch validation
    pub n_validation: usize,
    /// Held-out rows scored for the final accuracy
    pub n_test: usize,
    pub n_features: usize,
}

/// Scaler and network bundled for prediction on raw feature values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedClassifier {
    scaler: StandardScaler,
    network: MLPClassifier,
    feature_names: Vec<String>,
    target_name: String,
}

impl TrainedClassifier {
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn network(&self) -> &MLPClassifier {
        &self.network
    }

    /// Class probabilities for unscaled, encoded feature rows
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let scaled = self.scaler.transform(x)?;
        self.network.predict_proba(&scaled)
    }

    /// Target codes for unscaled, encoded feature rows
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let scaled = self.scaler.transform(x)?;
        self.network.predict(&scaled)
    }

    /// Encode raw string rows with `encoders`, predict, and decode the
    /// predicted target codes back to category strings
    pub fn predict_labels(
        &self,
        encoders: &LabelEncoders,
        rows: &[BTreeMap<String, String>],
    ) -> Result<Vec<String>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut data = Vec::with_capacity(rows.len() * self.feature_names.len());
        for row in rows {
            data.extend(encoders.encode_row(row, &self.feature_names)?);
        }
        let x = Array2::from_shape_vec((rows.len(), self.feature_names.len()), data)?;

        let codes = self.predict(&x)?;
        let target = encoders.codec(&self.target_name)?;
        codes
            .iter()
            .map(|&code| target.decode(code).map(str::to_string))
            .collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Everything a training run produces
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Per-epoch metrics of the fit
    pub history: FitHistory,
    /// Accuracy on the held-out test partition
    pub accuracy: f64,
    pub sizes: PartitionSizes,
    pub model: TrainedClassifier,
    pub training_time_secs: f64,
}

/// Splits, scales, fits and scores a dataset
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn train(&self, dataset: &Dataset) -> Result<TrainingOutcome> {
        self.train_with_callback(dataset, |_| {})
    }

    /// Train, calling `on_epoch` after every epoch of the fit
    pub fn train_with_callback<F>(&self, dataset: &Dataset, on_epoch: F) -> Result<TrainingOutcome>
    where
        F: FnMut(&EpochMetrics),
    {
        self.config.validate()?;
        let start = Instant::now();

        // The output layer covers every label in the table, not only the
        // ones that land in the training partition
        let classes = dataset.classes();
        if classes.len() < 2 {
            return Err(OffenseError::DegenerateTarget {
                n_classes: classes.len(),
            });
        }

        let split = train_test_split(
            dataset.n_samples(),
            self.config.test_fraction,
            self.config.seed,
        )?;

        let x_train = dataset.features.select(Axis(0), &split.train);
        let y_train = dataset.target.select(Axis(0), &split.train);
        let x_test = dataset.features.select(Axis(0), &split.test);
        let y_test = dataset.target.select(Axis(0), &split.test);

        let mut scaler = StandardScaler::new();
        match self.config.scaler_fit {
            ScalerFit::TrainOnly => {
                scaler.fit(&x_train)?;
            }
            ScalerFit::FullTable => {
                warn!("fitting the scaler on the full table, test rows leak into the feature statistics");
                scaler.fit(&dataset.features)?;
            }
        }
        let x_train = scaler.transform(&x_train)?;
        let x_test = scaler.transform(&x_test)?;

        let n_validation = validation_size(split.train.len(), self.config.validation_split);
        let sizes = PartitionSizes {
            n_train: split.train.len() - n_validation,
            n_validation,
            n_test: split.test.len(),
            n_features: dataset.n_features(),
        };
        info!(
            n_train = sizes.n_train,
            n_validation = sizes.n_validation,
            n_test = sizes.n_test,
            n_features = sizes.n_features,
            n_classes = classes.len(),
            "training classifier"
        );

        let mut network = MLPClassifier::new(self.config.mlp_config()).with_classes(classes);
        let history = network
            .fit_with_callback(&x_train, &y_train, on_epoch)
            .map_err(|e| e.with_test_size(sizes.n_test))?;

        let y_pred = network.predict(&x_test)?;
        let accuracy = accuracy(&y_test, &y_pred)?;
        let training_time_secs = start.elapsed().as_secs_f64();

        info!(accuracy, training_time_secs, "training finished");

        Ok(TrainingOutcome {
            history,
            accuracy,
            sizes,
            model: TrainedClassifier {
                scaler,
                network,
                feature_names: dataset.feature_names.clone(),
                target_name: dataset.target_name.clone(),
            },
            training_time_secs,
        })
    }
}
