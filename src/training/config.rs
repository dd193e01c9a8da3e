//! Training configuration

use super::neural_network::{Activation, AdamConfig, MLPConfig};
use crate::error::{OffenseError, Result};
use crate::preprocessing::ScalerFit;
use serde::{Deserialize, Serialize};

/// Hyperparameters of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of rows held out for the final accuracy
    pub test_fraction: f64,

    /// Fraction of the training partition used for per-epoch validation
    pub validation_split: f64,

    /// Number of passes over the training partition
    pub epochs: usize,

    /// Mini-batch size
    pub batch_size: usize,

    /// Seed for the split, weight initialization and shuffling
    pub seed: u64,

    /// Hidden layer widths
    pub hidden_layers: Vec<usize>,

    /// Activation function for hidden layers
    pub activation: Activation,

    /// Adam optimizer settings
    pub optimizer: AdamConfig,

    /// Rows used to fit the feature scaler
    pub scaler_fit: ScalerFit,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            validation_split: 0.2,
            epochs: 50,
            batch_size: 32,
            seed: 42,
            hidden_layers: vec![64, 32],
            activation: Activation::ReLU,
            optimizer: AdamConfig::default(),
            scaler_fit: ScalerFit::TrainOnly,
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    pub fn with_validation_split(mut self, fraction: f64) -> Self {
        self.validation_split = fraction;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_hidden_layers(mut self, layers: Vec<usize>) -> Self {
        self.hidden_layers = layers;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.optimizer.learning_rate = learning_rate;
        self
    }

    pub fn with_scaler_fit(mut self, scaler_fit: ScalerFit) -> Self {
        self.scaler_fit = scaler_fit;
        self
    }

    /// Reject values the trainer cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(OffenseError::invalid_parameter(
                "test_fraction",
                self.test_fraction,
                "must be in (0, 1)",
            ));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(OffenseError::invalid_parameter(
                "validation_split",
                self.validation_split,
                "must be in [0, 1)",
            ));
        }
        if self.epochs == 0 {
            return Err(OffenseError::invalid_parameter("epochs", 0, "must be positive"));
        }
        if self.batch_size == 0 {
            return Err(OffenseError::invalid_parameter("batch_size", 0, "must be positive"));
        }
        if self.hidden_layers.iter().any(|&w| w == 0) {
            return Err(OffenseError::invalid_parameter(
                "hidden_layers",
                format!("{:?}", self.hidden_layers),
                "layer widths must be positive",
            ));
        }
        if !(self.optimizer.learning_rate > 0.0 && self.optimizer.learning_rate.is_finite()) {
            return Err(OffenseError::invalid_parameter(
                "learning_rate",
                self.optimizer.learning_rate,
                "must be a positive finite number",
            ));
        }
        Ok(())
    }

    /// Classifier settings derived from this configuration
    pub fn mlp_config(&self) -> MLPConfig {
        MLPConfig {
            hidden_layers: self.hidden_layers.clone(),
            activation: self.activation,
            optimizer: self.optimizer.clone(),
            max_epochs: self.epochs,
            batch_size: self.batch_size,
            validation_split: self.validation_split,
            random_state: Some(self.seed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_hyperparameters() {
        let config = TrainingConfig::default();
        assert_eq!(config.test_fraction, 0.2);
        assert_eq!(config.epochs, 50);
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.seed, 42);
        assert_eq!(config.hidden_layers, vec![64, 32]);
        assert_eq!(config.scaler_fit, ScalerFit::TrainOnly);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = TrainingConfig::new()
            .with_epochs(5)
            .with_batch_size(8)
            .with_seed(7)
            .with_hidden_layers(vec![16])
            .with_learning_rate(0.01);

        let mlp = config.mlp_config();
        assert_eq!(mlp.max_epochs, 5);
        assert_eq!(mlp.batch_size, 8);
        assert_eq!(mlp.random_state, Some(7));
        assert_eq!(mlp.hidden_layers, vec![16]);
        assert_eq!(mlp.optimizer.learning_rate, 0.01);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(TrainingConfig::new().with_test_fraction(0.0).validate().is_err());
        assert!(TrainingConfig::new().with_test_fraction(1.0).validate().is_err());
        assert!(TrainingConfig::new().with_validation_split(1.0).validate().is_err());
        assert!(TrainingConfig::new().with_epochs(0).validate().is_err());
        assert!(TrainingConfig::new().with_batch_size(0).validate().is_err());
        assert!(TrainingConfig::new().with_hidden_layers(vec![8, 0]).validate().is_err());
    }

    #[test]
    fn test_config_json() {
        let config = TrainingConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: TrainingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }
}
