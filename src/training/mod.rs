//! Model training module
//!
//! Fits the offense classifier on an encoded dataset:
//! - Seeded train/test split
//! - Feature standardization
//! - Multi-layer perceptron with softmax output and Adam updates
//! - Per-epoch history and held-out accuracy

mod config;
mod engine;
pub mod history;
pub mod metrics;
pub mod neural_network;
pub mod split;

pub use config::TrainingConfig;
pub use engine::{PartitionSizes, TrainedClassifier, Trainer, TrainingOutcome};
pub use history::{EpochMetrics, FitHistory};
pub use metrics::{accuracy, confusion_matrix};
pub use neural_network::{Activation, AdamConfig, MLPClassifier, MLPConfig};
pub use split::{train_test_split, validation_size, TrainTestSplit};
