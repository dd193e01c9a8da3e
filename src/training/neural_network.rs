//! Neural Network (Multi-Layer Perceptron) classifier
//!
//! Dense hidden layers, a softmax output layer, sparse categorical
//! cross-entropy and Adam updates. `fit` returns the per-epoch history.

use super::history::{EpochMetrics, FitHistory};
use super::split::validation_size;
use crate::error::{OffenseError, Result};
use ndarray::{s, Array, Array1, Array2, ArrayView1, Axis, Dimension, Zip};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Probabilities are clipped to `[EPS, 1 - EPS]` before taking the log
const PROB_EPSILON: f64 = 1e-7;

/// Activation function for hidden layers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Activation {
    /// Rectified Linear Unit
    ReLU,
    /// Sigmoid
    Sigmoid,
    /// Hyperbolic tangent
    Tanh,
}

impl Default for Activation {
    fn default() -> Self {
        Self::ReLU
    }
}

impl Activation {
    fn apply(&self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::ReLU => z.mapv(|v| v.max(0.0)),
            Activation::Sigmoid => z.mapv(sigmoid),
            Activation::Tanh => z.mapv(f64::tanh),
        }
    }

    fn derivative(&self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::ReLU => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Sigmoid => z.mapv(|v| {
                let s = sigmoid(v);
                s * (1.0 - s)
            }),
            Activation::Tanh => z.mapv(|v| 1.0 - v.tanh().powi(2)),
        }
    }
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

/// Row-wise softmax
fn softmax(z: &Array2<f64>) -> Array2<f64> {
    let mut result = z.clone();
    for mut row in result.rows_mut() {
        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    result
}

fn argmax(row: ArrayView1<f64>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best_i, best_v), (i, &v)| {
            if v > best_v {
                (i, v)
            } else {
                (best_i, best_v)
            }
        })
        .0
}

/// Mean sparse categorical cross-entropy of a batch
fn cross_entropy(probabilities: &Array2<f64>, labels: &[usize]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let total: f64 = labels
        .iter()
        .enumerate()
        .map(|(i, &c)| probabilities[[i, c]].clamp(PROB_EPSILON, 1.0 - PROB_EPSILON).ln())
        .sum();
    -total / labels.len() as f64
}

fn count_correct(probabilities: &Array2<f64>, labels: &[usize]) -> usize {
    probabilities
        .rows()
        .into_iter()
        .zip(labels)
        .filter(|(row, label)| argmax(row.view()) == **label)
        .count()
}

fn to_onehot(labels: &[usize], n_classes: usize) -> Array2<f64> {
    let mut onehot = Array2::zeros((labels.len(), n_classes));
    for (i, &label) in labels.iter().enumerate() {
        onehot[[i, label]] = 1.0;
    }
    onehot
}

/// Adam optimizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdamConfig {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.001,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
        }
    }
}

/// First and second moment estimates for every parameter
struct AdamState {
    m_w: Vec<Array2<f64>>,
    v_w: Vec<Array2<f64>>,
    m_b: Vec<Array1<f64>>,
    v_b: Vec<Array1<f64>>,
    step: i32,
}

impl AdamState {
    fn new(weights: &[Array2<f64>], biases: &[Array1<f64>]) -> Self {
        let zeros_w = || weights.iter().map(|w| Array2::zeros(w.raw_dim())).collect();
        let zeros_b = || biases.iter().map(|b| Array1::zeros(b.len())).collect();
        Self {
            m_w: zeros_w(),
            v_w: zeros_w(),
            m_b: zeros_b(),
            v_b: zeros_b(),
            step: 0,
        }
    }

    fn update(
        &mut self,
        weights: &mut [Array2<f64>],
        biases: &mut [Array1<f64>],
        gradients: &[(Array2<f64>, Array1<f64>)],
        config: &AdamConfig,
    ) {
        self.step += 1;
        let lr_t = config.learning_rate * (1.0 - config.beta2.powi(self.step)).sqrt()
            / (1.0 - config.beta1.powi(self.step));

        for (i, (grad_w, grad_b)) in gradients.iter().enumerate() {
            adam_update(&mut weights[i], grad_w, &mut self.m_w[i], &mut self.v_w[i], lr_t, config);
            adam_update(&mut biases[i], grad_b, &mut self.m_b[i], &mut self.v_b[i], lr_t, config);
        }
    }
}

fn adam_update<D: Dimension>(
    param: &mut Array<f64, D>,
    grad: &Array<f64, D>,
    m: &mut Array<f64, D>,
    v: &mut Array<f64, D>,
    lr_t: f64,
    config: &AdamConfig,
) {
    Zip::from(param)
        .and(grad)
        .and(m)
        .and(v)
        .for_each(|p, &g, m, v| {
            *m = config.beta1 * *m + (1.0 - config.beta1) * g;
            *v = config.beta2 * *v + (1.0 - config.beta2) * g * g;
            *p -= lr_t * *m / (v.sqrt() + config.epsilon);
        });
}

/// Neural Network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MLPConfig {
    /// Hidden layer sizes
    pub hidden_layers: Vec<usize>,
    /// Activation function for hidden layers
    pub activation: Activation,
    /// Optimizer settings
    pub optimizer: AdamConfig,
    /// Number of epochs
    pub max_epochs: usize,
    /// Batch size
    pub batch_size: usize,
    /// Trailing fraction of the fit data used for validation
    pub validation_split: f64,
    /// Random seed
    pub random_state: Option<u64>,
}

impl Default for MLPConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![64, 32],
            activation: Activation::ReLU,
            optimizer: AdamConfig::default(),
            max_epochs: 50,
            batch_size: 32,
            validation_split: 0.2,
            random_state: Some(42),
        }
    }
}

/// Activations kept from a forward pass for backpropagation
struct ForwardPass {
    /// Input of every layer; `inputs[0]` is the batch itself
    inputs: Vec<Array2<f64>>,
    /// Pre-activation values of the hidden layers
    pre_activations: Vec<Array2<f64>>,
    probabilities: Array2<f64>,
}

/// Multi-Layer Perceptron Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MLPClassifier {
    config: MLPConfig,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    n_features: usize,
    classes: Vec<usize>,
    is_fitted: bool,
}

impl MLPClassifier {
    pub fn new(config: MLPConfig) -> Self {
        Self {
            config,
            weights: Vec::new(),
            biases: Vec::new(),
            n_features: 0,
            classes: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fix the output layer to these labels instead of the ones seen in `fit`
    pub fn with_classes(mut self, classes: impl IntoIterator<Item = usize>) -> Self {
        self.classes = classes.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        self
    }

    pub fn config(&self) -> &MLPConfig {
        &self.config
    }

    pub fn classes(&self) -> &[usize] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Fit the model
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<usize>) -> Result<FitHistory> {
        self.fit_with_callback(x, y, |_| {})
    }

    /// Fit the model, calling `on_epoch` after every epoch
    pub fn fit_with_callback<F>(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<usize>,
        mut on_epoch: F,
    ) -> Result<FitHistory>
    where
        F: FnMut(&EpochMetrics),
    {
        let n_samples = x.nrows();
        let n_features = x.ncols();
        let n_val = validation_size(n_samples, self.config.validation_split);
        let n_train = n_samples - n_val;

        if y.len() != n_samples {
            return Err(OffenseError::training(
                format!("{} feature rows but {} labels", n_samples, y.len()),
                n_train,
                n_val,
                n_features,
            ));
        }
        if n_features == 0 {
            return Err(OffenseError::training("no feature columns", n_train, n_val, 0));
        }
        if n_train == 0 {
            return Err(OffenseError::training(
                "no rows left for fitting after the validation carve-out",
                n_train,
                n_val,
                n_features,
            ));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(OffenseError::training(
                "feature matrix contains non-finite values",
                n_train,
                n_val,
                n_features,
            ));
        }

        if self.classes.is_empty() {
            self.classes = y.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        }
        if self.classes.len() < 2 {
            return Err(OffenseError::DegenerateTarget {
                n_classes: self.classes.len(),
            });
        }

        // Position of each label in the output layer
        let class_idx = y
            .iter()
            .map(|label| {
                self.classes.binary_search(label).map_err(|_| {
                    OffenseError::training(
                        format!("label {} is not one of the output classes", label),
                        n_train,
                        n_val,
                        n_features,
                    )
                })
            })
            .collect::<Result<Vec<usize>>>()?;

        let x_train = x.slice(s![..n_train, ..]).to_owned();
        let x_val = x.slice(s![n_train.., ..]).to_owned();
        let (idx_train, idx_val) = class_idx.split_at(n_train);
        let y_train = to_onehot(idx_train, self.classes.len());

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.n_features = n_features;
        self.initialize_weights(&mut rng);
        let mut adam = AdamState::new(&self.weights, &self.biases);
        let mut history = FitHistory::new();

        for epoch in 1..=self.config.max_epochs {
            let mut order: Vec<usize> = (0..n_train).collect();
            order.shuffle(&mut rng);

            let mut loss_sum = 0.0;
            let mut correct = 0usize;

            for batch in order.chunks(self.config.batch_size.max(1)) {
                let x_batch = x_train.select(Axis(0), batch);
                let y_batch = y_train.select(Axis(0), batch);
                let labels: Vec<usize> = batch.iter().map(|&i| idx_train[i]).collect();

                let pass = self.forward(&x_batch);
                loss_sum += cross_entropy(&pass.probabilities, &labels) * batch.len() as f64;
                correct += count_correct(&pass.probabilities, &labels);

                let gradients = self.backward(&y_batch, &pass);
                adam.update(&mut self.weights, &mut self.biases, &gradients, &self.config.optimizer);
            }

            let train_loss = loss_sum / n_train as f64;
            if !train_loss.is_finite() {
                return Err(OffenseError::training(
                    format!("loss became non-finite at epoch {}", epoch),
                    n_train,
                    n_val,
                    n_features,
                ));
            }

            let (val_loss, val_accuracy) = if n_val > 0 {
                let probabilities = self.forward(&x_val).probabilities;
                (
                    Some(cross_entropy(&probabilities, idx_val)),
                    Some(count_correct(&probabilities, idx_val) as f64 / n_val as f64),
                )
            } else {
                (None, None)
            };

            let metrics = EpochMetrics {
                epoch,
                train_accuracy: correct as f64 / n_train as f64,
                train_loss,
                val_accuracy,
                val_loss,
            };
            debug!(
                epoch,
                loss = metrics.train_loss,
                accuracy = metrics.train_accuracy,
                val_loss = ?metrics.val_loss,
                val_accuracy = ?metrics.val_accuracy,
                "epoch finished"
            );
            on_epoch(&metrics);
            history.push(metrics);
        }

        self.is_fitted = true;
        Ok(history)
    }

    /// Predict class probabilities, one column per class in `classes()` order
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(OffenseError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(OffenseError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(self.forward(x).probabilities)
    }

    /// Predict the most probable class label per row
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| self.classes[argmax(row)])
            .collect())
    }

    /// Glorot-uniform weights, zero biases
    fn initialize_weights(&mut self, rng: &mut Xoshiro256PlusPlus) {
        self.weights.clear();
        self.biases.clear();

        let mut layer_sizes = vec![self.n_features];
        layer_sizes.extend(&self.config.hidden_layers);
        layer_sizes.push(self.classes.len());

        for pair in layer_sizes.windows(2) {
            let (n_in, n_out) = (pair[0], pair[1]);
            let limit = (6.0 / (n_in + n_out) as f64).sqrt();

            self.weights
                .push(Array2::from_shape_fn((n_in, n_out), |_| rng.gen_range(-limit..limit)));
            self.biases.push(Array1::zeros(n_out));
        }
    }

    fn forward(&self, x: &Array2<f64>) -> ForwardPass {
        let n_layers = self.weights.len();
        let mut inputs = Vec::with_capacity(n_layers);
        let mut pre_activations = Vec::with_capacity(n_layers.saturating_sub(1));
        let mut current = x.to_owned();

        for (i, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let z = current.dot(w) + b;
            inputs.push(current);

            current = if i + 1 < n_layers {
                let a = self.config.activation.apply(&z);
                pre_activations.push(z);
                a
            } else {
                softmax(&z)
            };
        }

        ForwardPass {
            inputs,
            pre_activations,
            probabilities: current,
        }
    }

    fn backward(&self, y_onehot: &Array2<f64>, pass: &ForwardPass) -> Vec<(Array2<f64>, Array1<f64>)> {
        let n = y_onehot.nrows() as f64;
        let mut gradients = Vec::with_capacity(self.weights.len());

        // Softmax + cross-entropy gradient
        let mut delta = (&pass.probabilities - y_onehot) / n;

        for i in (0..self.weights.len()).rev() {
            let grad_w = pass.inputs[i].t().dot(&delta);
            let grad_b = delta.sum_axis(Axis(0));
            gradients.push((grad_w, grad_b));

            if i > 0 {
                delta = delta.dot(&self.weights[i].t())
                    * self.config.activation.derivative(&pass.pre_activations[i - 1]);
            }
        }

        gradients.reverse();
        gradients
    }
}
