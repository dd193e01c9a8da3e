//! Per-epoch fit history

use serde::{Deserialize, Serialize};

/// Metrics recorded at the end of one epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 1-based epoch number
    pub epoch: usize,
    pub train_accuracy: f64,
    pub train_loss: f64,
    /// `None` when the validation carve-out is empty
    pub val_accuracy: Option<f64>,
    pub val_loss: Option<f64>,
}

/// Ordered epoch records of one training run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitHistory {
    epochs: Vec<EpochMetrics>,
}

impl FitHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, metrics: EpochMetrics) {
        self.epochs.push(metrics);
    }

    pub fn epochs(&self) -> &[EpochMetrics] {
        &self.epochs
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }

    pub fn accuracy(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.train_accuracy).collect()
    }

    pub fn loss(&self) -> Vec<f64> {
        self.epochs.iter().map(|e| e.train_loss).collect()
    }

    pub fn val_accuracy(&self) -> Vec<Option<f64>> {
        self.epochs.iter().map(|e| e.val_accuracy).collect()
    }

    pub fn val_loss(&self) -> Vec<Option<f64>> {
        self.epochs.iter().map(|e| e.val_loss).collect()
    }

    /// Epoch with the lowest validation loss, if validation ran
    pub fn best_epoch(&self) -> Option<&EpochMetrics> {
        self.epochs
            .iter()
            .filter(|e| e.val_loss.is_some())
            .min_by(|a, b| {
                let a = a.val_loss.unwrap_or(f64::INFINITY);
                let b = b.val_loss.unwrap_or(f64::INFINITY);
                a.total_cmp(&b)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch(epoch: usize, val_loss: Option<f64>) -> EpochMetrics {
        EpochMetrics {
            epoch,
            train_accuracy: 0.5,
            train_loss: 1.0 / epoch as f64,
            val_accuracy: val_loss.map(|_| 0.4),
            val_loss,
        }
    }

    #[test]
    fn test_series_accessors() {
        let mut history = FitHistory::new();
        history.push(epoch(1, Some(0.9)));
        history.push(epoch(2, Some(0.7)));

        assert_eq!(history.len(), 2);
        assert_eq!(history.loss(), vec![1.0, 0.5]);
        assert_eq!(history.val_loss(), vec![Some(0.9), Some(0.7)]);
        assert_eq!(history.last().unwrap().epoch, 2);
    }

    #[test]
    fn test_best_epoch() {
        let mut history = FitHistory::new();
        history.push(epoch(1, Some(0.9)));
        history.push(epoch(2, Some(0.6)));
        history.push(epoch(3, Some(0.8)));
        assert_eq!(history.best_epoch().unwrap().epoch, 2);
    }

    #[test]
    fn test_best_epoch_without_validation() {
        let mut history = FitHistory::new();
        history.push(epoch(1, None));
        assert!(history.best_epoch().is_none());
    }
}
