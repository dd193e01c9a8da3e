//! Train/test partitioning

use crate::error::{OffenseError, Result};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Row indices of a shuffled train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n_samples` with `seed` and hold out `ceil(n * test_fraction)` rows.
///
/// Fails if either side would end up empty.
pub fn train_test_split(n_samples: usize, test_fraction: f64, seed: u64) -> Result<TrainTestSplit> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(OffenseError::invalid_parameter(
            "test_fraction",
            test_fraction,
            "must be in (0, 1)",
        ));
    }

    let n_test = (n_samples as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n_samples {
        return Err(OffenseError::training(
            format!(
                "{} rows cannot be split with test fraction {}",
                n_samples, test_fraction
            ),
            n_samples.saturating_sub(n_test),
            0,
            0,
        )
        .with_test_size(n_test));
    }

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n_samples).collect();
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(TrainTestSplit {
        train,
        test: indices,
    })
}

/// Number of trailing training rows used for validation.
///
/// The split point is `floor(n_train * (1 - validation_split))`, so the
/// validation rows are the last ones of the (already shuffled) partition.
pub fn validation_size(n_train: usize, validation_split: f64) -> usize {
    if validation_split <= 0.0 {
        return 0;
    }
    let split_at = (n_train as f64 * (1.0 - validation_split)).floor() as usize;
    n_train - split_at.min(n_train)
}
