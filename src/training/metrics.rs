//! Classification metrics

use crate::error::{OffenseError, Result};
use ndarray::{Array1, Array2};

/// Fraction of positions where the predicted label equals the true label
pub fn accuracy(y_true: &Array1<usize>, y_pred: &Array1<usize>) -> Result<f64> {
    check_lengths(y_true, y_pred)?;
    if y_true.is_empty() {
        return Err(OffenseError::DataError(
            "accuracy of an empty prediction set".to_string(),
        ));
    }

    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Counts indexed by `[true class position, predicted class position]`
/// over `classes`; labels outside `classes` are skipped.
pub fn confusion_matrix(
    y_true: &Array1<usize>,
    y_pred: &Array1<usize>,
    classes: &[usize],
) -> Result<Array2<usize>> {
    check_lengths(y_true, y_pred)?;

    let mut matrix = Array2::zeros((classes.len(), classes.len()));
    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        if let (Some(i), Some(j)) = (
            classes.iter().position(|c| c == t),
            classes.iter().position(|c| c == p),
        ) {
            matrix[[i, j]] += 1;
        }
    }
    Ok(matrix)
}

fn check_lengths(y_true: &Array1<usize>, y_pred: &Array1<usize>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(OffenseError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_accuracy() {
        let y_true = array![0usize, 1, 2, 1];
        let y_pred = array![0usize, 1, 1, 1];
        assert!((accuracy(&y_true, &y_pred).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_accuracy_errors() {
        assert!(accuracy(&array![0usize, 1], &array![0usize]).is_err());
        assert!(accuracy(&Array1::<usize>::zeros(0), &Array1::<usize>::zeros(0)).is_err());
    }

    #[test]
    fn test_confusion_matrix() {
        let y_true = array![0usize, 1, 2, 1];
        let y_pred = array![0usize, 1, 1, 2];
        let cm = confusion_matrix(&y_true, &y_pred, &[0, 1, 2]).unwrap();
        assert_eq!(cm[[0, 0]], 1);
        assert_eq!(cm[[1, 1]], 1);
        assert_eq!(cm[[2, 1]], 1);
        assert_eq!(cm[[1, 2]], 1);
        assert_eq!(cm.sum(), 4);
    }
}
