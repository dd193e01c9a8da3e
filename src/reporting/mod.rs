//! Fit-history reporters
//!
//! A reporter receives the per-epoch history and the held-out accuracy once
//! training is done. Rendering plots is left to external consumers; the
//! reporters here log the run or write it to disk.

use crate::error::{OffenseError, Result};
use crate::training::FitHistory;
use crate::utils::DataSaver;
use polars::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Consumer of a finished training run
pub trait HistoryReporter {
    fn report(&self, history: &FitHistory, accuracy: f64) -> Result<()>;
}

/// Logs every epoch and the final accuracy through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl HistoryReporter for LogReporter {
    fn report(&self, history: &FitHistory, accuracy: f64) -> Result<()> {
        for epoch in history.epochs() {
            info!(
                epoch = epoch.epoch,
                accuracy = epoch.train_accuracy,
                loss = epoch.train_loss,
                val_accuracy = ?epoch.val_accuracy,
                val_loss = ?epoch.val_loss,
                "epoch"
            );
        }
        info!(accuracy, epochs = history.len(), "held-out accuracy");
        Ok(())
    }
}

/// Keras-style `history.history` layout plus the test accuracy
#[derive(Debug, Serialize)]
struct HistoryDocument {
    test_accuracy: f64,
    epochs: usize,
    history: HistorySeries,
}

#[derive(Debug, Serialize)]
struct HistorySeries {
    accuracy: Vec<f64>,
    loss: Vec<f64>,
    val_accuracy: Vec<Option<f64>>,
    val_loss: Vec<Option<f64>>,
}

/// Writes the history as a JSON document
#[derive(Debug, Clone)]
pub struct JsonReporter {
    path: PathBuf,
}

impl JsonReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryReporter for JsonReporter {
    fn report(&self, history: &FitHistory, accuracy: f64) -> Result<()> {
        let document = HistoryDocument {
            test_accuracy: accuracy,
            epochs: history.len(),
            history: HistorySeries {
                accuracy: history.accuracy(),
                loss: history.loss(),
                val_accuracy: history.val_accuracy(),
                val_loss: history.val_loss(),
            },
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&document)?)?;
        info!(path = %self.path.display(), "wrote fit history");
        Ok(())
    }
}

/// Writes one row per epoch as CSV; the accuracy is not part of the table
#[derive(Debug, Clone)]
pub struct CsvReporter {
    path: PathBuf,
}

impl CsvReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Per-epoch history as a frame with columns
/// `epoch, accuracy, loss, val_accuracy, val_loss`
pub fn history_frame(history: &FitHistory) -> Result<DataFrame> {
    let epochs: Vec<u64> = history.epochs().iter().map(|e| e.epoch as u64).collect();
    let frame = df!(
        "epoch" => epochs,
        "accuracy" => history.accuracy(),
        "loss" => history.loss(),
        "val_accuracy" => history.val_accuracy(),
        "val_loss" => history.val_loss()
    )?;
    Ok(frame)
}

impl HistoryReporter for CsvReporter {
    fn report(&self, history: &FitHistory, _accuracy: f64) -> Result<()> {
        let mut frame = history_frame(history)?;
        DataSaver::save_csv(&mut frame, &self.path)?;
        info!(path = %self.path.display(), rows = frame.height(), "wrote fit history");
        Ok(())
    }
}

/// Pick a file reporter from the extension of `path` (`.json` or `.csv`)
pub fn file_reporter(path: &Path) -> Result<Box<dyn HistoryReporter>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("json") => Ok(Box::new(JsonReporter::new(path))),
        Some("csv") => Ok(Box::new(CsvReporter::new(path))),
        _ => Err(OffenseError::invalid_parameter(
            "history_out",
            path.display(),
            "expected a .json or .csv file",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::EpochMetrics;

    fn history() -> FitHistory {
        let mut history = FitHistory::new();
        for epoch in 1..=3 {
            history.push(EpochMetrics {
                epoch,
                train_accuracy: 0.5 + epoch as f64 * 0.1,
                train_loss: 1.0 / epoch as f64,
                val_accuracy: Some(0.5),
                val_loss: if epoch == 3 { None } else { Some(0.9) },
            });
        }
        history
    }

    #[test]
    fn test_history_frame() {
        let frame = history_frame(&history()).unwrap();
        assert_eq!(frame.shape(), (3, 5));
        assert_eq!(frame.column("val_loss").unwrap().null_count(), 1);
    }

    #[test]
    fn test_json_reporter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        JsonReporter::new(&path).report(&history(), 0.75).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["test_accuracy"], 0.75);
        assert_eq!(value["epochs"], 3);
        assert_eq!(value["history"]["loss"].as_array().unwrap().len(), 3);
        assert!(value["history"]["val_loss"][2].is_null());
    }

    #[test]
    fn test_csv_reporter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        CsvReporter::new(&path).report(&history(), 0.75).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("epoch,accuracy,loss,val_accuracy,val_loss"));
        assert_eq!(lines.count(), 3);
    }

    #[test]
    fn test_file_reporter_by_extension() {
        assert!(file_reporter(Path::new("out.json")).is_ok());
        assert!(file_reporter(Path::new("out.CSV")).is_ok());
        assert!(file_reporter(Path::new("out.txt")).is_err());
    }

    #[test]
    fn test_log_reporter() {
        assert!(LogReporter.report(&history(), 0.5).is_ok());
    }
}
