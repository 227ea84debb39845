// ============================================================
// Layer 6 - Training History Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Why log metrics to CSV?
//   - Easy to open in a spreadsheet or plot with any tool
//   - Shows when the LR was reduced and why training stopped
//   - Provides a permanent record of each training run
//
// Metrics recorded per epoch:
//   - epoch:         the epoch number (1, 2, 3, ...)
//   - train_loss:    mean cross-entropy over the training split
//   - train_acc:     fraction of training samples classified correctly
//   - val_loss:      mean cross-entropy over the validation split
//   - val_acc:       fraction of validation samples classified correctly
//   - learning_rate: rate the epoch was trained with
//
// Output file: reports/training_history_<version>.csv
//
// Example CSV output:
//   epoch,train_loss,train_acc,val_loss,val_acc,learning_rate
//   1,1.021300,0.482000,0.913400,0.571000,0.001000
//   2,0.804100,0.633000,0.755800,0.688000,0.001000
//   ...
//
// How to read the metrics:
//   - If val_loss increases while train_loss decreases → overfitting
//   - A halved learning_rate marks a validation-loss plateau
//
// A new run for the same version starts a fresh file.
//
// Reference: Rust Book §12 (I/O and File Handling)

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::domain::error::PipelineResult;
use crate::ml::controller::EpochRecord;

const HEADER: &str = "epoch,train_loss,train_acc,val_loss,val_acc,learning_rate";

/// Appends one CSV row per epoch.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create `<dir>/training_history_<version>.csv`, truncating any earlier
    /// history for the same version, and write the header row.
    pub fn create(dir: &Path, model_version: &str) -> PipelineResult<Self> {
        fs::create_dir_all(dir)?;

        let csv_path = dir.join(format!("training_history_{model_version}.csv"));
        let mut f = fs::File::create(&csv_path)?;
        writeln!(f, "{HEADER}")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch as a new row.
    pub fn log(&self, r: &EpochRecord) -> PipelineResult<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6e}",
            r.epoch,
            r.train.loss,
            r.train.accuracy,
            r.val.loss,
            r.val.accuracy,
            r.learning_rate,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            r.epoch,
            r.train.loss,
            r.val.loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::traits::EpochScore;

    fn record(epoch: usize) -> EpochRecord {
        EpochRecord {
            epoch,
            train: EpochScore { loss: 1.0, accuracy: 0.5 },
            val:   EpochScore { loss: 0.9, accuracy: 0.6 },
            learning_rate: 0.001,
        }
    }

    #[test]
    fn test_header_and_rows() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::create(dir.path(), "v1").unwrap();
        logger.log(&record(1)).unwrap();
        logger.log(&record(2)).unwrap();

        let text  = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert!(lines[2].starts_with("2,1.000000,0.500000,0.900000,0.600000,"));
        assert!(logger.csv_path().ends_with("training_history_v1.csv"));
    }

    #[test]
    fn test_new_run_truncates_history() {
        let dir = tempfile::tempdir().unwrap();
        MetricsLogger::create(dir.path(), "v1").unwrap().log(&record(1)).unwrap();

        let logger = MetricsLogger::create(dir.path(), "v1").unwrap();
        let text   = fs::read_to_string(logger.csv_path()).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}
