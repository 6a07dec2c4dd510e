// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records per-epoch metrics to a CSV file next to the checkpoint
// and tracks the best test accuracy seen so far.
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (1, 2, 3, ...)
//   - train_loss: mean NLL loss over the training batches
//   - test_loss:  mean NLL loss over the test set
//   - accuracy:   fraction of test digits classified correctly
//
// Output file: checkpoints/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,test_loss,accuracy
//   1,0.512300,0.201100,0.940100
//   2,0.301900,0.133800,0.958700
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
};
use serde::{Deserialize, Serialize};

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean NLL loss over all training batches
    pub train_loss: f64,

    /// Mean NLL loss over the whole test set
    pub test_loss: f64,

    /// Range: [0.0, 1.0]
    pub accuracy: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, test_loss: f64, accuracy: f64) -> Self {
        Self { epoch, train_loss, test_loss, accuracy }
    }
}

// ─── Best Accuracy ────────────────────────────────────────────────────────────
/// Running maximum of test accuracy across epochs.
///
/// Only a strictly greater accuracy replaces the incumbent, so ties keep
/// the earlier epoch. Starts below any valid accuracy.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BestAccuracy {
    best: Option<(usize, f64)>,
}

impl BestAccuracy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continue from a previously saved best epoch.
    pub fn resume(epoch: usize, accuracy: f64) -> Self {
        Self { best: Some((epoch, accuracy)) }
    }

    /// Record an epoch result. Returns true if it is the new best.
    pub fn observe(&mut self, epoch: usize, accuracy: f64) -> bool {
        if accuracy.is_nan() {
            return false;
        }
        let improved = self.best.map_or(true, |(_, best)| accuracy > best);
        if improved {
            self.best = Some((epoch, accuracy));
        }
        improved
    }

    pub fn accuracy(&self) -> Option<f64> {
        self.best.map(|(_, acc)| acc)
    }

    pub fn epoch(&self) -> Option<usize> {
        self.best.map(|(epoch, _)| epoch)
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    /// Full path to the CSV file
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl Into<String>) -> Result<Self> {
        let dir = PathBuf::from(dir.into());
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");

        // Existing logs are appended to across runs
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "epoch,train_loss,test_loss,accuracy")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.test_loss,
            m.accuracy,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, test_loss={:.4}, accuracy={:.4}",
            m.epoch,
            m.train_loss,
            m.test_loss,
            m.accuracy,
        );

        Ok(())
    }

    /// Return the path to the metrics CSV file
    pub fn csv_path(&self) -> &PathBuf {
        &self.csv_path
    }
}
