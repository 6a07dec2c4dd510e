// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Start a tracking run, record config   (Layer 6 - infra)
//   Step 2: Resolve the dataset artifact          (Layer 6 - infra)
//   Step 3: Load the train/test splits            (Layer 4 - data)
//   Step 4: Prepare the checkpoint directory      (Layer 6 - infra)
//   Step 5: Run training loop                     (Layer 5 - ml)
//   Step 6: Close the run                         (Layer 6 - infra)
//
// Reference: Rust Book §9 (Error Handling)
//            Burn Book §5 (Training)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::application::{DATASET_REF, DEFAULT_ENTITY, DEFAULT_PROJECT};
use crate::data::{dataset::MnistDataset, idx::Split};
use crate::domain::{
    artifact::{ArtifactRef, ArtifactType},
    traits::{ExperimentTracker, RunStatus},
};
use crate::infra::{checkpoint::CheckpointManager, tracking::LocalTracker};
use crate::ml::trainer::{run_training, TrainingSummary};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Serialisable so the tracker can store it with the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub batch_size:      usize,
    pub test_batch_size: usize,
    pub epochs:          usize,
    pub lr:              f64,
    pub momentum:        f64,
    pub no_cuda:         bool,
    pub seed:            u64,
    pub log_interval:    usize,
    pub checkpoint_dir:  String,
    pub tracking_dir:    String,
    pub entity:          String,
    pub project:         String,
    pub resume:          bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            batch_size:      64,
            test_batch_size: 1000,
            epochs:          5,
            lr:              0.01,
            momentum:        0.5,
            no_cuda:         false,
            seed:            1,
            log_interval:    10,
            checkpoint_dir:  "checkpoints".to_string(),
            tracking_dir:    "wandb".to_string(),
            entity:          DEFAULT_ENTITY.to_string(),
            project:         DEFAULT_PROJECT.to_string(),
            resume:          false,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainingSummary> {
        let cfg = &self.config;

        // ── Step 1: Tracking run ─────────────────────────────────────────────
        let mut tracker = LocalTracker::init(&cfg.tracking_dir, &cfg.entity, &cfg.project, "training")?;
        let config_json = serde_json::to_value(cfg).context("Cannot serialise training config")?;
        tracker.update_config(&config_json)?;

        // ── Steps 2-5 ────────────────────────────────────────────────────────
        // The run is marked failed on any error so it never stays "running".
        match self.train(&mut tracker) {
            Ok(summary) => {
                tracker.finish(RunStatus::Finished)?;
                Ok(summary)
            }
            Err(e) => {
                if let Err(finish_err) = tracker.finish(RunStatus::Failed) {
                    tracing::warn!("Cannot mark run as failed: {finish_err:#}");
                }
                Err(e)
            }
        }
    }

    fn train(&self, tracker: &mut dyn ExperimentTracker) -> Result<TrainingSummary> {
        let cfg = &self.config;

        // ── Step 2: Resolve dataset artifact ─────────────────────────────────
        let reference: ArtifactRef = DATASET_REF.parse()?;
        let dataset_dir = tracker.use_artifact(&reference, ArtifactType::Dataset)?;
        tracing::info!("Dataset '{}' available at '{}'", reference, dataset_dir.display());

        // ── Step 3: Load the splits ──────────────────────────────────────────
        let train = MnistDataset::load(&dataset_dir, Split::Train)?;
        let test  = MnistDataset::load(&dataset_dir, Split::Test)?;
        tracing::info!(
            "Loaded {} training and {} test images",
            train.sample_count(),
            test.sample_count()
        );

        // ── Step 4: Checkpoint directory ─────────────────────────────────────
        let ckpt_manager = CheckpointManager::new(cfg.checkpoint_dir.clone())?;

        // ── Step 5: Run training loop (Layer 5) ──────────────────────────────
        let summary = run_training(cfg, train, test, ckpt_manager, tracker)?;

        if let (Some(epoch), Some(accuracy)) = (summary.best_epoch, summary.best_accuracy) {
            println!("Best test accuracy {:.2}% at epoch {}", 100.0 * accuracy, epoch);
        }
        Ok(summary)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_cli_defaults() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.batch_size, 64);
        assert_eq!(cfg.test_batch_size, 1000);
        assert_eq!(cfg.epochs, 5);
        assert_eq!(cfg.lr, 0.01);
        assert_eq!(cfg.momentum, 0.5);
        assert_eq!(cfg.seed, 1);
        assert_eq!(cfg.log_interval, 10);
        assert!(!cfg.no_cuda);
    }

    #[test]
    fn test_missing_dataset_artifact_fails_the_run() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            tracking_dir:   tmp.path().join("wandb").to_string_lossy().into_owned(),
            checkpoint_dir: tmp.path().join("checkpoints").to_string_lossy().into_owned(),
            ..TrainConfig::default()
        };

        assert!(TrainUseCase::new(cfg.clone()).execute().is_err());

        // The run record is closed as failed
        let runs = tmp.path().join("wandb").join(&cfg.entity).join(&cfg.project).join("runs");
        let run  = std::fs::read_dir(runs).unwrap().next().unwrap().unwrap().path();
        let record = std::fs::read_to_string(run.join("run.json")).unwrap();
        assert!(record.contains("\"failed\""));
    }
}
