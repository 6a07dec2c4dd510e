// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores the saved best checkpoint on the MNIST test split:
//
//   Step 1: Load checkpoint from disk              (Layer 6 - infra)
//   Step 2: Load the test split                    (Layer 4 - data)
//   Step 3: Rebuild the model, restore weights     (Layer 5 - ml)
//   Step 4: Evaluate on the inference backend      (Layer 5 - ml)

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, NdArray},
    prelude::*,
};
use std::{path::PathBuf, sync::Arc};

use crate::data::{dataset::MnistDataset, idx::Split};
use crate::infra::checkpoint::{Checkpoint, CheckpointManager};
use crate::ml::{
    device::{gpu_available, select_device},
    model::NetConfig,
    trainer::{evaluate, Evaluation},
};
#[cfg(feature = "gpu")]
use crate::ml::device::ComputeDevice;

#[derive(Debug, Clone)]
pub struct EvaluateConfig {
    pub checkpoint_dir:  String,
    pub dataset_dir:     String,
    pub test_batch_size: usize,
    pub no_cuda:         bool,
    pub seed:            u64,
}

impl Default for EvaluateConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir:  "checkpoints".to_string(),
            dataset_dir:     "dataset".to_string(),
            test_batch_size: 1000,
            no_cuda:         false,
            seed:            1,
        }
    }
}

pub struct EvaluateUseCase {
    config: EvaluateConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvaluateConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<Evaluation> {
        let cfg = &self.config;

        // ── Step 1: Checkpoint ───────────────────────────────────────────────
        let ckpt = CheckpointManager::new(cfg.checkpoint_dir.clone())?.load()?;
        tracing::info!(
            "Loaded checkpoint from epoch {} (recorded accuracy {:.4})",
            ckpt.epoch,
            ckpt.accuracy
        );

        // ── Step 2: Test split ───────────────────────────────────────────────
        let test = Arc::new(MnistDataset::load(&PathBuf::from(&cfg.dataset_dir), Split::Test)?);

        // ── Steps 3-4 ────────────────────────────────────────────────────────
        let eval = match select_device(cfg.no_cuda, gpu_available()) {
            #[cfg(feature = "gpu")]
            ComputeDevice::Gpu => {
                let device = burn::backend::wgpu::WgpuDevice::default();
                self.score::<burn::backend::Wgpu>(&ckpt, test, &device)?
            }
            _ => self.score::<NdArray>(&ckpt, test, &NdArrayDevice::Cpu)?,
        };

        println!(
            "Test set: Average loss: {:.4}, Accuracy: {}/{} ({:.0}%)",
            eval.test_loss,
            eval.correct,
            eval.total,
            100.0 * eval.accuracy,
        );
        Ok(eval)
    }

    fn score<B: Backend>(
        &self,
        ckpt:   &Checkpoint,
        test:   Arc<MnistDataset>,
        device: &B::Device,
    ) -> Result<Evaluation> {
        let model = ckpt.restore_model(NetConfig::new().init::<B>(device), device)?;
        evaluate(&model, test, self.config.test_batch_size, self.config.seed, device)
    }
}
