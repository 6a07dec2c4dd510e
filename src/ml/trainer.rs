// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + test loop using Burn's DataLoader and SGD with momentum.
//
// Per epoch:
//   1. one pass over the training set (autodiff backend)
//   2. one pass over the test set with model.valid()
//      (inner backend, dropout off, no gradients)
//   3. log examples, test accuracy/loss and parameter norms
//   4. on strict accuracy improvement: overwrite the checkpoint
//      and publish it as the `best` model artifact
//
// Key Burn insight:
//   - model.valid() returns Net<B::InnerBackend>
//   - argmax(1) returns [batch,1] so we flatten before .equal()
//
// Reference: Burn Book §5, LeCun et al. (1998) Gradient-Based Learning

use anyhow::{anyhow, ensure, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{momentum::MomentumConfig, GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::{path::PathBuf, sync::Arc};

use crate::application::{
    train_use_case::TrainConfig,
    BEST_ALIAS, MODEL_ARTIFACT, MODEL_AUTHOR, MODEL_TIMESTAMP,
};
use crate::data::{
    batcher::{denormalize_pixel, MnistBatcher},
    dataset::{MnistDataset, HEIGHT, WIDTH},
};
use crate::domain::{
    artifact::{Artifact, ArtifactType, ArtifactVersion},
    media::ExampleImage,
    traits::{ExperimentTracker, LogEntry},
};
use crate::infra::{
    checkpoint::{Checkpoint, CheckpointManager, CHECKPOINT_FILE},
    metrics::{BestAccuracy, EpochMetrics, MetricsLogger},
};
use crate::ml::{
    device::{gpu_available, select_device},
    model::{nll_loss, Net, NetConfig},
};
#[cfg(feature = "gpu")]
use crate::ml::device::ComputeDevice;

type CpuBackend = Autodiff<NdArray>;

#[cfg(feature = "gpu")]
type GpuBackend = Autodiff<burn::backend::Wgpu>;

/// Test-set results of one model state.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub test_loss: f64,
    pub correct:   usize,
    pub total:     usize,
    pub accuracy:  f64,
    /// First image of every test batch, captioned with its prediction
    pub examples:  Vec<ExampleImage>,
}

#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub epochs:        Vec<EpochMetrics>,
    pub best_epoch:    Option<usize>,
    pub best_accuracy: Option<f64>,
    pub published:     Vec<ArtifactVersion>,
}

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: MnistDataset,
    test_dataset:  MnistDataset,
    ckpt_manager:  CheckpointManager,
    tracker:       &mut dyn ExperimentTracker,
) -> Result<TrainingSummary> {
    let device = select_device(cfg.no_cuda, gpu_available());
    let train  = Arc::new(train_dataset);
    let test   = Arc::new(test_dataset);

    match device {
        #[cfg(feature = "gpu")]
        ComputeDevice::Gpu => {
            let wgpu = burn::backend::wgpu::WgpuDevice::default();
            tracing::info!("Using WGPU device: {:?}", wgpu);
            train_loop::<GpuBackend>(cfg, train, test, &ckpt_manager, tracker, wgpu)
        }
        _ => {
            tracing::info!("Using CPU device (NdArray)");
            train_loop::<CpuBackend>(cfg, train, test, &ckpt_manager, tracker, NdArrayDevice::Cpu)
        }
    }
}

/// Whether batch `batch_idx` prints a progress line. An interval of 0 never logs.
pub fn should_log(batch_idx: usize, log_interval: usize) -> bool {
    log_interval != 0 && batch_idx % log_interval == 0
}

fn train_loop<B: AutodiffBackend>(
    cfg:          &TrainConfig,
    train:        Arc<MnistDataset>,
    test:         Arc<MnistDataset>,
    ckpt_manager: &CheckpointManager,
    tracker:      &mut dyn ExperimentTracker,
    device:       B::Device,
) -> Result<TrainingSummary> {
    ensure!(train.sample_count() > 0, "Training set is empty");

    B::seed(cfg.seed);

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: Net<B> = NetConfig::new().init(&device);
    tracing::info!("Model ready: {} parameters", model.num_params());

    // ── SGD with momentum ─────────────────────────────────────────────────────
    // v = μ*v + g
    // θ = θ - lr * v
    let momentum = MomentumConfig::new()
        .with_momentum(cfg.momentum)
        .with_dampening(0.0);
    let mut optim = SgdConfig::new()
        .with_momentum(Some(momentum))
        .init::<B, Net<B>>();

    // ── Resume from the best checkpoint ───────────────────────────────────────
    let mut best        = BestAccuracy::new();
    let mut start_epoch = 1;

    if cfg.resume && ckpt_manager.exists() {
        let ckpt = ckpt_manager.load()?;
        model       = ckpt.restore_model(model, &device)?;
        optim       = ckpt.restore_optimizer(optim, &device)?;
        best        = BestAccuracy::resume(ckpt.epoch, ckpt.accuracy);
        start_epoch = ckpt.epoch + 1;
        tracing::info!(
            "Resumed from epoch {} (accuracy {:.4}) in '{}'",
            ckpt.epoch,
            ckpt.accuracy,
            ckpt_manager.path().display()
        );
    } else if cfg.resume {
        tracing::warn!("No checkpoint at '{}', starting fresh", ckpt_manager.path().display());
    }

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_batcher = MnistBatcher::<B>::new(device.clone());
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(1)
        .build(train.clone());

    let metrics_logger = MetricsLogger::new(cfg.checkpoint_dir.clone())?;
    let total_samples  = train.sample_count();
    let total_batches  = total_samples.div_ceil(cfg.batch_size.max(1));

    let mut epochs    = Vec::new();
    let mut published = Vec::new();

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in start_epoch..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for (batch_idx, batch) in train_loader.iter().enumerate() {
            let (loss, _) = model.forward_loss(batch);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            train_loss_sum += loss_val;
            train_batches  += 1;

            // Backward pass + SGD update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);

            if should_log(batch_idx, cfg.log_interval) {
                println!(
                    "Train Epoch: {} [{}/{} ({:.0}%)]\tLoss: {:.6}",
                    epoch,
                    batch_idx * cfg.batch_size,
                    total_samples,
                    100.0 * batch_idx as f64 / total_batches as f64,
                    loss_val,
                );
            }
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Test phase ────────────────────────────────────────────────────────
        let model_valid = model.valid();
        let eval = evaluate(&model_valid, test.clone(), cfg.test_batch_size, cfg.seed, &device)?;

        println!(
            "Test set: Average loss: {:.4}, Accuracy: {}/{} ({:.0}%)",
            eval.test_loss,
            eval.correct,
            eval.total,
            100.0 * eval.accuracy,
        );

        let mut entry = LogEntry::new()
            .images("Examples", eval.examples.clone())
            .scalar("Test Accuracy", 100.0 * eval.accuracy)
            .scalar("Test Loss", eval.test_loss);
        for (name, norm) in model_valid.parameter_norms() {
            entry = entry.scalar(format!("parameters/{name}"), norm);
        }
        tracker.log(entry)?;

        let metrics = EpochMetrics::new(epoch, avg_train_loss, eval.test_loss, eval.accuracy);
        metrics_logger.log(&metrics)?;
        epochs.push(metrics);

        // ── Best checkpoint + model artifact ──────────────────────────────────
        if best.observe(epoch, eval.accuracy) {
            let ckpt = Checkpoint::capture(epoch, eval.test_loss, eval.accuracy, &model, &optim)?;
            let path = ckpt_manager.save(&ckpt)?;
            tracing::info!("New best accuracy {:.4} at epoch {}", eval.accuracy, epoch);

            let artifact = model_artifact(path, eval.test_loss, tracker.run_id());
            let version  = tracker.log_artifact(&artifact, &[BEST_ALIAS])?;
            tracing::info!("Published model artifact {}", version.qualified_name());
            published.push(version);
        }
    }

    tracing::info!("Training complete! Epoch metrics in '{}'", metrics_logger.csv_path().display());
    Ok(TrainingSummary {
        epochs,
        best_epoch: best.epoch(),
        best_accuracy: best.accuracy(),
        published,
    })
}

fn model_artifact(checkpoint: PathBuf, test_loss: f64, run_id: &str) -> Artifact {
    let mut artifact = Artifact::new(MODEL_ARTIFACT, ArtifactType::Model);
    artifact.add_file(checkpoint, CHECKPOINT_FILE);
    artifact.set_metadata("author", MODEL_AUTHOR);
    artifact.set_metadata("timestamp", MODEL_TIMESTAMP);
    artifact.set_metadata("test_loss", test_loss);
    artifact.set_metadata("run_id", run_id);
    artifact
}

/// Run `model` over the whole test set.
///
/// The loader is rebuilt on every call from `seed`, so the batch order
/// (and therefore the collected examples) is the same each time.
pub fn evaluate<B: Backend>(
    model:      &Net<B>,
    test:       Arc<MnistDataset>,
    batch_size: usize,
    seed:       u64,
    device:     &B::Device,
) -> Result<Evaluation> {
    ensure!(test.sample_count() > 0, "Test set is empty");

    let loader = DataLoaderBuilder::new(MnistBatcher::<B>::new(device.clone()))
        .batch_size(batch_size)
        .shuffle(seed)
        .build(test);

    let mut loss_sum = 0.0f64;
    let mut correct  = 0usize;
    let mut total    = 0usize;
    let mut examples = Vec::new();

    for batch in loader.iter() {
        let output     = model.forward(batch.images.clone());
        let batch_size = batch.targets.dims()[0];

        // Summed over the batch so the final mean is per image
        let batch_loss: f64 = nll_loss(output.clone(), batch.targets.clone())
            .into_scalar()
            .elem::<f64>();
        loss_sum += batch_loss * batch_size as f64;

        // argmax(1) returns shape [batch, 1]; flatten to [batch]
        let predicted = output.argmax(1).flatten::<1>(0, 1);
        total += batch_size;

        let batch_correct: i64 = predicted
            .clone()
            .equal(batch.targets.clone())
            .int().sum().into_scalar().elem::<i64>();
        correct += batch_correct as usize;

        // ── Example image: first of the batch ─────────────────────────────────
        let pixels: Vec<u8> = batch.images
            .slice([0..1])
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read example image: {e:?}"))?
            .into_iter()
            .map(denormalize_pixel)
            .collect();
        let pred:  i64 = predicted.slice([0..1]).into_scalar().elem::<i64>();
        let truth: i64 = batch.targets.slice([0..1]).into_scalar().elem::<i64>();

        examples.push(ExampleImage::new(
            WIDTH as u32,
            HEIGHT as u32,
            pixels,
            ExampleImage::prediction_caption(pred, truth),
        ));
    }

    let test_loss = loss_sum / total as f64;
    let accuracy  = correct as f64 / total as f64;

    Ok(Evaluation { test_loss, correct, total, accuracy, examples })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::synthetic;
    use crate::infra::tracking::{read_manifest, LocalTracker};
    use std::fs;

    type TestBackend = NdArray;

    fn dataset(count: usize) -> MnistDataset {
        let (pixels, labels) = synthetic(count);
        MnistDataset::from_raw(pixels, labels).unwrap()
    }

    fn config(dir: &std::path::Path, epochs: usize) -> TrainConfig {
        TrainConfig {
            batch_size:      16,
            test_batch_size: 8,
            epochs,
            lr:              0.05,
            log_interval:    0,
            checkpoint_dir:  dir.join("checkpoints").to_string_lossy().into_owned(),
            tracking_dir:    dir.join("wandb").to_string_lossy().into_owned(),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_should_log() {
        assert!(should_log(0, 10));
        assert!(!should_log(5, 10));
        assert!(should_log(20, 10));
        assert!(!should_log(0, 0));
        assert!(!should_log(7, 0));
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let device = NdArrayDevice::Cpu;
        let model: Net<TestBackend> = NetConfig::new().init(&device);
        let test = Arc::new(dataset(30));

        let first  = evaluate(&model, test.clone(), 8, 1, &device).unwrap();
        let second = evaluate(&model, test, 8, 1, &device).unwrap();

        assert_eq!(first.test_loss, second.test_loss);
        assert_eq!(first.correct, second.correct);
        assert_eq!(first.total, 30);
        assert_eq!(first.examples, second.examples);
        // One example per batch: ceil(30 / 8)
        assert_eq!(first.examples.len(), 4);
        assert!(first.examples[0].caption.starts_with("Pred: "));
    }

    #[test]
    fn test_evaluate_rejects_empty_test_set() {
        let device = NdArrayDevice::Cpu;
        let model: Net<TestBackend> = NetConfig::new().init(&device);
        let empty = Arc::new(MnistDataset::from_raw(Vec::new(), Vec::new()).unwrap());
        assert!(evaluate(&model, empty, 8, 1, &device).is_err());
    }

    #[test]
    fn test_training_publishes_only_on_improvement() {
        let tmp     = tempfile::tempdir().unwrap();
        let cfg     = config(tmp.path(), 3);
        let mut tracker = LocalTracker::init(&cfg.tracking_dir, "gigl", "mnist_wandb", "training").unwrap();
        let manager = CheckpointManager::new(cfg.checkpoint_dir.clone()).unwrap();

        let summary = train_loop::<CpuBackend>(
            &cfg,
            Arc::new(dataset(64)),
            Arc::new(dataset(20)),
            &manager,
            &mut tracker,
            NdArrayDevice::Cpu,
        )
        .unwrap();

        assert_eq!(summary.epochs.len(), 3);

        // Count strict improvements from the recorded accuracies
        let mut best = f64::NEG_INFINITY;
        let mut improvements = 0;
        for m in &summary.epochs {
            if m.accuracy > best {
                best = m.accuracy;
                improvements += 1;
            }
        }
        assert_eq!(summary.published.len(), improvements);
        assert_eq!(summary.best_accuracy, Some(best));
        // Versions count from v0
        assert_eq!(
            summary.published.last().map(|v| v.version),
            Some(improvements as u32 - 1)
        );

        // Exactly one checkpoint file, holding the best epoch
        let ckpts: Vec<_> = fs::read_dir(&cfg.checkpoint_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "ckpt"))
            .collect();
        assert_eq!(ckpts.len(), 1);

        let ckpt = manager.load().unwrap();
        assert_eq!(Some(ckpt.epoch), summary.best_epoch);
        assert_eq!(ckpt.accuracy, best);

        // The newest model version records who produced it
        let manifest = read_manifest(
            std::path::Path::new(&cfg.tracking_dir),
            "gigl",
            "mnist_wandb",
            MODEL_ARTIFACT,
            improvements as u32 - 1,
        )
        .unwrap();
        assert_eq!(manifest.metadata["author"], MODEL_AUTHOR);
        assert_eq!(manifest.metadata["timestamp"], MODEL_TIMESTAMP);
        assert_eq!(manifest.metadata["run_id"], tracker.run_id());
        assert_eq!(manifest.metadata["test_loss"], ckpt.test_loss);

        // Epoch rows land in checkpoints/metrics.csv
        let csv = fs::read_to_string(std::path::Path::new(&cfg.checkpoint_dir).join("metrics.csv")).unwrap();
        assert_eq!(csv.lines().count(), 1 + summary.epochs.len());
    }

    #[test]
    fn test_resume_continues_after_saved_epoch() {
        let tmp     = tempfile::tempdir().unwrap();
        let cfg     = config(tmp.path(), 1);
        let mut tracker = LocalTracker::init(&cfg.tracking_dir, "gigl", "mnist_wandb", "training").unwrap();
        let manager = CheckpointManager::new(cfg.checkpoint_dir.clone()).unwrap();

        train_loop::<CpuBackend>(
            &cfg, Arc::new(dataset(32)), Arc::new(dataset(10)),
            &manager, &mut tracker, NdArrayDevice::Cpu,
        )
        .unwrap();

        let resumed_cfg = TrainConfig { epochs: 2, resume: true, ..cfg };
        let summary = train_loop::<CpuBackend>(
            &resumed_cfg, Arc::new(dataset(32)), Arc::new(dataset(10)),
            &manager, &mut tracker, NdArrayDevice::Cpu,
        )
        .unwrap();

        assert_eq!(summary.epochs.len(), 1);
        assert_eq!(summary.epochs[0].epoch, 2);
    }
}
