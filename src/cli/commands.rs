// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `prepare`, `train` and
// `evaluate`, and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for bad values
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{
    evaluate_use_case::EvaluateConfig,
    prepare_use_case::PrepareConfig,
    train_use_case::TrainConfig,
    DATASET_URL, DEFAULT_ENTITY, DEFAULT_PROJECT,
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download MNIST and publish it as the `mnist` dataset artifact
    Prepare(PrepareArgs),

    /// Train the CNN on the latest `mnist` artifact
    Train(TrainArgs),

    /// Score the best checkpoint on the MNIST test split
    Evaluate(EvaluateArgs),
}

/// Where runs and artifacts are stored. Shared by `prepare` and `train`.
#[derive(Args, Debug, Clone)]
pub struct TrackingArgs {
    /// Root directory of the local experiment tracker
    #[arg(long, default_value = "wandb")]
    pub tracking_dir: String,

    #[arg(long, default_value = DEFAULT_ENTITY)]
    pub entity: String,

    #[arg(long, default_value = DEFAULT_PROJECT)]
    pub project: String,
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Directory the archive is downloaded to and extracted in
    #[arg(long, default_value = "dataset")]
    pub dataset_dir: String,

    /// Download and extract again even if the IDX files are present
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub tracking: TrackingArgs,
}

impl From<PrepareArgs> for PrepareConfig {
    fn from(a: PrepareArgs) -> Self {
        PrepareConfig {
            dataset_dir:  a.dataset_dir,
            tracking_dir: a.tracking.tracking_dir,
            entity:       a.tracking.entity,
            project:      a.tracking.project,
            url:          DATASET_URL.to_string(),
            force:        a.force,
        }
    }
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Input batch size for training
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Input batch size for testing
    #[arg(long, default_value_t = 1000)]
    pub test_batch_size: usize,

    /// Number of epochs to train
    #[arg(long, default_value_t = 5)]
    pub epochs: usize,

    /// Learning rate
    #[arg(long, default_value_t = 0.01)]
    pub lr: f64,

    /// SGD momentum
    #[arg(long, default_value_t = 0.5)]
    pub momentum: f64,

    /// Disable GPU training
    #[arg(long)]
    pub no_cuda: bool,

    /// Random seed
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// How many batches to wait before logging training status (0 = never)
    #[arg(long, default_value_t = 10)]
    pub log_interval: usize,

    /// Directory holding model.ckpt and metrics.csv
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Continue from the checkpoint in --checkpoint-dir
    #[arg(long)]
    pub resume: bool,

    #[command(flatten)]
    pub tracking: TrackingArgs,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            batch_size:      a.batch_size,
            test_batch_size: a.test_batch_size,
            epochs:          a.epochs,
            lr:              a.lr,
            momentum:        a.momentum,
            no_cuda:         a.no_cuda,
            seed:            a.seed,
            log_interval:    a.log_interval,
            checkpoint_dir:  a.checkpoint_dir,
            tracking_dir:    a.tracking.tracking_dir,
            entity:          a.tracking.entity,
            project:         a.tracking.project,
            resume:          a.resume,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory where training saved model.ckpt
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Extracted MNIST directory (as written by `prepare`)
    #[arg(long, default_value = "dataset")]
    pub dataset_dir: String,

    #[arg(long, default_value_t = 1000)]
    pub test_batch_size: usize,

    /// Disable GPU evaluation
    #[arg(long)]
    pub no_cuda: bool,

    /// Seed for the test-set batch order
    #[arg(long, default_value_t = 1)]
    pub seed: u64,
}

impl From<EvaluateArgs> for EvaluateConfig {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateConfig {
            checkpoint_dir:  a.checkpoint_dir,
            dataset_dir:     a.dataset_dir,
            test_batch_size: a.test_batch_size,
            no_cuda:         a.no_cuda,
            seed:            a.seed,
        }
    }
}
