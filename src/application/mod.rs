// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one job of the pipeline:
//
//   prepare_use_case.rs  — download MNIST, publish it as the
//                          `mnist` dataset artifact
//   train_use_case.rs    — resolve the dataset artifact, train,
//                          checkpoint and publish the best model
//   evaluate_use_case.rs — score the saved checkpoint on the
//                          test split
//
// Rules for this layer:
//   - No ML math or model code here
//   - No CLI parsing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Download + dataset artifact publication
pub mod prepare_use_case;

// The training workflow
pub mod train_use_case;

// Offline evaluation of the best checkpoint
pub mod evaluate_use_case;

// ─── Fixed Identities ─────────────────────────────────────────────────────────
pub const DATASET_URL: &str =
    "https://activeeon-public.s3.eu-west-2.amazonaws.com/datasets/MNIST.new.tar.gz";

pub const DATASET_ARTIFACT: &str = "mnist";

/// What the trainer consumes: always the newest prepared dataset.
pub const DATASET_REF: &str = "gigl/mnist_wandb/mnist:latest";

pub const MODEL_ARTIFACT: &str = "fully_connected_nn";

pub const BEST_ALIAS: &str = "best";

pub const MODEL_AUTHOR: &str = "Akshai";

pub const MODEL_TIMESTAMP: &str = "2023-10-15";

pub const DEFAULT_ENTITY: &str = "gigl";

pub const DEFAULT_PROJECT: &str = "mnist_wandb";
