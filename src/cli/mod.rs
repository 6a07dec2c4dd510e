// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `prepare`  — download MNIST, publish the dataset artifact
//   2. `train`    — train the CNN and publish the best model
//   3. `evaluate` — score the saved checkpoint
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, PrepareArgs, TrainArgs};

/// The main CLI struct. clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "mnist-tracker",
    version,
    about = "Prepare MNIST, train a small CNN and track runs and artifacts."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Prepare(args)  => run_prepare(args),
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    use crate::application::prepare_use_case::PrepareUseCase;

    tracing::info!("Preparing MNIST in: {}", args.dataset_dir);
    PrepareUseCase::new(args.into()).execute()?;
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training: {} epochs, batch size {}", args.epochs, args.batch_size);
    let summary = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Training complete. {} model artifact version(s) published.",
        summary.published.len()
    );
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    tracing::info!("Evaluating checkpoint in: {}", args.checkpoint_dir);
    EvaluateUseCase::new(args.into()).execute()?;
    Ok(())
}
