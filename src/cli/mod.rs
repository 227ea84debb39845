// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Commands:
//   1. `train`    - trains the CNN and saves a model version
//   2. `predict`  - classifies one image file
//   3. `evaluate` - report + confusion matrix for a version
//   4. `fetch`    - resolves the serving artifacts
//   5. `serve`    - starts the HTTP service
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, FetchArgs, PredictArgs, ServeArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "lung-cnn",
    version,
    about = "Train and serve a CNN that classifies lung histopathology images."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Predict(args)  => run_predict(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Fetch(args)    => run_fetch(args),
            Commands::Serve(args)    => run_serve(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on images in: {}", args.dataset.lung_path.display());

    let summary = TrainUseCase::new(args.into()).execute()?;

    println!(
        "Training complete ({}, {} epoch(s), val_acc={}). Model saved to {}",
        summary.outcome.stop_reason,
        summary.outcome.epochs_run,
        summary
            .outcome
            .final_val_accuracy
            .map(|a| format!("{:.1}%", a * 100.0))
            .unwrap_or_else(|| "n/a".to_string()),
        summary.paths.model.display(),
    );
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let report = PredictUseCase::new(args.into()).execute()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let summary = EvaluateUseCase::new(args.into()).execute()?;
    println!(
        "Accuracy {:.2}% on {} images. Saved {} and {}",
        summary.matrix.accuracy() * 100.0,
        summary.matrix.total(),
        summary.report_path.display(),
        summary.matrix_path.display(),
    );
    Ok(())
}

fn run_fetch(args: FetchArgs) -> Result<()> {
    use crate::application::fetch_use_case::FetchUseCase;

    let paths = FetchUseCase::new(args.acquire.into()).execute()?;
    println!("model:   {}", paths.model.display());
    println!("classes: {}", paths.classes.display());
    Ok(())
}

fn run_serve(args: ServeArgs) -> Result<()> {
    use crate::application::serve_use_case::ServeUseCase;

    ServeUseCase::new(args.into()).execute()
}
