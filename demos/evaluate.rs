//! Evaluation Example
//!
//! Scores the models of an experiment against annotated pages and prints the
//! report as JSON.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example evaluate -- --config <CONFIG> [--split val|test|train] [--output report.json]
//! ```

use archlayout::prelude::*;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Split {
    Train,
    Val,
    Test,
}

/// Command-line arguments for the evaluation example
#[derive(Parser)]
#[command(name = "evaluate")]
#[command(about = "Evaluation Example - scores layout models against annotated pages")]
struct Args {
    /// Experiment configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Dataset split to evaluate
    #[arg(long, value_enum, default_value = "val")]
    split: Split,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    archlayout::core::init_tracing();
    let args = Args::parse();

    let config = ExperimentConfig::load(&args.config)?;
    let analyzer = LayoutAnalyzer::from_config(&config)?;
    let (train, val, test) = LayoutDataset::from_config(&config)?;

    let (dataset, batch) = match args.split {
        Split::Train => (train, config.train.batch),
        Split::Val => (val, config.val.batch),
        Split::Test => (test, config.test.batch),
    };
    if dataset.is_empty() {
        warn!("The {:?} split has no pages", args.split);
    }

    let start = Instant::now();
    let mut evaluator = Evaluator::new(
        &analyzer,
        config.regions.projection_len,
        config.regions.match_iou,
    );
    evaluator.evaluate_dataset(&dataset, batch)?;
    let report = evaluator.finish();
    info!(
        "Evaluated {} page(s) in {:.2?}: loss {:.4}, AP {:.4}, IOU {:.4}",
        dataset.len(),
        start.elapsed(),
        report.loss,
        report.metrics.get("AP").copied().unwrap_or_default(),
        report.metrics.get("IOU").copied().unwrap_or_default()
    );

    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)?;
            info!("Saved report to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
