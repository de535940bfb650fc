//! Layout Analysis Example
//!
//! Segments archive pages, extracts content regions and classifies them.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example analyze -- [OPTIONS] --config <CONFIG> <IMAGES>...
//! ```
//!
//! # Arguments
//!
//! * `-c, --config` - Experiment configuration (TOML or JSON) naming both models
//! * `-o, --output-dir` - Directory to save JSON results and visualizations
//! * `--vis` - Save a rendering of each page (needs the `visualization` feature)
//! * `--font-path` - Font for region labels; a system font is tried otherwise
//! * `<IMAGES>...` - Page scans to analyze
//!
//! # Example
//!
//! ```bash
//! cargo run --features visualization --example analyze -- \
//!     -c experiment.toml -o output/ --vis \
//!     page_001.jpg page_002.jpg
//! ```

use archlayout::prelude::*;
use clap::Parser;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};

/// Command-line arguments for the layout analysis example
#[derive(Parser)]
#[command(name = "analyze")]
#[command(about = "Layout Analysis Example - finds and classifies regions of archive pages")]
struct Args {
    /// Experiment configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Paths to input page images
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Directory to save output results
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Enable visualization output
    #[arg(long)]
    vis: bool,

    /// Font used for region labels
    #[arg(long)]
    font_path: Option<PathBuf>,

    /// Pages processed per model call
    #[arg(long, default_value_t = 4)]
    batch_size: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    archlayout::core::init_tracing();
    let args = Args::parse();

    let config = ExperimentConfig::load(&args.config)?;
    info!(
        "Loading models: {} / {}",
        config.model.segmentation_path.display(),
        config.model.classifier_path.display()
    );
    let analyzer = LayoutAnalyzer::from_config(&config)?;

    let existing: Vec<PathBuf> = args
        .images
        .iter()
        .filter(|p| p.is_file())
        .cloned()
        .collect();
    if existing.len() < args.images.len() {
        warn!(
            "Skipping {} missing image(s)",
            args.images.len() - existing.len()
        );
    }
    if existing.is_empty() {
        error!("No valid image files found");
        return Err("No valid image files found".into());
    }

    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir)?;
    }

    #[cfg(feature = "visualization")]
    let vis_config = match &args.font_path {
        Some(path) => archlayout::utils::visualization::VisualizationConfig::with_font_path(path)?,
        None => archlayout::utils::visualization::VisualizationConfig::with_system_font(),
    };
    #[cfg(not(feature = "visualization"))]
    if args.vis || args.font_path.is_some() {
        warn!("Visualization requested but the visualization feature is not enabled");
    }

    let start = Instant::now();
    let mut total_regions = 0;
    for chunk in existing.chunks(args.batch_size.max(1)) {
        let pages = archlayout::utils::load_images_batch(chunk)?;
        let analyses = analyzer.analyze(&pages)?;

        for ((path, page), analysis) in chunk.iter().zip(&pages).zip(&analyses) {
            total_regions += analysis.regions.len();
            info!(
                "{}: {} regions, {:.1}% content",
                path.display(),
                analysis.regions.len(),
                analysis.coverage() * 100.0
            );
            for region in &analysis.regions {
                info!(
                    "  {:<6} ({}, {}) {}x{} score {:.3}",
                    region.category.name(),
                    region.rect.x,
                    region.rect.y,
                    region.rect.w,
                    region.rect.h,
                    region.score
                );
            }

            let Some(dir) = &args.output_dir else {
                continue;
            };
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("page");
            let result = json!({
                "image": path,
                "width": analysis.width,
                "height": analysis.height,
                "regions": analysis.regions,
            });
            fs::write(
                dir.join(format!("{stem}.json")),
                serde_json::to_string_pretty(&result)?,
            )?;

            #[cfg(feature = "visualization")]
            if args.vis {
                let rendered = archlayout::utils::visualization::render_analysis(
                    page,
                    analysis,
                    None,
                    &vis_config,
                );
                let out = dir.join(format!("{stem}_layout.png"));
                rendered.save(&out)?;
                info!("Saved visualization to {}", out.display());
            }
            #[cfg(not(feature = "visualization"))]
            let _ = page;
        }
    }

    info!(
        "Analyzed {} page(s), {} region(s) in {:.2?}",
        existing.len(),
        total_regions,
        start.elapsed()
    );
    Ok(())
}
