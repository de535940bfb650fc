//! # archlayout
//!
//! Layout analysis for scanned pages of historic archives using ONNX models.
//! A segmentation network marks the content of a page, connected components of
//! that mask become regions, and a classifier assigns every region a category
//! (text, title, table, image or stamp).
//!
//! ## Features
//!
//! - Batched page segmentation with a pooled ONNX Runtime session
//! - Region extraction and per-region projection profiles
//! - Chunked region classification
//! - Evaluation against annotated pages: losses, thresholded IoU, region
//!   accuracy and VOC average precision
//! - Optional rendering of results (`visualization` feature)
//!
//! ## Modules
//!
//! * [`core`] - Configuration, errors, tensors, ONNX Runtime integration and model traits
//! * [`domain`] - Region categories, rectangles and analysis results
//! * [`processors`] - Mask, region, projection and patch processing
//! * [`metrics`] - Losses, IoU, accuracy and average precision
//! * [`dataset`] - Annotated pages and dataset splits
//! * [`models`] - The segmentation and classification networks
//! * [`pipeline`] - The analyzer and the evaluator
//! * [`utils`] - Image loading and visualization
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use archlayout::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExperimentConfig::load("experiment.toml")?;
//! let analyzer = LayoutAnalyzer::from_config(&config)?;
//!
//! let page = load_gray_image(Path::new("page.jpg"))?;
//! for analysis in analyzer.analyze(&[page])? {
//!     for region in &analysis.regions {
//!         println!("{} {:?} {:.2}", region.category, region.rect, region.score);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Evaluation
//!
//! ```rust,no_run
//! use archlayout::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExperimentConfig::load("experiment.toml")?;
//! let analyzer = LayoutAnalyzer::from_config(&config)?;
//! let (_, val, _) = LayoutDataset::from_config(&config)?;
//!
//! let mut evaluator = Evaluator::new(
//!     &analyzer,
//!     config.regions.projection_len,
//!     config.regions.match_iou,
//! );
//! evaluator.evaluate_dataset(&val, config.val.batch)?;
//! println!("{}", serde_json::to_string_pretty(&evaluator.finish())?);
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod core;
pub mod dataset;
pub mod domain;
pub mod metrics;
pub mod models;

pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use archlayout::prelude::*;
/// ```
///
/// Included items cover analysis and evaluation with the ONNX models. For
/// lower-level pieces (processors, metrics, traits), import from the
/// respective modules.
pub mod prelude {
    // Pipeline
    pub use crate::pipeline::{EvaluationReport, Evaluator, LayoutAnalyzer, LayoutAnalyzerBuilder};

    // Models
    pub use crate::models::{
        RegionClassifierModel, RegionClassifierModelBuilder, SegmentationModel,
        SegmentationModelBuilder,
    };

    // Results
    pub use crate::domain::{LayoutAnalysis, LayoutRegion, Rect, RegionCategory};

    // Data
    pub use crate::dataset::{AnnotatedPage, LayoutDataset};

    // Configuration and errors
    pub use crate::core::{ExperimentConfig, LayoutError, LayoutResult};

    // Image loading
    pub use crate::utils::{load_gray_image, load_image};
}
