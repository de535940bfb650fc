//! The core module of the layout analysis pipeline.
//!
//! This module contains the fundamental pieces the rest of the crate is built on:
//! - Configuration management
//! - Constants used throughout the pipeline
//! - Error handling
//! - ONNX Runtime integration
//! - Tensor aliases
//! - The model traits that separate the pipeline from concrete networks

pub mod config;
pub mod constants;
pub mod errors;
pub mod inference;
pub mod tensor;
pub mod traits;

pub use config::{ConfigError, ConfigValidator, ExperimentConfig};
pub use constants::*;
pub use errors::{LayoutError, LayoutResult, ProcessingStage};
pub use inference::OrtInfer;
pub use tensor::{Tensor2D, Tensor4D, softmax_rows};
pub use traits::{MaskPredictor, PatchClassifier};

/// Initializes the tracing subscriber for logging.
///
/// This function sets up the tracing subscriber with environment filter and formatting layer.
/// It's typically called at the start of an application to enable logging.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}
