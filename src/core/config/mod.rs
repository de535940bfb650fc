//! Configuration types for the layout analysis pipeline.
//!
//! - [`errors`] holds [`ConfigError`] and the [`ConfigValidator`] trait
//! - [`onnx`] holds ONNX Runtime session settings
//! - [`experiment`] holds the file-backed [`ExperimentConfig`]

pub mod errors;
pub mod experiment;
pub mod onnx;

pub use errors::{ConfigError, ConfigValidator};
pub use experiment::{
    DataConfig, ExperimentConfig, ModelConfig, RegionConfig, SplitConfig, TestSplitConfig,
};
pub use onnx::{
    ModelInferenceConfig, OrtExecutionProvider, OrtGraphOptimizationLevel, OrtLogLevel,
    OrtSessionConfig,
};
