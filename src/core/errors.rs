//! Error types for the layout analysis pipeline.
//!
//! This module defines the errors that can occur while loading pages and
//! annotations, running the segmentation and classification models, and
//! post-processing their outputs into layout regions. It also provides
//! helper constructors that attach the right processing stage and context.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Pipeline step a [`LayoutError::Processing`] comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    TensorOperation,
    Normalization,
    Resize,
    /// Mask to region rectangles.
    RegionExtraction,
    /// Logits to masks and scores.
    PostProcessing,
    Generic,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ProcessingStage::TensorOperation => "tensor operation",
            ProcessingStage::Normalization => "normalization",
            ProcessingStage::Resize => "resize",
            ProcessingStage::RegionExtraction => "region extraction",
            ProcessingStage::PostProcessing => "post-processing",
            ProcessingStage::Generic => "processing",
        })
    }
}

/// Message-only error, used as the `source` when there is no underlying error.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SimpleError(String);

impl SimpleError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors produced by the layout analysis pipeline.
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("failed to load image")]
    ImageLoad(#[source] image::ImageError),

    #[error("{kind} failed: {context}")]
    Processing {
        kind: ProcessingStage,
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A model run failed or returned something unusable.
    #[error("model '{model}': {context}")]
    Inference {
        model: String,
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A model file could not be turned into a session.
    #[error("failed to load model {}: {message}", path.display())]
    ModelLoad {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Caller-supplied data is empty, mis-sized or inconsistent.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("configuration: {message}")]
    ConfigError { message: String },

    /// A ground-truth annotation file is malformed.
    #[error("annotation {}: {message}", path.display())]
    Annotation { path: PathBuf, message: String },

    #[error(transparent)]
    Session(#[from] ort::Error),

    #[error("tensor shape mismatch")]
    Tensor(#[from] ndarray::ShapeError),

    #[error("i/o error")]
    Io(#[from] std::io::Error),

    #[error("malformed json")]
    Json(#[from] serde_json::Error),

    #[error("malformed toml")]
    Toml(#[from] toml::de::Error),
}

/// Convenient result alias for layout operations.
pub type LayoutResult<T> = Result<T, LayoutError>;

impl LayoutError {
    fn processing(
        kind: ProcessingStage,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Failure while building, slicing or joining tensors.
    pub fn tensor_operation(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing(ProcessingStage::TensorOperation, context, error)
    }

    /// Failure while turning model output into masks or scores.
    pub fn post_processing(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing(ProcessingStage::PostProcessing, context, error)
    }

    pub fn normalization(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing(ProcessingStage::Normalization, context, error)
    }

    pub fn resize_error(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing(ProcessingStage::Resize, context, error)
    }

    /// Region extraction has no underlying error; `context` is the whole story.
    pub fn region_extraction(context: &str) -> Self {
        Self::processing(
            ProcessingStage::RegionExtraction,
            context,
            SimpleError::new(context),
        )
    }

    /// Creates an error for a failed model run.
    pub fn inference_error(
        model: &str,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model: model.to_string(),
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an error for a model file that could not be loaded.
    ///
    /// The optional `hint` is appended to the message to point at the usual fix.
    pub fn model_load_error(
        path: &Path,
        message: &str,
        hint: Option<&str>,
        error: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        let message = match hint {
            Some(hint) => format!("{message} ({hint})"),
            None => message.to_string(),
        };
        Self::ModelLoad {
            path: path.to_path_buf(),
            message,
            source: error.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates an error for a malformed annotation file.
    pub fn annotation(path: &Path, message: impl Into<String>) -> Self {
        Self::Annotation {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// A value that does not match what `component` expects, e.g. a tensor
    /// shape or batch length.
    pub fn validation_error(component: &str, field: &str, expected: &str, actual: &str) -> Self {
        Self::InvalidInput {
            message: format!("{component}: {field} should be {expected}, got {actual}"),
        }
    }
}

impl From<image::ImageError> for LayoutError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl From<crate::core::config::ConfigError> for LayoutError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}
