//! Page segmentation model.
//!
//! A UNet-style network that maps a grayscale page to one logit per pixel;
//! `sigmoid(logit)` is the probability that the pixel belongs to a content
//! region.

use crate::core::config::ModelInferenceConfig;
use crate::core::constants::{DEFAULT_INPUT_HEIGHT, DEFAULT_INPUT_WIDTH};
use crate::core::errors::{LayoutError, LayoutResult};
use crate::core::inference::OrtInfer;
use crate::core::tensor::Tensor4D;
use crate::core::traits::MaskPredictor;
use crate::processors::gray_to_tensor;
use image::GrayImage;
use std::path::Path;
use tracing::debug;

/// Name of the input tensor of the exported segmentation network.
pub const SEGMENTATION_INPUT_NAME: &str = "input";

/// ONNX-backed segmentation network.
#[derive(Debug)]
pub struct SegmentationModel {
    inference: OrtInfer,
    input_width: u32,
    input_height: u32,
}

impl SegmentationModel {
    pub fn new(inference: OrtInfer, input_width: u32, input_height: u32) -> LayoutResult<Self> {
        if input_width == 0 || input_height == 0 {
            return Err(LayoutError::config_error(format!(
                "segmentation input size must be non-zero, got {}x{}",
                input_width, input_height
            )));
        }
        Ok(Self {
            inference,
            input_width,
            input_height,
        })
    }

    /// Resizes pages to the model input and scales them to `[0, 1]`.
    pub fn preprocess(&self, pages: &[GrayImage]) -> LayoutResult<Tensor4D> {
        gray_to_tensor(pages, self.input_width, self.input_height)
    }

    /// Runs the network on a preprocessed batch.
    pub fn infer(&self, batch: &Tensor4D) -> LayoutResult<Tensor4D> {
        let logits = self.inference.infer_4d(batch)?;
        if logits.shape()[0] != batch.shape()[0] {
            return Err(LayoutError::validation_error(
                self.inference.model_name(),
                "output batch",
                &batch.shape()[0].to_string(),
                &logits.shape()[0].to_string(),
            ));
        }
        debug!(
            "Segmentation logits {:?} for input {:?}",
            logits.shape(),
            batch.shape()
        );
        Ok(logits)
    }

    /// Runs the complete forward pass: preprocess -> infer.
    pub fn forward(&self, pages: &[GrayImage]) -> LayoutResult<Tensor4D> {
        let batch = self.preprocess(pages)?;
        self.infer(&batch)
    }

    pub fn inference(&self) -> &OrtInfer {
        &self.inference
    }
}

impl MaskPredictor for SegmentationModel {
    fn predict_logits(&self, pages: &Tensor4D) -> LayoutResult<Tensor4D> {
        self.infer(pages)
    }

    fn input_size(&self) -> (u32, u32) {
        (self.input_width, self.input_height)
    }

    fn name(&self) -> &str {
        self.inference.model_name()
    }
}

/// Builder for [`SegmentationModel`].
#[derive(Debug, Default)]
pub struct SegmentationModelBuilder {
    input_size: Option<(u32, u32)>,
    session: Option<ModelInferenceConfig>,
}

impl SegmentationModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the network input size.
    pub fn input_size(mut self, width: u32, height: u32) -> Self {
        self.input_size = Some((width, height));
        self
    }

    /// Sets the ONNX Runtime session settings used by [`Self::load`].
    pub fn session_config(mut self, config: ModelInferenceConfig) -> Self {
        self.session = Some(config);
        self
    }

    /// Builds the model around an existing inference engine.
    pub fn build(self, inference: OrtInfer) -> LayoutResult<SegmentationModel> {
        let (width, height) = self
            .input_size
            .unwrap_or((DEFAULT_INPUT_WIDTH, DEFAULT_INPUT_HEIGHT));
        SegmentationModel::new(inference, width, height)
    }

    /// Loads the model file and builds the model.
    pub fn load(self, model_path: impl AsRef<Path>) -> LayoutResult<SegmentationModel> {
        let session = self.session.clone().unwrap_or_default();
        let inference =
            OrtInfer::from_config(&session, model_path, Some(SEGMENTATION_INPUT_NAME))?;
        self.build(inference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_model_fails() {
        let result = SegmentationModelBuilder::new()
            .input_size(64, 96)
            .load("does/not/exist.onnx");
        assert!(result.is_err());
    }
}
