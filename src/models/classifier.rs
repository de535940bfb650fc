//! Region classification model.
//!
//! A SqueezeNet-style network with an ImageNet-pretrained backbone. It reads
//! square RGB patches of page regions and returns one logit per region
//! category.

use crate::core::config::ModelInferenceConfig;
use crate::core::constants::DEFAULT_PATCH_SIZE;
use crate::core::errors::{LayoutError, LayoutResult};
use crate::core::inference::OrtInfer;
use crate::core::tensor::{Tensor2D, Tensor4D};
use crate::core::traits::PatchClassifier;
use crate::domain::RegionCategory;
use crate::processors::{NormalizeImage, patches_to_tensor};
use image::RgbImage;
use std::path::Path;

/// Name of the input tensor of the exported classifier.
pub const CLASSIFIER_INPUT_NAME: &str = "input";

/// ONNX-backed region classifier.
#[derive(Debug)]
pub struct RegionClassifierModel {
    inference: OrtInfer,
    normalizer: NormalizeImage,
    patch_size: u32,
    num_classes: usize,
}

impl RegionClassifierModel {
    pub fn new(
        inference: OrtInfer,
        normalizer: NormalizeImage,
        patch_size: u32,
        num_classes: usize,
    ) -> LayoutResult<Self> {
        if patch_size == 0 {
            return Err(LayoutError::config_error("patch size must be non-zero"));
        }
        if num_classes == 0 {
            return Err(LayoutError::config_error("num_classes must be non-zero"));
        }
        Ok(Self {
            inference,
            normalizer,
            patch_size,
            num_classes,
        })
    }

    pub fn patch_size(&self) -> u32 {
        self.patch_size
    }

    pub fn normalizer(&self) -> &NormalizeImage {
        &self.normalizer
    }

    /// Normalizes `patch_size × patch_size` patches into a batch tensor.
    pub fn preprocess(&self, patches: &[RgbImage]) -> LayoutResult<Tensor4D> {
        if let Some(bad) = patches
            .iter()
            .find(|p| p.dimensions() != (self.patch_size, self.patch_size))
        {
            return Err(LayoutError::validation_error(
                self.inference.model_name(),
                "patch size",
                &format!("{0}x{0}", self.patch_size),
                &format!("{}x{}", bad.width(), bad.height()),
            ));
        }
        patches_to_tensor(patches, &self.normalizer)
    }

    /// Runs the network and checks the number of output classes.
    pub fn infer(&self, batch: &Tensor4D) -> LayoutResult<Tensor2D> {
        let logits = self.inference.infer_2d(batch)?;
        if logits.ncols() != self.num_classes {
            return Err(LayoutError::validation_error(
                self.inference.model_name(),
                "num_classes",
                &self.num_classes.to_string(),
                &logits.ncols().to_string(),
            ));
        }
        Ok(logits)
    }

    /// Runs the complete forward pass: preprocess -> infer.
    pub fn forward(&self, patches: &[RgbImage]) -> LayoutResult<Tensor2D> {
        let batch = self.preprocess(patches)?;
        self.infer(&batch)
    }
}

impl PatchClassifier for RegionClassifierModel {
    fn classify(&self, patches: &Tensor4D) -> LayoutResult<Tensor2D> {
        self.infer(patches)
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn name(&self) -> &str {
        self.inference.model_name()
    }
}

/// Builder for [`RegionClassifierModel`].
#[derive(Debug, Default)]
pub struct RegionClassifierModelBuilder {
    patch_size: Option<u32>,
    num_classes: Option<usize>,
    normalizer: Option<NormalizeImage>,
    session: Option<ModelInferenceConfig>,
}

impl RegionClassifierModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patch_size(mut self, size: u32) -> Self {
        self.patch_size = Some(size);
        self
    }

    /// Overrides the number of output classes (default: every [`RegionCategory`]).
    pub fn num_classes(mut self, classes: usize) -> Self {
        self.num_classes = Some(classes);
        self
    }

    /// Overrides the ImageNet normalization.
    pub fn normalizer(mut self, normalizer: NormalizeImage) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn session_config(mut self, config: ModelInferenceConfig) -> Self {
        self.session = Some(config);
        self
    }

    pub fn build(self, inference: OrtInfer) -> LayoutResult<RegionClassifierModel> {
        RegionClassifierModel::new(
            inference,
            self.normalizer.unwrap_or_else(NormalizeImage::imagenet),
            self.patch_size.unwrap_or(DEFAULT_PATCH_SIZE),
            self.num_classes.unwrap_or(RegionCategory::COUNT),
        )
    }

    /// Loads the model file and builds the model.
    pub fn load(self, model_path: impl AsRef<Path>) -> LayoutResult<RegionClassifierModel> {
        let session = self.session.clone().unwrap_or_default();
        let inference = OrtInfer::from_config(&session, model_path, Some(CLASSIFIER_INPUT_NAME))?;
        self.build(inference)
    }
}
