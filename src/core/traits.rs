//! Model seams of the pipeline.
//!
//! The analyzer and evaluator only talk to networks through these traits, so the
//! ONNX-backed models in [`crate::models`] can be swapped for any other
//! implementation with the same tensor contract.

use crate::core::errors::LayoutResult;
use crate::core::tensor::{Tensor2D, Tensor4D};

/// A page segmentation network.
pub trait MaskPredictor: Send + Sync {
    /// Maps a `[B, 1, H, W]` batch of grayscale pages in `[0, 1]` to
    /// `[B, 1, H, W]` content logits.
    fn predict_logits(&self, pages: &Tensor4D) -> LayoutResult<Tensor4D>;

    /// Input size `(width, height)` the network expects.
    fn input_size(&self) -> (u32, u32);

    fn name(&self) -> &str;
}

/// A region patch classifier.
pub trait PatchClassifier: Send + Sync {
    /// Maps a `[N, 3, P, P]` batch of normalized patches to `[N, K]` logits.
    fn classify(&self, patches: &Tensor4D) -> LayoutResult<Tensor2D>;

    /// Number of categories `K` in the output.
    fn num_classes(&self) -> usize;

    fn name(&self) -> &str;
}
