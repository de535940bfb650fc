//! Image normalization for the segmentation and classification models.
//!
//! The segmentation network reads single-channel pages scaled to `[0, 1]`.
//! The region classifier re-uses an ImageNet-pretrained backbone and reads
//! three-channel patches normalized with per-channel mean and standard
//! deviation.

use crate::core::constants::{IMAGENET_MEAN, IMAGENET_STD};
use crate::core::errors::{LayoutError, LayoutResult};
use crate::core::tensor::Tensor4D;
use image::{GrayImage, RgbImage, imageops::FilterType};
use ndarray::{Array4, Axis};
use rayon::prelude::*;

/// Normalizes RGB images into CHW tensors.
///
/// Each channel value `v` becomes `v * alpha[c] + beta[c]`, where
/// `alpha = scale / std` and `beta = -mean / std`.
#[derive(Debug, Clone)]
pub struct NormalizeImage {
    /// Scaling factors for each channel (alpha = scale / std)
    pub alpha: [f32; 3],
    /// Offset values for each channel (beta = -mean / std)
    pub beta: [f32; 3],
}

impl NormalizeImage {
    /// Creates a normalizer.
    ///
    /// # Errors
    ///
    /// Returns an error if `scale` is not positive or any standard deviation is
    /// not positive.
    pub fn new(scale: f32, mean: [f32; 3], std: [f32; 3]) -> LayoutResult<Self> {
        if scale <= 0.0 {
            return Err(LayoutError::config_error("Scale must be greater than 0"));
        }
        for (i, &s) in std.iter().enumerate() {
            if s <= 0.0 {
                return Err(LayoutError::config_error(format!(
                    "Standard deviation at index {i} must be greater than 0, got {s}"
                )));
            }
        }

        let alpha = std.map(|s| scale / s);
        let beta = [0usize, 1, 2].map(|c| -mean[c] / std[c]);
        Ok(Self { alpha, beta })
    }

    /// ImageNet statistics on `[0, 1]`-scaled pixels.
    pub fn imagenet() -> Self {
        let alpha = IMAGENET_STD.map(|s| (1.0 / 255.0) / s);
        let beta = [0usize, 1, 2].map(|c| -IMAGENET_MEAN[c] / IMAGENET_STD[c]);
        Self { alpha, beta }
    }

    /// Normalizes one image into a CHW buffer.
    pub fn normalize(&self, img: &RgbImage) -> Vec<f32> {
        let (width, height) = img.dimensions();
        let plane = (width * height) as usize;
        let mut result = vec![0.0f32; 3 * plane];

        for (x, y, pixel) in img.enumerate_pixels() {
            let offset = (y * width + x) as usize;
            for c in 0..3 {
                result[c * plane + offset] = pixel[c] as f32 * self.alpha[c] + self.beta[c];
            }
        }
        result
    }

    /// Normalizes a batch of equally sized images into a `[B, 3, H, W]` tensor.
    pub fn normalize_batch(&self, imgs: &[RgbImage]) -> LayoutResult<Tensor4D> {
        let Some(first) = imgs.first() else {
            return Ok(Array4::zeros((0, 3, 0, 0)));
        };
        let (width, height) = first.dimensions();
        if let Some(bad) = imgs.iter().find(|img| img.dimensions() != (width, height)) {
            return Err(LayoutError::validation_error(
                "NormalizeImage",
                "image size",
                &format!("{}x{}", width, height),
                &format!("{}x{}", bad.width(), bad.height()),
            ));
        }

        let buffers: Vec<Vec<f32>> = imgs.par_iter().map(|img| self.normalize(img)).collect();
        let data: Vec<f32> = buffers.into_iter().flatten().collect();
        Array4::from_shape_vec((imgs.len(), 3, height as usize, width as usize), data)
            .map_err(|e| LayoutError::normalization("failed to assemble patch batch", e))
    }
}

/// Resizes grayscale pages and stacks them into a `[B, 1, H, W]` tensor in `[0, 1]`.
pub fn gray_to_tensor(images: &[GrayImage], width: u32, height: u32) -> LayoutResult<Tensor4D> {
    if width == 0 || height == 0 {
        return Err(LayoutError::validation_error(
            "gray_to_tensor",
            "target size",
            "non-zero",
            &format!("{}x{}", width, height),
        ));
    }
    let mut tensor = Array4::<f32>::zeros((images.len(), 1, height as usize, width as usize));

    let resized: Vec<GrayImage> = images
        .par_iter()
        .map(|img| {
            if img.dimensions() == (width, height) {
                img.clone()
            } else {
                image::imageops::resize(img, width, height, FilterType::Triangle)
            }
        })
        .collect();

    for (mut item, img) in tensor.axis_iter_mut(Axis(0)).zip(resized.iter()) {
        for (x, y, pixel) in img.enumerate_pixels() {
            item[[0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
        }
    }
    Ok(tensor)
}
