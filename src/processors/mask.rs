//! Conversions between segmentation logits, binary masks and target tensors.

use crate::core::errors::{LayoutError, LayoutResult};
use crate::core::tensor::Tensor4D;
use image::{GrayImage, Luma, imageops::FilterType};
use ndarray::{Array4, Axis};

#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Thresholds the first channel of `[B, C, H, W]` logits into one binary mask per item.
///
/// A pixel is content (255) when `sigmoid(logit) > threshold`.
pub fn binarize_logits(logits: &Tensor4D, threshold: f32) -> LayoutResult<Vec<GrayImage>> {
    let shape = logits.shape();
    if shape[1] == 0 {
        return Err(LayoutError::validation_error("binarize_logits", "channels", ">= 1", "0"));
    }
    let (height, width) = (shape[2] as u32, shape[3] as u32);

    let masks = logits
        .axis_iter(Axis(0))
        .map(|item| {
            let channel = item.index_axis(Axis(0), 0);
            GrayImage::from_fn(width, height, |x, y| {
                let p = sigmoid(channel[[y as usize, x as usize]]);
                Luma([if p > threshold { 255 } else { 0 }])
            })
        })
        .collect();
    Ok(masks)
}

/// Resizes a binary mask with nearest-neighbour sampling so it stays binary.
pub fn resize_mask(mask: &GrayImage, width: u32, height: u32) -> GrayImage {
    if mask.dimensions() == (width, height) {
        return mask.clone();
    }
    image::imageops::resize(mask, width, height, FilterType::Nearest)
}

/// Stacks binary masks into a `[B, 1, H, W]` tensor of 0/1 targets.
///
/// Masks are resized to `width × height` first.
pub fn masks_to_tensor(masks: &[GrayImage], width: u32, height: u32) -> Tensor4D {
    let mut tensor = Array4::<f32>::zeros((masks.len(), 1, height as usize, width as usize));
    for (b, mask) in masks.iter().enumerate() {
        let resized = resize_mask(mask, width, height);
        for (x, y, pixel) in resized.enumerate_pixels() {
            if pixel[0] > 127 {
                tensor[[b, 0, y as usize, x as usize]] = 1.0;
            }
        }
    }
    tensor
}
