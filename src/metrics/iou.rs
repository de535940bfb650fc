//! Segmentation overlap metrics.

use crate::core::constants::IOU_SMOOTH;
use crate::core::errors::{LayoutError, LayoutResult};
use crate::core::tensor::Tensor4D;
use crate::processors::sigmoid;
use image::GrayImage;
use ndarray::Axis;

/// Maps an IoU to a score in steps of 0.1.
///
/// Each step is one IoU threshold out of `0.5, 0.55, ..., 0.95` that the value
/// passes; an IoU of 0.5 or less scores 0.
#[inline]
pub fn threshold_iou(iou: f32) -> f32 {
    (20.0 * (iou - 0.5)).clamp(0.0, 10.0).ceil() / 10.0
}

/// Thresholded IoU between predicted logits and binary labels.
///
/// Both tensors are `[B, 1, H, W]`. A pixel is predicted when
/// `sigmoid(logit) > 0.5` and labelled when `label > 0.5`. The IoU of each item
/// is smoothed by `1e-6` on both sides of the division, so an empty prediction
/// of an empty label scores 1. With `reduce`, the single batch mean is
/// returned instead of one score per item.
pub fn thresholded_iou(
    logits: &Tensor4D,
    labels: &Tensor4D,
    reduce: bool,
) -> LayoutResult<Vec<f32>> {
    if logits.shape() != labels.shape() {
        return Err(LayoutError::validation_error(
            "thresholded_iou",
            "labels shape",
            &format!("{:?}", logits.shape()),
            &format!("{:?}", labels.shape()),
        ));
    }
    if logits.shape()[1] == 0 {
        return Err(LayoutError::validation_error("thresholded_iou", "channels", ">= 1", "0"));
    }

    let scores: Vec<f32> = logits
        .axis_iter(Axis(0))
        .zip(labels.axis_iter(Axis(0)))
        .map(|(out, lab)| {
            let out = out.index_axis(Axis(0), 0);
            let lab = lab.index_axis(Axis(0), 0);
            let (mut inter, mut union) = (0u64, 0u64);
            for (&o, &l) in out.iter().zip(lab.iter()) {
                let p = sigmoid(o) > 0.5;
                let t = l > 0.5;
                inter += (p && t) as u64;
                union += (p || t) as u64;
            }
            let iou = (inter as f32 + IOU_SMOOTH) / (union as f32 + IOU_SMOOTH);
            threshold_iou(iou)
        })
        .collect();

    if reduce {
        let mean = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f32>() / scores.len() as f32
        };
        return Ok(vec![mean]);
    }
    Ok(scores)
}

/// Plain IoU of two binary masks (non-zero pixels are foreground).
///
/// Two empty masks have an IoU of 1.
pub fn mask_iou(a: &GrayImage, b: &GrayImage) -> LayoutResult<f32> {
    if a.dimensions() != b.dimensions() {
        return Err(LayoutError::validation_error(
            "mask_iou",
            "mask size",
            &format!("{}x{}", a.width(), a.height()),
            &format!("{}x{}", b.width(), b.height()),
        ));
    }
    let (mut inter, mut union) = (0u64, 0u64);
    for (pa, pb) in a.as_raw().iter().zip(b.as_raw()) {
        let (fa, fb) = (*pa > 0, *pb > 0);
        inter += (fa && fb) as u64;
        union += (fa || fb) as u64;
    }
    if union == 0 {
        return Ok(1.0);
    }
    Ok(inter as f32 / union as f32)
}
