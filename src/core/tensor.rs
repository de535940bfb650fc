//! Tensor aliases used between preprocessing, inference and post-processing.

/// Classifier logits, `[batch, classes]`.
pub type Tensor2D = ndarray::Array2<f32>;

/// Image batches and segmentation logits, `[batch, channels, height, width]`.
pub type Tensor4D = ndarray::Array4<f32>;

/// Row-wise softmax of `[batch, classes]` logits, shifted by each row maximum.
pub fn softmax_rows(logits: &Tensor2D) -> Tensor2D {
    let mut probs = logits.clone();
    for mut row in probs.rows_mut() {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if !max.is_finite() {
            row.fill(0.0);
            continue;
        }
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    probs
}
