//! Region classification accuracy.

use crate::core::tensor::Tensor2D;
use ndarray::ArrayView1;

/// Index of the largest value; ties keep the first.
pub(crate) fn argmax(row: ArrayView1<'_, f32>) -> Option<usize> {
    row.iter()
        .copied()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (idx, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((idx, v)),
        })
        .map(|(idx, _)| idx)
}

/// Fraction of rows whose argmax equals the target, over rows with a target
/// `>= 0`. Returns 0 when no row qualifies.
pub fn accuracy(logits: &Tensor2D, targets: &[i64]) -> f32 {
    let mut correct = 0usize;
    let mut total = 0usize;
    for (row, &target) in logits.rows().into_iter().zip(targets) {
        if target < 0 {
            continue;
        }
        total += 1;
        if argmax(row) == Some(target as usize) {
            correct += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    correct as f32 / total as f32
}

/// Share of ground-truth regions that were both found and classified right.
///
/// `true_pred_map[g]` is the rectangle matched to ground-truth region `g` or
/// `-1`. A found region counts as correct when the argmax of its rectangle's
/// logits equals the rectangle's true class. The denominator is the number
/// of ground-truth regions, so missed regions count against the score.
/// Returns 0 with no ground truth.
pub fn region_accuracy(logits: &Tensor2D, true_classes: &[i64], true_pred_map: &[i64]) -> f32 {
    if true_pred_map.is_empty() {
        return 0.0;
    }
    let correct = true_pred_map
        .iter()
        .filter(|&&m| m >= 0)
        .filter(|&&m| {
            let m = m as usize;
            match (true_classes.get(m), m < logits.nrows()) {
                (Some(&truth), true) if truth >= 0 => argmax(logits.row(m)) == Some(truth as usize),
                _ => false,
            }
        })
        .count();
    correct as f32 / true_pred_map.len() as f32
}

/// Fraction of ground-truth regions that were matched to some rectangle.
///
/// Returns 0 with no ground truth.
pub fn found_fraction(true_pred_map: &[i64]) -> f32 {
    if true_pred_map.is_empty() {
        return 0.0;
    }
    true_pred_map.iter().filter(|&&m| m >= 0).count() as f32 / true_pred_map.len() as f32
}
