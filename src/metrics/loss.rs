//! Losses reported during evaluation.

use crate::core::errors::{LayoutError, LayoutResult};
use crate::core::tensor::Tensor2D;
use ndarray::{ArrayBase, ArrayView1, Data, Dimension};

/// Mean binary cross-entropy between logits and 0/1 targets.
///
/// Uses the stable form `max(x, 0) - x*t + ln(1 + e^-|x|)`. Returns 0 for
/// empty inputs.
pub fn bce_with_logits<S1, S2, D>(
    logits: &ArrayBase<S1, D>,
    targets: &ArrayBase<S2, D>,
) -> LayoutResult<f32>
where
    S1: Data<Elem = f32>,
    S2: Data<Elem = f32>,
    D: Dimension,
{
    if logits.shape() != targets.shape() {
        return Err(LayoutError::validation_error(
            "bce_with_logits",
            "targets shape",
            &format!("{:?}", logits.shape()),
            &format!("{:?}", targets.shape()),
        ));
    }
    if logits.is_empty() {
        return Ok(0.0);
    }
    let sum: f64 = logits
        .iter()
        .zip(targets.iter())
        .map(|(&x, &t)| {
            let x = x as f64;
            x.max(0.0) - x * t as f64 + (-x.abs()).exp().ln_1p()
        })
        .sum();
    Ok((sum / logits.len() as f64) as f32)
}

/// `ln(sum(exp(row)))`, shifted by the row maximum.
pub(crate) fn log_sum_exp(row: ArrayView1<'_, f32>) -> f32 {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return max;
    }
    max + row.iter().map(|&v| (v - max).exp()).sum::<f32>().ln()
}

/// Mean cross-entropy of `N × K` logits against class targets.
///
/// Rows whose target is negative are skipped. Returns 0 when no row has a
/// valid target.
pub fn cross_entropy(logits: &Tensor2D, targets: &[i64]) -> LayoutResult<f32> {
    if logits.nrows() != targets.len() {
        return Err(LayoutError::validation_error(
            "cross_entropy",
            "targets",
            &format!("{} entries", logits.nrows()),
            &targets.len().to_string(),
        ));
    }
    let classes = logits.ncols();
    let mut total = 0.0f32;
    let mut count = 0usize;
    for (row, &target) in logits.rows().into_iter().zip(targets) {
        if target < 0 {
            continue;
        }
        let target = target as usize;
        if target >= classes {
            return Err(LayoutError::validation_error(
                "cross_entropy",
                "target",
                &format!("< {}", classes),
                &target.to_string(),
            ));
        }
        total += log_sum_exp(row) - row[target];
        count += 1;
    }
    if count == 0 {
        return Ok(0.0);
    }
    Ok(total / count as f32)
}
