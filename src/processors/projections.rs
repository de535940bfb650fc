//! Projection-profile features of page regions.
//!
//! A region is summarised by how much ink each of its rows and columns
//! carries. Both profiles are normalised and resampled to a fixed length so
//! that regions of any size produce feature rows of equal width.

use crate::core::tensor::Tensor2D;
use crate::domain::Rect;
use image::GrayImage;
use ndarray::Array2;

fn min_max_normalize(profile: &mut [f32]) {
    let (min, max) = profile
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    if !range.is_finite() || range <= f32::EPSILON {
        profile.iter_mut().for_each(|v| *v = 0.0);
        return;
    }
    profile.iter_mut().for_each(|v| *v = (*v - min) / range);
}

/// Linear resampling of `values` to `len` samples, end points aligned.
fn resample(values: &[f32], len: usize) -> Vec<f32> {
    match (values.len(), len) {
        (_, 0) => Vec::new(),
        (0, _) => vec![0.0; len],
        (1, _) => vec![values[0]; len],
        (n, 1) => vec![values.iter().sum::<f32>() / n as f32],
        (n, _) => {
            let step = (n - 1) as f32 / (len - 1) as f32;
            (0..len)
                .map(|i| {
                    let pos = i as f32 * step;
                    let lo = (pos.floor() as usize).min(n - 1);
                    let hi = (lo + 1).min(n - 1);
                    let t = pos - lo as f32;
                    values[lo] * (1.0 - t) + values[hi] * t
                })
                .collect()
        }
    }
}

/// Row and column ink profiles of a rectangle of a grayscale page.
///
/// Returns `2 * len` values: the row profile resampled to `len`, followed by
/// the column profile resampled to `len`. Ink is `1 - pixel / 255`. Each
/// profile is min-max normalised to `[0, 1]`; a flat profile becomes zeros.
/// The rectangle is clamped to the page; a rectangle outside the page yields
/// all zeros.
pub fn projection_profile(gray: &GrayImage, rect: &Rect, len: usize) -> Vec<f32> {
    let Some(rect) = rect.clamp_to(gray.width(), gray.height()) else {
        return vec![0.0; 2 * len];
    };

    let mut rows = vec![0.0f32; rect.h as usize];
    let mut cols = vec![0.0f32; rect.w as usize];
    for (ry, y) in (rect.y..rect.bottom()).enumerate() {
        for (rx, x) in (rect.x..rect.right()).enumerate() {
            let ink = 1.0 - gray.get_pixel(x, y)[0] as f32 / 255.0;
            rows[ry] += ink;
            cols[rx] += ink;
        }
    }
    min_max_normalize(&mut rows);
    min_max_normalize(&mut cols);

    let mut features = resample(&rows, len);
    features.extend(resample(&cols, len));
    features
}

/// Projection profiles of many rectangles as an `N × 2L` matrix.
///
/// `image_index[i]` names the page in `images` that `rects[i]` belongs to.
/// Rows whose page index is out of range are left at zero.
pub fn projection_features(
    images: &[GrayImage],
    rects: &[Rect],
    image_index: &[usize],
    len: usize,
) -> Tensor2D {
    let mut features = Array2::<f32>::zeros((rects.len(), 2 * len));
    for (i, (rect, &page)) in rects.iter().zip(image_index).enumerate() {
        let Some(gray) = images.get(page) else {
            continue;
        };
        let profile = projection_profile(gray, rect, len);
        for (j, v) in profile.into_iter().enumerate() {
            features[[i, j]] = v;
        }
    }
    features
}
