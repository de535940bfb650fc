//! Linking extracted regions to ground truth.
//!
//! [`process_batch`] is the batch-level entry point: it extracts the regions of
//! every predicted mask, computes their projection features, labels each
//! region with its majority ground-truth category and pairs ground-truth
//! regions with extracted ones.

use crate::core::constants::{DEFAULT_MATCH_IOU, DEFAULT_PROJECTION_LEN};
use crate::core::errors::{LayoutError, LayoutResult};
use crate::core::tensor::Tensor2D;
use crate::domain::{ClassMask, Rect, RegionCategory};
use image::GrayImage;
use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use super::projections::projection_profile;
use super::regions::{RegionFilter, extract_regions};

/// Most frequent ground-truth category inside a rectangle.
///
/// Returns `-1` when the rectangle covers no labelled pixel. Ties go to the
/// lower class index.
pub fn majority_class(class_mask: &ClassMask, rect: &Rect) -> i16 {
    let counts = class_mask.histogram(rect);
    let mut best: Option<(usize, u64)> = None;
    for (idx, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        match best {
            Some((_, c)) if c >= count => {}
            _ => best = Some((idx, count)),
        }
    }
    best.map_or(ClassMask::BACKGROUND, |(idx, _)| idx as i16)
}

/// Greedily pairs ground-truth rectangles with predicted ones.
///
/// Ground truth is visited from the largest area to the smallest. Each one
/// takes the unused prediction with the highest IoU, provided it reaches
/// `iou_threshold`. The result holds, for each ground-truth rectangle in its
/// original order, the index of its prediction or `-1`.
pub fn match_ground_truth(gt: &[Rect], predicted: &[Rect], iou_threshold: f32) -> Vec<i64> {
    let mut result = vec![-1i64; gt.len()];
    let mut used = vec![false; predicted.len()];

    let mut order: Vec<usize> = (0..gt.len()).collect();
    order.sort_by(|&a, &b| gt[b].area().cmp(&gt[a].area()).then(a.cmp(&b)));

    for gi in order {
        let best = predicted
            .iter()
            .enumerate()
            .filter(|(pi, _)| !used[*pi])
            .map(|(pi, p)| (pi, gt[gi].iou(p)))
            .filter(|&(_, iou)| iou >= iou_threshold)
            .fold(None, |best: Option<(usize, f32)>, (pi, iou)| match best {
                Some((_, b)) if b >= iou => best,
                _ => Some((pi, iou)),
            });
        if let Some((pi, _)) = best {
            used[pi] = true;
            result[gi] = pi as i64;
        }
    }
    result
}

/// Ground truth of one page, aligned with its predicted mask.
#[derive(Debug, Clone)]
pub struct GroundTruthPage {
    pub class_mask: ClassMask,
    pub regions: Vec<(RegionCategory, Rect)>,
}

/// Settings for [`process_batch`].
#[derive(Debug, Clone, Copy)]
pub struct RegionOptions {
    pub filter: RegionFilter,
    pub projection_len: usize,
    pub match_iou: f32,
}

impl Default for RegionOptions {
    fn default() -> Self {
        Self {
            filter: RegionFilter::default(),
            projection_len: DEFAULT_PROJECTION_LEN,
            match_iou: DEFAULT_MATCH_IOU,
        }
    }
}

/// Regions extracted from a batch of masks, flattened across pages.
#[derive(Debug, Clone)]
pub struct RegionBatch {
    /// Every extracted rectangle, page by page.
    pub rects: Vec<Rect>,
    /// Page index of each rectangle.
    pub image_index: Vec<usize>,
    /// `N × 2L` projection features, one row per rectangle.
    pub projections: Tensor2D,
    /// Majority ground-truth class per rectangle, `-1` for unlabelled ones.
    pub true_classes: Vec<i64>,
    /// Ground-truth regions of the batch as `(page, category, rect)`.
    pub gt_regions: Vec<(usize, RegionCategory, Rect)>,
    /// For each entry of `gt_regions`, the index into `rects` of its match or `-1`.
    pub true_pred_map: Vec<i64>,
}

impl RegionBatch {
    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Number of rectangles with a known ground-truth class.
    pub fn labelled_count(&self) -> usize {
        self.true_classes.iter().filter(|&&c| c >= 0).count()
    }

    /// Rectangles per ground-truth class, in class-index order.
    pub fn class_distribution(&self) -> [usize; RegionCategory::COUNT] {
        let mut counts = [0; RegionCategory::COUNT];
        for &label in &self.true_classes {
            if let Some(category) = RegionCategory::from_label(label) {
                counts[category.index()] += 1;
            }
        }
        counts
    }

    /// Mean rectangle width and height, `None` for an empty batch.
    pub fn mean_size(&self) -> Option<(f32, f32)> {
        if self.rects.is_empty() {
            return None;
        }
        let n = self.rects.len() as f32;
        let (w, h) = self
            .rects
            .iter()
            .fold((0u64, 0u64), |(w, h), r| (w + r.w as u64, h + r.h as u64));
        Some((w as f32 / n, h as f32 / n))
    }
}

struct PageRegions {
    rects: Vec<Rect>,
    profiles: Vec<Vec<f32>>,
    true_classes: Vec<i64>,
    matches: Vec<i64>,
}

fn process_page(
    image: &GrayImage,
    mask: &GrayImage,
    truth: &GroundTruthPage,
    options: &RegionOptions,
) -> PageRegions {
    let rects = extract_regions(mask, &options.filter);
    let profiles = rects
        .iter()
        .map(|r| projection_profile(image, r, options.projection_len))
        .collect();
    let true_classes = rects
        .iter()
        .map(|r| majority_class(&truth.class_mask, r) as i64)
        .collect();
    let gt_rects: Vec<Rect> = truth.regions.iter().map(|(_, r)| *r).collect();
    let matches = match_ground_truth(&gt_rects, &rects, options.match_iou);
    PageRegions {
        rects,
        profiles,
        true_classes,
        matches,
    }
}

/// Extracts, describes and labels the regions of a batch of predicted masks.
///
/// `images`, `masks` and `truth` are parallel slices; each mask must match the
/// size of its page. Pages are processed in parallel.
///
/// # Errors
///
/// Fails when the slices differ in length or a mask does not match its page.
pub fn process_batch(
    images: &[GrayImage],
    masks: &[GrayImage],
    truth: &[GroundTruthPage],
    options: &RegionOptions,
) -> LayoutResult<RegionBatch> {
    if images.len() != masks.len() || images.len() != truth.len() {
        return Err(LayoutError::validation_error(
            "process_batch",
            "batch length",
            &format!("{} pages", images.len()),
            &format!("{} masks, {} ground truths", masks.len(), truth.len()),
        ));
    }
    for (i, (image, mask)) in images.iter().zip(masks).enumerate() {
        if image.dimensions() != mask.dimensions() {
            return Err(LayoutError::region_extraction(&format!(
                "mask {} is {}x{} but its page is {}x{}",
                i,
                mask.width(),
                mask.height(),
                image.width(),
                image.height()
            )));
        }
    }

    let pages: Vec<PageRegions> = images
        .par_iter()
        .zip(masks.par_iter())
        .zip(truth.par_iter())
        .map(|((image, mask), truth)| process_page(image, mask, truth, options))
        .collect();

    let total: usize = pages.iter().map(|p| p.rects.len()).sum();
    let width = 2 * options.projection_len;
    let mut projections = Array2::<f32>::zeros((total, width));
    let mut rects = Vec::with_capacity(total);
    let mut image_index = Vec::with_capacity(total);
    let mut true_classes = Vec::with_capacity(total);
    let mut gt_regions = Vec::new();
    let mut true_pred_map = Vec::new();

    for (page_idx, (page, truth)) in pages.into_iter().zip(truth).enumerate() {
        let offset = rects.len();
        for (row, profile) in page.profiles.iter().enumerate() {
            for (col, &v) in profile.iter().enumerate() {
                projections[[offset + row, col]] = v;
            }
        }
        image_index.extend(std::iter::repeat_n(page_idx, page.rects.len()));
        rects.extend(page.rects);
        true_classes.extend(page.true_classes);
        gt_regions.extend(truth.regions.iter().map(|&(c, r)| (page_idx, c, r)));
        true_pred_map.extend(
            page.matches
                .into_iter()
                .map(|m| if m >= 0 { m + offset as i64 } else { -1 }),
        );
    }

    debug!(
        "Extracted {} regions from {} pages ({} ground-truth regions)",
        rects.len(),
        images.len(),
        gt_regions.len()
    );

    Ok(RegionBatch {
        rects,
        image_index,
        projections,
        true_classes,
        gt_regions,
        true_pred_map,
    })
}
