//! Pascal VOC average precision for classified regions.
//!
//! Ground-truth boxes and scored detections are collected in a
//! [`BoundingBoxes`] accumulator, possibly over many batches, and scored per
//! category with [`voc_metrics`]. Average precision uses every-point
//! interpolation of the precision/recall curve (VOC 2010 and later).

use crate::core::errors::{LayoutError, LayoutResult};
use crate::core::tensor::{Tensor2D, softmax_rows};
use crate::domain::{Rect, RegionCategory};
use crate::processors::RegionBatch;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::accuracy::argmax;

/// A ground-truth region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundTruthBox {
    pub image_id: usize,
    pub category: RegionCategory,
    pub rect: Rect,
}

/// A classified region with its confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedBox {
    pub image_id: usize,
    pub category: RegionCategory,
    pub rect: Rect,
    pub confidence: f32,
}

/// Ground-truth and detected boxes of any number of images.
#[derive(Debug, Clone, Default)]
pub struct BoundingBoxes {
    ground_truth: Vec<GroundTruthBox>,
    detections: Vec<DetectedBox>,
    images: usize,
}

impl BoundingBoxes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_ground_truth(&mut self, image_id: usize, category: RegionCategory, rect: Rect) {
        self.images = self.images.max(image_id + 1);
        self.ground_truth.push(GroundTruthBox {
            image_id,
            category,
            rect,
        });
    }

    pub fn add_detection(
        &mut self,
        image_id: usize,
        category: RegionCategory,
        rect: Rect,
        confidence: f32,
    ) {
        self.images = self.images.max(image_id + 1);
        self.detections.push(DetectedBox {
            image_id,
            category,
            rect,
            confidence,
        });
    }

    /// Adds the regions of one batch.
    ///
    /// `logits` holds one classifier row per rectangle of `batch`; each
    /// rectangle becomes a detection of its most probable category, scored
    /// by that category's softmax probability. Image ids continue after the
    /// images already added, so batches never collide.
    ///
    /// `pages` is the number of pages in the batch, which may exceed the
    /// highest page index that produced a region.
    pub fn add_batch(
        &mut self,
        batch: &RegionBatch,
        logits: &Tensor2D,
        pages: usize,
    ) -> LayoutResult<()> {
        if logits.nrows() != batch.len() {
            return Err(LayoutError::validation_error(
                "BoundingBoxes::add_batch",
                "logits rows",
                &batch.len().to_string(),
                &logits.nrows().to_string(),
            ));
        }
        let base = self.images;
        let probs = softmax_rows(logits);

        for ((rect, &page), row) in batch
            .rects
            .iter()
            .zip(&batch.image_index)
            .zip(probs.rows())
        {
            let Some(best) = argmax(row) else { continue };
            let Some(category) = RegionCategory::from_index(best) else {
                continue;
            };
            self.add_detection(base + page, category, *rect, row[best]);
        }
        for &(page, category, rect) in &batch.gt_regions {
            self.add_ground_truth(base + page, category, rect);
        }
        self.images = self.images.max(base + pages);
        Ok(())
    }

    pub fn ground_truth(&self) -> &[GroundTruthBox] {
        &self.ground_truth
    }

    pub fn detections(&self) -> &[DetectedBox] {
        &self.detections
    }

    /// Number of image ids in use.
    pub fn image_count(&self) -> usize {
        self.images
    }

    pub fn is_empty(&self) -> bool {
        self.ground_truth.is_empty() && self.detections.is_empty()
    }
}

/// Detection quality of one category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub category: RegionCategory,
    /// Average precision.
    pub ap: f32,
    /// Cumulative precision after each detection, by descending confidence.
    pub precision: Vec<f32>,
    /// Cumulative recall after each detection, by descending confidence.
    pub recall: Vec<f32>,
    /// Number of ground-truth regions.
    pub total_positives: usize,
    pub tp: usize,
    pub fp: usize,
}

/// Area under the precision/recall curve with every-point interpolation.
fn every_point_ap(recall: &[f32], precision: &[f32]) -> f32 {
    let mut mrec = Vec::with_capacity(recall.len() + 2);
    mrec.push(0.0);
    mrec.extend_from_slice(recall);
    mrec.push(1.0);
    let mut mpre = Vec::with_capacity(precision.len() + 2);
    mpre.push(0.0);
    mpre.extend_from_slice(precision);
    mpre.push(0.0);

    for i in (0..mpre.len() - 1).rev() {
        mpre[i] = mpre[i].max(mpre[i + 1]);
    }
    (1..mrec.len())
        .filter(|&i| mrec[i] != mrec[i - 1])
        .map(|i| (mrec[i] - mrec[i - 1]) * mpre[i])
        .sum()
}

/// Scores every category that has ground truth or detections.
///
/// Detections are visited by descending confidence. Each one is a true
/// positive when its best-overlapping ground truth of the same image and
/// category reaches `iou_threshold` and was not matched before; otherwise it
/// is a false positive. Categories are reported in class-index order.
pub fn voc_metrics(boxes: &BoundingBoxes, iou_threshold: f32) -> Vec<ClassMetrics> {
    let mut results = Vec::new();

    for category in RegionCategory::ALL {
        let gts: Vec<&GroundTruthBox> = boxes
            .ground_truth
            .iter()
            .filter(|g| g.category == category)
            .collect();
        let dets: Vec<&DetectedBox> = boxes
            .detections
            .iter()
            .filter(|d| d.category == category)
            .sorted_by(|a, b| b.confidence.total_cmp(&a.confidence))
            .collect();
        if gts.is_empty() && dets.is_empty() {
            continue;
        }

        let by_image = gts
            .iter()
            .enumerate()
            .into_group_map_by(|(_, g)| g.image_id);
        let mut matched = vec![false; gts.len()];
        let mut tp_flags = Vec::with_capacity(dets.len());

        for det in &dets {
            let best = by_image.get(&det.image_id).and_then(|candidates| {
                candidates
                    .iter()
                    .map(|(gi, g)| (*gi, det.rect.iou(&g.rect)))
                    .fold(None, |best: Option<(usize, f32)>, (gi, iou)| match best {
                        Some((_, b)) if b >= iou => best,
                        _ => Some((gi, iou)),
                    })
            });
            let is_tp = match best {
                Some((gi, iou)) if iou >= iou_threshold && !matched[gi] => {
                    matched[gi] = true;
                    true
                }
                _ => false,
            };
            tp_flags.push(is_tp);
        }

        let total_positives = gts.len();
        let mut precision = Vec::with_capacity(dets.len());
        let mut recall = Vec::with_capacity(dets.len());
        let (mut tp, mut fp) = (0usize, 0usize);
        for is_tp in tp_flags {
            if is_tp {
                tp += 1;
            } else {
                fp += 1;
            }
            precision.push(tp as f32 / (tp + fp) as f32);
            recall.push(if total_positives == 0 {
                0.0
            } else {
                tp as f32 / total_positives as f32
            });
        }

        let ap = if total_positives == 0 {
            0.0
        } else {
            every_point_ap(&recall, &precision)
        };
        results.push(ClassMetrics {
            category,
            ap,
            precision,
            recall,
            total_positives,
            tp,
            fp,
        });
    }
    results
}

/// Mean AP over the categories that have ground truth; 0 when none has.
pub fn mean_ap(metrics: &[ClassMetrics]) -> f32 {
    let aps: Vec<f32> = metrics
        .iter()
        .filter(|m| m.total_positives > 0)
        .map(|m| m.ap)
        .collect();
    if aps.is_empty() {
        return 0.0;
    }
    aps.iter().sum::<f32>() / aps.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    #[test]
    fn test_perfect_detections() {
        let mut boxes = BoundingBoxes::new();
        boxes.add_ground_truth(0, RegionCategory::Text, Rect::new(0, 0, 10, 10));
        boxes.add_ground_truth(1, RegionCategory::Text, Rect::new(5, 5, 10, 10));
        boxes.add_detection(0, RegionCategory::Text, Rect::new(0, 0, 10, 10), 0.9);
        boxes.add_detection(1, RegionCategory::Text, Rect::new(5, 5, 10, 10), 0.8);

        let metrics = voc_metrics(&boxes, 0.5);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].category, RegionCategory::Text);
        assert!((metrics[0].ap - 1.0).abs() < 1e-6);
        assert_eq!((metrics[0].tp, metrics[0].fp), (2, 0));
        assert!((mean_ap(&metrics) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_duplicate_detection_is_false_positive() {
        let mut boxes = BoundingBoxes::new();
        boxes.add_ground_truth(0, RegionCategory::Table, Rect::new(0, 0, 10, 10));
        boxes.add_detection(0, RegionCategory::Table, Rect::new(0, 0, 10, 10), 0.9);
        boxes.add_detection(0, RegionCategory::Table, Rect::new(0, 0, 10, 9), 0.8);

        let metrics = voc_metrics(&boxes, 0.5);
        assert_eq!((metrics[0].tp, metrics[0].fp), (1, 1));
        assert_eq!(metrics[0].precision, vec![1.0, 0.5]);
        assert!((metrics[0].ap - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_interpolated_ap() {
        // ranked: FP, TP with one ground truth -> precision [0, 0.5], recall [0, 1]
        let mut boxes = BoundingBoxes::new();
        boxes.add_ground_truth(0, RegionCategory::Image, Rect::new(0, 0, 10, 10));
        boxes.add_detection(0, RegionCategory::Image, Rect::new(0, 0, 10, 10), 0.5);
        boxes.add_detection(0, RegionCategory::Image, Rect::new(50, 50, 10, 10), 0.9);

        let metrics = voc_metrics(&boxes, 0.5);
        assert_eq!(metrics[0].precision, vec![0.0, 0.5]);
        assert!((metrics[0].ap - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_taken_best_match_is_false_positive() {
        // the second detection overlaps both boxes but its best match is taken
        let mut boxes = BoundingBoxes::new();
        boxes.add_ground_truth(0, RegionCategory::Text, Rect::new(0, 0, 10, 10));
        boxes.add_ground_truth(0, RegionCategory::Text, Rect::new(2, 0, 10, 10));
        boxes.add_detection(0, RegionCategory::Text, Rect::new(0, 0, 11, 10), 0.8);
        boxes.add_detection(0, RegionCategory::Text, Rect::new(0, 0, 10, 10), 0.9);

        let metrics = voc_metrics(&boxes, 0.5);
        assert_eq!((metrics[0].tp, metrics[0].fp), (1, 1));
        assert_eq!(metrics[0].precision, vec![1.0, 0.5]);
        assert_eq!(metrics[0].recall, vec![0.5, 0.5]);
        assert!((metrics[0].ap - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_detection_on_other_image_does_not_match() {
        let mut boxes = BoundingBoxes::new();
        boxes.add_ground_truth(0, RegionCategory::Stamp, Rect::new(0, 0, 10, 10));
        boxes.add_detection(1, RegionCategory::Stamp, Rect::new(0, 0, 10, 10), 0.9);
        let metrics = voc_metrics(&boxes, 0.5);
        assert_eq!(metrics[0].tp, 0);
        assert_eq!(metrics[0].ap, 0.0);
    }

    #[test]
    fn test_mean_ap_skips_categories_without_ground_truth() {
        let mut boxes = BoundingBoxes::new();
        boxes.add_ground_truth(0, RegionCategory::Text, Rect::new(0, 0, 10, 10));
        boxes.add_detection(0, RegionCategory::Text, Rect::new(0, 0, 10, 10), 0.9);
        boxes.add_detection(0, RegionCategory::Title, Rect::new(20, 20, 5, 5), 0.9);

        let metrics = voc_metrics(&boxes, 0.5);
        assert_eq!(metrics.len(), 2);
        assert!((mean_ap(&metrics) - 1.0).abs() < 1e-6);
        assert_eq!(mean_ap(&[]), 0.0);
    }

    #[test]
    fn test_add_batch_offsets_images() {
        let batch = RegionBatch {
            rects: vec![Rect::new(0, 0, 4, 4)],
            image_index: vec![1],
            projections: Array2::zeros((1, 2)),
            true_classes: vec![2],
            gt_regions: vec![(1, RegionCategory::Table, Rect::new(0, 0, 4, 4))],
            true_pred_map: vec![0],
        };
        let logits = array![[0.0f32, 0.0, 5.0, 0.0, 0.0]];

        let mut boxes = BoundingBoxes::new();
        boxes.add_batch(&batch, &logits, 2).unwrap();
        boxes.add_batch(&batch, &logits, 2).unwrap();

        assert_eq!(boxes.image_count(), 4);
        assert_eq!(boxes.detections()[0].image_id, 1);
        assert_eq!(boxes.detections()[1].image_id, 3);
        assert_eq!(boxes.detections()[0].category, RegionCategory::Table);
        assert!(boxes.detections()[0].confidence > 0.9);

        let metrics = voc_metrics(&boxes, 0.5);
        assert!((mean_ap(&metrics) - 1.0).abs() < 1e-6);

        let short = Array2::<f32>::zeros((0, 5));
        assert!(boxes.add_batch(&batch, &short, 2).is_err());
    }
}
