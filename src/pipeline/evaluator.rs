//! # Stage Definition: Evaluation
//!
//! - **Inputs**: Batches of `AnnotatedPage`s and a `LayoutAnalyzer`.
//! - **Outputs**: Per-batch metric maps and a final `EvaluationReport`.
//! - **Logging**: Traces every batch's metrics and the final summary.
//! - **Error Behavior**: Returns `LayoutError` for model failures and malformed batches.
//! - **Invariants**:
//!     - Regions are extracted without size filtering.
//!     - `loss` in the report is the mean `total_loss`; it is not repeated in `metrics`.

use super::analyzer::LayoutAnalyzer;
use crate::core::errors::LayoutResult;
use crate::core::tensor::Tensor2D;
use crate::core::traits::{MaskPredictor, PatchClassifier};
use crate::dataset::{AnnotatedPage, LayoutDataset};
use crate::metrics::{
    BoundingBoxes, ClassMetrics, MetricCollector, bce_with_logits, cross_entropy, found_fraction,
    mean_ap, region_accuracy, thresholded_iou, voc_metrics,
};
use crate::processors::{RegionBatch, RegionFilter, RegionOptions, masks_to_tensor, process_batch};
use image::GrayImage;
use ndarray::s;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SEGM_LOSS: &str = "segm_loss";
pub const PROJ_LOSS: &str = "proj_loss";
pub const TOTAL_LOSS: &str = "total_loss";
pub const METRIC_IOU: &str = "metric_iou";
pub const METRIC_PROJ_ACC: &str = "metric_proj_acc";
pub const METRIC_FOUND_RECTS: &str = "metric_found_rects";
pub const VOC_METRICS_AP: &str = "VOC_Metrics_AP";

/// Summary of an evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Mean total loss over batches.
    pub loss: f32,
    /// Means of the per-batch metrics, plus `AP` over all pages and `IOU`
    /// averaged over pages.
    pub metrics: BTreeMap<String, f32>,
    /// VOC metrics per category over all pages.
    pub per_class: Vec<ClassMetrics>,
    pub batches: usize,
}

/// Scores an analyzer against annotated pages.
pub struct Evaluator<'a, M, C> {
    analyzer: &'a LayoutAnalyzer<M, C>,
    options: RegionOptions,
    collector: MetricCollector,
    boxes: BoundingBoxes,
    page_iou: Vec<f32>,
    batches: usize,
}

impl<'a, M: MaskPredictor, C: PatchClassifier> Evaluator<'a, M, C> {
    /// Creates an evaluator that extracts every connected component.
    pub fn new(analyzer: &'a LayoutAnalyzer<M, C>, projection_len: usize, match_iou: f32) -> Self {
        Self::with_options(
            analyzer,
            RegionOptions {
                filter: RegionFilter::disabled(),
                projection_len,
                match_iou,
            },
        )
    }

    pub fn with_options(analyzer: &'a LayoutAnalyzer<M, C>, options: RegionOptions) -> Self {
        Self {
            analyzer,
            options,
            collector: MetricCollector::new(),
            boxes: BoundingBoxes::new(),
            page_iou: Vec::new(),
            batches: 0,
        }
    }

    /// Scores one batch and returns its metrics.
    ///
    /// `VOC_Metrics_AP` is only reported for batches that produced regions.
    pub fn evaluate_batch(
        &mut self,
        pages: &[AnnotatedPage],
    ) -> LayoutResult<BTreeMap<String, f32>> {
        let images: Vec<GrayImage> = pages.iter().map(|p| p.image.clone()).collect();
        let (logits, masks) = self.analyzer.segment(&images)?;

        let logits = logits.slice(s![.., 0..1, .., ..]).to_owned();
        let (out_h, out_w) = (logits.shape()[2] as u32, logits.shape()[3] as u32);
        let truth_masks: Vec<GrayImage> = pages.iter().map(|p| p.mask.clone()).collect();
        let labels = masks_to_tensor(&truth_masks, out_w, out_h);

        let segm_loss = bce_with_logits(&logits, &labels)?;
        let ious = thresholded_iou(&logits, &labels, false)?;
        let batch_iou = ious.iter().sum::<f32>() / ious.len().max(1) as f32;
        self.page_iou.extend(&ious);

        let truth: Vec<_> = pages.iter().map(AnnotatedPage::ground_truth).collect();
        let regions = process_batch(&images, &masks, &truth, &self.options)?;

        let mut metrics = BTreeMap::new();
        let mut proj_loss = 0.0;
        let mut proj_acc = 0.0;
        if !regions.is_empty() {
            let class_logits = self.analyzer.classify_regions(
                &images,
                &regions.rects,
                &regions.image_index,
            )?;
            if regions.labelled_count() > 0 {
                proj_loss = cross_entropy(&class_logits, &regions.true_classes)?;
                proj_acc = region_accuracy(
                    &class_logits,
                    &regions.true_classes,
                    &regions.true_pred_map,
                );
            }
            let batch_ap = self.batch_ap(&regions, &class_logits, pages.len())?;
            metrics.insert(VOC_METRICS_AP.to_string(), batch_ap);
            self.boxes.add_batch(&regions, &class_logits, pages.len())?;
        } else {
            // pages without predicted regions still count their ground truth
            let empty = Tensor2D::zeros((0, self.analyzer.classifier().num_classes()));
            self.boxes.add_batch(&regions, &empty, pages.len())?;
        }

        metrics.insert(SEGM_LOSS.to_string(), segm_loss);
        metrics.insert(PROJ_LOSS.to_string(), proj_loss);
        metrics.insert(TOTAL_LOSS.to_string(), segm_loss + proj_loss);
        metrics.insert(METRIC_IOU.to_string(), batch_iou);
        metrics.insert(METRIC_PROJ_ACC.to_string(), proj_acc);
        metrics.insert(
            METRIC_FOUND_RECTS.to_string(),
            found_fraction(&regions.true_pred_map),
        );

        for (name, &value) in &metrics {
            self.collector.add(name.as_str(), value);
        }
        self.batches += 1;
        tracing::debug!(
            target: "evaluation",
            batch = self.batches,
            pages = pages.len(),
            regions = regions.len(),
            class_distribution = ?regions.class_distribution(),
            mean_size = ?regions.mean_size(),
            metrics = ?metrics,
            "Evaluated batch"
        );
        Ok(metrics)
    }

    fn batch_ap(
        &self,
        regions: &RegionBatch,
        class_logits: &Tensor2D,
        pages: usize,
    ) -> LayoutResult<f32> {
        let mut boxes = BoundingBoxes::new();
        boxes.add_batch(regions, class_logits, pages)?;
        Ok(mean_ap(&voc_metrics(&boxes, self.options.match_iou)))
    }

    /// Scores every batch of a dataset.
    pub fn evaluate_dataset(
        &mut self,
        dataset: &LayoutDataset,
        batch_size: usize,
    ) -> LayoutResult<()> {
        for batch in dataset.batches(batch_size) {
            self.evaluate_batch(&batch?)?;
        }
        Ok(())
    }

    /// Reduces everything seen so far into a report.
    pub fn finish(self) -> EvaluationReport {
        let mut metrics = self.collector.means();
        let loss = metrics.remove(TOTAL_LOSS).unwrap_or(0.0);

        let per_class = voc_metrics(&self.boxes, self.options.match_iou);
        metrics.insert("AP".to_string(), mean_ap(&per_class));
        let iou = if self.page_iou.is_empty() {
            0.0
        } else {
            self.page_iou.iter().sum::<f32>() / self.page_iou.len() as f32
        };
        metrics.insert("IOU".to_string(), iou);

        tracing::info!(
            target: "evaluation",
            batches = self.batches,
            loss,
            ap = metrics["AP"],
            iou,
            "Evaluation finished"
        );
        EvaluationReport {
            loss,
            metrics,
            per_class,
            batches: self.batches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClassMask, Rect, RegionCategory};
    use crate::pipeline::analyzer::tests::{ConstantClassifier, InkSegmenter, page_with_blocks};

    fn annotated(blocks: &[(RegionCategory, Rect)]) -> AnnotatedPage {
        let rects: Vec<Rect> = blocks.iter().map(|(_, r)| *r).collect();
        let image = page_with_blocks(32, 32, &rects);
        let mut class_mask = ClassMask::new(32, 32);
        for (category, rect) in blocks {
            class_mask.fill_rect(rect, category.index() as i16);
        }
        AnnotatedPage {
            mask: class_mask.to_binary(),
            image,
            class_mask,
            regions: blocks.to_vec(),
        }
    }

    fn analyzer(category: RegionCategory) -> LayoutAnalyzer<InkSegmenter, ConstantClassifier> {
        LayoutAnalyzer::builder(
            InkSegmenter { size: (32, 32) },
            ConstantClassifier::new(category),
        )
        .patch_size(16)
        .build()
        .unwrap()
    }

    #[test]
    fn test_evaluate_batch_metrics() {
        let page = annotated(&[
            (RegionCategory::Text, Rect::new(4, 4, 10, 10)),
            (RegionCategory::Table, Rect::new(18, 18, 10, 8)),
        ]);
        let analyzer = analyzer(RegionCategory::Text);
        let mut evaluator = Evaluator::new(&analyzer, 8, 0.5);
        let metrics = evaluator.evaluate_batch(&[page]).unwrap();

        assert!((metrics[METRIC_IOU] - 1.0).abs() < 1e-6);
        assert!((metrics[METRIC_FOUND_RECTS] - 1.0).abs() < 1e-6);
        // only the text block is classified right
        assert!((metrics[METRIC_PROJ_ACC] - 0.5).abs() < 1e-6);
        assert!(metrics[PROJ_LOSS] > 0.0);
        assert!(
            (metrics[TOTAL_LOSS] - metrics[SEGM_LOSS] - metrics[PROJ_LOSS]).abs() < 1e-6
        );
        assert!(metrics.contains_key(VOC_METRICS_AP));
    }

    #[test]
    fn test_finish_pops_total_loss() {
        let analyzer = analyzer(RegionCategory::Text);
        let mut evaluator = Evaluator::new(&analyzer, 8, 0.5);
        let first = annotated(&[(RegionCategory::Text, Rect::new(4, 4, 10, 10))]);
        let second = annotated(&[(RegionCategory::Text, Rect::new(2, 2, 8, 8))]);
        evaluator.evaluate_batch(&[first]).unwrap();
        evaluator.evaluate_batch(&[second]).unwrap();

        let report = evaluator.finish();
        assert_eq!(report.batches, 2);
        assert!(!report.metrics.contains_key(TOTAL_LOSS));
        assert!(report.metrics.contains_key(SEGM_LOSS));
        assert!((report.metrics["AP"] - 1.0).abs() < 1e-6);
        assert!((report.metrics["IOU"] - 1.0).abs() < 1e-6);
        assert_eq!(report.per_class.len(), 1);
        assert_eq!(report.per_class[0].category, RegionCategory::Text);

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"loss\""));
    }

    #[test]
    fn test_small_regions_are_kept() {
        // a 3x3 block falls below the analysis size filter
        let blocks = [(RegionCategory::Stamp, Rect::new(10, 10, 3, 3))];
        let analyzer = analyzer(RegionCategory::Stamp);
        let filtered = analyzer.analyze(&[annotated(&blocks).image]).unwrap();
        assert!(filtered[0].regions.is_empty());

        let mut evaluator = Evaluator::new(&analyzer, 8, 0.5);
        let metrics = evaluator.evaluate_batch(&[annotated(&blocks)]).unwrap();
        assert_eq!(metrics[METRIC_FOUND_RECTS], 1.0);
        assert_eq!(metrics[METRIC_PROJ_ACC], 1.0);
        assert!(metrics.contains_key(VOC_METRICS_AP));
    }

    #[test]
    fn test_blank_prediction_batch() {
        // ground truth exists but the page has no ink, so nothing is found
        let mut page = annotated(&[]);
        page.class_mask.fill_rect(&Rect::new(0, 0, 8, 8), 0);
        page.mask = page.class_mask.to_binary();
        page.regions = vec![(RegionCategory::Text, Rect::new(0, 0, 8, 8))];

        let analyzer = analyzer(RegionCategory::Text);
        let mut evaluator = Evaluator::new(&analyzer, 8, 0.5);
        let metrics = evaluator.evaluate_batch(&[page]).unwrap();

        assert_eq!(metrics[METRIC_FOUND_RECTS], 0.0);
        assert_eq!(metrics[METRIC_PROJ_ACC], 0.0);
        assert_eq!(metrics[PROJ_LOSS], 0.0);
        assert!(!metrics.contains_key(VOC_METRICS_AP));

        let report = evaluator.finish();
        assert_eq!(report.metrics["AP"], 0.0);
    }
}
