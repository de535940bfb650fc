//! # Stage Definition: Layout Analysis
//!
//! - **Inputs**: Grayscale pages of any size.
//! - **Outputs**: One `LayoutAnalysis` per page with its content mask and classified regions.
//! - **Logging**: Traces segmentation shape, region counts and classifier chunking.
//! - **Error Behavior**: Returns `LayoutError` for empty input, zero-sized pages and model
//!   failures.
//! - **Invariants**:
//!     - Masks and regions are always in page coordinates.
//!     - Regions are ordered top-to-bottom, then left-to-right, per page.
//!     - No model call receives more than `classifier_chunk` patches.

use crate::core::config::{ExperimentConfig, ModelInferenceConfig};
use crate::core::constants::{DEFAULT_CLASSIFIER_CHUNK, DEFAULT_MASK_THRESHOLD, DEFAULT_PATCH_SIZE};
use crate::core::errors::{LayoutError, LayoutResult};
use crate::core::tensor::{Tensor2D, Tensor4D, softmax_rows};
use crate::core::traits::{MaskPredictor, PatchClassifier};
use crate::domain::{LayoutAnalysis, LayoutRegion, Rect};
use crate::models::{
    RegionClassifierModel, RegionClassifierModelBuilder, SegmentationModel,
    SegmentationModelBuilder,
};
use crate::processors::{
    NormalizeImage, RegionFilter, binarize_logits, crop_patches, extract_regions, gray_to_tensor,
    patches_to_tensor, resize_mask,
};
use image::GrayImage;
use ndarray::{Array2, Axis, concatenate};
use rayon::prelude::*;

/// Segments pages and classifies their content regions.
#[derive(Debug)]
pub struct LayoutAnalyzer<M, C> {
    segmenter: M,
    classifier: C,
    mask_threshold: f32,
    filter: RegionFilter,
    classifier_chunk: usize,
    patch_size: u32,
    normalizer: NormalizeImage,
}

impl<M: MaskPredictor, C: PatchClassifier> LayoutAnalyzer<M, C> {
    pub fn builder(segmenter: M, classifier: C) -> LayoutAnalyzerBuilder<M, C> {
        LayoutAnalyzerBuilder::new(segmenter, classifier)
    }

    pub fn segmenter(&self) -> &M {
        &self.segmenter
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn region_filter(&self) -> &RegionFilter {
        &self.filter
    }

    fn validate_pages(pages: &[GrayImage]) -> LayoutResult<()> {
        if pages.is_empty() {
            return Err(LayoutError::invalid_input("no pages to analyze"));
        }
        if let Some((idx, page)) = pages
            .iter()
            .enumerate()
            .find(|(_, p)| p.width() == 0 || p.height() == 0)
        {
            return Err(LayoutError::invalid_input(format!(
                "page {} has zero size {}x{}",
                idx,
                page.width(),
                page.height()
            )));
        }
        Ok(())
    }

    /// Runs the segmentation network.
    ///
    /// Returns the raw logits at model resolution and one binary mask per page
    /// at page resolution.
    pub fn segment(&self, pages: &[GrayImage]) -> LayoutResult<(Tensor4D, Vec<GrayImage>)> {
        Self::validate_pages(pages)?;
        let (width, height) = self.segmenter.input_size();
        let input = gray_to_tensor(pages, width, height)?;
        let logits = self.segmenter.predict_logits(&input)?;

        let masks = binarize_logits(&logits, self.mask_threshold)?;
        if masks.len() != pages.len() {
            return Err(LayoutError::validation_error(
                self.segmenter.name(),
                "output batch",
                &pages.len().to_string(),
                &masks.len().to_string(),
            ));
        }
        tracing::debug!(
            target: "layout",
            model = self.segmenter.name(),
            logits = ?logits.shape(),
            "Segmented batch"
        );

        let masks = masks
            .par_iter()
            .zip(pages.par_iter())
            .map(|(mask, page)| resize_mask(mask, page.width(), page.height()))
            .collect();
        Ok((logits, masks))
    }

    /// Classifies the given regions, `classifier_chunk` patches per model call.
    ///
    /// Returns `N × K` logits, one row per rectangle.
    pub fn classify_regions(
        &self,
        pages: &[GrayImage],
        rects: &[Rect],
        image_index: &[usize],
    ) -> LayoutResult<Tensor2D> {
        let num_classes = self.classifier.num_classes();
        if rects.is_empty() {
            return Ok(Array2::zeros((0, num_classes)));
        }
        let patches = crop_patches(pages, rects, image_index, self.patch_size)?;

        let mut outputs = Vec::with_capacity(patches.len().div_ceil(self.classifier_chunk));
        for (chunk_idx, chunk) in patches.chunks(self.classifier_chunk).enumerate() {
            let batch = patches_to_tensor(chunk, &self.normalizer)?;
            let logits = self.classifier.classify(&batch)?;
            if logits.nrows() != chunk.len() || logits.ncols() != num_classes {
                return Err(LayoutError::validation_error(
                    self.classifier.name(),
                    "output shape",
                    &format!("[{}, {}]", chunk.len(), num_classes),
                    &format!("{:?}", logits.shape()),
                ));
            }
            tracing::trace!(
                target: "layout",
                chunk = chunk_idx,
                patches = chunk.len(),
                "Classified patch chunk"
            );
            outputs.push(logits);
        }

        let views: Vec<_> = outputs.iter().map(|o| o.view()).collect();
        concatenate(Axis(0), &views)
            .map_err(|e| LayoutError::tensor_operation("failed to join classifier outputs", e))
    }

    /// Analyzes a batch of pages.
    pub fn analyze(&self, pages: &[GrayImage]) -> LayoutResult<Vec<LayoutAnalysis>> {
        let (_, masks) = self.segment(pages)?;

        let page_regions: Vec<Vec<Rect>> = masks
            .par_iter()
            .map(|mask| extract_regions(mask, &self.filter))
            .collect();
        let rects: Vec<Rect> = page_regions.iter().flatten().copied().collect();
        let image_index: Vec<usize> = page_regions
            .iter()
            .enumerate()
            .flat_map(|(page, regions)| std::iter::repeat_n(page, regions.len()))
            .collect();

        let logits = self.classify_regions(pages, &rects, &image_index)?;
        let probs = softmax_rows(&logits);

        let mut analyses: Vec<LayoutAnalysis> = pages
            .iter()
            .zip(masks)
            .map(|(page, mask)| LayoutAnalysis {
                width: page.width(),
                height: page.height(),
                mask,
                regions: Vec::new(),
            })
            .collect();
        for ((rect, &page), row) in rects.iter().zip(&image_index).zip(probs.rows()) {
            if let Some(region) = LayoutRegion::from_probabilities(*rect, row.to_vec()) {
                analyses[page].regions.push(region);
            }
        }

        tracing::info!(
            target: "layout",
            pages = pages.len(),
            regions = rects.len(),
            "Analyzed batch"
        );
        Ok(analyses)
    }
}

impl LayoutAnalyzer<SegmentationModel, RegionClassifierModel> {
    /// Loads both ONNX models named by an experiment configuration.
    pub fn from_config(config: &ExperimentConfig) -> LayoutResult<Self> {
        let model = &config.model;
        let session = ModelInferenceConfig {
            session_pool_size: model.session_pool_size,
            ort_session: model.ort_session.clone(),
            ..ModelInferenceConfig::default()
        };
        let segmenter = SegmentationModelBuilder::new()
            .input_size(model.input_width, model.input_height)
            .session_config(session.clone())
            .load(&model.segmentation_path)?;
        let classifier = RegionClassifierModelBuilder::new()
            .patch_size(model.patch_size)
            .session_config(session)
            .load(&model.classifier_path)?;
        let normalizer = classifier.normalizer().clone();

        LayoutAnalyzer::builder(segmenter, classifier)
            .mask_threshold(model.mask_threshold)
            .classifier_chunk(model.classifier_chunk)
            .patch_size(model.patch_size)
            .normalizer(normalizer)
            .region_filter(RegionFilter {
                min_area: config.regions.min_area,
                min_side: config.regions.min_side,
                enabled: true,
            })
            .build()
    }
}

/// Builder for [`LayoutAnalyzer`].
#[derive(Debug)]
pub struct LayoutAnalyzerBuilder<M, C> {
    segmenter: M,
    classifier: C,
    mask_threshold: f32,
    filter: RegionFilter,
    classifier_chunk: usize,
    patch_size: u32,
    normalizer: Option<NormalizeImage>,
}

impl<M: MaskPredictor, C: PatchClassifier> LayoutAnalyzerBuilder<M, C> {
    pub fn new(segmenter: M, classifier: C) -> Self {
        Self {
            segmenter,
            classifier,
            mask_threshold: DEFAULT_MASK_THRESHOLD,
            filter: RegionFilter::default(),
            classifier_chunk: DEFAULT_CLASSIFIER_CHUNK,
            patch_size: DEFAULT_PATCH_SIZE,
            normalizer: None,
        }
    }

    /// Probability above which a pixel counts as content.
    pub fn mask_threshold(mut self, threshold: f32) -> Self {
        self.mask_threshold = threshold;
        self
    }

    pub fn region_filter(mut self, filter: RegionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Maximum number of patches per classifier call.
    pub fn classifier_chunk(mut self, chunk: usize) -> Self {
        self.classifier_chunk = chunk;
        self
    }

    pub fn patch_size(mut self, size: u32) -> Self {
        self.patch_size = size;
        self
    }

    pub fn normalizer(mut self, normalizer: NormalizeImage) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    pub fn build(self) -> LayoutResult<LayoutAnalyzer<M, C>> {
        if !(self.mask_threshold > 0.0 && self.mask_threshold < 1.0) {
            return Err(LayoutError::config_error(format!(
                "mask_threshold must be in (0, 1), got {}",
                self.mask_threshold
            )));
        }
        if self.classifier_chunk == 0 {
            return Err(LayoutError::config_error("classifier_chunk must be non-zero"));
        }
        if self.patch_size == 0 {
            return Err(LayoutError::config_error("patch_size must be non-zero"));
        }
        let (width, height) = self.segmenter.input_size();
        if width == 0 || height == 0 {
            return Err(LayoutError::config_error(format!(
                "segmenter '{}' reports a zero input size",
                self.segmenter.name()
            )));
        }

        Ok(LayoutAnalyzer {
            segmenter: self.segmenter,
            classifier: self.classifier,
            mask_threshold: self.mask_threshold,
            filter: self.filter,
            classifier_chunk: self.classifier_chunk,
            patch_size: self.patch_size,
            normalizer: self.normalizer.unwrap_or_else(NormalizeImage::imagenet),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::RegionCategory;
    use image::Luma;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Marks dark input pixels as content.
    pub(crate) struct InkSegmenter {
        pub size: (u32, u32),
    }

    impl MaskPredictor for InkSegmenter {
        fn predict_logits(&self, pages: &Tensor4D) -> LayoutResult<Tensor4D> {
            Ok(pages.mapv(|v| if v < 0.5 { 10.0 } else { -10.0 }))
        }

        fn input_size(&self) -> (u32, u32) {
            self.size
        }

        fn name(&self) -> &str {
            "ink"
        }
    }

    /// Predicts one fixed category and counts its calls.
    pub(crate) struct ConstantClassifier {
        pub category: RegionCategory,
        pub calls: AtomicUsize,
    }

    impl ConstantClassifier {
        pub(crate) fn new(category: RegionCategory) -> Self {
            Self {
                category,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PatchClassifier for ConstantClassifier {
        fn classify(&self, patches: &Tensor4D) -> LayoutResult<Tensor2D> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut logits = Array2::zeros((patches.shape()[0], RegionCategory::COUNT));
            logits.column_mut(self.category.index()).fill(6.0);
            Ok(logits)
        }

        fn num_classes(&self) -> usize {
            RegionCategory::COUNT
        }

        fn name(&self) -> &str {
            "constant"
        }
    }

    pub(crate) fn page_with_blocks(width: u32, height: u32, blocks: &[Rect]) -> GrayImage {
        let mut page = GrayImage::from_pixel(width, height, Luma([255]));
        for b in blocks {
            for y in b.y..b.bottom() {
                for x in b.x..b.right() {
                    page.put_pixel(x, y, Luma([0]));
                }
            }
        }
        page
    }

    fn analyzer(chunk: usize) -> LayoutAnalyzer<InkSegmenter, ConstantClassifier> {
        LayoutAnalyzer::builder(
            InkSegmenter { size: (32, 32) },
            ConstantClassifier::new(RegionCategory::Table),
        )
        .region_filter(RegionFilter::disabled())
        .classifier_chunk(chunk)
        .patch_size(16)
        .build()
        .unwrap()
    }

    #[test]
    fn test_analyze_finds_and_classifies_blocks() {
        let blocks = [Rect::new(18, 18, 10, 8), Rect::new(4, 4, 10, 10)];
        let page = page_with_blocks(32, 32, &blocks);
        let analyses = analyzer(32).analyze(&[page]).unwrap();

        assert_eq!(analyses.len(), 1);
        let analysis = &analyses[0];
        assert_eq!((analysis.width, analysis.height), (32, 32));
        let rects: Vec<Rect> = analysis.regions.iter().map(|r| r.rect).collect();
        assert_eq!(
            rects,
            vec![Rect::new(4, 4, 10, 10), Rect::new(18, 18, 10, 8)]
        );
        for region in &analysis.regions {
            assert_eq!(region.category, RegionCategory::Table);
            assert!(region.score > 0.9);
        }
        assert_eq!(analysis.mask.get_pixel(5, 5)[0], 255);
        assert_eq!(analysis.mask.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_classifier_is_called_in_chunks() {
        let blocks = [
            Rect::new(1, 1, 4, 4),
            Rect::new(10, 1, 4, 4),
            Rect::new(20, 1, 4, 4),
        ];
        let pages = vec![
            page_with_blocks(32, 32, &blocks),
            page_with_blocks(32, 32, &blocks[..1]),
        ];
        let analyzer = analyzer(2);
        let analyses = analyzer.analyze(&pages).unwrap();

        assert_eq!(analyses[0].regions.len(), 3);
        assert_eq!(analyses[1].regions.len(), 1);
        // four patches in chunks of two
        assert_eq!(analyzer.classifier().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_pages_are_resized_to_model_input() {
        let page = page_with_blocks(64, 48, &[Rect::new(8, 8, 24, 24)]);
        let analyses = analyzer(32).analyze(&[page]).unwrap();
        assert_eq!(analyses[0].mask.dimensions(), (64, 48));
        assert_eq!(analyses[0].regions.len(), 1);
        assert!(analyses[0].regions[0].rect.iou(&Rect::new(8, 8, 24, 24)) > 0.7);
    }

    #[test]
    fn test_blank_page_has_no_regions() {
        let page = GrayImage::from_pixel(32, 32, Luma([255]));
        let analyzer = analyzer(32);
        let analyses = analyzer.analyze(&[page]).unwrap();
        assert!(analyses[0].regions.is_empty());
        assert_eq!(analyzer.classifier().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_input() {
        let analyzer = analyzer(32);
        assert!(analyzer.analyze(&[]).is_err());
        assert!(analyzer.analyze(&[GrayImage::new(0, 10)]).is_err());
    }

    #[test]
    fn test_builder_validation() {
        let build = |threshold: f32, chunk: usize| {
            LayoutAnalyzer::builder(
                InkSegmenter { size: (8, 8) },
                ConstantClassifier::new(RegionCategory::Text),
            )
            .mask_threshold(threshold)
            .classifier_chunk(chunk)
            .build()
        };
        assert!(build(0.5, 32).is_ok());
        assert!(build(1.0, 32).is_err());
        assert!(build(0.5, 0).is_err());

        let zero = LayoutAnalyzer::builder(
            InkSegmenter { size: (0, 8) },
            ConstantClassifier::new(RegionCategory::Text),
        )
        .build();
        assert!(zero.is_err());
    }

    #[test]
    fn test_segment_returns_model_resolution_logits() {
        let page = page_with_blocks(64, 64, &[Rect::new(0, 0, 10, 10)]);
        let (logits, masks) = analyzer(32).segment(&[page]).unwrap();
        assert_eq!(logits.shape(), &[1, 1, 32, 32]);
        assert_eq!(masks[0].dimensions(), (64, 64));
    }
}
