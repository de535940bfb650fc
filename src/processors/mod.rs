//! Image and mask processing for layout analysis.
//!
//! The stages run in this order inside the pipeline:
//! [`normalization`] prepares model inputs, [`mask`] turns segmentation logits
//! into binary masks, [`regions`] finds content rectangles, and [`projections`],
//! [`patches`] and [`matching`] derive per-region features and ground-truth
//! links.

pub mod mask;
pub mod matching;
pub mod normalization;
pub mod patches;
pub mod projections;
pub mod regions;

pub use mask::{binarize_logits, masks_to_tensor, resize_mask, sigmoid};
pub use matching::{
    GroundTruthPage, RegionBatch, RegionOptions, majority_class, match_ground_truth,
    process_batch,
};
pub use normalization::{NormalizeImage, gray_to_tensor};
pub use patches::{crop_patch, crop_patches, patches_to_tensor};
pub use projections::{projection_features, projection_profile};
pub use regions::{RegionFilter, extract_regions};
