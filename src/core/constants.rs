//! Default values shared across the pipeline.

/// Width of the segmentation model input.
pub const DEFAULT_INPUT_WIDTH: u32 = 724;

/// Height of the segmentation model input.
pub const DEFAULT_INPUT_HEIGHT: u32 = 1024;

/// Side of the square patch fed to the region classifier.
pub const DEFAULT_PATCH_SIZE: u32 = 224;

/// Probability above which a pixel is part of a content region.
pub const DEFAULT_MASK_THRESHOLD: f32 = 0.5;

/// Maximum number of patches per classifier call.
pub const DEFAULT_CLASSIFIER_CHUNK: usize = 32;

pub const DEFAULT_BATCH_SIZE: usize = 4;

/// Connected components smaller than this many pixels are dropped when filtering.
pub const DEFAULT_MIN_REGION_AREA: u32 = 64;

/// Connected components thinner than this are dropped when filtering.
pub const DEFAULT_MIN_REGION_SIDE: u32 = 4;

/// Length of each row/column projection profile.
pub const DEFAULT_PROJECTION_LEN: usize = 64;

/// IoU needed to pair a ground-truth region with a predicted one.
pub const DEFAULT_MATCH_IOU: f32 = 0.5;

/// Additive smoothing term of the IoU metric.
pub const IOU_SMOOTH: f32 = 1e-6;

/// Number of images above which batch loading switches to rayon.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4;

/// ImageNet channel means used by the pretrained classifier backbone.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations used by the pretrained classifier backbone.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];
