//! ONNX-backed networks of the layout pipeline.
//!
//! Both models follow the same shape: `preprocess` turns images into a batch
//! tensor, `infer` runs the session pool, and `forward` chains the two. They
//! plug into the pipeline through [`crate::core::traits`].

pub mod classifier;
pub mod segmentation;

pub use classifier::{CLASSIFIER_INPUT_NAME, RegionClassifierModel, RegionClassifierModelBuilder};
pub use segmentation::{SEGMENTATION_INPUT_NAME, SegmentationModel, SegmentationModelBuilder};
