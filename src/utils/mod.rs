//! Utility functions for the layout pipeline.
//!
//! Page loading lives in [`image`]; rendering of analysis results in
//! `visualization`, behind the `visualization` feature.

pub mod image;
#[cfg(feature = "visualization")]
pub mod visualization;

pub use image::{
    dynamic_to_gray, dynamic_to_rgb, load_gray_image, load_image, load_images_batch,
    load_images_batch_with_threshold,
};
