//! Utility functions for loading page images.
//!
//! Archive scans arrive in whatever format and color depth the scanner
//! produced. The segmentation model reads grayscale pages, so most callers
//! want [`load_gray_image`]; [`load_image`] keeps the colors for rendering.

use crate::core::constants::DEFAULT_PARALLEL_THRESHOLD;
use crate::core::errors::{LayoutError, LayoutResult};
use image::{DynamicImage, GrayImage, RgbImage};
use rayon::prelude::*;
use std::path::Path;

/// Converts a DynamicImage to an RgbImage.
pub fn dynamic_to_rgb(img: DynamicImage) -> RgbImage {
    img.to_rgb8()
}

/// Converts a DynamicImage to a GrayImage.
///
/// Color images are reduced with the luma weights of the `image` crate.
pub fn dynamic_to_gray(img: DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Loads an image from a file path and converts it to RgbImage.
///
/// # Errors
///
/// Returns [`LayoutError::ImageLoad`] if the file cannot be opened or decoded.
pub fn load_image(path: &Path) -> LayoutResult<RgbImage> {
    let img = image::open(path).map_err(LayoutError::ImageLoad)?;
    Ok(dynamic_to_rgb(img))
}

/// Loads an image from a file path and converts it to GrayImage.
///
/// # Errors
///
/// Returns [`LayoutError::ImageLoad`] if the file cannot be opened or decoded.
pub fn load_gray_image(path: &Path) -> LayoutResult<GrayImage> {
    let img = image::open(path).map_err(LayoutError::ImageLoad)?;
    Ok(dynamic_to_gray(img))
}

/// Loads a batch of grayscale pages.
///
/// Loading switches to rayon when there are more than
/// [`DEFAULT_PARALLEL_THRESHOLD`] paths.
pub fn load_images_batch<P: AsRef<Path> + Send + Sync>(
    paths: &[P],
) -> LayoutResult<Vec<GrayImage>> {
    load_images_batch_with_threshold(paths, None)
}

/// Loads a batch of grayscale pages with a custom parallel threshold.
///
/// # Arguments
///
/// * `paths` - Paths of the image files to load
/// * `parallel_threshold` - Number of paths above which loading runs in
///   parallel. If `None`, [`DEFAULT_PARALLEL_THRESHOLD`] is used.
///
/// # Errors
///
/// Returns the first error met if any image cannot be loaded.
pub fn load_images_batch_with_threshold<P: AsRef<Path> + Send + Sync>(
    paths: &[P],
    parallel_threshold: Option<usize>,
) -> LayoutResult<Vec<GrayImage>> {
    let threshold = parallel_threshold.unwrap_or(DEFAULT_PARALLEL_THRESHOLD);

    if paths.len() > threshold {
        paths
            .par_iter()
            .map(|p| load_gray_image(p.as_ref()))
            .collect()
    } else {
        paths.iter().map(|p| load_gray_image(p.as_ref())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn test_load_gray_image_from_rgb_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.png");
        RgbImage::from_pixel(6, 4, Rgb([255, 255, 255]))
            .save(&path)
            .unwrap();

        let gray = load_gray_image(&path).unwrap();
        assert_eq!(gray.dimensions(), (6, 4));
        assert!(gray.pixels().all(|p| p[0] == 255));

        let rgb = load_image(&path).unwrap();
        assert_eq!(rgb.dimensions(), (6, 4));
    }

    #[test]
    fn test_load_missing_image() {
        let err = load_gray_image(Path::new("does/not/exist.png")).unwrap_err();
        assert!(matches!(err, LayoutError::ImageLoad(_)));
    }

    #[test]
    fn test_load_images_batch_parallel_and_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<_> = (0..3)
            .map(|i| {
                let path = dir.path().join(format!("{i}.png"));
                GrayImage::from_pixel(2, 2, Luma([i as u8 * 10]))
                    .save(&path)
                    .unwrap();
                path
            })
            .collect();

        let sequential = load_images_batch_with_threshold(&paths, Some(10)).unwrap();
        let parallel = load_images_batch_with_threshold(&paths, Some(0)).unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(parallel[2].get_pixel(0, 0)[0], 20);
        assert_eq!(load_images_batch(&paths).unwrap().len(), 3);
    }
}
