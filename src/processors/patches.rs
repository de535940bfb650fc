//! Square image patches of page regions for the region classifier.

use crate::core::errors::{LayoutError, LayoutResult};
use crate::core::tensor::Tensor4D;
use crate::domain::Rect;
use image::{DynamicImage, GrayImage, RgbImage, imageops::FilterType};
use rayon::prelude::*;

use super::normalization::NormalizeImage;

/// Crops a rectangle out of a grayscale page and resizes it to a `size × size`
/// RGB patch.
///
/// The rectangle is clamped to the page first. A rectangle with no pixels on
/// the page gives a blank (black) patch.
pub fn crop_patch(gray: &GrayImage, rect: &Rect, size: u32) -> RgbImage {
    let Some(rect) = rect.clamp_to(gray.width(), gray.height()) else {
        return RgbImage::new(size, size);
    };
    let crop = image::imageops::crop_imm(gray, rect.x, rect.y, rect.w, rect.h).to_image();
    let rgb = DynamicImage::ImageLuma8(crop).to_rgb8();
    image::imageops::resize(&rgb, size, size, FilterType::Triangle)
}

/// Crops the patch of every rectangle from the page it belongs to.
///
/// # Errors
///
/// Fails when the index slice does not match the rectangles or names a page
/// that does not exist.
pub fn crop_patches(
    images: &[GrayImage],
    rects: &[Rect],
    image_index: &[usize],
    size: u32,
) -> LayoutResult<Vec<RgbImage>> {
    if rects.len() != image_index.len() {
        return Err(LayoutError::validation_error(
            "crop_patches",
            "image_index",
            &format!("{} entries", rects.len()),
            &image_index.len().to_string(),
        ));
    }
    if let Some(&bad) = image_index.iter().find(|&&i| i >= images.len()) {
        return Err(LayoutError::validation_error(
            "crop_patches",
            "image_index",
            &format!("< {}", images.len()),
            &bad.to_string(),
        ));
    }

    let patches: Vec<RgbImage> = rects
        .par_iter()
        .zip(image_index.par_iter())
        .map(|(rect, &page)| crop_patch(&images[page], rect, size))
        .collect();
    Ok(patches)
}

/// Normalizes patches into a `[N, 3, P, P]` classifier input.
pub fn patches_to_tensor(
    patches: &[RgbImage],
    normalizer: &NormalizeImage,
) -> LayoutResult<Tensor4D> {
    normalizer.normalize_batch(patches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_crop_patch_size_and_content() {
        let mut page = GrayImage::from_pixel(50, 50, Luma([255]));
        for y in 10..20 {
            for x in 10..20 {
                page.put_pixel(x, y, Luma([0]));
            }
        }
        let patch = crop_patch(&page, &Rect::new(10, 10, 10, 10), 16);
        assert_eq!(patch.dimensions(), (16, 16));
        assert!(patch.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_crop_patch_outside_page_is_blank() {
        let page = GrayImage::from_pixel(10, 10, Luma([255]));
        let patch = crop_patch(&page, &Rect::new(20, 20, 5, 5), 8);
        assert_eq!(patch.dimensions(), (8, 8));
        assert!(patch.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_crop_patches_validates_index() {
        let pages = vec![GrayImage::new(10, 10)];
        let rects = vec![Rect::new(0, 0, 4, 4)];
        assert!(crop_patches(&pages, &rects, &[1], 8).is_err());
        assert!(crop_patches(&pages, &rects, &[], 8).is_err());

        let patches = crop_patches(&pages, &rects, &[0], 8).unwrap();
        assert_eq!(patches.len(), 1);
    }

    #[test]
    fn test_patches_to_tensor_shape() {
        let pages = vec![GrayImage::new(10, 10), GrayImage::new(12, 12)];
        let rects = vec![Rect::new(0, 0, 4, 4), Rect::new(1, 1, 6, 3)];
        let patches = crop_patches(&pages, &rects, &[0, 1], 8).unwrap();
        let tensor = patches_to_tensor(&patches, &NormalizeImage::imagenet()).unwrap();
        assert_eq!(tensor.shape(), &[2, 3, 8, 8]);
    }
}
