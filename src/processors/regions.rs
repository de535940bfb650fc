//! Content region extraction from binary masks.
//!
//! Every 8-connected component of foreground pixels becomes one rectangle.

use crate::core::constants::{DEFAULT_MIN_REGION_AREA, DEFAULT_MIN_REGION_SIDE};
use crate::domain::Rect;
use image::{GrayImage, Luma};
use imageproc::region_labelling::{Connectivity, connected_components};
use serde::{Deserialize, Serialize};

/// Drops connected components that are too small to be content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegionFilter {
    /// Minimum number of foreground pixels in a component.
    pub min_area: u32,
    /// Minimum width and height of the component's bounding box.
    pub min_side: u32,
    /// When `false`, every component is kept.
    pub enabled: bool,
}

impl Default for RegionFilter {
    fn default() -> Self {
        Self {
            min_area: DEFAULT_MIN_REGION_AREA,
            min_side: DEFAULT_MIN_REGION_SIDE,
            enabled: true,
        }
    }
}

impl RegionFilter {
    /// A filter that keeps every component.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    fn keeps(&self, rect: &Rect, pixels: u64) -> bool {
        !self.enabled
            || (pixels >= self.min_area as u64
                && rect.w >= self.min_side
                && rect.h >= self.min_side)
    }
}

#[derive(Debug, Clone, Copy)]
struct ComponentStats {
    x_min: u32,
    y_min: u32,
    x_max: u32,
    y_max: u32,
    pixels: u64,
}

/// Finds the bounding rectangles of the foreground components of a mask.
///
/// Pixels above 127 are foreground. The result is sorted top-to-bottom, then
/// left-to-right.
pub fn extract_regions(mask: &GrayImage, filter: &RegionFilter) -> Vec<Rect> {
    let (width, height) = mask.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let binary = GrayImage::from_fn(width, height, |x, y| {
        Luma([if mask.get_pixel(x, y)[0] > 127 { 255 } else { 0 }])
    });
    let labels = connected_components(&binary, Connectivity::Eight, Luma([0u8]));

    let mut stats: Vec<Option<ComponentStats>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        if stats.len() < label {
            stats.resize(label, None);
        }
        let entry = &mut stats[label - 1];
        match entry {
            Some(s) => {
                s.x_min = s.x_min.min(x);
                s.y_min = s.y_min.min(y);
                s.x_max = s.x_max.max(x);
                s.y_max = s.y_max.max(y);
                s.pixels += 1;
            }
            None => {
                *entry = Some(ComponentStats {
                    x_min: x,
                    y_min: y,
                    x_max: x,
                    y_max: y,
                    pixels: 1,
                });
            }
        }
    }

    let mut rects: Vec<Rect> = stats
        .into_iter()
        .flatten()
        .filter_map(|s| {
            let rect = Rect::from_span(s.x_min, s.y_min, s.x_max, s.y_max);
            filter.keeps(&rect, s.pixels).then_some(rect)
        })
        .collect();
    rects.sort_by_key(|r| (r.y, r.x));
    rects
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_with(rects: &[Rect], width: u32, height: u32) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        for r in rects {
            for y in r.y..r.bottom() {
                for x in r.x..r.right() {
                    mask.put_pixel(x, y, Luma([255]));
                }
            }
        }
        mask
    }

    #[test]
    fn test_extracts_separate_blocks_in_reading_order() {
        let blocks = [
            Rect::new(40, 50, 20, 10),
            Rect::new(5, 5, 30, 10),
            Rect::new(5, 50, 20, 20),
        ];
        let mask = mask_with(&blocks, 100, 100);
        let regions = extract_regions(&mask, &RegionFilter::disabled());
        assert_eq!(
            regions,
            vec![
                Rect::new(5, 5, 30, 10),
                Rect::new(5, 50, 20, 20),
                Rect::new(40, 50, 20, 10),
            ]
        );
    }

    #[test]
    fn test_diagonal_pixels_are_one_component() {
        let mut mask = GrayImage::new(4, 4);
        mask.put_pixel(0, 0, Luma([255]));
        mask.put_pixel(1, 1, Luma([255]));
        mask.put_pixel(2, 2, Luma([255]));
        let regions = extract_regions(&mask, &RegionFilter::disabled());
        assert_eq!(regions, vec![Rect::new(0, 0, 3, 3)]);
    }

    #[test]
    fn test_filter_drops_small_components() {
        let blocks = [Rect::new(0, 0, 2, 2), Rect::new(10, 10, 20, 20)];
        let mask = mask_with(&blocks, 40, 40);

        let filtered = extract_regions(&mask, &RegionFilter::default());
        assert_eq!(filtered, vec![Rect::new(10, 10, 20, 20)]);

        let unfiltered = extract_regions(&mask, &RegionFilter::disabled());
        assert_eq!(unfiltered.len(), 2);
    }

    #[test]
    fn test_thin_line_is_filtered_by_side() {
        let mask = mask_with(&[Rect::new(0, 10, 100, 2)], 100, 20);
        let filter = RegionFilter {
            min_area: 10,
            min_side: 4,
            enabled: true,
        };
        assert!(extract_regions(&mask, &filter).is_empty());
    }

    #[test]
    fn test_empty_mask() {
        let mask = GrayImage::new(10, 10);
        assert!(extract_regions(&mask, &RegionFilter::default()).is_empty());
        assert!(extract_regions(&GrayImage::new(0, 0), &RegionFilter::default()).is_empty());
    }
}
