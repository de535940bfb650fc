//! Ground-truth annotation files and their rasterization.
//!
//! Each annotated page is described by one JSON file in the `annotations/`
//! folder of a data directory:
//!
//! ```json
//! {
//!   "image": "scans/page_0001.png",
//!   "regions": [
//!     { "category": "text", "points": [[10, 10], [200, 10], [200, 80], [10, 80]] },
//!     { "category": "stamp", "bbox": [300, 40, 60, 60] }
//!   ]
//! }
//! ```
//!
//! `image` is relative to the data directory. Regions are given either as a
//! polygon or as an `[x, y, w, h]` box.

use crate::core::errors::{LayoutError, LayoutResult};
use crate::domain::{ClassMask, Rect, RegionCategory};
use crate::processors::GroundTruthPage;
use crate::utils::image::load_gray_image;
use image::{GrayImage, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the folder holding annotation files inside a data directory.
pub const ANNOTATION_FOLDER: &str = "annotations";

/// Outline of an annotated region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegionShape {
    Polygon { points: Vec<[f32; 2]> },
    Box { bbox: [u32; 4] },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionAnnotation {
    pub category: RegionCategory,
    #[serde(flatten)]
    pub shape: RegionShape,
}

/// Contents of one annotation file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAnnotation {
    pub image: PathBuf,
    #[serde(default)]
    pub regions: Vec<RegionAnnotation>,
}

impl PageAnnotation {
    /// Reads and parses an annotation file.
    pub fn from_file(path: &Path) -> LayoutResult<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| LayoutError::annotation(path, format!("invalid JSON: {e}")))
    }
}

/// One ground-truth sample: a grayscale page with its masks and regions.
#[derive(Debug, Clone)]
pub struct AnnotatedPage {
    pub image: GrayImage,
    /// Binary content mask, 255 inside any region.
    pub mask: GrayImage,
    /// Category of every pixel; later regions override earlier ones.
    pub class_mask: ClassMask,
    /// Bounding box of every region, clamped to the page.
    pub regions: Vec<(RegionCategory, Rect)>,
}

impl AnnotatedPage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn ground_truth(&self) -> GroundTruthPage {
        GroundTruthPage {
            class_mask: self.class_mask.clone(),
            regions: self.regions.clone(),
        }
    }
}

/// Polygon vertices in pixel coordinates, without a repeated closing vertex.
fn polygon_points(points: &[[f32; 2]]) -> Vec<Point<i32>> {
    let mut out: Vec<Point<i32>> = points
        .iter()
        .map(|&[x, y]| Point::new(x.round() as i32, y.round() as i32))
        .collect();
    out.dedup();
    if out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

fn polygon_bounds(points: &[Point<i32>], width: u32, height: u32) -> Option<Rect> {
    let x_min = points.iter().map(|p| p.x).min()?.max(0);
    let y_min = points.iter().map(|p| p.y).min()?.max(0);
    let x_max = points.iter().map(|p| p.x).max()?;
    let y_max = points.iter().map(|p| p.y).max()?;
    if x_max < 0 || y_max < 0 {
        return None;
    }
    Rect::from_span(x_min as u32, y_min as u32, x_max as u32, y_max as u32).clamp_to(width, height)
}

/// Draws annotated regions onto a page of the given size.
///
/// Returns the binary mask, the class mask and the clamped bounding boxes of
/// the regions that touch the page. Regions entirely outside the page are
/// skipped.
pub fn rasterize_regions(
    regions: &[RegionAnnotation],
    width: u32,
    height: u32,
    source: &Path,
) -> LayoutResult<(GrayImage, ClassMask, Vec<(RegionCategory, Rect)>)> {
    let mut mask = GrayImage::new(width, height);
    let mut class_mask = ClassMask::new(width, height);
    let mut boxes = Vec::with_capacity(regions.len());

    for (i, region) in regions.iter().enumerate() {
        match &region.shape {
            RegionShape::Box { bbox } => {
                let [x, y, w, h] = *bbox;
                if w == 0 || h == 0 {
                    return Err(LayoutError::annotation(
                        source,
                        format!("region {i} has an empty bbox"),
                    ));
                }
                if x.checked_add(w).is_none() || y.checked_add(h).is_none() {
                    return Err(LayoutError::annotation(
                        source,
                        format!("region {i} bbox {bbox:?} overflows the coordinate range"),
                    ));
                }
                let Some(rect) = Rect::new(x, y, w, h).clamp_to(width, height) else {
                    continue;
                };
                class_mask.fill_rect(&rect, region.category.index() as i16);
                for py in rect.y..rect.bottom() {
                    for px in rect.x..rect.right() {
                        mask.put_pixel(px, py, Luma([255]));
                    }
                }
                boxes.push((region.category, rect));
            }
            RegionShape::Polygon { points } => {
                let poly = polygon_points(points);
                if poly.len() < 3 {
                    return Err(LayoutError::annotation(
                        source,
                        format!("region {i} needs at least 3 distinct points"),
                    ));
                }
                let Some(rect) = polygon_bounds(&poly, width, height) else {
                    continue;
                };
                let mut stencil = GrayImage::new(width, height);
                draw_polygon_mut(&mut stencil, &poly, Luma([255]));
                draw_polygon_mut(&mut mask, &poly, Luma([255]));
                class_mask.paint(&stencil, region.category);
                boxes.push((region.category, rect));
            }
        }
    }
    Ok((mask, class_mask, boxes))
}

/// Loads an annotation file together with its page image.
///
/// The image path inside the file is resolved against the data directory,
/// the parent of the `annotations/` folder.
pub fn load_annotated_page(path: &Path) -> LayoutResult<AnnotatedPage> {
    let annotation = PageAnnotation::from_file(path)?;
    let root = path
        .parent()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new("."));
    let image_path = root.join(&annotation.image);
    let image = load_gray_image(&image_path)?;
    let (width, height) = image.dimensions();

    let (mask, class_mask, regions) = rasterize_regions(&annotation.regions, width, height, path)?;
    debug!(
        "Loaded {} ({}x{}, {} regions)",
        path.display(),
        width,
        height,
        regions.len()
    );
    Ok(AnnotatedPage {
        image,
        mask,
        class_mask,
        regions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_both_shapes() {
        let json = r#"{
            "image": "scans/p1.png",
            "regions": [
                { "category": "text", "points": [[0, 0], [4, 0], [4, 4]] },
                { "category": "stamp", "bbox": [1, 2, 3, 4] }
            ]
        }"#;
        let annotation: PageAnnotation = serde_json::from_str(json).unwrap();
        assert_eq!(annotation.image, PathBuf::from("scans/p1.png"));
        assert_eq!(annotation.regions.len(), 2);
        assert!(matches!(annotation.regions[0].shape, RegionShape::Polygon { .. }));
        assert_eq!(annotation.regions[1].category, RegionCategory::Stamp);
        assert_eq!(
            annotation.regions[1].shape,
            RegionShape::Box { bbox: [1, 2, 3, 4] }
        );
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let json = r#"{ "image": "p.png", "regions": [ { "category": "map", "bbox": [0, 0, 1, 1] } ] }"#;
        assert!(serde_json::from_str::<PageAnnotation>(json).is_err());
    }

    #[test]
    fn test_rasterize_later_regions_override() {
        let regions = vec![
            RegionAnnotation {
                category: RegionCategory::Table,
                shape: RegionShape::Box {
                    bbox: [0, 0, 10, 10],
                },
            },
            RegionAnnotation {
                category: RegionCategory::Stamp,
                shape: RegionShape::Box {
                    bbox: [5, 5, 10, 10],
                },
            },
        ];
        let (mask, class_mask, boxes) =
            rasterize_regions(&regions, 12, 12, Path::new("a.json")).unwrap();

        assert_eq!(class_mask.get(2, 2), RegionCategory::Table.index() as i16);
        assert_eq!(class_mask.get(6, 6), RegionCategory::Stamp.index() as i16);
        assert_eq!(class_mask.get(11, 0), ClassMask::BACKGROUND);
        assert_eq!(mask.get_pixel(11, 11)[0], 255);
        assert_eq!(boxes[1], (RegionCategory::Stamp, Rect::new(5, 5, 7, 7)));
    }

    #[test]
    fn test_rasterize_polygon() {
        let regions = vec![RegionAnnotation {
            category: RegionCategory::Image,
            shape: RegionShape::Polygon {
                points: vec![[2.0, 2.0], [8.0, 2.0], [8.0, 8.0], [2.0, 8.0], [2.0, 2.0]],
            },
        }];
        let (mask, class_mask, boxes) =
            rasterize_regions(&regions, 10, 10, Path::new("a.json")).unwrap();
        assert_eq!(mask.get_pixel(5, 5)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
        assert_eq!(class_mask.get(5, 5), RegionCategory::Image.index() as i16);
        assert_eq!(boxes, vec![(RegionCategory::Image, Rect::new(2, 2, 7, 7))]);
    }

    #[test]
    fn test_rasterize_rejects_degenerate_regions() {
        let line = vec![RegionAnnotation {
            category: RegionCategory::Text,
            shape: RegionShape::Polygon {
                points: vec![[0.0, 0.0], [5.0, 5.0]],
            },
        }];
        assert!(rasterize_regions(&line, 10, 10, Path::new("a.json")).is_err());

        let empty = vec![RegionAnnotation {
            category: RegionCategory::Text,
            shape: RegionShape::Box { bbox: [0, 0, 0, 5] },
        }];
        assert!(rasterize_regions(&empty, 10, 10, Path::new("a.json")).is_err());
    }

    #[test]
    fn test_rasterize_rejects_overflowing_bbox() {
        for bbox in [[u32::MAX - 5, 0, 10, 10], [0, u32::MAX, 10, 1]] {
            let regions = vec![RegionAnnotation {
                category: RegionCategory::Table,
                shape: RegionShape::Box { bbox },
            }];
            let result = rasterize_regions(&regions, 10, 10, Path::new("a.json"));
            assert!(matches!(result, Err(LayoutError::Annotation { .. })));
        }
    }

    #[test]
    fn test_load_annotated_page() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(ANNOTATION_FOLDER)).unwrap();
        GrayImage::from_pixel(20, 10, Luma([200]))
            .save(dir.path().join("page.png"))
            .unwrap();
        let annotation_path = dir.path().join(ANNOTATION_FOLDER).join("page.json");
        std::fs::write(
            &annotation_path,
            r#"{ "image": "page.png", "regions": [ { "category": "title", "bbox": [2, 2, 5, 3] } ] }"#,
        )
        .unwrap();

        let page = load_annotated_page(&annotation_path).unwrap();
        assert_eq!((page.width(), page.height()), (20, 10));
        assert_eq!(
            page.regions,
            vec![(RegionCategory::Title, Rect::new(2, 2, 5, 3))]
        );
        assert_eq!(page.ground_truth().regions.len(), 1);
        assert_eq!(page.mask.pixels().filter(|p| p[0] == 255).count(), 15);
    }

    #[test]
    fn test_malformed_annotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_annotated_page(&path).unwrap_err();
        assert!(matches!(err, LayoutError::Annotation { .. }));
    }
}
