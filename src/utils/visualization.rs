//! Rendering of layout analysis results.
//!
//! Pages are drawn in grayscale with the predicted content mask blended in,
//! a rectangle around every region and a `t:<true>;p:<predicted>` label in
//! its top-left corner. Label text needs a font; without one only the boxes
//! are drawn.
//!
//! ```rust,no_run
//! use archlayout::utils::visualization::{VisualizationConfig, render_analysis};
//! # fn demo(page: &image::GrayImage, analysis: &archlayout::domain::LayoutAnalysis) {
//! let config = VisualizationConfig::with_system_font();
//! let image = render_analysis(page, analysis, None, &config);
//! image.save("layout.png").ok();
//! # }
//! ```

use crate::core::errors::{LayoutError, LayoutResult};
use crate::domain::{ClassMask, LayoutAnalysis, Rect, RegionCategory};
use crate::processors::majority_class;
use ab_glyph::FontVec;
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use std::path::Path;
use tracing::{debug, info};

const BBOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Blend color of the predicted content mask.
pub const MASK_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Configuration for layout visualization.
pub struct VisualizationConfig {
    /// The font to use for labels. If None, labels are skipped.
    pub font: Option<FontVec>,

    /// The scale factor for the font. Defaults to 14.0.
    pub font_scale: f32,

    /// The thickness of region outlines. Defaults to 2.
    pub bbox_thickness: i32,
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            font: None,
            font_scale: 14.0,
            bbox_thickness: 2,
        }
    }
}

impl VisualizationConfig {
    /// Creates a configuration with a font loaded from the specified path.
    pub fn with_font_path(font_path: &Path) -> LayoutResult<Self> {
        let font_data = std::fs::read(font_path)?;
        let font = FontVec::try_from_vec(font_data).map_err(|_| {
            LayoutError::invalid_input(format!(
                "failed to parse font file: {}",
                font_path.display()
            ))
        })?;

        Ok(Self {
            font: Some(font),
            ..Self::default()
        })
    }

    /// Creates a configuration with a system font.
    ///
    /// Falls back to the default configuration when no font is found.
    pub fn with_system_font() -> Self {
        let font_paths = [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/System/Library/Fonts/Arial.ttf",
            "C:\\Windows\\Fonts\\arial.ttf",
        ];

        for path in &font_paths {
            if let Ok(font_data) = std::fs::read(path)
                && let Ok(font) = FontVec::try_from_vec(font_data)
            {
                info!("Loaded system font: {}", path);
                return Self {
                    font: Some(font),
                    ..Self::default()
                };
            }
        }

        debug!("No system font found, labels will be skipped");
        Self::default()
    }
}

/// Converts a grayscale page to RGB and blends `color` into masked pixels.
///
/// A masked pixel becomes `pixel / 2 + color / 2`.
pub fn overlay_mask(gray: &GrayImage, mask: &GrayImage, color: Rgb<u8>) -> LayoutResult<RgbImage> {
    if gray.dimensions() != mask.dimensions() {
        return Err(LayoutError::validation_error(
            "overlay_mask",
            "mask size",
            &format!("{}x{}", gray.width(), gray.height()),
            &format!("{}x{}", mask.width(), mask.height()),
        ));
    }
    Ok(RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0];
        if mask.get_pixel(x, y)[0] > 0 {
            Rgb(color.0.map(|c| v / 2 + c / 2))
        } else {
            Rgb([v, v, v])
        }
    }))
}

/// Label of a region: `t:<true>;p:<predicted>`, with `bad` for unknown classes.
pub fn region_label(true_class: i64, predicted_class: i64) -> String {
    format!(
        "t:{};p:{}",
        RegionCategory::label_name(true_class),
        RegionCategory::label_name(predicted_class)
    )
}

fn measure_text(text: &str, font: &FontVec, scale: f32) -> (u32, u32) {
    use ab_glyph::{Font, ScaleFont};

    let scaled_font = font.as_scaled(scale);
    let width: f32 = text
        .chars()
        .map(|ch| scaled_font.h_advance(scaled_font.glyph_id(ch)))
        .sum();
    (width.ceil() as u32, scaled_font.height().ceil() as u32)
}

fn draw_outline(img: &mut RgbImage, rect: &Rect, thickness: i32) {
    let (width, height) = img.dimensions();
    for t in 0..thickness.max(1) {
        let x = rect.x as i32 + t;
        let y = rect.y as i32 + t;
        let w = rect.w as i32 - 2 * t;
        let h = rect.h as i32 - 2 * t;
        if w <= 0 || h <= 0 || x >= width as i32 || y >= height as i32 {
            break;
        }
        let outline = imageproc::rect::Rect::at(x, y).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(img, outline, BBOX_COLOR);
    }
}

/// Draws region outlines and, when a font is configured, their labels.
///
/// `labels` pairs with `rects` by position; missing labels are not drawn.
pub fn draw_regions(
    img: &mut RgbImage,
    rects: &[Rect],
    labels: &[String],
    config: &VisualizationConfig,
) {
    for (i, rect) in rects.iter().enumerate() {
        draw_outline(img, rect, config.bbox_thickness);

        let (Some(font), Some(label)) = (config.font.as_ref(), labels.get(i)) else {
            continue;
        };
        let (text_w, text_h) = measure_text(label, font, config.font_scale);
        let label_box = imageproc::rect::Rect::at(rect.x as i32, rect.y as i32)
            .of_size(text_w + 3, text_h + 4);
        draw_filled_rect_mut(img, label_box, BBOX_COLOR);
        draw_text_mut(
            img,
            TEXT_COLOR,
            rect.x as i32 + 1,
            rect.y as i32 + 2,
            config.font_scale,
            font,
            label,
        );
    }
}

/// Renders a page with its analysis.
///
/// With a ground-truth class mask, each label shows the region's majority
/// true class; otherwise the true class is `bad`.
pub fn render_analysis(
    page: &GrayImage,
    analysis: &LayoutAnalysis,
    truth: Option<&ClassMask>,
    config: &VisualizationConfig,
) -> RgbImage {
    let mut img = overlay_mask(page, &analysis.mask, MASK_COLOR).unwrap_or_else(|e| {
        debug!("Skipping mask overlay: {}", e);
        image::DynamicImage::ImageLuma8(page.clone()).to_rgb8()
    });

    let rects: Vec<Rect> = analysis.regions.iter().map(|r| r.rect).collect();
    let labels: Vec<String> = analysis
        .regions
        .iter()
        .map(|r| {
            let true_class = truth.map_or(-1, |mask| majority_class(mask, &r.rect) as i64);
            region_label(true_class, r.category.index() as i64)
        })
        .collect();
    draw_regions(&mut img, &rects, &labels, config);
    img
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LayoutRegion;
    use image::Luma;

    #[test]
    fn test_overlay_mask_blends() {
        let gray = GrayImage::from_pixel(2, 1, Luma([100]));
        let mut mask = GrayImage::new(2, 1);
        mask.put_pixel(1, 0, Luma([255]));

        let img = overlay_mask(&gray, &mask, MASK_COLOR).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [100, 100, 100]);
        assert_eq!(img.get_pixel(1, 0).0, [177, 50, 50]);
        assert!(overlay_mask(&gray, &GrayImage::new(1, 1), MASK_COLOR).is_err());
    }

    #[test]
    fn test_region_label() {
        assert_eq!(region_label(2, 0), "t:table;p:text");
        assert_eq!(region_label(-1, 4), "t:bad;p:stamp");
    }

    #[test]
    fn test_render_analysis_draws_outlines() {
        let page = GrayImage::from_pixel(20, 20, Luma([255]));
        let region = LayoutRegion::from_probabilities(
            Rect::new(2, 2, 10, 10),
            vec![0.9, 0.1, 0.0, 0.0, 0.0],
        )
        .unwrap();
        let analysis = LayoutAnalysis {
            width: 20,
            height: 20,
            mask: GrayImage::new(20, 20),
            regions: vec![region],
        };

        let img = render_analysis(&page, &analysis, None, &VisualizationConfig::default());
        assert_eq!(img.get_pixel(2, 2).0, BBOX_COLOR.0);
        assert_eq!(img.get_pixel(3, 3).0, BBOX_COLOR.0);
        assert_eq!(img.get_pixel(6, 6).0, [255, 255, 255]);
    }
}
