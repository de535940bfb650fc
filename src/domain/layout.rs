//! Analyzed pages and ground-truth class maps.

use super::region::{Rect, RegionCategory};
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// A classified content region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutRegion {
    /// Region bounds in page pixels.
    pub rect: Rect,
    /// Most probable category.
    pub category: RegionCategory,
    /// Softmax probability of `category`.
    pub score: f32,
    /// Softmax probabilities of all categories in class-index order.
    pub class_scores: Vec<f32>,
}

impl LayoutRegion {
    /// Builds a region from classifier probabilities.
    ///
    /// Returns `None` when `probabilities` is empty or its argmax is not a
    /// known category.
    pub fn from_probabilities(rect: Rect, probabilities: Vec<f32>) -> Option<Self> {
        let (best, score) = probabilities
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (idx, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((idx, p)),
            })?;
        Some(Self {
            rect,
            category: RegionCategory::from_index(best)?,
            score,
            class_scores: probabilities,
        })
    }
}

/// Layout of one page.
#[derive(Debug, Clone)]
pub struct LayoutAnalysis {
    pub width: u32,
    pub height: u32,
    /// Binary content mask at page resolution (0 or 255).
    pub mask: GrayImage,
    /// Regions sorted top-to-bottom, then left-to-right.
    pub regions: Vec<LayoutRegion>,
}

impl LayoutAnalysis {
    /// Fraction of page pixels marked as content.
    pub fn coverage(&self) -> f32 {
        let total = self.mask.len();
        if total == 0 {
            return 0.0;
        }
        let on = self.mask.as_raw().iter().filter(|&&v| v > 0).count();
        on as f32 / total as f32
    }
}

/// Per-pixel ground-truth categories; `-1` marks background.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMask {
    width: u32,
    height: u32,
    labels: Vec<i16>,
}

impl ClassMask {
    pub const BACKGROUND: i16 = -1;

    /// Creates an all-background mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            labels: vec![Self::BACKGROUND; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> i16 {
        self.labels[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, label: i16) {
        let idx = y as usize * self.width as usize + x as usize;
        self.labels[idx] = label;
    }

    /// Sets every pixel of a rectangle that lies inside the mask.
    pub fn fill_rect(&mut self, rect: &Rect, label: i16) {
        let Some(rect) = rect.clamp_to(self.width, self.height) else {
            return;
        };
        for y in rect.y..rect.bottom() {
            for x in rect.x..rect.right() {
                self.set(x, y, label);
            }
        }
    }

    /// Copies the labels of `category` pixels of a binary stencil (any non-zero
    /// pixel) into this mask.
    pub fn paint(&mut self, stencil: &GrayImage, category: RegionCategory) {
        for (x, y, pixel) in stencil.enumerate_pixels() {
            if pixel[0] > 0 && x < self.width && y < self.height {
                self.set(x, y, category.index() as i16);
            }
        }
    }

    /// Per-category pixel counts inside a rectangle.
    pub fn histogram(&self, rect: &Rect) -> [u64; RegionCategory::COUNT] {
        let mut counts = [0u64; RegionCategory::COUNT];
        let Some(rect) = rect.clamp_to(self.width, self.height) else {
            return counts;
        };
        for y in rect.y..rect.bottom() {
            let row = y as usize * self.width as usize;
            for &label in &self.labels[row + rect.x as usize..row + rect.right() as usize] {
                if label >= 0 && (label as usize) < RegionCategory::COUNT {
                    counts[label as usize] += 1;
                }
            }
        }
        counts
    }

    /// Binary foreground mask (255 for any labelled pixel).
    pub fn to_binary(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            image::Luma([if self.get(x, y) >= 0 { 255 } else { 0 }])
        })
    }
}
