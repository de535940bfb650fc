//! Region categories and axis-aligned pixel rectangles.

use crate::core::errors::LayoutError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Semantic class of a content region on an archive page.
///
/// The discriminant is the class index used by the region classifier output
/// and by ground-truth class masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionCategory {
    /// Body text, handwritten or printed.
    Text = 0,
    /// Headings and form titles.
    Title = 1,
    /// Ruled tables, including register grids.
    Table = 2,
    /// Drawings, photographs and ornaments.
    Image = 3,
    /// Seals, stamps and signatures.
    Stamp = 4,
}

impl RegionCategory {
    /// Number of categories.
    pub const COUNT: usize = 5;

    /// All categories in class-index order.
    pub const ALL: [RegionCategory; Self::COUNT] = [
        RegionCategory::Text,
        RegionCategory::Title,
        RegionCategory::Table,
        RegionCategory::Image,
        RegionCategory::Stamp,
    ];

    /// Class index of this category.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Category for a class index, if it is in range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Category for a signed label as stored in class masks; negative labels
    /// mean "no category".
    pub fn from_label(label: i64) -> Option<Self> {
        usize::try_from(label).ok().and_then(Self::from_index)
    }

    pub fn name(self) -> &'static str {
        match self {
            RegionCategory::Text => "text",
            RegionCategory::Title => "title",
            RegionCategory::Table => "table",
            RegionCategory::Image => "image",
            RegionCategory::Stamp => "stamp",
        }
    }

    /// Display name for a signed label, `"bad"` when it names no category.
    pub fn label_name(label: i64) -> &'static str {
        Self::from_label(label).map_or("bad", Self::name)
    }
}

impl std::fmt::Display for RegionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RegionCategory {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|category| category.name() == normalized)
            .ok_or_else(|| {
                LayoutError::invalid_input(format!(
                    "unknown region category '{}'; expected one of: {}",
                    s,
                    Self::ALL
                        .iter()
                        .map(|c| c.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

/// An axis-aligned rectangle in pixel coordinates.
///
/// `x`/`y` is the top-left pixel; the rectangle covers `w × h` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    #[inline]
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Builds the smallest rectangle covering the inclusive pixel span
    /// `[x_min, x_max] × [y_min, y_max]`.
    pub fn from_span(x_min: u32, y_min: u32, x_max: u32, y_max: u32) -> Self {
        Self {
            x: x_min,
            y: y_min,
            w: x_max.saturating_sub(x_min) + 1,
            h: y_max.saturating_sub(y_min) + 1,
        }
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.w
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    #[inline]
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 > x1 && y2 > y1 {
            Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
        } else {
            None
        }
    }

    pub fn intersection_area(&self, other: &Rect) -> u64 {
        self.intersection(other).map_or(0, |r| r.area())
    }

    /// Intersection over union; 0 when both rectangles are empty.
    pub fn iou(&self, other: &Rect) -> f32 {
        let inter = self.intersection_area(other);
        let union = self.area() + other.area() - inter;
        if union == 0 {
            0.0
        } else {
            inter as f32 / union as f32
        }
    }

    /// Clamps the rectangle to an image of the given size.
    ///
    /// Returns `None` when nothing of the rectangle lies inside the image.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Rect> {
        let x2 = self.right().min(width);
        let y2 = self.bottom().min(height);
        if self.x >= x2 || self.y >= y2 {
            return None;
        }
        Some(Rect::new(self.x, self.y, x2 - self.x, y2 - self.y))
    }

    /// Maps the rectangle from one image resolution to another.
    ///
    /// Edges are scaled independently and rounded outwards so that the result
    /// always covers at least one pixel.
    pub fn scale(&self, from: (u32, u32), to: (u32, u32)) -> Rect {
        let sx = to.0 as f32 / from.0.max(1) as f32;
        let sy = to.1 as f32 / from.1.max(1) as f32;
        let x1 = (self.x as f32 * sx).floor() as u32;
        let y1 = (self.y as f32 * sy).floor() as u32;
        let x2 = ((self.right() as f32 * sx).ceil() as u32).clamp(x1 + 1, to.0.max(x1 + 1));
        let y2 = ((self.bottom() as f32 * sy).ceil() as u32).clamp(y1 + 1, to.1.max(y1 + 1));
        Rect::new(x1, y1, x2 - x1, y2 - y1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_index_roundtrip() {
        for (idx, category) in RegionCategory::ALL.iter().enumerate() {
            assert_eq!(category.index(), idx);
            assert_eq!(RegionCategory::from_index(idx), Some(*category));
        }
        assert_eq!(RegionCategory::from_index(RegionCategory::COUNT), None);
        assert_eq!(RegionCategory::from_label(-1), None);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(
            "Table".parse::<RegionCategory>().unwrap(),
            RegionCategory::Table
        );
        assert_eq!(
            " stamp ".parse::<RegionCategory>().unwrap(),
            RegionCategory::Stamp
        );
        assert!("footnote".parse::<RegionCategory>().is_err());
    }

    #[test]
    fn test_label_name_for_unknown() {
        assert_eq!(RegionCategory::label_name(1), "title");
        assert_eq!(RegionCategory::label_name(-1), "bad");
        assert_eq!(RegionCategory::label_name(9), "bad");
    }

    #[test]
    fn test_rect_iou() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 0, 10, 10);
        assert_eq!(a.intersection_area(&b), 50);
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-6);
        assert_eq!(a.iou(&a), 1.0);
        assert_eq!(a.iou(&Rect::new(20, 20, 5, 5)), 0.0);
    }

    #[test]
    fn test_rect_touching_edges_do_not_intersect() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 0, 10, 10);
        assert!(a.intersection(&b).is_none());
    }

    #[test]
    fn test_rect_from_span_and_contains() {
        let r = Rect::from_span(2, 3, 5, 3);
        assert_eq!(r, Rect::new(2, 3, 4, 1));
        assert!(r.contains(5, 3));
        assert!(!r.contains(6, 3));
    }

    #[test]
    fn test_rect_clamp() {
        let r = Rect::new(90, 90, 20, 20);
        assert_eq!(r.clamp_to(100, 100), Some(Rect::new(90, 90, 10, 10)));
        assert_eq!(Rect::new(100, 0, 5, 5).clamp_to(100, 100), None);
    }

    #[test]
    fn test_rect_scale() {
        let r = Rect::new(10, 20, 30, 40);
        let scaled = r.scale((100, 200), (200, 400));
        assert_eq!(scaled, Rect::new(20, 40, 60, 80));

        let tiny = Rect::new(0, 0, 1, 1).scale((1000, 1000), (10, 10));
        assert_eq!(tiny, Rect::new(0, 0, 1, 1));
    }
}
