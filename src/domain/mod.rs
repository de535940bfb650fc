//! Domain types for layout analysis.
//!
//! - [`region`]: region categories and pixel rectangles
//! - [`layout`]: analyzed pages and the per-pixel ground-truth class map

pub mod layout;
pub mod region;

pub use layout::{ClassMask, LayoutAnalysis, LayoutRegion};
pub use region::{Rect, RegionCategory};
