//! Annotated archive pages for evaluation.
//!
//! A data directory holds page scans and an `annotations/` folder with one
//! JSON file per page (see [`annotation`] for the format).

pub mod annotation;
pub mod layout_dataset;
pub mod split;

pub use annotation::{
    ANNOTATION_FOLDER, AnnotatedPage, PageAnnotation, RegionAnnotation, RegionShape,
    load_annotated_page, rasterize_regions,
};
pub use layout_dataset::LayoutDataset;
pub use split::{list_annotation_files, split_files};
