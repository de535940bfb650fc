//! The layout analysis pipeline.
//!
//! [`LayoutAnalyzer`] turns pages into classified regions; [`Evaluator`] runs
//! the same models over annotated pages and scores them.

pub mod analyzer;
pub mod evaluator;

pub use analyzer::{LayoutAnalyzer, LayoutAnalyzerBuilder};
pub use evaluator::{EvaluationReport, Evaluator};
