//! Structures and helpers for ONNX Runtime inference.
//!
//! This module centralizes the session pool used by the segmentation and
//! region classification models.

pub mod ort_infer;

pub use ort_infer::OrtInfer;
