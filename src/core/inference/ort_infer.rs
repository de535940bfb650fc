//! ONNX Runtime inference engine with a pool of sessions.

use crate::core::errors::LayoutError;
use crate::core::tensor::Tensor4D;
use ort::{session::Session, value::ValueType};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;

#[path = "ort_infer_builders.rs"]
mod ort_infer_builders;
#[path = "ort_infer_execution.rs"]
mod ort_infer_execution;

/// A pool of sessions for one ONNX model.
///
/// Each call locks the next session round-robin, so one `OrtInfer` shared
/// between threads runs up to `pool_size` forward passes at once.
pub struct OrtInfer {
    pub(super) sessions: Vec<Mutex<Session>>,
    pub(super) next_idx: AtomicUsize,
    pub(super) input_name: String,
    pub(super) model_path: PathBuf,
    pub(super) model_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("model_name", &self.model_name)
            .field("model_path", &self.model_path)
            .field("input_name", &self.input_name)
            .field("pool_size", &self.sessions.len())
            .finish()
    }
}

impl OrtInfer {
    /// Declared shape of the first model input; dynamic axes are `-1`.
    pub fn primary_input_shape(&self) -> Option<Vec<i64>> {
        let session = self.sessions.first()?.lock().ok()?;
        match &session.inputs.first()?.input_type {
            ValueType::Tensor { shape, .. } => Some(shape.iter().copied().collect()),
            _ => None,
        }
    }

    pub(crate) fn check_batch(&self, x: &Tensor4D) -> Result<(), LayoutError> {
        if x.shape()[0] == 0 {
            return Err(LayoutError::invalid_input(format!(
                "model '{}' received an empty batch",
                self.model_name
            )));
        }
        Ok(())
    }
}
