use super::*;
use crate::core::errors::SimpleError;
use crate::core::tensor::Tensor2D;
use ndarray::{ArrayView2, ArrayView4};
use ort::value::TensorRef;

impl OrtInfer {
    /// Name of the model's first output.
    fn get_output_name(&self) -> Result<String, LayoutError> {
        let session = self
            .sessions
            .first()
            .ok_or_else(|| LayoutError::invalid_input("session pool is empty"))?
            .lock()
            .map_err(|_| LayoutError::invalid_input("Failed to acquire session lock"))?;
        session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| {
                LayoutError::invalid_input(
                    "No outputs available in session - model may be invalid or corrupted",
                )
            })
    }

    /// Returns the model path associated with this inference engine.
    pub fn model_path(&self) -> &std::path::Path {
        &self.model_path
    }

    /// Returns the model name associated with this inference engine.
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn run_inference_with_processor<T>(
        &self,
        x: &Tensor4D,
        processor: impl FnOnce(&[i64], &[f32]) -> Result<T, LayoutError>,
    ) -> Result<T, LayoutError> {
        self.check_batch(x)?;
        let input_shape = x.shape().to_vec();
        let output_name = self.get_output_name()?;

        let input_tensor = TensorRef::from_array_view(x.view()).map_err(|e| {
            LayoutError::inference_error(
                &self.model_name,
                &format!("failed to convert input tensor with shape {input_shape:?}"),
                e,
            )
        })?;

        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];

        let idx = self
            .next_idx
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            % self.sessions.len();
        let mut session_guard = self.sessions[idx].lock().map_err(|_| {
            LayoutError::inference_error(
                &self.model_name,
                &format!(
                    "failed to acquire session lock for session {}/{}",
                    idx,
                    self.sessions.len()
                ),
                SimpleError::new("Session lock acquisition failed"),
            )
        })?;

        let outputs = session_guard.run(inputs).map_err(|e| {
            LayoutError::inference_error(
                &self.model_name,
                &format!(
                    "forward pass failed with input '{}' -> output '{}'",
                    self.input_name, output_name
                ),
                e,
            )
        })?;

        let (output_shape, output_data) = outputs[output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                LayoutError::inference_error(
                    &self.model_name,
                    &format!("failed to extract output tensor '{}' as f32", output_name),
                    e,
                )
            })?;

        processor(output_shape, output_data)
    }

    /// Checks an output tensor's rank and data length and returns its
    /// dimensions.
    fn output_dims<const N: usize>(
        &self,
        shape: &[i64],
        data_len: usize,
    ) -> Result<[usize; N], LayoutError> {
        let dims: Option<Vec<usize>> = shape.iter().map(|&d| usize::try_from(d).ok()).collect();
        let dims: [usize; N] = dims
            .and_then(|d| d.try_into().ok())
            .ok_or_else(|| {
                LayoutError::tensor_operation(
                    &format!("model '{}' returned shape {shape:?}", self.model_name),
                    SimpleError::new(format!("expected a {N}D output tensor")),
                )
            })?;
        let expected: usize = dims.iter().product();
        if expected != data_len {
            return Err(LayoutError::validation_error(
                &self.model_name,
                "output length",
                &expected.to_string(),
                &data_len.to_string(),
            ));
        }
        Ok(dims)
    }

    /// Runs a model with a `[B, C, H, W]` output, such as the segmentation network.
    pub fn infer_4d(&self, x: &Tensor4D) -> Result<Tensor4D, LayoutError> {
        self.run_inference_with_processor(x, |shape, data| {
            let [b, c, h, w] = self.output_dims::<4>(shape, data.len())?;
            Ok(ArrayView4::from_shape((b, c, h, w), data)?.to_owned())
        })
    }

    /// Runs a model with a `[B, K]` output, such as the region classifier.
    pub fn infer_2d(&self, x: &Tensor4D) -> Result<Tensor2D, LayoutError> {
        let batch = x.shape()[0];
        self.run_inference_with_processor(x, |shape, data| {
            let [rows, classes] = self.output_dims::<2>(shape, data.len())?;
            if rows != batch {
                return Err(LayoutError::validation_error(
                    &self.model_name,
                    "output batch",
                    &batch.to_string(),
                    &rows.to_string(),
                ));
            }
            Ok(ArrayView2::from_shape((rows, classes), data)?.to_owned())
        })
    }
}
