//! Configuration errors and the validation helpers shared by config types.

use thiserror::Error;

/// A configuration value that failed validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{field} must be greater than 0")]
    InvalidBatchSize { field: String },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("{field} out of range: {message}")]
    OutOfRange { field: String, message: String },
}

/// Validation for configuration types.
///
/// Implementors only write [`validate`](ConfigValidator::validate); the
/// provided methods cover the recurring range checks.
pub trait ConfigValidator {
    fn validate(&self) -> Result<(), ConfigError>;

    /// A configuration that passes [`validate`](ConfigValidator::validate).
    fn get_defaults() -> Self
    where
        Self: Sized;

    fn validate_batch_size(&self, field: &str, batch_size: usize) -> Result<(), ConfigError> {
        if batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize {
                field: field.to_string(),
            });
        }
        Ok(())
    }

    /// `value` must lie in `[0, 1]`.
    fn validate_unit_interval(&self, field: &str, value: f32) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::OutOfRange {
                field: field.to_string(),
                message: format!("must be in [0, 1], got {}", value),
            });
        }
        Ok(())
    }

    /// `value` must lie in `(0, 1)`.
    fn validate_open_unit_interval(&self, field: &str, value: f32) -> Result<(), ConfigError> {
        if !(value > 0.0 && value < 1.0) {
            return Err(ConfigError::OutOfRange {
                field: field.to_string(),
                message: format!("must be in (0, 1), got {}", value),
            });
        }
        Ok(())
    }

    fn validate_image_dimensions(
        &self,
        field: &str,
        width: u32,
        height: u32,
    ) -> Result<(), ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidConfig {
                message: format!("{} must be non-zero, got {}x{}", field, width, height),
            });
        }
        Ok(())
    }
}
