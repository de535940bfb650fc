//! ONNX Runtime session settings.
//!
//! All fields are optional; anything left unset keeps the runtime default,
//! except the log level, which is lowered to `Error` so model loading stays
//! quiet.

use serde::{Deserialize, Serialize};

/// Graph optimization level applied when a session is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrtGraphOptimizationLevel {
    DisableAll,
    #[default]
    Level1,
    Level2,
    /// Every optimization, including layout transforms.
    Level3,
}

/// Minimum severity of ONNX Runtime's own log messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrtLogLevel {
    Verbose,
    Info,
    Warning,
    #[default]
    Error,
    Fatal,
}

/// Device a session runs on. Listed providers are tried in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum OrtExecutionProvider {
    #[default]
    CPU,
    /// Needs the `cuda` feature; ignored with a warning otherwise.
    CUDA { device_id: Option<i32> },
}

/// Per-session ONNX Runtime settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrtSessionConfig {
    /// Threads inside one operator.
    pub intra_threads: Option<usize>,
    /// Threads across independent operators.
    pub inter_threads: Option<usize>,
    pub optimization_level: Option<OrtGraphOptimizationLevel>,
    pub log_level: Option<OrtLogLevel>,
    pub execution_providers: Option<Vec<OrtExecutionProvider>>,
}

impl OrtSessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = Some(threads);
        self
    }

    pub fn with_inter_threads(mut self, threads: usize) -> Self {
        self.inter_threads = Some(threads);
        self
    }

    pub fn with_optimization_level(mut self, level: OrtGraphOptimizationLevel) -> Self {
        self.optimization_level = Some(level);
        self
    }

    pub fn with_log_level(mut self, level: OrtLogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn with_execution_providers(mut self, providers: Vec<OrtExecutionProvider>) -> Self {
        self.execution_providers = Some(providers);
        self
    }
}

/// Settings shared by every model loaded through [`crate::core::inference::OrtInfer`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelInferenceConfig {
    /// Name used in logs and errors; defaults to the model file stem.
    pub model_name: Option<String>,
    /// Sessions kept in the pool (default: 1).
    pub session_pool_size: Option<usize>,
    pub ort_session: Option<OrtSessionConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_builder() {
        let config = OrtSessionConfig::new()
            .with_intra_threads(4)
            .with_optimization_level(OrtGraphOptimizationLevel::Level3)
            .with_log_level(OrtLogLevel::Warning);
        assert_eq!(config.intra_threads, Some(4));
        assert_eq!(config.inter_threads, None);
        assert_eq!(
            config.optimization_level,
            Some(OrtGraphOptimizationLevel::Level3)
        );
        assert_eq!(config.log_level, Some(OrtLogLevel::Warning));
        assert!(config.execution_providers.is_none());
    }

    #[test]
    fn test_session_config_from_toml() {
        let config: ModelInferenceConfig = toml::from_str(
            r#"
            session_pool_size = 2

            [ort_session]
            intra_threads = 2
            optimization_level = "level2"
            execution_providers = ["CPU", { CUDA = { device_id = 1 } }]
            "#,
        )
        .unwrap();
        assert_eq!(config.session_pool_size, Some(2));
        let session = config.ort_session.unwrap();
        assert_eq!(
            session.optimization_level,
            Some(OrtGraphOptimizationLevel::Level2)
        );
        assert_eq!(
            session.execution_providers.unwrap(),
            vec![
                OrtExecutionProvider::CPU,
                OrtExecutionProvider::CUDA { device_id: Some(1) }
            ]
        );
        assert!(session.log_level.is_none());
    }
}
