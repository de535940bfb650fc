use super::*;
use crate::core::config::{
    ModelInferenceConfig, OrtExecutionProvider, OrtGraphOptimizationLevel, OrtLogLevel,
    OrtSessionConfig,
};
use itertools::Itertools;
use ort::execution_providers::{CPUExecutionProvider, ExecutionProviderDispatch};
use ort::logging::LogLevel;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use std::path::Path;
use std::sync::atomic::AtomicUsize;
use tracing::debug;

impl OrtInfer {
    /// Loads a single session with default settings.
    pub fn new(
        model_path: impl AsRef<Path>,
        input_name: Option<&str>,
    ) -> Result<Self, LayoutError> {
        Self::from_config(&ModelInferenceConfig::default(), model_path, input_name)
    }

    /// Loads `session_pool_size` sessions of one model, each configured from
    /// `config.ort_session`.
    ///
    /// `input_name` defaults to `"input"`, the name both layout models are
    /// exported with.
    pub fn from_config(
        config: &ModelInferenceConfig,
        model_path: impl AsRef<Path>,
        input_name: Option<&str>,
    ) -> Result<Self, LayoutError> {
        let path = model_path.as_ref();
        let pool_size = config.session_pool_size.unwrap_or(1).max(1);
        let sessions = (0..pool_size)
            .map(|_| Self::load_pooled_session(path, config.ort_session.as_ref()))
            .map_ok(Mutex::new)
            .collect::<Result<Vec<_>, _>>()?;

        let model_name = config
            .model_name
            .clone()
            .unwrap_or_else(|| model_stem(path));
        debug!(
            target: "inference",
            model = %model_name,
            path = %path.display(),
            pool_size,
            "Loaded ONNX model"
        );

        Ok(OrtInfer {
            sessions,
            next_idx: AtomicUsize::new(0),
            input_name: input_name.unwrap_or("input").to_string(),
            model_path: path.to_path_buf(),
            model_name,
        })
    }

    fn load_pooled_session(
        path: &Path,
        session: Option<&OrtSessionConfig>,
    ) -> Result<Session, LayoutError> {
        let builder = match session {
            Some(cfg) => Self::configure(Session::builder()?, cfg)?,
            None => Session::builder()?.with_log_level(LogLevel::Error)?,
        };
        builder.commit_from_file(path).map_err(|e| {
            LayoutError::model_load_error(
                path,
                "failed to create ONNX session",
                Some("check the model file and the configured execution providers"),
                Some(e),
            )
        })
    }

    fn configure(
        mut builder: SessionBuilder,
        cfg: &OrtSessionConfig,
    ) -> Result<SessionBuilder, ort::Error> {
        let log_level = match cfg.log_level.unwrap_or_default() {
            OrtLogLevel::Verbose => LogLevel::Verbose,
            OrtLogLevel::Info => LogLevel::Info,
            OrtLogLevel::Warning => LogLevel::Warning,
            OrtLogLevel::Error => LogLevel::Error,
            OrtLogLevel::Fatal => LogLevel::Fatal,
        };
        builder = builder.with_log_level(log_level)?;

        if let Some(threads) = cfg.intra_threads {
            builder = builder.with_intra_threads(threads)?;
        }
        if let Some(threads) = cfg.inter_threads {
            builder = builder.with_inter_threads(threads)?;
        }
        if let Some(level) = cfg.optimization_level {
            builder = builder.with_optimization_level(match level {
                OrtGraphOptimizationLevel::DisableAll => GraphOptimizationLevel::Disable,
                OrtGraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
                OrtGraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
                OrtGraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
            })?;
        }

        let providers = cfg
            .execution_providers
            .as_deref()
            .map(execution_providers)
            .unwrap_or_default();
        if !providers.is_empty() {
            builder = builder.with_execution_providers(providers)?;
        }
        Ok(builder)
    }
}

fn execution_providers(requested: &[OrtExecutionProvider]) -> Vec<ExecutionProviderDispatch> {
    requested
        .iter()
        .filter_map(|ep| match ep {
            OrtExecutionProvider::CPU => Some(CPUExecutionProvider::default().build()),
            #[cfg(feature = "cuda")]
            OrtExecutionProvider::CUDA { device_id } => {
                let mut cuda = ort::execution_providers::CUDAExecutionProvider::default();
                if let Some(id) = device_id {
                    cuda = cuda.with_device_id(*id);
                }
                Some(cuda.build())
            }
            #[cfg(not(feature = "cuda"))]
            OrtExecutionProvider::CUDA { .. } => {
                tracing::warn!("CUDA requested but the cuda feature is not enabled, skipping");
                None
            }
        })
        .collect()
}

fn model_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown_model")
        .to_string()
}
