//! File-backed configuration for an analysis or evaluation run.
//!
//! The layout follows the experiment directory convention used for the
//! archive collections: a list of annotated data directories that are split
//! into train/validation parts by seed, a separate test list, and the model
//! and region extraction settings.
//!
//! ```toml
//! [data]
//! list = ["data/metric_books"]
//! seed = 42
//! train_fraction = 0.8
//!
//! [test]
//! list = ["data/holdout"]
//! batch = 4
//!
//! [model]
//! segmentation_path = "models/unet.onnx"
//! classifier_path = "models/squeezenet.onnx"
//! ```

use super::errors::{ConfigError, ConfigValidator};
use super::onnx::OrtSessionConfig;
use crate::core::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_CLASSIFIER_CHUNK, DEFAULT_INPUT_HEIGHT, DEFAULT_INPUT_WIDTH,
    DEFAULT_MASK_THRESHOLD, DEFAULT_MATCH_IOU, DEFAULT_MIN_REGION_AREA, DEFAULT_MIN_REGION_SIDE,
    DEFAULT_PATCH_SIZE, DEFAULT_PROJECTION_LEN,
};
use crate::core::errors::{LayoutError, LayoutResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Data directories for the train/validation split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directories that each contain an `annotations/` folder.
    pub list: Vec<PathBuf>,
    /// Seed for the shuffle that precedes the split.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Fraction of files assigned to the training part.
    #[serde(default = "default_train_fraction")]
    pub train_fraction: f32,
}

fn default_seed() -> u64 {
    42
}

fn default_train_fraction() -> f32 {
    0.8
}

fn default_batch() -> usize {
    DEFAULT_BATCH_SIZE
}

/// Batch settings of a split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    #[serde(default = "default_batch")]
    pub batch: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            batch: DEFAULT_BATCH_SIZE,
        }
    }
}

/// The held-out test split, read from its own directories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestSplitConfig {
    #[serde(default)]
    pub list: Vec<PathBuf>,
    #[serde(default = "default_batch")]
    pub batch: usize,
}

/// Model files and their input geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub segmentation_path: PathBuf,
    pub classifier_path: PathBuf,
    /// Segmentation input width in pixels.
    pub input_width: u32,
    /// Segmentation input height in pixels.
    pub input_height: u32,
    /// Side of the square patch fed to the region classifier.
    pub patch_size: u32,
    /// Probability above which a pixel belongs to a content region.
    pub mask_threshold: f32,
    /// Maximum number of patches classified in one model call.
    pub classifier_chunk: usize,
    pub session_pool_size: Option<usize>,
    /// Runtime settings shared by both model sessions.
    pub ort_session: Option<OrtSessionConfig>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            segmentation_path: PathBuf::from("models/segmentation.onnx"),
            classifier_path: PathBuf::from("models/classifier.onnx"),
            input_width: DEFAULT_INPUT_WIDTH,
            input_height: DEFAULT_INPUT_HEIGHT,
            patch_size: DEFAULT_PATCH_SIZE,
            mask_threshold: DEFAULT_MASK_THRESHOLD,
            classifier_chunk: DEFAULT_CLASSIFIER_CHUNK,
            session_pool_size: None,
            ort_session: None,
        }
    }
}

/// Region extraction and matching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Components with fewer pixels than this are dropped when filtering.
    pub min_area: u32,
    /// Components narrower or shorter than this are dropped when filtering.
    pub min_side: u32,
    /// Length of each projection profile.
    pub projection_len: usize,
    /// IoU required to pair a ground-truth region with a predicted one.
    pub match_iou: f32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            min_area: DEFAULT_MIN_REGION_AREA,
            min_side: DEFAULT_MIN_REGION_SIDE,
            projection_len: DEFAULT_PROJECTION_LEN,
            match_iou: DEFAULT_MATCH_IOU,
        }
    }
}

/// Complete configuration of an experiment directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub train: SplitConfig,
    #[serde(default)]
    pub val: SplitConfig,
    #[serde(default)]
    pub test: TestSplitConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub regions: RegionConfig,
}

impl ExperimentConfig {
    /// Loads and validates a configuration file.
    ///
    /// Files ending in `.toml` are parsed as TOML, everything else as JSON.
    pub fn load(path: impl AsRef<Path>) -> LayoutResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let config: Self = if is_toml {
            toml::from_str(&text)?
        } else {
            serde_json::from_str(&text)?
        };
        config.validate().map_err(LayoutError::from)?;
        debug!(
            "Loaded experiment config from {} ({} data dirs, {} test dirs)",
            path.display(),
            config.data.list.len(),
            config.test.list.len()
        );
        Ok(config)
    }
}

impl ConfigValidator for ExperimentConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.data.list.is_empty() {
            return Err(ConfigError::InvalidConfig {
                message: "data.list must name at least one directory".to_string(),
            });
        }
        self.validate_unit_interval("data.train_fraction", self.data.train_fraction)?;
        self.validate_batch_size("train.batch", self.train.batch)?;
        self.validate_batch_size("val.batch", self.val.batch)?;
        self.validate_batch_size("test.batch", self.test.batch)?;
        self.validate_batch_size("model.classifier_chunk", self.model.classifier_chunk)?;
        self.validate_image_dimensions(
            "model input size",
            self.model.input_width,
            self.model.input_height,
        )?;
        self.validate_image_dimensions(
            "model.patch_size",
            self.model.patch_size,
            self.model.patch_size,
        )?;
        self.validate_open_unit_interval("model.mask_threshold", self.model.mask_threshold)?;
        if self.regions.match_iou <= 0.0 || self.regions.match_iou > 1.0 {
            return Err(ConfigError::OutOfRange {
                field: "regions.match_iou".to_string(),
                message: format!("must be in (0, 1], got {}", self.regions.match_iou),
            });
        }
        if self.regions.projection_len == 0 {
            return Err(ConfigError::InvalidConfig {
                message: "regions.projection_len must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self {
            data: DataConfig {
                list: vec![PathBuf::from("data")],
                seed: default_seed(),
                train_fraction: default_train_fraction(),
            },
            train: SplitConfig::default(),
            val: SplitConfig::default(),
            test: TestSplitConfig::default(),
            model: ModelConfig::default(),
            regions: RegionConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::onnx::OrtGraphOptimizationLevel;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ExperimentConfig::get_defaults();
        assert!(config.validate().is_ok());
        assert_eq!(config.model.input_width, 724);
        assert_eq!(config.model.input_height, 1024);
    }

    #[test]
    fn test_load_json_with_partial_sections() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{
                "data": {{"list": ["data/a", "data/b"], "seed": 7, "train_fraction": 0.75}},
                "train": {{"batch": 8}},
                "test": {{"list": ["data/test"], "batch": 2}},
                "model": {{"patch_size": 128}}
            }}"#
        )
        .unwrap();

        let config = ExperimentConfig::load(file.path()).unwrap();
        assert_eq!(config.data.list.len(), 2);
        assert_eq!(config.data.seed, 7);
        assert_eq!(config.train.batch, 8);
        assert_eq!(config.val.batch, DEFAULT_BATCH_SIZE);
        assert_eq!(config.test.batch, 2);
        assert_eq!(config.model.patch_size, 128);
        assert_eq!(config.model.input_width, DEFAULT_INPUT_WIDTH);
        assert_eq!(config.regions.projection_len, DEFAULT_PROJECTION_LEN);
    }

    #[test]
    fn test_load_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[data]
list = ["archive"]

[regions]
match_iou = 0.6
"#
        )
        .unwrap();

        let config = ExperimentConfig::load(file.path()).unwrap();
        assert_eq!(config.data.seed, 42);
        assert!((config.regions.match_iou - 0.6).abs() < f32::EPSILON);
        assert!(config.model.ort_session.is_none());
    }

    #[test]
    fn test_load_toml_session_settings() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[data]
list = ["archive"]

[model]
session_pool_size = 2

[model.ort_session]
intra_threads = 2
optimization_level = "level3"
"#
        )
        .unwrap();

        let config = ExperimentConfig::load(file.path()).unwrap();
        assert_eq!(config.model.session_pool_size, Some(2));
        assert_eq!(config.model.patch_size, DEFAULT_PATCH_SIZE);
        let session = config.model.ort_session.unwrap();
        assert_eq!(session.intra_threads, Some(2));
        assert_eq!(
            session.optimization_level,
            Some(OrtGraphOptimizationLevel::Level3)
        );
        assert!(session.inter_threads.is_none());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ExperimentConfig::get_defaults();
        config.data.train_fraction = 1.5;
        assert!(config.validate().is_err());

        let mut config = ExperimentConfig::get_defaults();
        config.model.mask_threshold = 1.0;
        assert!(config.validate().is_err());

        let mut config = ExperimentConfig::get_defaults();
        config.data.list.clear();
        assert!(config.validate().is_err());

        let mut config = ExperimentConfig::get_defaults();
        config.test.batch = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBatchSize { field }) if field == "test.batch"
        ));
    }
}
