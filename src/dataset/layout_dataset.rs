//! Lazily loaded collections of annotated pages.

use super::annotation::{AnnotatedPage, load_annotated_page};
use super::split::{list_annotation_files, split_files};
use crate::core::config::ExperimentConfig;
use crate::core::errors::{LayoutError, LayoutResult};
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::info;

/// A list of annotation files; pages are only read when requested.
#[derive(Debug, Clone, Default)]
pub struct LayoutDataset {
    files: Vec<PathBuf>,
}

impl LayoutDataset {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self { files }
    }

    /// Builds the train, validation and test datasets of an experiment.
    ///
    /// Train and validation come from a seeded split of `data.list`; the
    /// test set holds every file of `test.list`.
    pub fn from_config(
        config: &ExperimentConfig,
    ) -> LayoutResult<(LayoutDataset, LayoutDataset, LayoutDataset)> {
        let files = list_annotation_files(config.data.list.as_slice())?;
        let (train, val) = split_files(files, config.data.seed, config.data.train_fraction);
        let test = if config.test.list.is_empty() {
            Vec::new()
        } else {
            list_annotation_files(config.test.list.as_slice())?
        };
        info!(
            "Datasets: {} train, {} val, {} test",
            train.len(),
            val.len(),
            test.len()
        );
        Ok((Self::new(train), Self::new(val), Self::new(test)))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Loads page `index`.
    pub fn get(&self, index: usize) -> LayoutResult<AnnotatedPage> {
        let path = self.files.get(index).ok_or_else(|| {
            LayoutError::invalid_input(format!(
                "page index {} out of range for {} pages",
                index,
                self.files.len()
            ))
        })?;
        load_annotated_page(path)
    }

    /// Iterates over consecutive batches of at most `batch_size` pages.
    ///
    /// The pages of a batch are loaded in parallel when the batch is
    /// requested. A `batch_size` of 0 is treated as 1.
    pub fn batches(
        &self,
        batch_size: usize,
    ) -> impl Iterator<Item = LayoutResult<Vec<AnnotatedPage>>> + '_ {
        self.files
            .chunks(batch_size.max(1))
            .map(|chunk| chunk.par_iter().map(|p| load_annotated_page(p)).collect())
    }
}
