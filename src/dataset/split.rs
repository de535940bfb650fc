//! Discovery of annotation files and the seeded train/validation split.

use super::annotation::ANNOTATION_FOLDER;
use crate::core::errors::{LayoutError, LayoutResult};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::path::{Path, PathBuf};
use tracing::debug;

fn is_annotation_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Lists the annotation files of the given data directories.
///
/// Every directory must contain an `annotations/` folder. The returned
/// paths are sorted, so the listing does not depend on file system order.
pub fn list_annotation_files<P: AsRef<Path>>(dirs: &[P]) -> LayoutResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for dir in dirs {
        let folder = dir.as_ref().join(ANNOTATION_FOLDER);
        if !folder.is_dir() {
            return Err(LayoutError::invalid_input(format!(
                "{} has no '{}' folder",
                dir.as_ref().display(),
                ANNOTATION_FOLDER
            )));
        }
        for entry in std::fs::read_dir(&folder)? {
            let path = entry?.path();
            if is_annotation_file(&path) {
                files.push(path);
            }
        }
    }
    files.sort();
    debug!("Found {} files in {} directories", files.len(), dirs.len());
    Ok(files)
}

/// Shuffles `files` with a seeded generator and cuts it into train and
/// validation parts.
///
/// The first `floor(len * train_fraction)` shuffled files form the training
/// part. The same seed and input always give the same split.
pub fn split_files(
    mut files: Vec<PathBuf>,
    seed: u64,
    train_fraction: f32,
) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut rng = StdRng::seed_from_u64(seed);
    files.shuffle(&mut rng);

    // f32 fractions such as 0.7 sit just below their decimal value
    let fraction = train_fraction.clamp(0.0, 1.0) as f64;
    let split_at = ((files.len() as f64 * fraction + 1e-6).floor() as usize).min(files.len());
    let val = files.split_off(split_at);

    debug!("Split: {} train, {} validation", files.len(), val.len());
    (files, val)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<PathBuf> {
        (0..n)
            .map(|i| PathBuf::from(format!("{i:03}.json")))
            .collect()
    }

    #[test]
    fn test_split_sizes() {
        let (train, val) = split_files(names(10), 42, 0.8);
        assert_eq!(train.len(), 8);
        assert_eq!(val.len(), 2);

        let (train, val) = split_files(names(7), 42, 0.5);
        assert_eq!(train.len(), 3);
        assert_eq!(val.len(), 4);

        let (train, val) = split_files(Vec::new(), 1, 0.8);
        assert!(train.is_empty() && val.is_empty());
    }

    #[test]
    fn test_split_is_deterministic_and_complete() {
        let a = split_files(names(20), 7, 0.6);
        let b = split_files(names(20), 7, 0.6);
        assert_eq!(a, b);

        let mut all: Vec<PathBuf> = a.0.into_iter().chain(a.1).collect();
        all.sort();
        assert_eq!(all, names(20));
    }

    #[test]
    fn test_list_annotation_files() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join(ANNOTATION_FOLDER);
        std::fs::create_dir_all(&folder).unwrap();
        for name in ["b.json", "a.json", "notes.txt"] {
            std::fs::write(folder.join(name), "{}").unwrap();
        }

        let files = list_annotation_files(&[dir.path()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);

        let missing = tempfile::tempdir().unwrap();
        assert!(list_annotation_files(&[missing.path()]).is_err());
    }
}
