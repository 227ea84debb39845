// ============================================================
// Layer 4 - Dataset Ingestor
// ============================================================
// Turns the raw dataset on disk into a LabeledDataset.
//
//   archive.zip ──extract_if_needed──▶ extract_dir/
//                                         └── <image_root>/
//                                               ├── lung_n/*.jpeg
//                                               ├── lung_aca/*.jpeg
//                                               └── lung_scc/*.jpeg
//
// For each class, in label order:
//   1. list image files (jpeg / jpg / png, sorted by path)
//   2. decode + resize them with the shared ImageCodec
//   3. append (pixels, one-hot(class index))
//
// Ingestion is best-effort: a file that fails to decode is
// logged and skipped, never fatal. Only a completely empty
// result aborts the run.
//
// Files inside one class are decoded in parallel with rayon;
// collect() keeps the sorted order so the dataset, and hence
// the seeded split, is reproducible.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::data::archive::extract_if_needed;
use crate::data::codec::ImageCodec;
use crate::data::dataset::{one_hot, LabeledDataset};
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::labels::LabelSet;

const IMAGE_EXTENSIONS: [&str; 3] = ["jpeg", "jpg", "png"];

/// Where the raw images come from
#[derive(Debug, Clone)]
pub struct DatasetSource {
    /// Zip archive to expand; None when the images are already a directory tree
    pub archive:     Option<PathBuf>,
    /// Directory the archive expands into
    pub extract_dir: PathBuf,
    /// Directory holding one subdirectory per class
    pub image_root:  PathBuf,
}

pub struct DatasetIngestor {
    source: DatasetSource,
    codec:  ImageCodec,
}

impl DatasetIngestor {
    pub fn new(source: DatasetSource, codec: ImageCodec) -> Self {
        Self { source, codec }
    }

    /// Materialise the dataset and decode every class in label order.
    pub fn ingest(&self, labels: &LabelSet) -> PipelineResult<LabeledDataset> {
        if let Some(archive) = &self.source.archive {
            extract_if_needed(archive, &self.source.extract_dir)?;
        }

        let root = &self.source.image_root;
        if !root.is_dir() {
            return Err(PipelineError::TrainingData(format!(
                "image root '{}' does not exist",
                root.display()
            )));
        }

        let mut images  = Vec::new();
        let mut targets = Vec::new();

        for (class_idx, class) in labels.iter().enumerate() {
            let files   = list_images(&root.join(class))?;
            let decoded = self.decode_all(&files);
            let kept    = decoded.len();

            tracing::info!(
                "Class '{}': {} decoded, {} skipped",
                class,
                kept,
                files.len() - kept
            );
            if kept == 0 {
                tracing::warn!("Class '{}' has no usable images", class);
            }

            for pixels in decoded {
                images.push(pixels);
                targets.push(one_hot(class_idx, labels.len()));
            }
        }

        if images.is_empty() {
            return Err(PipelineError::TrainingData(format!(
                "no decodable images found under '{}'",
                root.display()
            )));
        }

        tracing::info!("Ingested {} images across {} classes", images.len(), labels.len());

        Ok(LabeledDataset {
            img_size: self.codec.size(),
            labels:   labels.clone(),
            images,
            targets,
        })
    }

    /// Decode files in parallel, dropping the ones that fail
    fn decode_all(&self, files: &[PathBuf]) -> Vec<Vec<u8>> {
        let results: Vec<PipelineResult<Vec<u8>>> = files
            .par_iter()
            .map(|path| {
                let bytes = fs::read(path)?;
                self.codec.decode_resized(&bytes)
            })
            .collect();

        files
            .iter()
            .zip(results)
            .filter_map(|(path, res)| match res {
                Ok(pixels) => Some(pixels),
                Err(e) => {
                    tracing::warn!("Skipping '{}': {}", path.display(), e);
                    None
                }
            })
            .collect()
    }
}

/// Image files directly inside `dir`, sorted. A missing directory yields none.
fn list_images(dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        tracing::warn!("Class directory '{}' does not exist", dir.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if is_image && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
