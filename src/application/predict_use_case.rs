// ============================================================
// Layer 2 - PredictUseCase
// ============================================================
// Classifies one image file from the command line:
//
//   Step 1: Check the image, weights and class files exist
//   Step 2: Load the artifact pair        (Layer 5 - ml)
//   Step 3: Decode + classify the image   (Layer 4 + 5)
//
// Output is a JSON object:
//   {"image": "...", "predicted_class": "lung_aca",
//    "probabilities": {"lung_n": 0.1, "lung_aca": 0.7, ...}}

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::infra::artifact_store::ArtifactPaths;
use crate::ml::{default_device, inferencer::InferenceService, InferBackend};

#[derive(Debug, Clone)]
pub struct PredictConfig {
    pub image:    PathBuf,
    pub model:    PathBuf,
    pub classes:  PathBuf,
    /// Used only when no metadata.json sits next to the weights
    pub img_size: u32,
}

#[derive(Debug, Serialize)]
pub struct PredictionReport {
    pub image:           String,
    pub predicted_class: String,
    pub probabilities:   Map<String, Value>,
}

pub struct PredictUseCase {
    config: PredictConfig,
}

impl PredictUseCase {
    pub fn new(config: PredictConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<PredictionReport> {
        let cfg = &self.config;

        // ── Step 1: Paths ─────────────────────────────────────────────────────
        for (what, path) in [("Image", &cfg.image), ("Model", &cfg.model), ("Classes file", &cfg.classes)] {
            if !path.is_file() {
                bail!("{what} not found: {}", path.display());
            }
        }

        // ── Step 2: Load ──────────────────────────────────────────────────────
        let paths   = ArtifactPaths { model: cfg.model.clone(), classes: cfg.classes.clone() };
        let version = version_from_path(&cfg.model);
        let service = InferenceService::from_artifacts::<InferBackend>(
            &paths,
            cfg.img_size,
            &version,
            &default_device(),
        )
        .with_context(|| format!("cannot load model '{}'", cfg.model.display()))?;

        // ── Step 3: Classify ──────────────────────────────────────────────────
        let bytes = std::fs::read(&cfg.image)
            .with_context(|| format!("cannot read '{}'", cfg.image.display()))?;
        let prediction = service
            .predict(&bytes)
            .with_context(|| format!("cannot classify '{}'", cfg.image.display()))?;

        let probabilities = prediction
            .probabilities
            .iter()
            .map(|(class, p)| (class.clone(), Value::from(*p as f64)))
            .collect();

        Ok(PredictionReport {
            image: cfg.image.display().to_string(),
            predicted_class: prediction.predicted_class,
            probabilities,
        })
    }
}

/// Artifacts live in `<root>/<version>/`, so the parent directory names the
/// version when there is no metadata to say otherwise.
fn version_from_path(model: &Path) -> String {
    model
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::codec::tests::png_bytes;
    use crate::domain::labels::LabelSet;
    use crate::infra::artifact_store::{write_atomic, ArtifactStore};
    use crate::ml::model::{LungCnn, LungCnnConfig};

    #[test]
    fn test_missing_image_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = PredictConfig {
            image:    dir.path().join("nope.png"),
            model:    dir.path().join("lung_cnn.bin"),
            classes:  dir.path().join("classes.json"),
            img_size: 8,
        };
        let err = PredictUseCase::new(cfg).execute().unwrap_err();
        assert!(err.to_string().contains("Image not found"));
    }

    #[test]
    fn test_predicts_from_explicit_paths() {
        let dir    = tempfile::tempdir().unwrap();
        let store  = ArtifactStore::new(dir.path());
        let paths  = store.paths("v3").unwrap();
        let device = Default::default();

        let model: LungCnn<InferBackend> = LungCnnConfig::new(3, 8).init(&device);
        write_atomic(&paths.model, &model.to_bytes().unwrap()).unwrap();
        store.save_labels("v3", &LabelSet::default()).unwrap();

        let image = dir.path().join("tile.png");
        std::fs::write(&image, png_bytes(20, 20, [120, 60, 180])).unwrap();

        let report = PredictUseCase::new(PredictConfig {
            image,
            model:    paths.model,
            classes:  paths.classes,
            img_size: 8,
        })
        .execute()
        .unwrap();

        assert_eq!(report.probabilities.len(), 3);
        assert!(report.probabilities.contains_key(&report.predicted_class));
        let keys: Vec<&String> = report.probabilities.keys().collect();
        assert_eq!(keys, vec!["lung_n", "lung_aca", "lung_scc"]);
    }

    #[test]
    fn test_version_from_path() {
        assert_eq!(version_from_path(Path::new("artifacts/models/v2/lung_cnn.bin")), "v2");
    }
}
