// ============================================================
// Layer 2 - EvaluateUseCase
// ============================================================
// Scores a saved model on the validation split it was trained
// against:
//
//   Step 1: Locate the version's artifacts     (Layer 6 - infra)
//   Step 2: Re-ingest with the saved class list (Layer 4 - data)
//   Step 3: Rebuild the validation split with
//           the recorded seed and ratio         (Layer 4 - data)
//   Step 4: Classify every validation image     (Layer 5 - ml)
//   Step 5: Write report + confusion matrix     (Layer 6 - infra)
//
// Seed, ratio and image size come from metadata.json when it
// exists; the configured values are only a fallback.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::data::{
    codec::{rescale, ImageCodec},
    ingestor::{DatasetIngestor, DatasetSource},
    splitter::split,
};
use crate::domain::prediction::argmax;
use crate::domain::tensor::{ImageTensor, CHANNELS};
use crate::infra::{
    artifact_store::{read_labels, ArtifactStore},
    reports::{write_reports, ConfusionMatrix},
};
use crate::ml::{default_device, inferencer::InferenceService, InferBackend};

#[derive(Debug, Clone)]
pub struct EvaluateConfig {
    pub model_version: String,
    pub artifact_root: PathBuf,
    pub reports_dir:   PathBuf,
    pub raw_zip_path:  PathBuf,
    pub extract_dir:   PathBuf,
    pub lung_path:     PathBuf,
    // fallbacks when the artifact has no metadata
    pub img_size:      u32,
    pub split:         f64,
    pub seed:          u64,
}

#[derive(Debug)]
pub struct EvaluateSummary {
    pub matrix:      ConfusionMatrix,
    pub report_path: PathBuf,
    pub matrix_path: PathBuf,
}

pub struct EvaluateUseCase {
    config: EvaluateConfig,
}

impl EvaluateUseCase {
    pub fn new(config: EvaluateConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<EvaluateSummary> {
        let cfg = &self.config;

        // ── Step 1: Artifacts ─────────────────────────────────────────────────
        let store    = ArtifactStore::new(&cfg.artifact_root);
        let paths    = store.load_paths(&cfg.model_version)?;
        let labels   = read_labels(&paths.classes)?;
        let metadata = store.load_metadata(&cfg.model_version)?;

        let (img_size, ratio, seed) = match &metadata {
            Some(m) => (m.img_size, m.split, m.seed),
            None => {
                tracing::warn!("No metadata for '{}'; using configured split settings", cfg.model_version);
                (cfg.img_size, cfg.split, cfg.seed)
            }
        };

        // ── Step 2: Ingest ────────────────────────────────────────────────────
        let source = DatasetSource {
            archive:     Some(cfg.raw_zip_path.clone()),
            extract_dir: cfg.extract_dir.clone(),
            image_root:  cfg.lung_path.clone(),
        };
        let dataset = DatasetIngestor::new(source, ImageCodec::new(img_size)?)
            .ingest(&labels)
            .context("dataset ingestion failed")?;

        // ── Step 3: Validation split ──────────────────────────────────────────
        let parts = split(dataset.images, dataset.targets, ratio, seed)?;
        tracing::info!("Evaluating on {} validation images", parts.x_val.len());

        // ── Step 4: Classify ──────────────────────────────────────────────────
        let service = InferenceService::from_artifacts::<InferBackend>(
            &paths,
            img_size,
            &cfg.model_version,
            &default_device(),
        )?;

        let side       = img_size as usize;
        let mut matrix = ConfusionMatrix::new(&labels);
        for (pixels, target) in parts.x_val.iter().zip(&parts.y_val) {
            let input      = ImageTensor::new([1, side, side, CHANNELS], rescale(pixels))?;
            let prediction = service.predict_tensor(&input)?;

            let truth     = argmax(target).context("validation label is not one-hot")?;
            let predicted = labels
                .index_of(&prediction.predicted_class)
                .context("prediction names an unknown class")?;
            matrix.record(truth, predicted);
        }
        tracing::info!("Validation accuracy: {:.4}", matrix.accuracy());

        // ── Step 5: Reports ───────────────────────────────────────────────────
        let (report_path, matrix_path) = write_reports(&cfg.reports_dir, &cfg.model_version, &matrix)?;

        Ok(EvaluateSummary { matrix, report_path, matrix_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{TrainConfig, TrainUseCase};
    use crate::data::codec::tests::png_bytes;
    use crate::domain::labels::DEFAULT_CLASSES;
    use std::fs;
    use std::path::Path;

    fn evaluate_config(root: &Path) -> EvaluateConfig {
        EvaluateConfig {
            model_version: "v1".into(),
            artifact_root: root.join("artifacts"),
            reports_dir:   root.join("reports"),
            raw_zip_path:  root.join("missing.zip"),
            extract_dir:   root.join("raw"),
            lung_path:     root.join("raw/lung_image_sets"),
            img_size:      8,
            split:         0.25,
            seed:          2022,
        }
    }

    #[test]
    fn test_unknown_version_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(EvaluateUseCase::new(evaluate_config(dir.path())).execute().is_err());
    }

    #[test]
    fn test_reports_cover_validation_split() {
        let dir = tempfile::tempdir().unwrap();
        for (class, rgb) in DEFAULT_CLASSES.iter().zip([[220, 20, 20], [20, 220, 20], [20, 20, 220]]) {
            let class_dir = dir.path().join("raw/lung_image_sets").join(class);
            fs::create_dir_all(&class_dir).unwrap();
            for i in 0..4 {
                fs::write(class_dir.join(format!("{i}.png")), png_bytes(9, 9, rgb)).unwrap();
            }
        }

        let train = TrainConfig {
            img_size:      8,
            split:         0.25,
            batch_size:    4,
            epochs:        1,
            raw_zip_path:  dir.path().join("missing.zip"),
            extract_dir:   dir.path().join("raw"),
            lung_path:     dir.path().join("raw/lung_image_sets"),
            artifact_root: dir.path().join("artifacts"),
            reports_dir:   dir.path().join("reports"),
            ..TrainConfig::default()
        };
        TrainUseCase::new(train).execute().unwrap();

        // the fallback seed is wrong on purpose; metadata must win
        let cfg     = EvaluateConfig { seed: 1, ..evaluate_config(dir.path()) };
        let summary = EvaluateUseCase::new(cfg).execute().unwrap();

        assert_eq!(summary.matrix.total(), 3);
        assert!(summary.report_path.is_file());
        assert!(summary.matrix_path.is_file());
    }
}
