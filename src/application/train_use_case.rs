// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Extract + ingest the images   (Layer 4 - data)
//   Step 2: Seeded train/validation split (Layer 4 - data)
//   Step 3: Persist the label ordering    (Layer 6 - infra)
//   Step 4: Build model, Adam, loaders    (Layer 5 - ml)
//   Step 5: Run the controlled epoch loop (Layer 5 - ml)
//   Step 6: Save weights, labels and
//           metadata for this version     (Layer 6 - infra)
//
// Failure rules:
//   - ingestion or split fails   → nothing is written
//   - a metric becomes NaN/inf   → weights and metadata are
//                                  not written (the class list
//                                  from step 3 stays)
//
// Reference: Burn Book §5 (Training)

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::data::{
    codec::ImageCodec,
    dataset::{class_distribution, ImageDataset},
    ingestor::{DatasetIngestor, DatasetSource},
    splitter::split,
};
use crate::domain::labels::{LabelSet, DEFAULT_CLASSES};
use crate::domain::metadata::RunMetadata;
use crate::infra::{
    artifact_store::{ArtifactPaths, ArtifactStore},
    metrics::MetricsLogger,
};
use crate::ml::{
    controller::{ControllerSettings, TrainingController, TrainingOutcome},
    default_device,
    model::{LungCnnConfig, MIN_IMG_SIZE},
    trainer::{adam_trainer, LoaderSettings},
    TrainBackend,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All knobs for a training run. Serialisable so a run's exact settings can be
// logged or stored next to its reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub img_size:            u32,
    /// Validation fraction
    pub split:               f64,
    pub batch_size:          usize,
    pub epochs:              usize,
    pub seed:                u64,
    pub model_version:       String,

    pub raw_zip_path:        PathBuf,
    pub extract_dir:         PathBuf,
    pub lung_path:           PathBuf,
    pub artifact_root:       PathBuf,
    pub reports_dir:         PathBuf,

    pub classes:             Vec<String>,
    pub learning_rate:       f64,
    pub early_stop_patience: usize,
    pub lr_patience:         usize,
    pub target_accuracy:     f64,
    pub num_workers:         usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            img_size:            256,
            split:               0.2,
            batch_size:          64,
            epochs:              10,
            seed:                2022,
            model_version:       "v1".to_string(),
            raw_zip_path:        "data/raw/lung-and-colon-cancer-histopathological-images.zip".into(),
            extract_dir:         "data/raw/lung_colon_image_set".into(),
            lung_path:           "data/raw/lung_colon_image_set/lung_image_sets".into(),
            artifact_root:       "artifacts/models".into(),
            reports_dir:         "artifacts/reports".into(),
            classes:             DEFAULT_CLASSES.iter().map(|c| c.to_string()).collect(),
            learning_rate:       1e-3,
            early_stop_patience: 3,
            lr_patience:         2,
            target_accuracy:     0.90,
            num_workers:         1,
        }
    }
}

impl TrainConfig {
    fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            epochs:              self.epochs,
            learning_rate:       self.learning_rate,
            early_stop_patience: self.early_stop_patience,
            lr_patience:         self.lr_patience,
            target_accuracy:     self.target_accuracy,
            ..ControllerSettings::default()
        }
    }
}

/// What a finished run produced
#[derive(Debug)]
pub struct TrainSummary {
    pub outcome: TrainingOutcome,
    pub paths:   ArtifactPaths,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;

        ensure!(
            cfg.img_size as usize >= MIN_IMG_SIZE,
            "image size must be at least {MIN_IMG_SIZE}, got {}",
            cfg.img_size
        );
        ensure!(cfg.batch_size > 0, "batch size must be positive");
        ensure!(cfg.epochs > 0, "epochs must be positive");

        let labels = LabelSet::new(cfg.classes.iter().cloned())?;
        let codec  = ImageCodec::new(cfg.img_size)?;
        let store  = ArtifactStore::new(&cfg.artifact_root);
        // Rejects bad version strings before any work is done
        store.version_dir(&cfg.model_version)?;

        // ── Step 1: Extract + ingest ──────────────────────────────────────────
        tracing::info!("Loading images from '{}'", cfg.lung_path.display());
        let source = DatasetSource {
            archive:     Some(cfg.raw_zip_path.clone()),
            extract_dir: cfg.extract_dir.clone(),
            image_root:  cfg.lung_path.clone(),
        };
        let dataset = DatasetIngestor::new(source, codec)
            .ingest(&labels)
            .context("dataset ingestion failed")?;
        tracing::info!("Class distribution: {:?}", dataset.class_distribution());

        // ── Step 2: Train / validation split ──────────────────────────────────
        let parts = split(dataset.images, dataset.targets, cfg.split, cfg.seed)
            .context("train/validation split failed")?;
        tracing::info!(
            "Split: {} train {:?}, {} validation {:?}",
            parts.x_train.len(),
            class_distribution(&parts.y_train, labels.len()),
            parts.x_val.len(),
            class_distribution(&parts.y_val, labels.len()),
        );

        // ── Step 3: Persist label ordering ────────────────────────────────────
        store.save_labels(&cfg.model_version, &labels)?;

        // ── Step 4: Model, optimiser, loaders ─────────────────────────────────
        let device  = default_device();
        let loader  = LoaderSettings {
            batch_size:  cfg.batch_size,
            img_size:    cfg.img_size as usize,
            seed:        cfg.seed,
            num_workers: cfg.num_workers.max(1),
        };
        let mut trainer = adam_trainer::<TrainBackend>(
            &LungCnnConfig::new(labels.len(), cfg.img_size as usize),
            ImageDataset::new(parts.x_train, parts.y_train),
            ImageDataset::new(parts.x_val, parts.y_val),
            loader,
            &device,
        );

        // ── Step 5: Epoch loop ────────────────────────────────────────────────
        let metrics    = MetricsLogger::create(&cfg.reports_dir, &cfg.model_version)?;
        let controller = TrainingController::new(cfg.controller_settings());
        let outcome    = controller
            .run(&mut trainer, |record| metrics.log(record))
            .context("training aborted")?;

        tracing::info!(
            "Training finished after {} epoch(s): {}",
            outcome.epochs_run,
            outcome.stop_reason
        );

        // ── Step 6: Persist the run ───────────────────────────────────────────
        let metadata = RunMetadata {
            model_version:      cfg.model_version.clone(),
            img_size:           cfg.img_size,
            epochs:             cfg.epochs,
            batch_size:         cfg.batch_size,
            split:              cfg.split,
            seed:               cfg.seed,
            saved_at_utc:       RunMetadata::timestamp(Utc::now()),
            classes:            labels.as_slice().to_vec(),
            learning_rate:      Some(cfg.learning_rate),
            epochs_run:         Some(outcome.epochs_run),
            stop_reason:        Some(outcome.stop_reason),
            best_epoch:         outcome.best_epoch,
            final_val_accuracy: outcome.final_val_accuracy,
        };
        let paths = store.save(&trainer, &labels, &metadata)?;
        tracing::info!("History written to '{}'", metrics.csv_path().display());

        Ok(TrainSummary { outcome, paths })
    }
}
