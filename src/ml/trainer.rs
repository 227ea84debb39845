// ============================================================
// Layer 5 - Burn Trainer
// ============================================================
// The burn-backed TrainableClassifier: one LungCnn, its Adam
// optimiser and the two data loaders. The TrainingController
// calls it one epoch at a time.
//
// Backend split:
//   - Training uses B (Autodiff<...>) for gradients
//   - model.valid() returns the model on B::InnerBackend
//   - The validation batcher therefore uses B::InnerBackend
//   - argmax(1) returns [batch, 1]; count_correct flattens it
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use std::sync::Arc;

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::batcher::{ImageBatch, ImageBatcher};
use crate::data::dataset::ImageDataset;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::traits::{EpochScore, ExportWeights, TrainableClassifier};
use crate::ml::model::{count_correct, LungCnn, LungCnnConfig};

/// Loader settings shared by both splits
#[derive(Debug, Clone, Copy)]
pub struct LoaderSettings {
    pub batch_size:  usize,
    pub img_size:    usize,
    /// Seeds the per-epoch shuffle of the training loader
    pub seed:        u64,
    pub num_workers: usize,
}

pub struct BurnTrainer<B: AutodiffBackend, O> {
    model:        LungCnn<B>,
    optim:        O,
    train_loader: Arc<dyn DataLoader<ImageBatch<B>>>,
    val_loader:   Arc<dyn DataLoader<ImageBatch<B::InnerBackend>>>,
}

/// Fresh model + Adam over the given splits.
pub fn adam_trainer<B: AutodiffBackend>(
    model_cfg: &LungCnnConfig,
    train:     ImageDataset,
    val:       ImageDataset,
    loader:    LoaderSettings,
    device:    &B::Device,
) -> BurnTrainer<B, impl Optimizer<LungCnn<B>, B>> {
    let model: LungCnn<B> = model_cfg.init(device);
    tracing::info!(
        "Model ready: {} classes, input {}x{}x3",
        model_cfg.num_classes, model_cfg.img_size, model_cfg.img_size
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let optim = AdamConfig::new().with_epsilon(1e-8).init::<B, LungCnn<B>>();

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_loader = DataLoaderBuilder::new(ImageBatcher::<B>::new(device.clone(), loader.img_size))
        .batch_size(loader.batch_size)
        .shuffle(loader.seed)
        .num_workers(loader.num_workers)
        .build(train);

    // ── Validation data loader (InnerBackend - no autodiff overhead) ──────────
    let val_loader =
        DataLoaderBuilder::new(ImageBatcher::<B::InnerBackend>::new(device.clone(), loader.img_size))
            .batch_size(loader.batch_size)
            .num_workers(loader.num_workers)
            .build(val);

    BurnTrainer { model, optim, train_loader, val_loader }
}

impl<B: AutodiffBackend, O> BurnTrainer<B, O> {
    pub fn model(&self) -> &LungCnn<B> {
        &self.model
    }
}

impl<B, O> TrainableClassifier for BurnTrainer<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<LungCnn<B>, B>,
{
    type Snapshot = LungCnn<B>;

    fn train_epoch(&mut self, learning_rate: f64) -> PipelineResult<EpochScore> {
        let mut model    = self.model.clone();
        let mut loss_sum = 0.0f64;
        let mut correct  = 0usize;
        let mut seen     = 0usize;

        for batch in self.train_loader.iter() {
            let n = batch.targets.dims()[0];
            let (loss, logits) = model.forward_loss(batch.images, batch.targets.clone());

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            loss_sum += loss_val * n as f64;
            correct  += count_correct(logits, batch.targets);
            seen     += n;

            // Backward pass + Adam update
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = self.optim.step(learning_rate, model, grads);
        }
        self.model = model;

        score(loss_sum, correct, seen, "training")
    }

    fn validate(&self) -> PipelineResult<EpochScore> {
        // dropout is disabled on the inner backend
        let model = self.model.valid();

        let mut loss_sum = 0.0f64;
        let mut correct  = 0usize;
        let mut seen     = 0usize;

        for batch in self.val_loader.iter() {
            let n = batch.targets.dims()[0];
            let (loss, logits) = model.forward_loss(batch.images, batch.targets.clone());

            loss_sum += loss.into_scalar().elem::<f64>() * n as f64;
            correct  += count_correct(logits, batch.targets);
            seen     += n;
        }

        score(loss_sum, correct, seen, "validation")
    }

    fn snapshot(&self) -> LungCnn<B> {
        self.model.clone()
    }

    fn restore(&mut self, snapshot: LungCnn<B>) {
        self.model = snapshot;
    }
}

impl<B: AutodiffBackend, O> ExportWeights for BurnTrainer<B, O> {
    fn export_weights(&self) -> PipelineResult<Vec<u8>> {
        self.model.valid().to_bytes()
    }
}

/// Sample-weighted mean loss and accuracy
fn score(loss_sum: f64, correct: usize, seen: usize, split: &str) -> PipelineResult<EpochScore> {
    if seen == 0 {
        return Err(PipelineError::TrainingData(format!("{split} split produced no batches")));
    }
    Ok(EpochScore {
        loss:     loss_sum / seen as f64,
        accuracy: correct as f64 / seen as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::one_hot;
    use crate::ml::TrainBackend;

    fn tiny_split(n: usize) -> ImageDataset {
        let images  = (0..n).map(|i| vec![(i * 40 % 255) as u8; 8 * 8 * 3]).collect();
        let targets = (0..n).map(|i| one_hot(i % 3, 3)).collect();
        ImageDataset::new(images, targets)
    }

    fn trainer() -> BurnTrainer<TrainBackend, impl Optimizer<LungCnn<TrainBackend>, TrainBackend>> {
        let device = Default::default();
        let loader = LoaderSettings { batch_size: 4, img_size: 8, seed: 1, num_workers: 1 };
        adam_trainer::<TrainBackend>(&LungCnnConfig::new(3, 8), tiny_split(6), tiny_split(3), loader, &device)
    }

    #[test]
    fn test_one_epoch_produces_finite_scores() {
        let mut t = trainer();
        let train = t.train_epoch(1e-3).unwrap();
        let val   = t.validate().unwrap();

        assert!(train.loss.is_finite());
        assert!((0.0..=1.0).contains(&val.accuracy));
    }

    #[test]
    fn test_restore_brings_back_snapshot_weights() {
        let mut t  = trainer();
        let before = t.export_weights().unwrap();
        let snap   = t.snapshot();

        t.train_epoch(1e-2).unwrap();
        assert_ne!(t.export_weights().unwrap(), before);

        t.restore(snap);
        assert_eq!(t.export_weights().unwrap(), before);
    }

    #[test]
    fn test_empty_validation_split_is_an_error() {
        let device = Default::default();
        let loader = LoaderSettings { batch_size: 2, img_size: 8, seed: 1, num_workers: 1 };
        let t = adam_trainer::<TrainBackend>(
            &LungCnnConfig::new(3, 8),
            tiny_split(2),
            ImageDataset::new(Vec::new(), Vec::new()),
            loader,
            &device,
        );
        assert!(matches!(t.validate(), Err(PipelineError::TrainingData(_))));
    }
}
