// ============================================================
// Layer 3 - Core Traits (Abstractions)
// ============================================================
// The seams between the pipeline and the things it treats as
// opaque capabilities:
//
//   Classifier          - forward pass for serving
//   TrainableClassifier - one epoch of fitting + validation
//   ExportWeights       - turn trained weights into bytes
//   ArtifactSource      - fetch a named file from a remote repo
//
// The burn-backed implementations live in Layer 5 (ml) and the
// HTTP source in Layer 6 (infra). Tests substitute scripted
// fakes, which is how the stopping rules and the acquirer are
// checked without a real network or a real CNN.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)
//            Rust Book §17 (Trait Objects)

use std::path::{Path, PathBuf};

use crate::domain::error::PipelineResult;
use crate::domain::tensor::ImageTensor;

// ─── Classifier ───────────────────────────────────────────────────────────────
/// A loaded model that maps one preprocessed image to class probabilities.
///
/// Implementations must be safe to call from several request handlers at
/// once, either because the forward pass is re-entrant or because they
/// serialise it internally.
pub trait Classifier: Send + Sync {
    /// `input` has shape [1, img_size, img_size, 3]. The returned vector has
    /// one probability per class, in label order.
    fn predict_proba(&self, input: &ImageTensor) -> PipelineResult<Vec<f32>>;
}

// ─── TrainableClassifier ──────────────────────────────────────────────────────
/// Loss and accuracy over one pass of a data split
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochScore {
    pub loss:     f64,
    pub accuracy: f64,
}

/// A model plus its optimiser and data, driven one epoch at a time by the
/// training controller. The controller owns the stopping rules and the
/// learning rate; the implementation owns the maths.
pub trait TrainableClassifier {
    /// Opaque copy of the weights, used to restore the best epoch
    type Snapshot;

    /// Run one full pass over the training split at the given learning rate.
    fn train_epoch(&mut self, learning_rate: f64) -> PipelineResult<EpochScore>;

    /// Score the current weights on the validation split.
    fn validate(&self) -> PipelineResult<EpochScore>;

    fn snapshot(&self) -> Self::Snapshot;

    fn restore(&mut self, snapshot: Self::Snapshot);
}

// ─── ExportWeights ────────────────────────────────────────────────────────────
/// Anything whose learned parameters can be written to an artifact file.
/// The artifact store decides where and how the bytes land on disk.
pub trait ExportWeights {
    fn export_weights(&self) -> PipelineResult<Vec<u8>>;
}

// ─── ArtifactSource ───────────────────────────────────────────────────────────
/// A place model artifacts can be downloaded from.
///
/// Implementations:
///   - LocalOnlySource → never fetches; used when no remote is configured
///   - HubSource       → HTTP download from a model hub repository
pub trait ArtifactSource: Send + Sync {
    /// Download `filename` from `repo` and place it at exactly `dest`.
    ///
    /// Must not leave a partial file at `dest` on failure.
    fn fetch(&self, repo: &str, filename: &str, dest: &Path) -> PipelineResult<PathBuf>;
}
