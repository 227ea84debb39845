// ============================================================
// Layer 5 - Inferencer
// ============================================================
// Three pieces, from the inside out:
//
//   BurnClassifier    - LungCnn behind a Mutex; implements the
//                       domain Classifier trait
//   InferenceService  - classifier + label ordering + codec;
//                       bytes in, Prediction out
//   PredictorState    - process-wide cell, set once at startup:
//                       Loaded(InferenceService) or Unloaded
//
// The input size always comes from the artifact: metadata.json
// when it sits next to the weights, otherwise the configured
// size the artifact is loaded with. Callers never pick it per
// request.

use std::{
    path::Path,
    sync::{Mutex, OnceLock},
};

use burn::{
    prelude::*,
    tensor::{activation::softmax, TensorData},
};

use crate::data::codec::ImageCodec;
use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::labels::LabelSet;
use crate::domain::prediction::Prediction;
use crate::domain::tensor::ImageTensor;
use crate::domain::traits::Classifier;
use crate::infra::artifact_store::{read_labels, read_metadata, ArtifactPaths};
use crate::ml::model::{LungCnn, LungCnnConfig, MIN_IMG_SIZE};

// ─── BurnClassifier ───────────────────────────────────────────────────────────
pub struct BurnClassifier<B: Backend> {
    /// One forward pass at a time
    model:  Mutex<LungCnn<B>>,
    device: B::Device,
}

impl<B: Backend> BurnClassifier<B> {
    pub fn new(model: LungCnn<B>, device: B::Device) -> Self {
        Self { model: Mutex::new(model), device }
    }

    /// Rebuild the architecture for `num_classes` × `img_size` and load the
    /// weights file into it.
    pub fn load(
        weights:     &Path,
        num_classes: usize,
        img_size:    usize,
        device:      &B::Device,
    ) -> PipelineResult<Self> {
        if img_size < MIN_IMG_SIZE {
            return Err(PipelineError::Model(format!(
                "image size {img_size} is below the minimum of {MIN_IMG_SIZE}"
            )));
        }

        let bytes = std::fs::read(weights)?;
        let model: LungCnn<B> = LungCnnConfig::new(num_classes, img_size)
            .init(device)
            .load_bytes(bytes, device)?;
        check_shapes(&model, num_classes, img_size)?;

        Ok(Self::new(model, device.clone()))
    }
}

/// Catch weights trained for another class count or input size before the
/// first request does.
fn check_shapes<B: Backend>(model: &LungCnn<B>, num_classes: usize, img_size: usize) -> PipelineResult<()> {
    let side     = img_size / 8;
    let expected = [[128 * side * side, 256], [128, num_classes]];
    let actual   = [model.fc1.weight.dims(), model.head.weight.dims()];

    if actual != expected {
        return Err(PipelineError::Model(format!(
            "weights do not match {num_classes} classes at {img_size}px \
             (dense shapes {actual:?}, expected {expected:?})"
        )));
    }
    Ok(())
}

impl<B: Backend> Classifier for BurnClassifier<B> {
    fn predict_proba(&self, input: &ImageTensor) -> PipelineResult<Vec<f32>> {
        let tensor = Tensor::<B, 4>::from_data(
            TensorData::new(input.as_slice().to_vec(), input.shape()),
            &self.device,
        );

        let logits = {
            let model = self
                .model
                .lock()
                .map_err(|_| PipelineError::Model("classifier lock poisoned".into()))?;
            model.forward(tensor)
        };

        softmax(logits, 1)
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| PipelineError::Model(format!("cannot read probabilities: {e:?}")))
    }
}

// ─── InferenceService ─────────────────────────────────────────────────────────
pub struct InferenceService {
    classifier:    Box<dyn Classifier>,
    labels:        LabelSet,
    codec:         ImageCodec,
    model_version: String,
}

impl InferenceService {
    pub fn new(
        classifier:    Box<dyn Classifier>,
        labels:        LabelSet,
        codec:         ImageCodec,
        model_version: impl Into<String>,
    ) -> Self {
        Self { classifier, labels, codec, model_version: model_version.into() }
    }

    /// Load an artifact pair with the burn classifier.
    ///
    /// `fallback_img_size` is used only when no metadata.json sits next to
    /// the weights.
    pub fn from_artifacts<B: Backend>(
        paths:             &ArtifactPaths,
        fallback_img_size: u32,
        fallback_version:  &str,
        device:            &B::Device,
    ) -> PipelineResult<Self> {
        let labels   = read_labels(&paths.classes)?;
        let metadata = read_metadata(&paths.metadata())?;

        let (img_size, version) = match &metadata {
            Some(meta) => {
                if meta.img_size != fallback_img_size {
                    tracing::warn!(
                        "Configured image size {} differs from the artifact's {}; using {}",
                        fallback_img_size, meta.img_size, meta.img_size
                    );
                }
                (meta.img_size, meta.model_version.clone())
            }
            None => {
                tracing::warn!(
                    "No metadata next to '{}'; assuming image size {}",
                    paths.model.display(),
                    fallback_img_size
                );
                (fallback_img_size, fallback_version.to_string())
            }
        };

        let classifier = BurnClassifier::<B>::load(&paths.model, labels.len(), img_size as usize, device)?;
        let codec      = ImageCodec::new(img_size)?;

        tracing::info!(
            "Model '{}' loaded: {} classes, {}px input",
            version, labels.len(), img_size
        );
        Ok(Self::new(Box::new(classifier), labels, codec, version))
    }

    /// Classify one encoded image.
    pub fn predict(&self, image_bytes: &[u8]) -> PipelineResult<Prediction> {
        let input = self.codec.decode_and_normalize(image_bytes)?;
        self.predict_tensor(&input)
    }

    pub fn predict_tensor(&self, input: &ImageTensor) -> PipelineResult<Prediction> {
        let probs = self.classifier.predict_proba(input)?;
        Prediction::from_probabilities(&self.labels, &probs)
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn img_size(&self) -> u32 {
        self.codec.size()
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }
}

// ─── PredictorState ───────────────────────────────────────────────────────────
/// Set at most once. A failed or skipped load leaves it Unloaded for the
/// rest of the process; there is no retry.
#[derive(Default)]
pub struct PredictorState {
    slot: OnceLock<Option<InferenceService>>,
}

impl PredictorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of the startup load.
    pub fn initialize(&self, loaded: PipelineResult<InferenceService>) {
        let value = match loaded {
            Ok(service) => Some(service),
            Err(e) => {
                tracing::error!("Model load failed; /predict will answer 503: {}", e);
                None
            }
        };
        if self.slot.set(value).is_err() {
            tracing::warn!("Predictor already initialised; ignoring a second load");
        }
    }

    /// Leave the predictor Unloaded on purpose.
    pub fn skip(&self) {
        tracing::warn!("Model loading skipped; predictions are disabled");
        let _ = self.slot.set(None);
    }

    pub fn service(&self) -> PipelineResult<&InferenceService> {
        self.slot
            .get()
            .and_then(Option::as_ref)
            .ok_or(PipelineError::ServiceUnavailable)
    }

    pub fn is_loaded(&self) -> bool {
        self.service().is_ok()
    }

    pub fn model_version(&self) -> Option<&str> {
        self.service().ok().map(InferenceService::model_version)
    }
}
