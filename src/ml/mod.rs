// ============================================================
// Layer 5 - ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn model, the training loop and
// the inference engine. Besides the tensor batcher in Layer 4,
// no other layer touches burn types.
//
// What's in this layer:
//
//   model.rs      - The LungCnn convolutional classifier and
//                   its weight (de)serialisation
//
//   policies.rs   - Early stopping, LR reduction on plateau,
//                   target-accuracy stop
//
//   controller.rs - The framework-free epoch loop that
//                   applies those policies
//
//   trainer.rs    - The burn TrainableClassifier: forward
//                   pass, loss, backward pass, Adam step,
//                   validation
//
//   inferencer.rs - Loads an artifact pair, runs single-image
//                   predictions, and holds the process-wide
//                   predictor state
//
// Backends:
//   CPU NdArray by default; `--features wgpu` switches both
//   training and serving to the Wgpu backend.
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

use burn::prelude::Backend;

/// LungCnn architecture
pub mod model;

/// Stop and learning-rate rules consulted every epoch
pub mod policies;

/// Epoch loop driving any TrainableClassifier
pub mod controller;

/// Burn-backed trainer (model + Adam + data loaders)
pub mod trainer;

/// Inference engine and predictor state
pub mod inferencer;

#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray;

#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu;

pub type TrainBackend = burn::backend::Autodiff<InferBackend>;

pub fn default_device() -> <InferBackend as Backend>::Device {
    let device = Default::default();
    tracing::debug!("Using device: {:?}", device);
    device
}
