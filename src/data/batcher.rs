// ============================================================
// Layer 4 - Image Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<ImageSample>
// into one batch of tensors.
//
// How batching works here:
//   Input:  N samples, each size × size × 3 bytes (B, G, R)
//   Output: images  [N, size, size, 3]  f32 in [0, 1]
//           targets [N]                 class indices
//
// The u8 → f32 rescale happens here, once per batch, through
// the same `rescale` the serving codec uses. This is the only
// place training data is normalised.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::codec::rescale;
use crate::data::dataset::ImageSample;
use crate::domain::tensor::CHANNELS;

#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// NHWC images - shape: [batch_size, size, size, 3]
    pub images: Tensor<B, 4>,

    /// Ground-truth class ids - shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
    pub size:   usize,
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device, size: usize) -> Self {
        Self { device, size }
    }
}

impl<B: Backend> Batcher<ImageSample, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageSample>) -> ImageBatch<B> {
        let batch_size = items.len();

        // ── Flatten and rescale pixels ────────────────────────────────────────
        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| rescale(&s.pixels))
            .collect();

        let targets: Vec<i32> = items.iter().map(|s| s.class as i32).collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, self.size, self.size, CHANNELS]),
            &self.device,
        );

        let targets = Tensor::<B, 1, Int>::from_ints(targets.as_slice(), &self.device);

        ImageBatch { images, targets }
    }
}
