// ============================================================
// Layer 5 - Lung CNN Model
// ============================================================
// A small VGG-style convolutional classifier:
//
//   input  [N, S, S, 3]   NHWC, B-G-R, values in [0, 1]
//     │  permute to NCHW
//   conv 5×5,  32 filters, same padding → ReLU → maxpool 2×2
//   conv 3×3,  64 filters, same padding → ReLU → maxpool 2×2
//   conv 3×3, 128 filters, same padding → ReLU → maxpool 2×2
//     │  flatten  (128 × S/8 × S/8)
//   dense 256 → ReLU
//   dense 128 → ReLU → dropout
//   dense num_classes          (logits; softmax applied by callers)
//
// The pipeline treats this as an opaque trainable classifier;
// only the input layout and the output length matter outside
// this file.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
    record::{BinBytesRecorder, FullPrecisionSettings, Recorder},
};

use crate::domain::error::{PipelineError, PipelineResult};

/// Smallest side that survives three 2×2 poolings
pub const MIN_IMG_SIZE: usize = 8;

type WeightsRecorder = BinBytesRecorder<FullPrecisionSettings>;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct LungCnnConfig {
    pub num_classes: usize,
    pub img_size:    usize,
    #[config(default = "0.3")]
    pub dropout:     f64,
}

impl LungCnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LungCnn<B> {
        let conv = |c_in: usize, c_out: usize, k: usize| -> Conv2d<B> {
            Conv2dConfig::new([c_in, c_out], [k, k])
                .with_padding(PaddingConfig2d::Same)
                .init(device)
        };

        let side = self.img_size / 8;
        let flat = 128 * side * side;

        LungCnn {
            conv1:   conv(3, 32, 5),
            conv2:   conv(32, 64, 3),
            conv3:   conv(64, 128, 3),
            pool:    MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            relu:    Relu::new(),
            fc1:     LinearConfig::new(flat, 256).init(device),
            fc2:     LinearConfig::new(256, 128).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            head:    LinearConfig::new(128, self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct LungCnn<B: Backend> {
    pub conv1:   Conv2d<B>,
    pub conv2:   Conv2d<B>,
    pub conv3:   Conv2d<B>,
    pub pool:    MaxPool2d,
    pub relu:    Relu,
    pub fc1:     Linear<B>,
    pub fc2:     Linear<B>,
    pub dropout: Dropout,
    pub head:    Linear<B>,
}

impl<B: Backend> LungCnn<B> {
    /// images: [batch, S, S, 3] → logits: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = images.permute([0, 3, 1, 2]);

        let x = self.pool.forward(self.relu.forward(self.conv1.forward(x)));
        let x = self.pool.forward(self.relu.forward(self.conv2.forward(x)));
        let x = self.pool.forward(self.relu.forward(self.conv3.forward(x)));

        let x = x.flatten::<2>(1, 3);
        let x = self.relu.forward(self.fc1.forward(x));
        let x = self.relu.forward(self.fc2.forward(x));
        self.head.forward(self.dropout.forward(x))
    }

    /// Logits plus mean cross-entropy against integer class targets.
    pub fn forward_loss(
        &self,
        images:  Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets);
        (loss, logits)
    }

    /// Serialise the parameters to the artifact byte format.
    pub fn to_bytes(&self) -> PipelineResult<Vec<u8>> {
        Recorder::<B>::record(&WeightsRecorder::default(), self.clone().into_record(), ())
            .map_err(|e| PipelineError::Model(format!("cannot serialise weights: {e:?}")))
    }

    /// Replace the parameters with ones read from artifact bytes.
    pub fn load_bytes(self, bytes: Vec<u8>, device: &B::Device) -> PipelineResult<Self> {
        let record = Recorder::<B>::load(&WeightsRecorder::default(), bytes, device)
            .map_err(|e| PipelineError::Model(format!("cannot load weights: {e:?}")))?;
        Ok(self.load_record(record))
    }
}

/// Number of predictions matching the targets
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    let correct: i64 = predicted.equal(targets).int().sum().into_scalar().elem::<i64>();
    correct as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model: LungCnn<B> = LungCnnConfig::new(3, 16).init(&device);
        let x = Tensor::<B, 4>::zeros([2, 16, 16, 3], &device);
        assert_eq!(model.forward(x).dims(), [2, 3]);
    }

    #[test]
    fn test_weights_bytes_restore_outputs() {
        let device = Default::default();
        let cfg    = LungCnnConfig::new(3, 8);
        let a: LungCnn<B> = cfg.init(&device);
        let b: LungCnn<B> = cfg.init(&device).load_bytes(a.to_bytes().unwrap(), &device).unwrap();

        let x  = Tensor::<B, 4>::ones([1, 8, 8, 3], &device);
        let ya = a.forward(x.clone()).into_data().to_vec::<f32>().unwrap();
        let yb = b.forward(x).into_data().to_vec::<f32>().unwrap();
        assert_eq!(ya, yb);
    }

    #[test]
    fn test_count_correct() {
        let device  = Default::default();
        let logits  = Tensor::<B, 2>::from_floats([[0.1, 0.9], [0.8, 0.2], [0.3, 0.7]], &device);
        let targets = Tensor::<B, 1, Int>::from_ints([1, 1, 1], &device);
        assert_eq!(count_correct(logits, targets), 2);
    }
}
