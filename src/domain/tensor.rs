// ============================================================
// Layer 3 - ImageTensor
// ============================================================
// A framework-free 4D float tensor in NHWC layout:
//
//   [batch, height, width, channels = 3]
//
// Values are in [0.0, 1.0] and channels are in B, G, R order.
// The ml layer turns this into a burn Tensor; nothing outside
// that layer needs to know burn exists.

use crate::domain::error::{PipelineError, PipelineResult};

pub const CHANNELS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    shape: [usize; 4],
    data:  Vec<f32>,
}

impl ImageTensor {
    /// Wrap a flat NHWC buffer, checking that it matches the shape.
    pub fn new(shape: [usize; 4], data: Vec<f32>) -> PipelineResult<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected || shape[3] != CHANNELS || shape[1] != shape[2] {
            return Err(PipelineError::Model(format!(
                "tensor data of length {} does not fit shape {:?}",
                data.len(),
                shape
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_must_match_data() {
        assert!(ImageTensor::new([1, 2, 2, 3], vec![0.0; 12]).is_ok());
        assert!(ImageTensor::new([1, 2, 2, 3], vec![0.0; 11]).is_err());
        assert!(ImageTensor::new([1, 2, 3, 3], vec![0.0; 18]).is_err());
    }
}
