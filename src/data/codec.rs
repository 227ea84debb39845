// ============================================================
// Layer 4 - Image Codec (canonical preprocessing)
// ============================================================
// The single decode / resize / rescale procedure used by BOTH
// dataset ingestion and inference serving.
//
//   raw bytes (JPEG / PNG / ...)
//       │  decode, drop alpha, force 8-bit
//       ▼
//   RGB image of any size
//       │  resize_exact to size × size (Triangle filter)
//       ▼
//   interleaved B, G, R bytes         ← decode_resized (ingestion)
//       │  divide by 255.0
//       ▼
//   ImageTensor [1, size, size, 3]    ← decode_and_normalize (serving)
//
// Channel order is B, G, R. The trained weights depend on it;
// nothing downstream may swap channels.
//
// Ingestion stops after the resize and keeps u8 samples so the
// dataset stays four times smaller in memory; the batcher calls
// `rescale` on each batch, which is the same division by 255.0.
//
// Reference: image crate documentation (imageops::resize)

use image::{imageops::FilterType, RgbImage};

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::tensor::{ImageTensor, CHANNELS};

const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Decoder bound to one target size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCodec {
    size: u32,
}

impl ImageCodec {
    pub fn new(size: u32) -> PipelineResult<Self> {
        if size == 0 {
            return Err(PipelineError::Model("image size must be positive".into()));
        }
        Ok(Self { size })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of u8 samples in one resized image
    pub fn sample_len(&self) -> usize {
        (self.size as usize) * (self.size as usize) * CHANNELS
    }

    /// Decode and resize, returning HWC bytes in B, G, R order.
    pub fn decode_resized(&self, bytes: &[u8]) -> PipelineResult<Vec<u8>> {
        if bytes.is_empty() {
            return Err(PipelineError::Decode("empty input".into()));
        }

        let decoded = image::load_from_memory(bytes)
            .map_err(|e| PipelineError::Decode(e.to_string()))?;

        let rgb: RgbImage = decoded.to_rgb8();
        let resized = image::imageops::resize(&rgb, self.size, self.size, RESIZE_FILTER);

        let mut bgr = Vec::with_capacity(self.sample_len());
        for px in resized.pixels() {
            let [r, g, b] = px.0;
            bgr.extend_from_slice(&[b, g, r]);
        }
        Ok(bgr)
    }

    /// Full serving preprocessing: decode, resize, rescale, add batch dim.
    pub fn decode_and_normalize(&self, bytes: &[u8]) -> PipelineResult<ImageTensor> {
        let pixels = self.decode_resized(bytes)?;
        let side   = self.size as usize;
        ImageTensor::new([1, side, side, CHANNELS], rescale(&pixels))
    }
}

/// Map 0..=255 samples to [0.0, 1.0].
pub fn rescale(pixels: &[u8]) -> Vec<f32> {
    pixels.iter().map(|&p| p as f32 / 255.0).collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;

    /// Encode a solid-colour RGB image as PNG bytes.
    pub(crate) fn png_bytes(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(rgb));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_shape_and_range() {
        let codec  = ImageCodec::new(8).unwrap();
        let tensor = codec.decode_and_normalize(&png_bytes(20, 13, [10, 128, 255])).unwrap();
        assert_eq!(tensor.shape(), [1, 8, 8, 3]);
        assert!(tensor.as_slice().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_channels_are_bgr() {
        let codec  = ImageCodec::new(4).unwrap();
        let pixels = codec.decode_resized(&png_bytes(4, 4, [200, 100, 0])).unwrap();
        assert_eq!(&pixels[..3], &[0, 100, 200]);

        let tensor = codec.decode_and_normalize(&png_bytes(4, 4, [255, 0, 0])).unwrap();
        assert_eq!(&tensor.as_slice()[..3], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_resize_is_deterministic() {
        let codec = ImageCodec::new(5).unwrap();
        let bytes = png_bytes(17, 9, [33, 66, 99]);
        assert_eq!(codec.decode_resized(&bytes).unwrap(), codec.decode_resized(&bytes).unwrap());
    }

    #[test]
    fn test_bad_input_is_decode_error() {
        let codec = ImageCodec::new(8).unwrap();
        assert!(matches!(codec.decode_and_normalize(&[]), Err(PipelineError::Decode(_))));
        assert!(matches!(
            codec.decode_and_normalize(b"definitely not an image"),
            Err(PipelineError::Decode(_))
        ));
        // truncated PNG: valid signature, header cut short
        let png = png_bytes(8, 8, [1, 2, 3]);
        assert!(matches!(
            codec.decode_and_normalize(&png[..20]),
            Err(PipelineError::Decode(_))
        ));
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(ImageCodec::new(0).is_err());
    }
}
