use burn::data::dataset::Dataset;

use crate::domain::labels::LabelSet;
use crate::domain::prediction::argmax;

/// Parallel arrays produced by ingestion.
/// `images[i]` is img_size × img_size × 3 bytes (B, G, R, not yet rescaled);
/// `targets[i]` is a one-hot row whose columns follow `labels`.
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    pub img_size: u32,
    pub labels:   LabelSet,
    pub images:   Vec<Vec<u8>>,
    pub targets:  Vec<Vec<f32>>,
}

impl LabeledDataset {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Samples per class, in label order
    pub fn class_distribution(&self) -> Vec<usize> {
        class_distribution(&self.targets, self.labels.len())
    }
}

/// One-hot row with a 1.0 in column `class`
pub fn one_hot(class: usize, num_classes: usize) -> Vec<f32> {
    let mut row = vec![0.0; num_classes];
    row[class] = 1.0;
    row
}

/// Count one-hot rows per column
pub fn class_distribution(targets: &[Vec<f32>], num_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; num_classes];
    for row in targets {
        if let Some(c) = argmax(row) {
            if c < num_classes {
                counts[c] += 1;
            }
        }
    }
    counts
}

/// One training example as handed to the batcher
#[derive(Debug, Clone)]
pub struct ImageSample {
    pub pixels: Vec<u8>,
    pub class:  usize,
}

/// One side of the train/validation split, exposed through burn's Dataset trait
pub struct ImageDataset {
    images:  Vec<Vec<u8>>,
    classes: Vec<usize>,
}

impl ImageDataset {
    pub fn new(images: Vec<Vec<u8>>, targets: Vec<Vec<f32>>) -> Self {
        let classes = targets.iter().map(|t| argmax(t).unwrap_or(0)).collect();
        Self { images, classes }
    }
}

impl Dataset<ImageSample> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageSample> {
        let pixels = self.images.get(index)?.clone();
        Some(ImageSample { pixels, class: self.classes[index] })
    }

    fn len(&self) -> usize {
        self.images.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_hot_and_distribution() {
        let targets = vec![one_hot(0, 3), one_hot(2, 3), one_hot(2, 3)];
        assert_eq!(targets[1], vec![0.0, 0.0, 1.0]);
        assert_eq!(class_distribution(&targets, 3), vec![1, 0, 2]);
    }

    #[test]
    fn test_dataset_recovers_class_index() {
        let ds = ImageDataset::new(vec![vec![1, 2, 3], vec![4, 5, 6]], vec![one_hot(1, 3), one_hot(0, 3)]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(0).unwrap().class, 1);
        assert_eq!(ds.get(1).unwrap().pixels, vec![4, 5, 6]);
        assert!(ds.get(2).is_none());
    }
}
