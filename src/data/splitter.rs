// ============================================================
// Layer 4 - Train/Validation Splitter
// ============================================================
// Shuffles sample indices with a seeded RNG and splits them
// into two disjoint sets:
//   - Training set:   used to update model weights
//   - Validation set: drives early stopping, LR reduction and
//                     the target-accuracy stop
//
// Why seeded?
//   The same (data, ratio, seed) must always give the same
//   partition, so runs can be compared and `evaluate` can
//   rebuild the exact validation set a model was scored on.
//   ChaCha8Rng produces the same stream on every platform.
//
// `ratio` is the VALIDATION fraction. The validation side gets
// ceil(n * ratio) samples, the rest go to training; both sides
// must end up non-empty.
//
// There is no stratification: class balance across the split
// is only measured (class_distribution) and logged.
//
// Reference: rand crate documentation (SliceRandom::shuffle)
//            rand_chacha crate documentation

use rand::{seq::SliceRandom, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::domain::error::{PipelineError, PipelineResult};

/// Index sets of a split, in shuffled order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub val:   Vec<usize>,
}

/// Both sides of a split of parallel arrays X and y
#[derive(Debug, Clone)]
pub struct Split<X, Y> {
    pub x_train: Vec<X>,
    pub x_val:   Vec<X>,
    pub y_train: Vec<Y>,
    pub y_val:   Vec<Y>,
}

/// Shuffle 0..total with `seed` and cut off the validation share.
pub fn partition_indices(total: usize, ratio: f64, seed: u64) -> PipelineResult<SplitIndices> {
    if !(ratio > 0.0 && ratio < 1.0) {
        return Err(PipelineError::TrainingData(format!(
            "split ratio must be in (0, 1), got {ratio}"
        )));
    }

    let val_len = ((total as f64) * ratio).ceil() as usize;
    if val_len == 0 || val_len >= total {
        return Err(PipelineError::TrainingData(format!(
            "cannot split {total} samples with ratio {ratio} into two non-empty sets"
        )));
    }

    // Fisher-Yates shuffle driven by a reproducible stream
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..total).collect();
    indices.shuffle(&mut rng);

    // After split_off: indices = train part, val = validation part
    let train_len = total - val_len;
    let val       = indices.split_off(train_len);

    tracing::debug!(
        "Dataset split: {} training, {} validation (seed {})",
        indices.len(),
        val.len(),
        seed
    );

    Ok(SplitIndices { train: indices, val })
}

/// Split parallel arrays `x` and `y` into train and validation sides.
pub fn split<X, Y>(x: Vec<X>, y: Vec<Y>, ratio: f64, seed: u64) -> PipelineResult<Split<X, Y>> {
    if x.len() != y.len() {
        return Err(PipelineError::TrainingData(format!(
            "X has {} rows but y has {}",
            x.len(),
            y.len()
        )));
    }

    let idx = partition_indices(x.len(), ratio, seed)?;

    // Move each row out exactly once by tagging it with its destination
    let mut x_slots: Vec<Option<X>> = x.into_iter().map(Some).collect();
    let mut y_slots: Vec<Option<Y>> = y.into_iter().map(Some).collect();

    let mut take = |ids: &[usize]| -> (Vec<X>, Vec<Y>) {
        ids.iter()
            .filter_map(|&i| Some((x_slots[i].take()?, y_slots[i].take()?)))
            .unzip()
    };

    let (x_train, y_train) = take(&idx.train);
    let (x_val, y_val)     = take(&idx.val);

    Ok(Split { x_train, x_val, y_train, y_val })
}
