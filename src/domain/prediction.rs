// ============================================================
// Layer 3 - Prediction Domain Type
// ============================================================
// The answer to one classification request.
//
// Serialises to the flat JSON object the HTTP API returns:
//
//   {"lung_n": 0.1, "lung_aca": 0.7, "lung_scc": 0.2,
//    "predicted_class": "lung_aca"}
//
// Probabilities keep label order so clients can rely on it.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::labels::LabelSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// (class name, probability) in label order
    pub probabilities:   Vec<(String, f32)>,
    pub predicted_class: String,
}

impl Prediction {
    /// Pair a probability vector with the label ordering it was produced under.
    ///
    /// The predicted class is the arg-max; on ties the lowest index wins.
    pub fn from_probabilities(labels: &LabelSet, probs: &[f32]) -> PipelineResult<Self> {
        if probs.len() != labels.len() {
            return Err(PipelineError::Model(format!(
                "classifier produced {} probabilities for {} labels",
                probs.len(),
                labels.len()
            )));
        }

        let best = argmax(probs).ok_or_else(|| {
            PipelineError::Model("classifier produced non-finite probabilities".into())
        })?;

        let probabilities = labels
            .iter()
            .zip(probs.iter())
            .map(|(name, &p)| (name.to_string(), p))
            .collect();

        Ok(Self {
            probabilities,
            predicted_class: labels.get(best).unwrap_or_default().to_string(),
        })
    }

    pub fn probability_of(&self, class: &str) -> Option<f32> {
        self.probabilities
            .iter()
            .find(|(name, _)| name == class)
            .map(|(_, p)| *p)
    }
}

/// Index of the largest value; the first occurrence wins ties.
/// Returns None for an empty slice or if any value is NaN.
pub fn argmax(values: &[f32]) -> Option<usize> {
    if values.iter().any(|v| v.is_nan()) {
        return None;
    }
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

impl Serialize for Prediction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.probabilities.len() + 1))?;
        for (name, p) in &self.probabilities {
            map.serialize_entry(name, p)?;
        }
        map.serialize_entry("predicted_class", &self.predicted_class)?;
        map.end()
    }
}
