// ============================================================
// Layer 3 - LabelSet Domain Type
// ============================================================
// The ordered list of class names.
//
// The position of a name in this list is the class id used
// everywhere else: one-hot columns in the training targets,
// the order of the softmax output, and the order written to
// classes.json. Training and serving must agree on it exactly,
// otherwise predictions are silently mislabelled.
//
// Serialises as a plain JSON array of strings:
//   ["lung_n", "lung_aca", "lung_scc"]

use serde::{Deserialize, Serialize};

use crate::domain::error::{PipelineError, PipelineResult};

/// Class folder names of the Kaggle lung histopathology set
pub const DEFAULT_CLASSES: [&str; 3] = ["lung_n", "lung_aca", "lung_scc"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet {
    names: Vec<String>,
}

impl LabelSet {
    /// Build a label set, rejecting empty lists and duplicate names.
    pub fn new<I, S>(names: I) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let set = Self { names };
        set.validate()?;
        Ok(set)
    }

    /// Checks the invariants again after deserialisation.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.names.is_empty() {
            return Err(PipelineError::TrainingData("label set is empty".into()));
        }
        for (i, name) in self.names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(PipelineError::TrainingData(format!("label {i} is blank")));
            }
            if self.names[..i].contains(name) {
                return Err(PipelineError::TrainingData(format!("duplicate label '{name}'")));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self { names: DEFAULT_CLASSES.iter().map(|s| s.to_string()).collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_is_position() {
        let labels = LabelSet::default();
        assert_eq!(labels.index_of("lung_aca"), Some(1));
        assert_eq!(labels.get(2), Some("lung_scc"));
        assert_eq!(labels.len(), 3);
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert!(LabelSet::new(["a", "b", "a"]).is_err());
        assert!(LabelSet::new(Vec::<String>::new()).is_err());
        assert!(LabelSet::new(["a", " "]).is_err());
    }

    #[test]
    fn test_json_is_plain_list_in_order() {
        let labels = LabelSet::new(["z", "a"]).unwrap();
        let json   = serde_json::to_string(&labels).unwrap();
        assert_eq!(json, r#"["z","a"]"#);
        let back: LabelSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, labels);
    }
}
