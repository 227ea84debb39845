// ============================================================
// Layer 3 - Pipeline Error Taxonomy
// ============================================================
// Every failure the core layers (data, ml, infra) can report.
//
// The variants fall into three audiences:
//
//   User-facing (recoverable, per request)
//     Decode              - the uploaded bytes are not an image
//     ServiceUnavailable  - the predictor was never loaded
//
//   Operator-facing (configuration / storage)
//     ArtifactMissing     - local store incomplete for a version
//     ArtifactUnavailable - nothing local and no remote configured
//     ArtifactFetch       - the remote download failed
//
//   Fatal to a training run
//     TrainingData              - ingestion or split failed
//     NumericalTrainingFailure  - loss or accuracy went non-finite
//
// The application and CLI layers wrap these in anyhow::Error
// with extra context; the HTTP layer maps them to status codes.
//
// Reference: thiserror crate documentation
//            Rust Book §9 (Recoverable Errors with Result)

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input could not be parsed as a supported raster image
    #[error("could not decode image: {0}")]
    Decode(String),

    /// A required artifact file is absent from the local store
    #[error("artifact missing for version '{version}': {}", path.display())]
    ArtifactMissing { version: String, path: PathBuf },

    /// Required files are absent locally and no remote source is configured
    #[error("model artifacts not found locally ({missing}) and no remote repository is configured")]
    ArtifactUnavailable { missing: String },

    /// Downloading an artifact from the remote source failed
    #[error("failed to fetch '{filename}' from '{repo}': {reason}")]
    ArtifactFetch {
        repo:     String,
        filename: String,
        reason:   String,
    },

    /// The predictor is not loaded in this process
    #[error("model is not loaded; the service is not ready to serve predictions")]
    ServiceUnavailable,

    /// Dataset ingestion or train/validation split failed
    #[error("training data error: {0}")]
    TrainingData(String),

    /// A training or validation metric became NaN or infinite
    #[error("non-finite {metric} ({value}) at epoch {epoch}")]
    NumericalTrainingFailure {
        epoch:  usize,
        metric: &'static str,
        value:  f64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Framework-level model failure (record load, tensor readback, shape mismatch)
    #[error("model error: {0}")]
    Model(String),
}

impl PipelineError {
    /// True for errors caused by the caller's input rather than the service state.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::Decode(_))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_decode_is_client_error() {
        assert!(PipelineError::Decode("empty".into()).is_client_error());
        assert!(!PipelineError::ServiceUnavailable.is_client_error());
        assert!(!PipelineError::TrainingData("x".into()).is_client_error());
    }

    #[test]
    fn test_messages_name_the_offender() {
        let err = PipelineError::ArtifactFetch {
            repo:     "org/lung".into(),
            filename: "classes.json".into(),
            reason:   "404".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("classes.json"));
        assert!(msg.contains("org/lung"));
    }
}
