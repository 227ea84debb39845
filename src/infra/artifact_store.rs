// ============================================================
// Layer 6 - Artifact Store
// ============================================================
// Owns the on-disk layout of trained models.
//
// File naming convention:
//   artifacts/
//     v1/
//       lung_cnn.bin    ← model weights (burn BinBytesRecorder)
//       classes.json    ← ordered class names
//       metadata.json   ← RunMetadata of the run that wrote v1
//     v2/
//       ...
//
// Why keep the class list in its own file?
//   The weights only know "output column 2", never "lung_scc".
//   Serving must map columns through the exact ordering the
//   model was trained with, so it is persisted as soon as the
//   dataset is ingested and re-written when the run ends.
//
// Every file is written to a temp file in the same directory
// and renamed into place, so readers never observe a
// half-written artifact under its canonical name. Writing the
// same version twice replaces the previous files.
//
// Reference: Burn Book §5 (Records)
//            tempfile crate documentation (NamedTempFile::persist)

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::labels::LabelSet;
use crate::domain::metadata::RunMetadata;
use crate::domain::traits::ExportWeights;

pub const WEIGHTS_FILE:  &str = "lung_cnn.bin";
pub const CLASSES_FILE:  &str = "classes.json";
pub const METADATA_FILE: &str = "metadata.json";

/// The two files serving needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model:   PathBuf,
    pub classes: PathBuf,
}

impl ArtifactPaths {
    /// metadata.json next to the weights, whether or not it exists
    pub fn metadata(&self) -> PathBuf {
        self.model.with_file_name(METADATA_FILE)
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn version_dir(&self, version: &str) -> PipelineResult<PathBuf> {
        let bad = version.is_empty()
            || version == "."
            || version == ".."
            || version.contains(['/', '\\']);
        if bad {
            return Err(PipelineError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{version}' is not a valid model version"),
            )));
        }
        Ok(self.root.join(version))
    }

    /// Canonical paths for a version, without checking they exist
    pub fn paths(&self, version: &str) -> PipelineResult<ArtifactPaths> {
        let dir = self.version_dir(version)?;
        Ok(ArtifactPaths { model: dir.join(WEIGHTS_FILE), classes: dir.join(CLASSES_FILE) })
    }

    pub fn save_labels(&self, version: &str, labels: &LabelSet) -> PipelineResult<PathBuf> {
        let path = self.version_dir(version)?.join(CLASSES_FILE);
        write_atomic(&path, &serde_json::to_vec_pretty(labels)?)?;
        tracing::debug!("Saved {} class names to '{}'", labels.len(), path.display());
        Ok(path)
    }

    pub fn save_weights(&self, version: &str, model: &dyn ExportWeights) -> PipelineResult<PathBuf> {
        let path  = self.version_dir(version)?.join(WEIGHTS_FILE);
        let bytes = model.export_weights()?;
        write_atomic(&path, &bytes)?;
        tracing::debug!("Saved {} bytes of weights to '{}'", bytes.len(), path.display());
        Ok(path)
    }

    pub fn save_metadata(&self, metadata: &RunMetadata) -> PipelineResult<PathBuf> {
        let path = self.version_dir(&metadata.model_version)?.join(METADATA_FILE);
        write_atomic(&path, &serde_json::to_vec_pretty(metadata)?)?;
        Ok(path)
    }

    /// Persist a finished run: weights, class list and metadata.
    pub fn save(
        &self,
        model:    &dyn ExportWeights,
        labels:   &LabelSet,
        metadata: &RunMetadata,
    ) -> PipelineResult<ArtifactPaths> {
        let version = metadata.model_version.as_str();
        let model   = self.save_weights(version, model)?;
        let classes = self.save_labels(version, labels)?;
        self.save_metadata(metadata)?;

        tracing::info!("Artifacts for '{}' written to '{}'", version, self.root.join(version).display());
        Ok(ArtifactPaths { model, classes })
    }

    /// Paths of an existing version; both weights and classes must be present.
    pub fn load_paths(&self, version: &str) -> PipelineResult<ArtifactPaths> {
        let paths = self.paths(version)?;
        for path in [&paths.model, &paths.classes] {
            if !path.is_file() {
                return Err(PipelineError::ArtifactMissing {
                    version: version.to_string(),
                    path:    path.clone(),
                });
            }
        }
        Ok(paths)
    }

    pub fn load_metadata(&self, version: &str) -> PipelineResult<Option<RunMetadata>> {
        read_metadata(&self.version_dir(version)?.join(METADATA_FILE))
    }
}

/// Parse and validate a classes.json file.
pub fn read_labels(path: &Path) -> PipelineResult<LabelSet> {
    let json   = fs::read_to_string(path)?;
    let labels: LabelSet = serde_json::from_str(&json)?;
    labels.validate()?;
    Ok(labels)
}

/// Metadata is optional on the read side: a missing file is `None`.
pub fn read_metadata(path: &Path) -> PipelineResult<Option<RunMetadata>> {
    match fs::read_to_string(path) {
        Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write `bytes` to a sibling temp file, then rename it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> PipelineResult<()> {
    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| PipelineError::Io(e.error))?;
    Ok(())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metadata::StopReason;

    struct FixedWeights(Vec<u8>);

    impl ExportWeights for FixedWeights {
        fn export_weights(&self) -> PipelineResult<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    fn metadata(version: &str) -> RunMetadata {
        RunMetadata {
            model_version:      version.into(),
            img_size:           128,
            epochs:             30,
            batch_size:         32,
            split:              0.2,
            seed:               2022,
            saved_at_utc:       "2026-10-16T09:30:00.000Z".into(),
            classes:            LabelSet::default().as_slice().to_vec(),
            learning_rate:      Some(1e-3),
            epochs_run:         Some(4),
            stop_reason:        Some(StopReason::TargetReached),
            best_epoch:         Some(4),
            final_val_accuracy: Some(0.93),
        }
    }

    #[test]
    fn test_save_then_load_paths() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());

        let saved = store.save(&FixedWeights(vec![1, 2, 3]), &LabelSet::default(), &metadata("v1")).unwrap();
        let found = store.load_paths("v1").unwrap();
        assert_eq!(saved, found);

        assert_eq!(fs::read(&found.model).unwrap(), vec![1, 2, 3]);
        assert_eq!(read_labels(&found.classes).unwrap(), LabelSet::default());
        assert_eq!(store.load_metadata("v1").unwrap(), Some(metadata("v1")));
    }

    #[test]
    fn test_resave_replaces_previous_files() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let labels = LabelSet::default();

        store.save(&FixedWeights(vec![1; 10]), &labels, &metadata("v1")).unwrap();
        store.save(&FixedWeights(vec![2; 4]), &labels, &metadata("v1")).unwrap();

        let paths = store.load_paths("v1").unwrap();
        assert_eq!(fs::read(paths.model).unwrap(), vec![2; 4]);

        // no temp files left behind
        let names: Vec<_> = fs::read_dir(dir.path().join("v1")).unwrap().collect();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_missing_weights_is_artifact_missing() {
        let dir   = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        store.save_labels("v2", &LabelSet::default()).unwrap();

        match store.load_paths("v2") {
            Err(PipelineError::ArtifactMissing { version, path }) => {
                assert_eq!(version, "v2");
                assert!(path.ends_with(WEIGHTS_FILE));
            }
            other => panic!("expected ArtifactMissing, got {other:?}"),
        }
        assert_eq!(store.load_metadata("v2").unwrap(), None);
    }

    #[test]
    fn test_rejects_path_like_versions() {
        let store = ArtifactStore::new("artifacts");
        assert!(store.version_dir("../v1").is_err());
        assert!(store.version_dir("").is_err());
        assert!(store.version_dir("v1").is_ok());
    }

    #[test]
    fn test_invalid_class_file_is_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join(CLASSES_FILE);
        fs::write(&path, r#"["a", "a"]"#).unwrap();
        assert!(read_labels(&path).is_err());
    }
}
