// ============================================================
// Layer 2 - FetchUseCase
// ============================================================
// Resolves the serving artifacts exactly the way `serve` does,
// without starting the server. Useful to warm a model volume
// before a deployment.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::domain::traits::ArtifactSource;
use crate::infra::{
    acquirer::{ArtifactAcquirer, HubSource, LocalOnlySource, RemoteFiles},
    artifact_store::{ArtifactPaths, ArtifactStore},
};

/// Which model version serving needs, where it lives locally, and where it
/// may be downloaded from
#[derive(Debug, Clone)]
pub struct AcquireConfig {
    pub model_version: String,
    pub artifact_root: PathBuf,
    /// Replaces `<artifact_root>/<model_version>/` when set
    pub model_dir:     Option<PathBuf>,
    /// Names inside the remote repository
    pub remote:        RemoteFiles,
    /// Model hub repository id; None or blank disables downloads
    pub repo:          Option<String>,
    pub endpoint:      String,
    pub revision:      String,
    pub token:         Option<String>,
}

impl AcquireConfig {
    pub fn acquirer(&self) -> Result<ArtifactAcquirer> {
        let remote = self.repo.as_deref().is_some_and(|r| !r.trim().is_empty());

        let source: Box<dyn ArtifactSource> = if remote {
            Box::new(
                HubSource::new(&self.endpoint, &self.revision, self.token.clone())
                    .context("cannot build the model hub client")?,
            )
        } else {
            Box::new(LocalOnlySource)
        };

        Ok(ArtifactAcquirer::new(
            ArtifactStore::new(&self.artifact_root),
            self.remote.clone(),
            self.repo.clone(),
            source,
        )
        .with_model_dir(self.model_dir.clone()))
    }

    /// Resolve the configured version, fetching missing files if allowed.
    pub fn resolve(&self) -> Result<ArtifactPaths> {
        self.acquirer()?
            .ensure_local(&self.model_version)
            .with_context(|| format!("cannot resolve artifacts for model version '{}'", self.model_version))
    }
}

pub struct FetchUseCase {
    config: AcquireConfig,
}

impl FetchUseCase {
    pub fn new(config: AcquireConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<ArtifactPaths> {
        self.config.resolve()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::infra::acquirer::{DEFAULT_HUB_ENDPOINT, DEFAULT_REVISION};

    pub(crate) fn config(root: &std::path::Path, version: &str) -> AcquireConfig {
        AcquireConfig {
            model_version: version.into(),
            artifact_root: root.to_path_buf(),
            model_dir:     None,
            remote:        RemoteFiles::default(),
            repo:          None,
            endpoint:      DEFAULT_HUB_ENDPOINT.into(),
            revision:      DEFAULT_REVISION.into(),
            token:         None,
        }
    }

    fn write_version(root: &std::path::Path, version: &str) {
        let dir = root.join(version);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("lung_cnn.bin"), version.as_bytes()).unwrap();
        std::fs::write(dir.join("classes.json"), b"[]").unwrap();
    }

    #[test]
    fn test_local_files_resolve_without_remote() {
        let root = tempfile::tempdir().unwrap();
        write_version(root.path(), "v1");

        let paths = FetchUseCase::new(config(root.path(), "v1")).execute().unwrap();
        assert_eq!(paths.model, root.path().join("v1/lung_cnn.bin"));
    }

    #[test]
    fn test_requested_version_is_resolved() {
        let root = tempfile::tempdir().unwrap();
        write_version(root.path(), "v1");
        write_version(root.path(), "v2");

        let paths = FetchUseCase::new(config(root.path(), "v2")).execute().unwrap();
        assert_eq!(paths.model, root.path().join("v2/lung_cnn.bin"));
        assert_eq!(std::fs::read(paths.model).unwrap(), b"v2");
    }

    #[test]
    fn test_explicit_model_dir_wins() {
        let root = tempfile::tempdir().unwrap();
        write_version(root.path(), "pinned");

        let mut cfg = config(root.path(), "v7");
        cfg.model_dir = Some(root.path().join("pinned"));
        let paths = FetchUseCase::new(cfg).execute().unwrap();
        assert_eq!(paths.classes, root.path().join("pinned/classes.json"));
    }

    #[test]
    fn test_missing_files_without_remote_fail() {
        let root = tempfile::tempdir().unwrap();
        let err = FetchUseCase::new(config(root.path(), "v9")).execute().unwrap_err();
        assert!(format!("{err:#}").contains("no remote repository"));
        assert!(!root.path().join("v9").exists());
    }
}
