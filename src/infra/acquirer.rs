// ============================================================
// Layer 6 - Artifact Acquirer
// ============================================================
// Makes sure the weights file and the class list of one model
// version exist locally before serving starts.
//
//   both present      → return their paths, no network at all
//   some missing,
//     no remote repo  → ArtifactUnavailable, nothing created
//     remote repo     → fetch only the missing ones
//
// Local paths come from the ArtifactStore layout
// (<root>/<version>/lung_cnn.bin, classes.json) unless an
// explicit model directory overrides it. Remote file names may
// differ from the local ones; a download is always stored under
// the canonical local name so `evaluate` finds it too.
//
// Downloads are plain blocking HTTP GETs against a model hub:
//   {endpoint}/{repo}/resolve/{revision}/{filename}
// The body goes into a temp file in the destination directory
// and is renamed over the final name only once it is complete.
//
// This runs before the async runtime is started, so blocking
// reqwest is fine here. There are no retries.
//
// Reference: reqwest crate documentation (blocking client)

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use tempfile::NamedTempFile;

use crate::domain::error::{PipelineError, PipelineResult};
use crate::domain::traits::ArtifactSource;
use crate::infra::artifact_store::{ArtifactPaths, ArtifactStore, CLASSES_FILE, WEIGHTS_FILE};

pub const DEFAULT_HUB_ENDPOINT: &str = "https://huggingface.co";
pub const DEFAULT_REVISION:     &str = "main";

/// File names inside the remote repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFiles {
    pub weights: String,
    pub classes: String,
}

impl Default for RemoteFiles {
    fn default() -> Self {
        Self { weights: WEIGHTS_FILE.to_string(), classes: CLASSES_FILE.to_string() }
    }
}

pub struct ArtifactAcquirer {
    store:     ArtifactStore,
    model_dir: Option<PathBuf>,
    remote:    RemoteFiles,
    repo:      Option<String>,
    source:    Box<dyn ArtifactSource>,
}

impl ArtifactAcquirer {
    /// A blank `repo` counts as "no remote configured".
    pub fn new(
        store:  ArtifactStore,
        remote: RemoteFiles,
        repo:   Option<String>,
        source: Box<dyn ArtifactSource>,
    ) -> Self {
        Self {
            store,
            model_dir: None,
            remote,
            repo: repo.filter(|r| !r.trim().is_empty()),
            source,
        }
    }

    /// Look in `dir` instead of `<root>/<version>/`.
    pub fn with_model_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.model_dir = dir;
        self
    }

    pub fn local_paths(&self, version: &str) -> PipelineResult<ArtifactPaths> {
        match &self.model_dir {
            Some(dir) => Ok(ArtifactPaths {
                model:   dir.join(WEIGHTS_FILE),
                classes: dir.join(CLASSES_FILE),
            }),
            None => self.store.paths(version),
        }
    }

    /// Local-first resolution of the weights and class files of `version`.
    pub fn ensure_local(&self, version: &str) -> PipelineResult<ArtifactPaths> {
        let paths = self.local_paths(version)?;

        let missing: Vec<(&str, &Path)> = [
            (self.remote.weights.as_str(), paths.model.as_path()),
            (self.remote.classes.as_str(), paths.classes.as_path()),
        ]
        .into_iter()
        .filter(|(_, path)| !path.is_file())
        .collect();

        if missing.is_empty() {
            tracing::info!("Model artifacts for '{}' found locally", version);
            return Ok(paths);
        }

        let Some(repo) = self.repo.as_deref() else {
            let names: Vec<String> = missing.iter().map(|(_, path)| path.display().to_string()).collect();
            return Err(PipelineError::ArtifactUnavailable { missing: names.join(", ") });
        };

        for (name, dest) in missing {
            tracing::info!("Fetching '{}' from '{}' into '{}'", name, repo, dest.display());
            self.source.fetch(repo, name, dest)?;
        }

        Ok(paths)
    }
}

// ─── LocalOnlySource ──────────────────────────────────────────────────────────
/// Used when no remote is configured: every fetch fails.
pub struct LocalOnlySource;

impl ArtifactSource for LocalOnlySource {
    fn fetch(&self, _repo: &str, filename: &str, _dest: &Path) -> PipelineResult<PathBuf> {
        Err(PipelineError::ArtifactUnavailable { missing: filename.to_string() })
    }
}

fn client_builder() -> reqwest::blocking::ClientBuilder {
    reqwest::blocking::Client::builder()
        .user_agent(concat!("lung-cnn/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(600))
}

// ─── HubSource ────────────────────────────────────────────────────────────────
/// Downloads files from a Hugging Face style model hub.
pub struct HubSource {
    client:   reqwest::blocking::Client,
    endpoint: String,
    revision: String,
    token:    Option<String>,
}

impl HubSource {
    pub fn new(endpoint: &str, revision: &str, token: Option<String>) -> PipelineResult<Self> {
        let client = client_builder().build().map_err(io::Error::other)?;
        Ok(Self::with_client(client, endpoint, revision, token))
    }

    pub fn with_client(
        client:   reqwest::blocking::Client,
        endpoint: &str,
        revision: &str,
        token:    Option<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            revision: revision.to_string(),
            token:    token.filter(|t| !t.is_empty()),
        }
    }

    pub fn url(&self, repo: &str, filename: &str) -> String {
        format!("{}/{}/resolve/{}/{}", self.endpoint, repo, self.revision, filename)
    }
}

impl ArtifactSource for HubSource {
    fn fetch(&self, repo: &str, filename: &str, dest: &Path) -> PipelineResult<PathBuf> {
        let fail = |reason: String| PipelineError::ArtifactFetch {
            repo:     repo.to_string(),
            filename: filename.to_string(),
            reason,
        };

        let url = self.url(repo, filename);
        tracing::debug!("GET {}", url);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let mut response = request.send().map_err(|e| fail(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fail(format!("HTTP {}", response.status())));
        }

        let dir = dest
            .parent()
            .ok_or_else(|| fail(format!("'{}' has no parent directory", dest.display())))?;
        fs::create_dir_all(dir).map_err(|e| fail(format!("cannot create '{}': {e}", dir.display())))?;

        // Stream into a sibling temp file; it is deleted on drop if we bail out
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| fail(format!("cannot create temp file: {e}")))?;
        let written = response.copy_to(&mut tmp).map_err(|e| fail(e.to_string()))?;
        tmp.flush().map_err(|e| fail(e.to_string()))?;
        tmp.persist(dest).map_err(|e| fail(format!("cannot move into place: {}", e.error)))?;

        tracing::info!("Downloaded '{}' ({} bytes) to '{}'", filename, written, dest.display());
        Ok(dest.to_path_buf())
    }
}
