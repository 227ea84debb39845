// ============================================================
// Layer 2 - ServeUseCase
// ============================================================
// Startup sequence of the HTTP service:
//
//   Step 1: Resolve artifacts (local-first, hub fetch if set)
//           → any failure aborts startup
//   Step 2: Load the predictor once
//           → a load failure leaves it Unloaded; the server
//             still starts and /predict answers 503
//   Step 3: Start the tokio runtime and the axum server
//
// Steps 1 and 2 are blocking and run before the runtime
// exists, so the blocking HTTP client never sits inside an
// async context.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::application::fetch_use_case::AcquireConfig;
use crate::ml::{
    default_device,
    inferencer::{InferenceService, PredictorState},
    InferBackend,
};
use crate::server::{self, ServerSettings};

#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub server:          ServerSettings,
    /// Also names the model version to serve
    pub acquire:         AcquireConfig,
    /// Used only when the artifact has no metadata.json
    pub img_size:        u32,
    pub skip_model_load: bool,
}

pub struct ServeUseCase {
    config: ServeConfig,
}

impl ServeUseCase {
    pub fn new(config: ServeConfig) -> Self {
        Self { config }
    }

    /// Build the predictor state according to the startup rules.
    pub fn load_predictor(&self) -> Result<Arc<PredictorState>> {
        let cfg   = &self.config;
        let state = Arc::new(PredictorState::new());

        if cfg.skip_model_load {
            state.skip();
            return Ok(state);
        }

        // ── Step 1: Artifacts ─────────────────────────────────────────────────
        let paths = cfg
            .acquire
            .resolve()
            .context("model artifacts are unavailable; refusing to start")?;

        // ── Step 2: Load once ─────────────────────────────────────────────────
        state.initialize(InferenceService::from_artifacts::<InferBackend>(
            &paths,
            cfg.img_size,
            &cfg.acquire.model_version,
            &default_device(),
        ));
        Ok(state)
    }

    pub fn execute(&self) -> Result<()> {
        let state = self.load_predictor()?;

        // ── Step 3: Runtime + server ──────────────────────────────────────────
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("cannot start the async runtime")?;

        runtime.block_on(server::serve(self.config.server.clone(), state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fetch_use_case::tests::config as acquire_config;

    fn config(root: &std::path::Path, skip: bool) -> ServeConfig {
        ServeConfig {
            server: ServerSettings {
                host:             "127.0.0.1".into(),
                port:             0,
                allowed_origins:  vec!["http://localhost:5173".into()],
                max_upload_bytes: server::DEFAULT_MAX_UPLOAD_BYTES,
            },
            acquire:         acquire_config(root, "v1"),
            img_size:        8,
            skip_model_load: skip,
        }
    }

    #[test]
    fn test_missing_artifacts_abort_startup() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ServeUseCase::new(config(dir.path(), false)).load_predictor().is_err());
    }

    #[test]
    fn test_skip_leaves_predictor_unloaded() {
        let dir   = tempfile::tempdir().unwrap();
        let state = ServeUseCase::new(config(dir.path(), true)).load_predictor().unwrap();
        assert!(!state.is_loaded());
    }

    #[test]
    fn test_corrupt_weights_start_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        let v1  = dir.path().join("v1");
        std::fs::create_dir_all(&v1).unwrap();
        std::fs::write(v1.join("lung_cnn.bin"), b"garbage").unwrap();
        std::fs::write(v1.join("classes.json"), r#"["lung_n","lung_aca","lung_scc"]"#).unwrap();

        let state = ServeUseCase::new(config(dir.path(), false)).load_predictor().unwrap();
        assert!(!state.is_loaded());
    }

    #[test]
    fn test_other_version_is_not_served() {
        let dir = tempfile::tempdir().unwrap();
        let v1  = dir.path().join("v1");
        std::fs::create_dir_all(&v1).unwrap();
        std::fs::write(v1.join("lung_cnn.bin"), b"garbage").unwrap();
        std::fs::write(v1.join("classes.json"), r#"["lung_n","lung_aca","lung_scc"]"#).unwrap();

        let mut cfg = config(dir.path(), false);
        cfg.acquire.model_version = "v2".into();
        let err = ServeUseCase::new(cfg).load_predictor().err().unwrap();
        assert!(format!("{err:#}").contains("v2"));
    }
}
