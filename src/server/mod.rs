// ============================================================
// Layer 1 - HTTP Server
// ============================================================
// Thin axum front end over the process-wide PredictorState.
//
//   GET  /         → usage message
//   GET  /health   → {status, model_loaded, model_version}
//   POST /predict  → multipart upload, first file field
//                    → {<class>: p, ..., predicted_class}
//
// Middleware:
//   - TraceLayer        request/response spans through tracing
//   - CorsLayer         only the configured allowed origins
//   - DefaultBodyLimit  uploads above max_upload_bytes → 413
//
// The server stops cleanly on Ctrl-C.
//
// Reference: axum crate documentation
//            tower-http crate documentation (cors, trace)

pub mod routes;

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::ml::inferencer::PredictorState;

pub type SharedState = Arc<PredictorState>;

/// Full-resolution histopathology tiles run to a few MB; axum's 2 MB default is too tight
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host:             String,
    pub port:             u16,
    pub allowed_origins:  Vec<String>,
    pub max_upload_bytes: usize,
}

pub fn router(state: SharedState, settings: &ServerSettings) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/predict", post(routes::predict))
        .layer(DefaultBodyLimit::max(settings.max_upload_bytes))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&settings.allowed_origins))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    // tower-http rejects "*" inside an explicit list
    if allowed_origins.iter().any(|o| o.trim() == "*") {
        return base.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(origins))
}

pub async fn serve(settings: ServerSettings, state: SharedState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", settings.host, settings.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", settings.host, settings.port))?;

    let app = router(state, &settings);

    tracing::info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
