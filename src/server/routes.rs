// ============================================================
// Layer 1 - HTTP Route Handlers
// ============================================================
// Error responses are (StatusCode, message) pairs:
//
//   Decode              → 400  bad upload, service unaffected
//   missing file field  → 400
//   body over the limit → 413
//   ServiceUnavailable  → 503  model never loaded
//   anything else       → 500
//
// The forward pass is CPU bound, so it runs on the blocking
// thread pool instead of an async worker.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::domain::error::PipelineError;
use crate::domain::prediction::Prediction;
use crate::server::SharedState;

type ApiError = (StatusCode, String);

pub fn status_for(err: &PipelineError) -> StatusCode {
    match err {
        e if e.is_client_error()          => StatusCode::BAD_REQUEST,
        PipelineError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        _                                 => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(err: PipelineError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!("Prediction failed: {}", err);
    } else {
        tracing::debug!("Prediction rejected: {}", err);
    }
    (status, err.to_string())
}

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Use POST /predict or GET /health" }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status:        &'static str,
    pub model_loaded:  bool,
    pub model_version: Option<String>,
}

/// GET /health
pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status:        "ok",
        model_loaded:  state.is_loaded(),
        model_version: state.model_version().map(str::to_string),
    })
}

/// POST /predict
pub async fn predict(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<Prediction>, ApiError> {
    // No point reading the upload if nothing can classify it
    if !state.is_loaded() {
        return Err(api_error(PipelineError::ServiceUnavailable));
    }

    let bytes = first_file(&mut multipart).await?;
    classify(state, bytes).await.map(Json)
}

/// Run one prediction on the blocking pool.
pub async fn classify(state: SharedState, bytes: Bytes) -> Result<Prediction, ApiError> {
    let result = tokio::task::spawn_blocking(move || state.service()?.predict(&bytes))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("prediction task failed: {e}")))?;

    result.map_err(api_error)
}

/// Bytes of the first field that carries a file (or is named "file").
async fn first_file(multipart: &mut Multipart) -> Result<Bytes, ApiError> {
    // 413 when the body limit is hit, 400 for malformed bodies
    let rejected = |what: &str, e: MultipartError| (e.status(), format!("{what}: {}", e.body_text()));

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| rejected("invalid multipart body", e))?
    {
        if field.file_name().is_some() || field.name() == Some("file") {
            return field.bytes().await.map_err(|e| rejected("cannot read upload", e));
        }
    }

    Err((StatusCode::BAD_REQUEST, "multipart body has no file field".to_string()))
}
