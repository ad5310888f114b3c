use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use tracing::Instrument;

use vox_core::StageError;

use crate::server::AppState;

/// Log the error once and write it exactly once as the full response body.
pub(crate) fn error_response(err: &StageError) -> Response {
    tracing::error!(kind = err.error_kind(), "{err}");
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, err.to_string()).into_response()
}

/// `POST /alexa`: drive the inbound audio payload through the pipeline and
/// return the synthesized answer. The body is opaque to the gateway; only
/// the first stage interprets it.
pub async fn alexa_handler(State(state): State<AppState>, body: Bytes) -> Response {
    let request_id = uuid::Uuid::now_v7();
    let span = tracing::info_span!("alexa", request_id = %request_id);

    async move {
        if body.is_empty() {
            return error_response(&StageError::validation("request body is empty"));
        }

        tracing::debug!(bytes = body.len(), "pipeline request accepted");

        match state.pipeline.run(body).await {
            Ok(document) => (StatusCode::OK, Json(document)).into_response(),
            Err(err) => error_response(&err),
        }
    }
    .instrument(span)
    .await
}

/// Health check HTTP endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Snapshot of the in-memory metrics recorder.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(metrics) => Json(metrics.report()).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
