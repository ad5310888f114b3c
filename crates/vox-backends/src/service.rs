//! Single-purpose HTTP listeners for the three backends. Each validates its
//! JSON request against a typed schema, calls its third-party adapter, and
//! writes exactly one response.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::Engine;
use bytes::Bytes;

use vox_core::payloads::{SpeechPayload, TextPayload};
use vox_core::StageError;

use crate::knowledge::KnowledgeClient;
use crate::recognizer::SpeechRecognizer;
use crate::synthesizer::SpeechSynthesizer;

/// Log the error once and render it as the full response body.
fn error_response(err: &StageError) -> Response {
    tracing::error!(kind = err.error_kind(), "{err}");
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, err.to_string()).into_response()
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, StageError> {
    serde_json::from_slice(body).map_err(|e| StageError::validation(e.to_string()))
}

/// `POST /stt`: `{"speech": "<b64 wav>"}` in, `{"text": ...}` out.
async fn stt_handler(State(recognizer): State<Arc<SpeechRecognizer>>, body: Bytes) -> Response {
    let result = async {
        let payload: SpeechPayload = parse_body(&body)?;
        let audio = payload
            .decode_audio()
            .map_err(|e| StageError::validation(format!("speech field is not base64: {e}")))?;
        recognizer.recognize(&audio).await
    }
    .await;

    match result {
        Ok(text) => (StatusCode::OK, Json(TextPayload::new(text))).into_response(),
        Err(err) => error_response(&err),
    }
}

/// `POST /alpha`: `{"text": "<question>"}` in, `{"text": "<answer>"}` out.
async fn alpha_handler(State(client): State<Arc<KnowledgeClient>>, body: Bytes) -> Response {
    let result = async {
        let payload: TextPayload = parse_body(&body)?;
        client.ask(&payload.text).await
    }
    .await;

    match result {
        Ok(answer) => (StatusCode::OK, Json(TextPayload::new(answer))).into_response(),
        Err(err) => error_response(&err),
    }
}

/// `POST /tts`: `{"text": "<answer>"}` in, `{"speech": "<b64 audio>"}` out.
async fn tts_handler(State(synthesizer): State<Arc<SpeechSynthesizer>>, body: Bytes) -> Response {
    let result = async {
        let payload: TextPayload = parse_body(&body)?;
        synthesizer.synthesize(&payload.text).await
    }
    .await;

    match result {
        Ok(audio) => {
            let speech = base64::engine::general_purpose::STANDARD.encode(audio);
            (StatusCode::OK, Json(SpeechPayload { speech })).into_response()
        }
        Err(err) => error_response(&err),
    }
}

pub fn stt_router(recognizer: Arc<SpeechRecognizer>) -> Router {
    Router::new()
        .route("/stt", post(stt_handler))
        .with_state(recognizer)
}

pub fn alpha_router(client: Arc<KnowledgeClient>) -> Router {
    Router::new()
        .route("/alpha", post(alpha_handler))
        .with_state(client)
}

pub fn tts_router(synthesizer: Arc<SpeechSynthesizer>) -> Router {
    Router::new()
        .route("/tts", post(tts_handler))
        .with_state(synthesizer)
}

/// Bind and serve one backend listener. Returns a handle that keeps the
/// serve task alive.
pub async fn start_service(router: Router, port: u16) -> Result<ServiceHandle, std::io::Error> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "backend listener started");

    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServiceHandle {
        port: local_addr.port(),
        _server: server,
    })
}

/// Handle returned by `start_service`. Dropping it stops nothing; the serve
/// task runs until process exit.
pub struct ServiceHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}
