//! HTTP surface for Paperchat.
//!
//! This module exposes a compact Axum router mirroring the upstream backend contract:
//!
//! - `POST /upload` – Ingest a raw PDF body into a fresh session; returns the session id
//!   and the initial chat history. Unparseable documents are rejected with 400.
//! - `POST /ask` – Answer a question against a session. Failures are folded into the
//!   returned history rather than surfaced as transport errors.
//! - `POST /clear` – Return an empty chat history. The session index is untouched.
//! - `GET /health` – Liveness probe.
//! - `GET /metrics` – Observe ingestion/query/reclamation counters.
//!
//! Callers hold their own chat history between requests; the server persists only the
//! per-session index.

use crate::metrics::MetricsSnapshot;
use crate::pipeline::{ChatHistory, IngestError, RagApi};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the chat API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: RagApi + 'static,
{
    Router::new()
        .route("/upload", post(upload_document::<S>))
        .route("/ask", post(ask_question::<S>))
        .route("/clear", post(clear_history::<S>))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics::<S>))
        .with_state(service)
}

/// Success response for the `POST /upload` endpoint.
#[derive(Serialize)]
struct UploadResponse {
    /// Identifier to pass to subsequent `/ask` calls.
    session_id: String,
    /// Initial transcript announcing the ingestion.
    chat_history: ChatHistory,
}

/// Ingest an uploaded PDF into a fresh session.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    body: Bytes,
) -> Result<Json<UploadResponse>, AppError>
where
    S: RagApi,
{
    if body.is_empty() {
        return Err(AppError::validation("Request body must contain a PDF document"));
    }

    let outcome = service.ingest(body.to_vec()).await?;
    tracing::info!(session_id = %outcome.session_id, "Upload request completed");
    Ok(Json(UploadResponse {
        session_id: outcome.session_id,
        chat_history: outcome.history,
    }))
}

/// Request body for the `POST /ask` endpoint.
#[derive(Deserialize)]
struct AskRequest {
    /// Session returned by a previous upload.
    session_id: String,
    /// Natural-language question about the document.
    question: String,
    /// Transcript from previous calls; the caller owns it between requests.
    #[serde(default)]
    chat_history: ChatHistory,
}

/// Response body for the `POST /ask` endpoint.
#[derive(Serialize)]
struct AskResponse {
    /// Transcript with this question's turn appended.
    chat_history: ChatHistory,
    /// Latest answer text; empty for no-op questions and expired sessions.
    answer: String,
}

/// Answer a question against a session's index.
///
/// This handler never fails for query-path reasons: expired sessions and completion
/// failures come back as transcript turns with a 200 status.
async fn ask_question<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AskRequest>,
) -> Json<AskResponse>
where
    S: RagApi,
{
    let AskRequest {
        session_id,
        question,
        chat_history,
    } = request;
    let outcome = service.query(&session_id, &question, chat_history).await;
    Json(AskResponse {
        chat_history: outcome.history,
        answer: outcome.answer,
    })
}

/// Response body for the `POST /clear` endpoint.
#[derive(Serialize)]
struct ClearResponse {
    chat_history: ChatHistory,
}

/// Hand the caller a fresh, empty transcript.
async fn clear_history<S>(State(service): State<Arc<S>>) -> Json<ClearResponse>
where
    S: RagApi,
{
    Json(ClearResponse {
        chat_history: service.clear(),
    })
}

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

/// Return service counters for observability dashboards.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: RagApi,
{
    Json(service.metrics_snapshot())
}

enum AppError {
    Validation(String),
    Ingest(IngestError),
}

impl AppError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::Ingest(IngestError::Extract(err)) => {
                (StatusCode::BAD_REQUEST, err.to_string()).into_response()
            }
            Self::Ingest(err) => {
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            }
        }
    }
}

impl From<IngestError> for AppError {
    fn from(inner: IngestError) -> Self {
        Self::Ingest(inner)
    }
}
