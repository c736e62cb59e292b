//! Data types and errors shared by the ingestion and query pipelines.

use crate::chunking::ChunkingError;
use crate::embedding::EmbeddingClientError;
use crate::extract::ExtractError;
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Speaker label used for turns authored by the service itself.
pub const SYSTEM_SPEAKER: &str = "System";

/// Message appended when a query targets a session that no longer exists.
pub const SESSION_EXPIRED_MESSAGE: &str =
    "Session expired or not found. Please upload your document again.";

/// One entry in a conversation transcript.
///
/// `speaker` is either the fixed system label or the literal question text; `message`
/// carries the system notice or the generated answer. Query failures become ordinary
/// turns with an `Error: ...` message, which keeps the transcript appendable after any
/// outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who produced this turn: the system label or the verbatim question.
    pub speaker: String,
    /// The system notice, answer, or error text.
    pub message: String,
}

impl ChatTurn {
    /// A turn authored by the service.
    pub fn system(message: impl Into<String>) -> Self {
        Self {
            speaker: SYSTEM_SPEAKER.to_string(),
            message: message.into(),
        }
    }

    /// A question/answer exchange keyed by the question text.
    pub fn exchange(question: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            speaker: question.into(),
            message: message.into(),
        }
    }
}

/// Ordered conversation transcript, held by the caller between requests.
pub type ChatHistory = Vec<ChatTurn>;

/// Result of a successful ingestion.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Fresh identifier for the created session.
    pub session_id: String,
    /// Initial transcript announcing the session.
    pub history: ChatHistory,
}

/// Result of a query call. Produced for every query, including degraded outcomes.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    /// Transcript with this query's turn appended (unchanged for blank questions).
    pub history: ChatHistory,
    /// Latest answer text; empty when no turn was produced.
    pub answer: String,
}

/// Errors that abort an ingestion. Nothing durable exists when one of these is
/// returned, so the caller retries the whole upload.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Uploaded bytes were not a usable document.
    #[error(transparent)]
    Extract(#[from] ExtractError),
    /// Extracted text could not be chunked.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed; no partial index is persisted.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// Persisting the session index failed.
    #[error("Failed to persist session index: {0}")]
    Store(#[from] StoreError),
}
