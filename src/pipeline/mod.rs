//! Ingestion and retrieval-augmented query orchestration.

/// Prompt composition for grounded answers.
pub mod prompt;
mod service;
mod types;

pub use service::{RagApi, RagService};
pub use types::{
    ChatHistory, ChatTurn, IngestError, IngestOutcome, QueryOutcome, SESSION_EXPIRED_MESSAGE,
    SYSTEM_SPEAKER,
};
