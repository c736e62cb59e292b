#![deny(missing_docs)]

//! Core library for the Paperchat retrieval-augmented chat server.

/// HTTP routing and REST handlers.
pub mod api;
/// Fixed-window text chunking.
pub mod chunking;
/// LLM completion gateway.
pub mod completion;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// PDF text extraction.
pub mod extract;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion and query counters.
pub mod metrics;
/// Ingestion and retrieval-augmented query pipelines.
pub mod pipeline;
/// Session reclamation background task.
pub mod reaper;
/// Per-session similarity index storage.
pub mod store;
