//! Service coordinating extraction, chunking, embedding, storage, and completion.

use crate::{
    chunking::chunk_text,
    completion::{CompletionClient, HttpCompletionClient},
    config::get_config,
    embedding::{EmbeddingClient, get_embedding_client},
    extract::extract_text,
    metrics::{MetricsSnapshot, RagMetrics},
    pipeline::{
        prompt::{SYSTEM_PROMPT, TOP_K, build_prompt},
        types::{
            ChatHistory, ChatTurn, IngestError, IngestOutcome, QueryOutcome,
            SESSION_EXPIRED_MESSAGE,
        },
    },
    store::{SessionStore, StoreError},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Coordinates the full document lifecycle: ingestion into a per-session index and
/// retrieval-augmented answering against it.
///
/// The service owns long-lived handles to the embedding client, the session store, the
/// completion gateway, and the metrics registry. Construct it once near process start
/// and share it through an `Arc`; the store and metrics handles are shared with the
/// reclamation task.
pub struct RagService {
    embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
    completion_client: Box<dyn CompletionClient + Send + Sync>,
    store: Arc<SessionStore>,
    metrics: Arc<RagMetrics>,
}

/// Abstraction over the pipelines consumed by the HTTP surface.
#[async_trait]
pub trait RagApi: Send + Sync {
    /// Extract, chunk, embed, and persist an uploaded document, returning the new
    /// session id and its initial transcript.
    async fn ingest(&self, document: Vec<u8>) -> Result<IngestOutcome, IngestError>;

    /// Answer a question against a session, appending the outcome to `history`.
    async fn query(&self, session_id: &str, question: &str, history: ChatHistory)
    -> QueryOutcome;

    /// Produce an empty transcript. The session and its index are untouched.
    fn clear(&self) -> ChatHistory;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl RagService {
    /// Build a service from the process configuration.
    pub fn new(store: Arc<SessionStore>, metrics: Arc<RagMetrics>) -> Self {
        tracing::info!("Initializing embedding client");
        let embedding_client = get_embedding_client();
        let completion_client = Box::new(HttpCompletionClient::from_config());
        Self {
            embedding_client,
            completion_client,
            store,
            metrics,
        }
    }

    /// Build a service from explicit parts. Used by tests to substitute clients.
    pub fn with_parts(
        embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
        completion_client: Box<dyn CompletionClient + Send + Sync>,
        store: Arc<SessionStore>,
        metrics: Arc<RagMetrics>,
    ) -> Self {
        Self {
            embedding_client,
            completion_client,
            store,
            metrics,
        }
    }

    /// Ingest a raw uploaded PDF document.
    pub async fn ingest(&self, document: &[u8]) -> Result<IngestOutcome, IngestError> {
        let text = extract_text(document)?;
        self.ingest_text(&text).await
    }

    /// Ingest already-extracted text into a fresh session.
    ///
    /// Text without extractable content still creates a session; its queries run with an
    /// empty grounding context. Any embedding or storage failure aborts the whole
    /// ingestion with nothing persisted.
    pub async fn ingest_text(&self, text: &str) -> Result<IngestOutcome, IngestError> {
        let config = get_config();
        let chunks = chunk_text(text, config.chunk_size, config.chunk_overlap)?;
        let vectors = if chunks.is_empty() {
            Vec::new()
        } else {
            self.embedding_client.embed_batch(chunks.clone()).await?
        };

        debug_assert_eq!(chunks.len(), vectors.len());

        let session_id = uuid::Uuid::new_v4().to_string();
        let chunk_count = chunks.len();
        self.store
            .create(&session_id, chunks, vectors, config.embedding_dimension)?;

        self.metrics.record_session(chunk_count as u64);
        tracing::info!(session_id, chunks = chunk_count, "Document ingested");

        let history = vec![ChatTurn::system(format!(
            "Document processed successfully! Session ID: {session_id}. \
             You can now ask questions about it."
        ))];
        Ok(IngestOutcome {
            session_id,
            history,
        })
    }

    /// Answer a question against a session's index.
    ///
    /// Never fails the call as a whole: a vanished session appends the fixed expiry
    /// notice, a blank question returns the transcript unchanged, and every downstream
    /// failure is folded into the transcript as an `Error: ...` turn so the caller's
    /// session stays usable.
    pub async fn query(
        &self,
        session_id: &str,
        question: &str,
        mut history: ChatHistory,
    ) -> QueryOutcome {
        if !self.store.exists(session_id) {
            tracing::info!(session_id, "Query against absent session");
            history.push(ChatTurn::system(SESSION_EXPIRED_MESSAGE));
            return QueryOutcome {
                history,
                answer: String::new(),
            };
        }

        if question.trim().is_empty() {
            return QueryOutcome {
                history,
                answer: String::new(),
            };
        }

        // The existence check above can race the reclamation task; a NotFound here is
        // the same user-visible outcome, not an error.
        let index = match self.store.load(session_id) {
            Ok(index) => index,
            Err(StoreError::NotFound(_)) => {
                tracing::info!(session_id, "Session reclaimed between check and load");
                history.push(ChatTurn::system(SESSION_EXPIRED_MESSAGE));
                return QueryOutcome {
                    history,
                    answer: String::new(),
                };
            }
            Err(err) => return self.fold_failure(history, question, &err),
        };

        let query_vector = match self.embedding_client.embed(question.to_string()).await {
            Ok(vector) => vector,
            Err(err) => return self.fold_failure(history, question, &err),
        };

        let hits = index.search(&query_vector, TOP_K);
        let context = hits
            .iter()
            .map(|hit| hit.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        tracing::debug!(
            session_id,
            retrieved = hits.len(),
            context_len = context.len(),
            "Retrieved grounding context"
        );

        let prompt = build_prompt(&context, question);
        match self.completion_client.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(answer) => {
                self.metrics.record_question();
                history.push(ChatTurn::exchange(question, answer.clone()));
                QueryOutcome { history, answer }
            }
            Err(err) => self.fold_failure(history, question, &err),
        }
    }

    /// Produce an empty transcript; the session directory is untouched.
    pub fn clear(&self) -> ChatHistory {
        Vec::new()
    }

    /// Return the current service counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn fold_failure(
        &self,
        mut history: ChatHistory,
        question: &str,
        error: &dyn std::error::Error,
    ) -> QueryOutcome {
        tracing::warn!(error = %error, "Query failed; folding into transcript");
        let answer = format!("Error: {error}");
        history.push(ChatTurn::exchange(question, answer.clone()));
        QueryOutcome { history, answer }
    }
}

#[async_trait]
impl RagApi for RagService {
    async fn ingest(&self, document: Vec<u8>) -> Result<IngestOutcome, IngestError> {
        RagService::ingest(self, &document).await
    }

    async fn query(
        &self,
        session_id: &str,
        question: &str,
        history: ChatHistory,
    ) -> QueryOutcome {
        RagService::query(self, session_id, question, history).await
    }

    fn clear(&self) -> ChatHistory {
        RagService::clear(self)
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        RagService::metrics_snapshot(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionError;
    use crate::config::{CONFIG, Config};
    use crate::embedding::EmbeddingClientError;
    use crate::pipeline::types::SYSTEM_SPEAKER;
    use reqwest::StatusCode;
    use std::sync::Once;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    fn ensure_test_config() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let _ = CONFIG.set(Config {
                storage_root: std::env::temp_dir().join("paperchat-test-unused"),
                session_ttl_secs: 1000,
                cleanup_interval_secs: 600,
                completion_base_url: "http://127.0.0.1:9".into(),
                completion_api_key: None,
                completion_model: "test-model".into(),
                completion_timeout_secs: 5,
                embedding_dimension: 2,
                chunk_size: 100,
                chunk_overlap: 20,
                server_port: None,
            });
        });
    }

    /// Embedding mock with controlled similarity: anything mentioning the sky maps to
    /// one axis, everything else to the other.
    struct KeywordEmbedder;

    #[async_trait]
    impl EmbeddingClient for KeywordEmbedder {
        async fn embed_batch(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            Ok(texts
                .into_iter()
                .map(|text| {
                    let lower = text.to_lowercase();
                    if lower.contains("sky") || lower.contains("rayleigh") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingClient for FailingEmbedder {
        async fn embed_batch(
            &self,
            _texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            Err(EmbeddingClientError::GenerationFailed("model offline".into()))
        }
    }

    struct StubCompletion {
        calls: Arc<Mutex<Vec<(String, String)>>>,
        fail: bool,
    }

    impl StubCompletion {
        fn answering() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                fail: true,
            }
        }

        fn recorded(&self) -> Arc<Mutex<Vec<(String, String)>>> {
            self.calls.clone()
        }
    }

    #[async_trait]
    impl CompletionClient for StubCompletion {
        async fn complete(&self, system: &str, user: &str) -> Result<String, CompletionError> {
            self.calls
                .lock()
                .await
                .push((system.to_string(), user.to_string()));
            if self.fail {
                Err(CompletionError::UnexpectedStatus {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    body: "upstream down".into(),
                })
            } else {
                Ok("Because shorter wavelengths scatter more strongly.".into())
            }
        }
    }

    fn service_with(
        dir: &TempDir,
        embedder: Box<dyn EmbeddingClient + Send + Sync>,
        completion: Box<dyn CompletionClient + Send + Sync>,
    ) -> (RagService, Arc<SessionStore>) {
        ensure_test_config();
        let store = Arc::new(SessionStore::new(dir.path()).expect("store"));
        let service = RagService::with_parts(
            embedder,
            completion,
            store.clone(),
            Arc::new(RagMetrics::new()),
        );
        (service, store)
    }

    const DOCUMENT: &str = "The sky is blue because of Rayleigh scattering. \
        Filler paragraph about unrelated instrumentation and calibration procedures. \
        Another filler paragraph describing the appendix layout of the paper.";

    #[tokio::test]
    async fn ingest_then_query_round_trip() {
        let dir = TempDir::new().expect("tempdir");
        let completion = Box::new(StubCompletion::answering());
        let (service, _store) = service_with(&dir, Box::new(KeywordEmbedder), completion);

        let outcome = service.ingest_text(DOCUMENT).await.expect("ingest");
        assert_eq!(outcome.history.len(), 1);
        assert_eq!(outcome.history[0].speaker, SYSTEM_SPEAKER);
        assert!(outcome.history[0].message.contains(&outcome.session_id));

        let question = "Why is the sky blue?";
        let result = service
            .query(&outcome.session_id, question, outcome.history.clone())
            .await;

        let last = result.history.last().expect("appended turn");
        assert_eq!(last.speaker, question);
        assert_eq!(last.message, result.answer);
        assert!(!result.answer.is_empty());
        assert_eq!(service.metrics_snapshot().questions_answered, 1);
    }

    #[tokio::test]
    async fn retrieved_context_reaches_the_completion_prompt() {
        let dir = TempDir::new().expect("tempdir");
        let completion = StubCompletion::answering();
        let recorded = completion.recorded();
        let (service, _store) = service_with(
            &dir,
            Box::new(KeywordEmbedder),
            Box::new(completion),
        );

        let outcome = service.ingest_text(DOCUMENT).await.expect("ingest");
        service
            .query(&outcome.session_id, "Why is the sky blue?", Vec::new())
            .await;

        let calls = recorded.lock().await;
        assert_eq!(calls.len(), 1);
        let (system, user) = &calls[0];
        assert_eq!(system, SYSTEM_PROMPT);
        assert!(user.contains("Rayleigh scattering"));
        assert!(user.contains("Why is the sky blue?"));
    }

    #[tokio::test]
    async fn missing_session_yields_expiry_notice() {
        let dir = TempDir::new().expect("tempdir");
        let (service, _store) = service_with(
            &dir,
            Box::new(KeywordEmbedder),
            Box::new(StubCompletion::answering()),
        );

        let result = service.query("no-such-session", "Anything?", Vec::new()).await;
        assert_eq!(result.history.len(), 1);
        assert_eq!(result.history[0].speaker, SYSTEM_SPEAKER);
        assert_eq!(result.history[0].message, SESSION_EXPIRED_MESSAGE);
        assert!(result.answer.is_empty());
    }

    #[tokio::test]
    async fn blank_question_is_a_no_op() {
        let dir = TempDir::new().expect("tempdir");
        let (service, _store) = service_with(
            &dir,
            Box::new(KeywordEmbedder),
            Box::new(StubCompletion::answering()),
        );

        let outcome = service.ingest_text(DOCUMENT).await.expect("ingest");
        let before = outcome.history.clone();
        let result = service
            .query(&outcome.session_id, "   \n", outcome.history)
            .await;

        assert_eq!(result.history, before);
        assert!(result.answer.is_empty());
    }

    #[tokio::test]
    async fn completion_failure_becomes_an_error_turn() {
        let dir = TempDir::new().expect("tempdir");
        let (service, _store) = service_with(
            &dir,
            Box::new(KeywordEmbedder),
            Box::new(StubCompletion::failing()),
        );

        let outcome = service.ingest_text(DOCUMENT).await.expect("ingest");
        let question = "Why is the sky blue?";
        let result = service.query(&outcome.session_id, question, Vec::new()).await;

        let last = result.history.last().expect("turn");
        assert_eq!(last.speaker, question);
        assert!(last.message.starts_with("Error: "));
        assert!(last.message.contains("500"));

        // The session survives a failed completion.
        let retry = service.query(&outcome.session_id, question, result.history).await;
        assert_eq!(retry.history.len(), 2);
    }

    #[tokio::test]
    async fn embedding_failure_aborts_ingestion_without_a_session() {
        let dir = TempDir::new().expect("tempdir");
        let (service, store) = service_with(
            &dir,
            Box::new(FailingEmbedder),
            Box::new(StubCompletion::answering()),
        );

        let err = service.ingest_text(DOCUMENT).await.expect_err("ingest fails");
        assert!(matches!(err, IngestError::Embedding(_)));
        assert!(store.list_session_ids().expect("list").is_empty());
    }

    #[tokio::test]
    async fn empty_document_creates_a_degraded_session() {
        let dir = TempDir::new().expect("tempdir");
        let (service, _store) = service_with(
            &dir,
            Box::new(KeywordEmbedder),
            Box::new(StubCompletion::answering()),
        );

        let outcome = service.ingest_text("").await.expect("ingest");
        let result = service
            .query(&outcome.session_id, "Anything in here?", Vec::new())
            .await;

        // Empty context still produces a normal answer turn.
        let last = result.history.last().expect("turn");
        assert_eq!(last.speaker, "Anything in here?");
        assert!(!result.answer.is_empty());
    }

    #[tokio::test]
    async fn session_deleted_mid_query_resolves_to_expiry() {
        let dir = TempDir::new().expect("tempdir");
        let (service, store) = service_with(
            &dir,
            Box::new(KeywordEmbedder),
            Box::new(StubCompletion::answering()),
        );

        let outcome = service.ingest_text(DOCUMENT).await.expect("ingest");

        // Simulate the reaper winning the race between the existence check and the
        // load: the directory survives but the index artifact is already gone.
        let index_path = dir.path().join(&outcome.session_id).join("index.json");
        std::fs::remove_file(&index_path).expect("remove index");

        let result = service
            .query(&outcome.session_id, "Why is the sky blue?", Vec::new())
            .await;
        let last = result.history.last().expect("turn");
        assert_eq!(last.message, SESSION_EXPIRED_MESSAGE);

        // And the ordinary case: fully deleted before the call.
        store.delete(&outcome.session_id).expect("delete");
        let result = service
            .query(&outcome.session_id, "Why is the sky blue?", Vec::new())
            .await;
        assert_eq!(
            result.history.last().expect("turn").message,
            SESSION_EXPIRED_MESSAGE
        );
    }

    #[tokio::test]
    async fn clear_returns_empty_history_and_keeps_sessions() {
        let dir = TempDir::new().expect("tempdir");
        let (service, store) = service_with(
            &dir,
            Box::new(KeywordEmbedder),
            Box::new(StubCompletion::answering()),
        );

        let outcome = service.ingest_text(DOCUMENT).await.expect("ingest");
        assert!(service.clear().is_empty());
        assert!(store.exists(&outcome.session_id));
    }
}
