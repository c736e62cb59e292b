use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion, query, and reclamation activity.
#[derive(Default)]
pub struct RagMetrics {
    sessions_created: AtomicU64,
    chunks_indexed: AtomicU64,
    questions_answered: AtomicU64,
    sessions_reclaimed: AtomicU64,
}

impl RagMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a created session and the number of chunks indexed for it.
    pub fn record_session(&self, chunk_count: u64) {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunk_count, Ordering::Relaxed);
    }

    /// Record a question that produced a transcript turn.
    pub fn record_question(&self) {
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record sessions removed by a reclamation sweep.
    pub fn record_reclaimed(&self, count: u64) {
        self.sessions_reclaimed.fetch_add(count, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_created: self.sessions_created.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            sessions_reclaimed: self.sessions_reclaimed.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of service counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Sessions created since startup.
    pub sessions_created: u64,
    /// Total chunks indexed across all sessions.
    pub chunks_indexed: u64,
    /// Questions that produced a transcript turn.
    pub questions_answered: u64,
    /// Sessions removed by the reclamation task.
    pub sessions_reclaimed: u64,
}
