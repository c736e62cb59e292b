//! In-memory similarity index persisted per session.

use serde::{Deserialize, Serialize};

/// A single indexed chunk: its text and the embedding computed at ingestion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Chunk text as extracted from the source document.
    pub text: String,
    /// Embedding vector for `text`, computed once and never refreshed.
    pub vector: Vec<f32>,
}

/// Similarity index over the chunks of one session's document.
///
/// Built once during ingestion and read-only afterwards. Search is brute-force cosine
/// similarity over all entries; session indexes cover a single document, so the entry
/// count stays small enough that nothing smarter is warranted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionIndex {
    /// Dimensionality every stored vector conforms to.
    pub dimension: usize,
    /// Indexed chunks in document order.
    pub entries: Vec<IndexEntry>,
}

/// A retrieval hit: chunk text plus its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// Text of the retrieved chunk.
    pub text: String,
    /// Cosine similarity between the query vector and the chunk vector.
    pub score: f32,
}

impl SessionIndex {
    /// Build an index from paired chunk texts and vectors.
    pub fn from_pairs(dimension: usize, pairs: Vec<(String, Vec<f32>)>) -> Self {
        let entries = pairs
            .into_iter()
            .map(|(text, vector)| IndexEntry { text, vector })
            .collect();
        Self { dimension, entries }
    }

    /// Number of chunks held by the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return up to `k` entries most similar to `query`, most-similar first.
    ///
    /// An empty index yields an empty result rather than an error; the query pipeline
    /// degrades to an empty grounding context in that case.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                text: entry.text.clone(),
                score: cosine_similarity(query, &entry.vector),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
