//! Durable mapping from session ids to persisted similarity indexes.
//!
//! Each session owns one directory under the storage root, named by its id and holding
//! the serialized index. Directory presence is the single source of truth for whether a
//! session is alive: ingestion creates the directory, queries only read it, and the
//! reclamation task removes it. The directory's modification time doubles as the TTL
//! clock; no separate metadata record is kept.
//!
//! All path construction lives behind [`SessionStore`] so the on-disk layout can change
//! without touching the pipelines.

mod index;

pub use index::{IndexEntry, ScoredChunk, SessionIndex};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

const INDEX_FILE: &str = "index.json";
const STAGING_PREFIX: &str = ".staging-";

/// Errors raised by session store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A session directory with this id already exists; ids must be fresh.
    #[error("session '{0}' already exists")]
    AlreadyExists(String),
    /// The session directory is absent — never created, or already reclaimed.
    #[error("session '{0}' not found")]
    NotFound(String),
    /// Chunk texts and vectors were not paired one-to-one.
    #[error("chunk/vector count mismatch: {chunks} chunks, {vectors} vectors")]
    PairMismatch {
        /// Number of chunk texts supplied.
        chunks: usize,
        /// Number of vectors supplied.
        vectors: usize,
    },
    /// Underlying filesystem operation failed.
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),
    /// Persisted index could not be serialized or deserialized.
    #[error("index serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Filesystem-backed store of per-session similarity indexes.
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        tracing::debug!(root = %root.display(), "Opened session store");
        Ok(Self { root })
    }

    /// Build a new index over paired chunks and vectors and persist it atomically.
    ///
    /// The index is written into a hidden staging directory and renamed into place, so a
    /// session either exists fully or not at all — a concurrent query or reclamation scan
    /// can never observe a half-written session.
    pub fn create(
        &self,
        session_id: &str,
        chunks: Vec<String>,
        vectors: Vec<Vec<f32>>,
        dimension: usize,
    ) -> Result<(), StoreError> {
        if chunks.len() != vectors.len() {
            return Err(StoreError::PairMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }

        let target = self.session_dir(session_id);
        if target.exists() {
            return Err(StoreError::AlreadyExists(session_id.to_string()));
        }

        let index = SessionIndex::from_pairs(dimension, chunks.into_iter().zip(vectors).collect());

        let staging = self.root.join(format!("{STAGING_PREFIX}{session_id}"));
        fs::create_dir_all(&staging)?;
        let result = write_index(&staging, &index).and_then(|()| {
            fs::rename(&staging, &target).map_err(StoreError::from)
        });

        if result.is_err() {
            // Leave no staging debris behind on failure.
            let _ = fs::remove_dir_all(&staging);
        } else {
            tracing::debug!(session_id, chunks = index.len(), "Session index persisted");
        }
        result
    }

    /// Whether the session directory is currently present.
    pub fn exists(&self, session_id: &str) -> bool {
        is_valid_id(session_id) && self.session_dir(session_id).is_dir()
    }

    /// Deserialize the persisted index for querying.
    ///
    /// Fails with [`StoreError::NotFound`] when the directory is absent, covering both
    /// "never existed" and "reclaimed since the existence check".
    pub fn load(&self, session_id: &str) -> Result<SessionIndex, StoreError> {
        if !is_valid_id(session_id) {
            return Err(StoreError::NotFound(session_id.to_string()));
        }
        let path = self.session_dir(session_id).join(INDEX_FILE);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(session_id.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Remove the session directory tree.
    ///
    /// Idempotent: deleting an absent session succeeds, which absorbs the race where two
    /// reclamation passes target the same candidate.
    pub fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        if !is_valid_id(session_id) {
            return Ok(());
        }
        match fs::remove_dir_all(self.session_dir(session_id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Enumerate the ids of all sessions currently present under the root.
    ///
    /// Staging directories from in-flight creations are excluded.
    pub fn list_session_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }
            ids.push(name.to_string());
        }
        Ok(ids)
    }

    /// Modification time of the session directory, used as the inactivity clock.
    pub fn last_modified(&self, session_id: &str) -> Result<SystemTime, StoreError> {
        let metadata = match fs::metadata(self.session_dir(session_id)) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(session_id.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(metadata.modified()?)
    }

    fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(session_id)
    }
}

fn write_index(dir: &Path, index: &SessionIndex) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec(index)?;
    fs::write(dir.join(INDEX_FILE), bytes)?;
    Ok(())
}

// Session ids are generated UUIDs, but the query surface accepts arbitrary strings;
// anything that could escape the root or collide with staging entries is treated as
// a nonexistent session.
fn is_valid_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && !session_id.starts_with('.')
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
