//! Fixed-window chunking with overlap.
//!
//! Documents are split into contiguous character windows of a target size, each window
//! starting `size - overlap` characters after the previous one so adjacent chunks share
//! `overlap` characters of context across the boundary. Splitting is purely positional;
//! no attempt is made to respect sentence or paragraph structure. The function is
//! deterministic and the windows are aligned to `char` boundaries, never bytes, so
//! multi-byte text cannot be split mid-character.

use thiserror::Error;

/// Errors produced while turning raw text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// A zero-length window can never make progress.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave room for the window to advance.
    #[error("chunk overlap {overlap} must be smaller than chunk size {size}")]
    InvalidOverlap {
        /// Configured window size.
        size: usize,
        /// Configured overlap.
        overlap: usize,
    },
}

/// Split `text` into overlapping windows of `size` characters.
///
/// Consecutive windows start `size - overlap` characters apart. Whitespace-only input
/// yields no chunks; input shorter than `size` yields a single chunk containing all of
/// it. The final window may be shorter than `size`.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>, ChunkingError> {
    if size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if overlap >= size {
        return Err(ChunkingError::InvalidOverlap { size, overlap });
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    let step = size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_yields_single_chunk() {
        let chunks = chunk_text("hello world", 1000, 200).expect("chunks");
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 1000, 200).expect("chunks").is_empty());
        assert!(chunk_text("   \n\t", 1000, 200).expect("chunks").is_empty());
    }

    #[test]
    fn windows_share_declared_overlap() {
        let text: String = ('a'..='z').cycle().take(25).collect();
        let chunks = chunk_text(&text, 10, 4).expect("chunks");

        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].chars().collect();
            let tail: String = prev[prev.len() - 4..].iter().collect();
            assert!(pair[1].starts_with(&tail));
        }
    }

    #[test]
    fn chunks_cover_the_whole_text() {
        let text = "The sky is blue because of Rayleigh scattering. Shorter wavelengths \
                    scatter more strongly than longer ones, so blue light dominates.";
        let (size, overlap) = (40, 10);
        let chunks = chunk_text(text, size, overlap).expect("chunks");

        // Reconstruct by dropping the overlap prefix of every chunk after the first.
        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            let body: String = chunk.chars().skip(overlap).collect();
            rebuilt.push_str(&body);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn chunking_is_deterministic() {
        let text: String = "lorem ipsum dolor sit amet ".repeat(50);
        let first = chunk_text(&text, 100, 20).expect("chunks");
        let second = chunk_text(&text, 100, 20).expect("chunks");
        assert_eq!(first, second);
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text = "日本語のテキストを分割する".repeat(10);
        let chunks = chunk_text(&text, 12, 3).expect("chunks");
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 12));
    }

    #[test]
    fn rejects_degenerate_parameters() {
        assert!(matches!(
            chunk_text("text", 0, 0),
            Err(ChunkingError::InvalidChunkSize)
        ));
        assert!(matches!(
            chunk_text("text", 10, 10),
            Err(ChunkingError::InvalidOverlap { .. })
        ));
    }
}
