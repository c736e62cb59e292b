//! PDF text extraction behind a narrow function seam.
//!
//! `pdf-extract` flattens the whole document into a single string. Extraction failure
//! means the bytes are not a usable PDF and is reported to the uploader; a well-formed
//! PDF with no text layer (scans, image-only pages) is not an error — the ingestion
//! pipeline accepts the empty result and builds an empty index.

use thiserror::Error;

/// Errors raised while extracting text from an uploaded document.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The uploaded bytes could not be parsed as a PDF document.
    #[error("Failed to parse PDF document: {0}")]
    InvalidDocument(String),
}

/// Extract the plain-text content of a PDF supplied as raw bytes.
///
/// Returns an empty string for documents without extractable text.
pub fn extract_text(data: &[u8]) -> Result<String, ExtractError> {
    let text = pdf_extract::extract_text_from_mem(data)
        .map_err(|err| ExtractError::InvalidDocument(err.to_string()))?;
    Ok(text)
}
