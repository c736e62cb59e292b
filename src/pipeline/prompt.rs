//! Fixed prompt templates for the query pipeline.

/// Persona instruction sent as the system message on every completion call.
pub const SYSTEM_PROMPT: &str = "You are a research assistant that explains technical \
papers in clear, accessible language. Answer using only the provided context from the \
uploaded document. If the context does not contain the answer, say that the document \
does not cover it.";

/// Number of chunks retrieved to ground an answer.
pub const TOP_K: usize = 3;

/// Compose the user message from the retrieved context and the question.
///
/// `context` holds the retrieved chunks joined by blank lines, most similar first; an
/// empty context is passed through as-is so sessions over empty documents still answer.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Use the following excerpts from the document to answer the question.\n\n\
         Context:\n{context}\n\nQuestion: {question}\n\nAnswer:"
    )
}
