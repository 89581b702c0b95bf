//! Error types for the retrieval engine.

use faq_embeddings::EmbeddingError;
use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur in the retrieval engine.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// A document or query log id did not resolve.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: u64 },

    /// Input rejected before any side effect.
    #[error("validation error: {0}")]
    Validation(String),

    /// Vector length disagreement between embedder, index, or caller.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The vector index or another backend is unreachable or timed out.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Any other embedding error.
    #[error("embedding error: {0}")]
    Embedding(EmbeddingError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RetrievalError {
    pub(crate) fn document_not_found(id: u64) -> Self {
        Self::NotFound {
            kind: "document",
            id,
        }
    }
}

impl From<EmbeddingError> for RetrievalError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::DimensionMismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
            err if err.is_unavailable() => Self::BackendUnavailable(err.to_string()),
            err => Self::Embedding(err),
        }
    }
}
