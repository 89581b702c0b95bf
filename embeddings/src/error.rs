//! Error types for the embeddings system.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur in the embeddings system.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The vector index is closed or its backing store cannot be reached.
    #[error("vector index unavailable: {0}")]
    IndexUnavailable(String),

    /// A backend call did not finish before its deadline.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    /// Invalid index or embedder configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EmbeddingError {
    /// Whether this error means the backend could not serve the request,
    /// as opposed to the request itself being wrong.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::IndexUnavailable(_) | Self::Timeout { .. })
    }
}
