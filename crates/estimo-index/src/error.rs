//! Error types for estimo-index.

use std::path::PathBuf;

/// Errors raised while preparing or searching the index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// IO error reading the corpus or the persisted index.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Embedding provider error.
    #[error("embedding failed: {0}")]
    Llm(#[from] estimo_llm::LlmError),

    #[error("invalid chunking: chunk_size {chunk_size}, overlap {overlap}")]
    InvalidChunking { chunk_size: usize, overlap: usize },

    /// Vector length differs from the index dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedder returned {got} vectors for {expected} chunks")]
    EmbeddingCount { expected: usize, got: usize },

    /// Persisted index is structurally inconsistent.
    #[error("corrupt index: {0}")]
    Corrupt(String),
}

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type alias using `IndexError`.
pub type Result<T> = std::result::Result<T, IndexError>;
