use std::fmt;
use std::time::Duration;

use estimo_index::IndexError;
use estimo_llm::LlmError;
use serde::Serialize;

/// Failures that stop the process before any query is served.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid chunking configuration: {0}")]
    Chunking(#[source] IndexError),

    #[error("failed to load corpus: {0}")]
    Corpus(#[source] IndexError),

    #[error("embedding probe failed: {0}")]
    Probe(#[source] LlmError),

    #[error("embedding probe timed out after {0:?}")]
    ProbeTimeout(Duration),

    #[error("embedding probe returned an empty vector")]
    EmptyProbe,

    #[error("provider {provider} does not support embeddings")]
    EmbeddingsUnsupported { provider: String },

    #[error("embedder returns {probed}-dimensional vectors, configured dimension is {configured}")]
    DimensionMismatch { configured: usize, probed: usize },

    #[error("failed to build or load index: {0}")]
    Index(#[source] IndexError),
}

/// Pipeline stage a query was in when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStage {
    Validating,
    Embedding,
    Retrieving,
    Generating,
}

impl QueryStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Embedding => "embedding",
            Self::Retrieving => "retrieving",
            Self::Generating => "generating",
        }
    }
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryErrorKind {
    InvalidQuery,
    Embedding,
    DimensionMismatch,
    Generation,
    Timeout,
}

impl QueryErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidQuery => "invalid_query",
            Self::Embedding => "embedding",
            Self::DimensionMismatch => "dimension_mismatch",
            Self::Generation => "generation",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recoverable failure of a single query. Shared state is never affected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind} error while {stage}: {message}")]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub stage: QueryStage,
    pub message: String,
}

impl QueryError {
    pub fn new(kind: QueryErrorKind, stage: QueryStage, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            message: message.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::InvalidQuery, QueryStage::Validating, message)
    }

    pub(crate) fn timeout(stage: QueryStage, after: Duration) -> Self {
        Self::new(
            QueryErrorKind::Timeout,
            stage,
            format!("no response within {}s", after.as_secs()),
        )
    }

    /// Classify a provider error raised while embedding or generating.
    pub(crate) fn from_provider(stage: QueryStage, err: &LlmError) -> Self {
        let kind = if err.is_timeout() {
            QueryErrorKind::Timeout
        } else if stage == QueryStage::Generating {
            QueryErrorKind::Generation
        } else {
            QueryErrorKind::Embedding
        };
        Self::new(kind, stage, err.to_string())
    }

    pub(crate) fn from_index(stage: QueryStage, err: &IndexError) -> Self {
        let kind = match err {
            IndexError::DimensionMismatch { .. } => QueryErrorKind::DimensionMismatch,
            IndexError::Llm(e) if e.is_timeout() => QueryErrorKind::Timeout,
            _ => QueryErrorKind::Embedding,
        };
        Self::new(kind, stage, err.to_string())
    }
}
