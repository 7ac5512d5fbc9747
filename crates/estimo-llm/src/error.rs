#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rate limited")]
    RateLimited,

    #[error("empty response from {provider}")]
    EmptyResponse { provider: String },

    #[error("SSE parse error: {0}")]
    SseParse(String),

    #[error("embedding not supported by {provider}")]
    EmbedUnsupported { provider: String },

    #[error("{provider} returned {got} embeddings for {expected} inputs")]
    EmbeddingCount {
        provider: String,
        expected: usize,
        got: usize,
    },

    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// Whether the failure came from the transport layer timing out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
