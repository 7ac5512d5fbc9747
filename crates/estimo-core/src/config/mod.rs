mod env;
mod types;


pub use types::*;

use std::path::Path;

use anyhow::{Context, bail};
use estimo_index::SearchStrategy;

impl Config {
    /// Load configuration from a TOML file with env var overrides, then validate.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or if
    /// the resulting configuration is invalid.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with.
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting.
    pub fn validate(&self) -> anyhow::Result<()> {
        let chunking = &self.chunking;
        if chunking.chunk_size == 0 {
            bail!("chunking.chunk_size must be greater than 0");
        }
        if chunking.chunk_overlap >= chunking.chunk_size {
            bail!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunking.chunk_overlap,
                chunking.chunk_size
            );
        }
        if self.index.embed_batch_size == 0 {
            bail!("index.embed_batch_size must be greater than 0");
        }
        if self.index.embedding_dimension == Some(0) {
            bail!("index.embedding_dimension must be greater than 0");
        }

        let retrieval = &self.retrieval;
        if retrieval.top_k == 0 {
            bail!("retrieval.top_k must be greater than 0");
        }
        if retrieval.max_context_chunks == 0 {
            bail!("retrieval.max_context_chunks must be greater than 0");
        }
        if !(0.0..=1.0).contains(&retrieval.mmr_lambda) {
            bail!(
                "retrieval.mmr_lambda must be within [0, 1], got {}",
                retrieval.mmr_lambda
            );
        }
        if retrieval.strategy == SearchStrategy::Mmr && retrieval.fetch_k < retrieval.top_k {
            bail!(
                "retrieval.fetch_k ({}) must be at least top_k ({}) for mmr",
                retrieval.fetch_k,
                retrieval.top_k
            );
        }
        if retrieval.max_distance.is_some_and(|d| d.is_nan() || d < 0.0) {
            bail!("retrieval.max_distance must be a non-negative number");
        }

        if self.timeouts.embedding_seconds == 0 || self.timeouts.llm_seconds == 0 {
            bail!("timeouts must be greater than 0 seconds");
        }
        if self.query.max_chars == 0 {
            bail!("query.max_chars must be greater than 0");
        }
        if self.llm.max_tokens == 0 {
            bail!("llm.max_tokens must be greater than 0");
        }
        Ok(())
    }
}
