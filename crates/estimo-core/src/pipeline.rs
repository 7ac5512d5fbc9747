//! Startup barrier and per-query answering pipeline.
//!
//! A [`Pipeline`] only exists once the index has been built or loaded, so
//! holding one means the system is ready. Queries share it by reference and
//! never mutate it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use estimo_index::chunker::{self, ChunkerConfig};
use estimo_index::record::{corpus_fingerprint, load_corpus};
use estimo_index::{
    DistanceMetric, IndexOptions, IndexOrigin, RetrievalConfig, Retriever, VectorIndex, context,
};
use estimo_llm::{LlmError, LlmProvider, Message};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;

use crate::config::Config;
use crate::error::{QueryError, QueryStage, StartupError};

const PROBE_TEXT: &str = "probe";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub chunks: usize,
    pub uptime_secs: u64,
}

/// Everything the pipeline needs from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub corpus_path: PathBuf,
    pub chunker: ChunkerConfig,
    pub index_path: PathBuf,
    pub embedding_dimension: Option<usize>,
    pub embed_batch_size: usize,
    pub metric: DistanceMetric,
    pub embedding_model: String,
    pub retrieval: RetrievalConfig,
    pub max_context_chunks: usize,
    pub max_query_chars: usize,
    pub embedding_timeout: Duration,
    pub llm_timeout: Duration,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            corpus_path: config.corpus.path.clone(),
            chunker: config.chunking.into(),
            index_path: config.index.path.clone(),
            embedding_dimension: config.index.embedding_dimension,
            embed_batch_size: config.index.embed_batch_size,
            metric: config.index.metric,
            embedding_model: config.llm.embedding_model.clone(),
            retrieval: config.retrieval.into(),
            max_context_chunks: config.retrieval.max_context_chunks,
            max_query_chars: config.query.max_chars,
            embedding_timeout: config.timeouts.embedding(),
            llm_timeout: config.timeouts.llm(),
        }
    }
}

/// Ready-state handle: the loaded index plus the provider handles.
pub struct Pipeline<E, G> {
    index: Arc<VectorIndex>,
    retriever: Retriever,
    embedder: Arc<E>,
    generator: Arc<G>,
    origin: IndexOrigin,
    max_context_chunks: usize,
    max_query_chars: usize,
    embedding_timeout: Duration,
    llm_timeout: Duration,
    started_at: Instant,
}

impl<E: LlmProvider, G: LlmProvider> Pipeline<E, G> {
    /// Run the one-time indexing phase and return the ready pipeline.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal: invalid chunking, an unreadable or
    /// unparseable corpus, an embedder that is unreachable or cannot embed,
    /// a probed dimension that disagrees with the configured one, or an index
    /// that cannot be loaded, built or written.
    pub async fn start(
        settings: PipelineSettings,
        embedder: Arc<E>,
        generator: Arc<G>,
    ) -> Result<Self, StartupError> {
        let started_at = Instant::now();
        tracing::info!(state = "indexing", embedder = embedder.name(), "pipeline starting");

        settings.chunker.validate().map_err(StartupError::Chunking)?;
        if !embedder.supports_embeddings() {
            return Err(StartupError::EmbeddingsUnsupported {
                provider: embedder.name().to_owned(),
            });
        }
        let records = load_corpus(&settings.corpus_path)
            .await
            .map_err(StartupError::Corpus)?;
        if records.is_empty() {
            tracing::warn!(path = %settings.corpus_path.display(), "corpus is empty");
        }
        let chunks = chunker::split(&records, &settings.chunker).map_err(StartupError::Chunking)?;

        let dimension = probe_dimension(embedder.as_ref(), settings.embedding_timeout).await?;
        if let Some(configured) = settings.embedding_dimension
            && configured != dimension
        {
            return Err(StartupError::DimensionMismatch {
                configured,
                probed: dimension,
            });
        }

        let options = IndexOptions {
            path: settings.index_path.clone(),
            expected_dimension: dimension,
            batch_size: settings.embed_batch_size,
            metric: settings.metric,
            embedding_model: settings.embedding_model.clone(),
            corpus_fingerprint: corpus_fingerprint(&records),
        };
        let (index, origin) = VectorIndex::build_or_load(&chunks, embedder.as_ref(), &options)
            .await
            .map_err(StartupError::Index)?;

        tracing::info!(
            state = "ready",
            origin = origin.as_str(),
            entries = index.len(),
            dimension,
            metric = %index.metric(),
            elapsed_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            "pipeline ready"
        );

        Ok(Self {
            index: Arc::new(index),
            retriever: Retriever::new(settings.retrieval),
            embedder,
            generator,
            origin,
            max_context_chunks: settings.max_context_chunks,
            max_query_chars: settings.max_query_chars,
            embedding_timeout: settings.embedding_timeout,
            llm_timeout: settings.llm_timeout,
            started_at,
        })
    }

    /// Answer one question from retrieved context.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] naming the failed stage. The pipeline stays
    /// usable for later queries.
    pub async fn answer_query(&self, query: &str) -> Result<QueryResponse, QueryError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(QueryError::invalid("query must not be empty"));
        }
        let len = query.chars().count();
        if len > self.max_query_chars {
            return Err(QueryError::invalid(format!(
                "query is {len} characters, limit is {}",
                self.max_query_chars
            )));
        }

        let stage_start = Instant::now();
        let vector = match tokio::time::timeout(self.embedding_timeout, self.embedder.embed(query))
            .await
        {
            Ok(Ok(vector)) => vector,
            Ok(Err(e)) => {
                tracing::error!(stage = "embedding", "query embedding failed: {e}");
                return Err(QueryError::from_provider(QueryStage::Embedding, &e));
            }
            Err(_) => {
                tracing::error!(stage = "embedding", "query embedding timed out");
                return Err(QueryError::timeout(
                    QueryStage::Embedding,
                    self.embedding_timeout,
                ));
            }
        };
        tracing::debug!(stage = "embedding", elapsed_ms = elapsed_ms(stage_start));

        let stage_start = Instant::now();
        let context = {
            let result = self
                .retriever
                .retrieve(&self.index, &vector)
                .map_err(|e| QueryError::from_index(QueryStage::Retrieving, &e))?;
            tracing::debug!(
                stage = "retrieving",
                hits = result.len(),
                elapsed_ms = elapsed_ms(stage_start)
            );
            context::assemble(&result, self.max_context_chunks)
        };
        tracing::debug!(stage = "assembling", context_chars = context.chars().count());

        let prompt = build_prompt(&context, query);
        let stage_start = Instant::now();
        let answer = match tokio::time::timeout(self.llm_timeout, self.generate(prompt)).await {
            Ok(Ok(answer)) => answer,
            Ok(Err(e)) => {
                tracing::error!(stage = "generating", "generation failed: {e}");
                return Err(QueryError::from_provider(QueryStage::Generating, &e));
            }
            Err(_) => {
                tracing::error!(stage = "generating", "generation timed out");
                return Err(QueryError::timeout(QueryStage::Generating, self.llm_timeout));
            }
        };
        tracing::debug!(
            stage = "generating",
            answer_chars = answer.chars().count(),
            elapsed_ms = elapsed_ms(stage_start)
        );

        Ok(QueryResponse { answer })
    }

    /// Pull the fragment stream to completion, concatenating in arrival order.
    async fn generate(&self, prompt: String) -> Result<String, LlmError> {
        let mut stream = self.generator.chat_stream(&[Message::user(prompt)]).await?;
        let mut answer = String::new();
        while let Some(fragment) = stream.next().await {
            answer.push_str(&fragment?);
        }
        Ok(answer)
    }

    #[must_use]
    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy".into(),
            chunks: self.index.len(),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }

    #[must_use]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    #[must_use]
    pub fn origin(&self) -> IndexOrigin {
        self.origin
    }
}

/// The generator prompt. `context` and `query` are the only interpolated values.
#[must_use]
pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "Answer the question based only on the following context:\n{context}\n\nQuestion: {query}\n"
    )
}

async fn probe_dimension<E: LlmProvider>(
    embedder: &E,
    timeout: Duration,
) -> Result<usize, StartupError> {
    let vector = tokio::time::timeout(timeout, embedder.embed(PROBE_TEXT))
        .await
        .map_err(|_| StartupError::ProbeTimeout(timeout))?
        .map_err(StartupError::Probe)?;
    if vector.is_empty() {
        return Err(StartupError::EmptyProbe);
    }
    tracing::info!(dimension = vector.len(), "embedding dimension probed");
    Ok(vector.len())
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn prompt_matches_template() {
        let prompt = build_prompt("ctx text", "How long?");
        assert_eq!(
            prompt,
            "Answer the question based only on the following context:\nctx text\n\nQuestion: How long?\n"
        );
    }

    #[test]
    fn prompt_placeholders_in_input_left_alone() {
        let prompt = build_prompt("{query}", "{context}");
        assert_eq!(
            prompt,
            "Answer the question based only on the following context:\n{query}\n\nQuestion: {context}\n"
        );
    }

    #[test]
    fn prompt_with_empty_context() {
        assert_eq!(
            build_prompt("", "q"),
            "Answer the question based only on the following context:\n\n\nQuestion: q\n"
        );
    }

    #[test]
    fn settings_from_default_config() {
        let settings = PipelineSettings::from(&Config::default());
        assert_eq!(settings.chunker, ChunkerConfig::default());
        assert_eq!(settings.retrieval.top_k, 3);
        assert_eq!(settings.max_context_chunks, 3);
        assert_eq!(settings.embed_batch_size, 32);
        assert_eq!(settings.llm_timeout, Duration::from_secs(120));
        assert_eq!(settings.embedding_model, "sentence-transformers/all-mpnet-base-v2");
    }

    proptest! {
        #[test]
        fn prompt_interpolates_verbatim(context in ".*", query in ".*") {
            let prompt = build_prompt(&context, &query);
            let expected_prefix = "Answer the question based only on the following context:\n";
            prop_assert!(prompt.starts_with(expected_prefix));
            let rest = &prompt[expected_prefix.len()..];
            prop_assert_eq!(rest, format!("{context}\n\nQuestion: {query}\n"));
        }
    }
}
