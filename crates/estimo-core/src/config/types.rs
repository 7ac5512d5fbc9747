use std::path::PathBuf;
use std::time::Duration;

use estimo_index::{ChunkerConfig, DistanceMetric, RetrievalConfig, SearchStrategy};
use estimo_llm::GenerationConfig;
use serde::{Deserialize, Serialize};

use crate::secret::Secret;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(skip)]
    pub secrets: ResolvedSecrets,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorpusConfig {
    #[serde(default = "default_corpus_path")]
    pub path: PathBuf,
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from("./data/industry_data.json")
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: default_corpus_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_chunk_size() -> usize {
    750
}

fn default_chunk_overlap() -> usize {
    250
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

impl From<ChunkingConfig> for ChunkerConfig {
    fn from(cfg: ChunkingConfig) -> Self {
        Self {
            chunk_size: cfg.chunk_size,
            chunk_overlap: cfg.chunk_overlap,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
    /// Expected vector length. The embedder is always probed at startup and
    /// must agree with this value when it is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_dimension: Option<usize>,
    #[serde(default = "default_embed_batch_size")]
    pub embed_batch_size: usize,
    #[serde(default)]
    pub metric: DistanceMetric,
}

fn default_index_path() -> PathBuf {
    PathBuf::from("./data/index.json")
}

fn default_embed_batch_size() -> usize {
    32
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            embedding_dimension: None,
            embed_batch_size: default_embed_batch_size(),
            metric: DistanceMetric::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RetrievalSettings {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_max_context_chunks")]
    pub max_context_chunks: usize,
    #[serde(default)]
    pub strategy: SearchStrategy,
    #[serde(default = "default_fetch_k")]
    pub fetch_k: usize,
    #[serde(default = "default_mmr_lambda")]
    pub mmr_lambda: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f32>,
}

fn default_top_k() -> usize {
    3
}

fn default_max_context_chunks() -> usize {
    3
}

fn default_fetch_k() -> usize {
    20
}

fn default_mmr_lambda() -> f32 {
    0.5
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            max_context_chunks: default_max_context_chunks(),
            strategy: SearchStrategy::default(),
            fetch_k: default_fetch_k(),
            mmr_lambda: default_mmr_lambda(),
            max_distance: None,
        }
    }
}

impl From<RetrievalSettings> for RetrievalConfig {
    fn from(cfg: RetrievalSettings) -> Self {
        Self {
            strategy: cfg.strategy,
            top_k: cfg.top_k,
            fetch_k: cfg.fetch_k,
            mmr_lambda: cfg.mmr_lambda,
            max_distance: cfg.max_distance,
        }
    }
}

/// Embedding and generation backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Any OpenAI-compatible HTTP API.
    #[default]
    OpenAi,
    Ollama,
}

impl ProviderKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

fn default_base_url() -> String {
    "https://router.huggingface.co/v1".into()
}

fn default_model() -> String {
    "microsoft/Phi-3-mini-4k-instruct".into()
}

fn default_embedding_model() -> String {
    "sentence-transformers/all-mpnet-base-v2".into()
}

fn default_max_tokens() -> u32 {
    500
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: default_base_url(),
            model: default_model(),
            embedding_model: default_embedding_model(),
            max_tokens: default_max_tokens(),
            temperature: None,
        }
    }
}

impl LlmConfig {
    #[must_use]
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig::new(self.model.clone())
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_embedding_timeout")]
    pub embedding_seconds: u64,
    #[serde(default = "default_llm_timeout")]
    pub llm_seconds: u64,
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_llm_timeout() -> u64 {
    120
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            embedding_seconds: default_embedding_timeout(),
            llm_seconds: default_llm_timeout(),
        }
    }
}

impl TimeoutConfig {
    #[must_use]
    pub fn embedding(&self) -> Duration {
        Duration::from_secs(self.embedding_seconds)
    }

    #[must_use]
    pub fn llm(&self) -> Duration {
        Duration::from_secs(self.llm_seconds)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct QueryConfig {
    /// Longest accepted question, in characters.
    #[serde(default = "default_query_max_chars")]
    pub max_chars: usize,
}

fn default_query_max_chars() -> usize {
    2000
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_chars: default_query_max_chars(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    #[serde(default = "default_gateway_max_body")]
    pub max_body_size: usize,
    /// Browser origins allowed by CORS. Empty disables the CORS layer.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_gateway_bind() -> String {
    "127.0.0.1".into()
}

fn default_gateway_port() -> u16 {
    8000
}

fn default_gateway_max_body() -> usize {
    65_536
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_gateway_bind(),
            port: default_gateway_port(),
            max_body_size: default_gateway_max_body(),
            cors_origins: Vec::new(),
        }
    }
}

/// Credentials resolved from the environment, never from the config file.
#[derive(Debug, Default)]
pub struct ResolvedSecrets {
    pub api_key: Option<Secret>,
}
