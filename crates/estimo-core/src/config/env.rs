use super::Config;
use crate::secret::Secret;

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_paths();
        self.apply_env_overrides_retrieval();
        self.apply_env_overrides_llm();
        self.apply_env_overrides_gateway();
        self.apply_env_secrets();
    }

    fn apply_env_overrides_paths(&mut self) {
        if let Ok(v) = std::env::var("ESTIMO_CORPUS_PATH") {
            self.corpus.path = v.into();
        }
        if let Ok(v) = std::env::var("ESTIMO_INDEX_PATH") {
            self.index.path = v.into();
        }
        if let Ok(v) = std::env::var("ESTIMO_EMBEDDING_DIMENSION")
            && let Ok(dim) = v.parse::<usize>()
        {
            self.index.embedding_dimension = Some(dim);
        }
        if let Ok(v) = std::env::var("ESTIMO_EMBED_BATCH_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.index.embed_batch_size = n;
        }
        if let Ok(v) = std::env::var("ESTIMO_INDEX_METRIC") {
            match v.parse() {
                Ok(metric) => self.index.metric = metric,
                Err(e) => tracing::warn!("ignoring invalid ESTIMO_INDEX_METRIC value: {e}"),
            }
        }
    }

    fn apply_env_overrides_retrieval(&mut self) {
        if let Ok(v) = std::env::var("ESTIMO_CHUNK_SIZE")
            && let Ok(n) = v.parse::<usize>()
        {
            self.chunking.chunk_size = n;
        }
        if let Ok(v) = std::env::var("ESTIMO_CHUNK_OVERLAP")
            && let Ok(n) = v.parse::<usize>()
        {
            self.chunking.chunk_overlap = n;
        }
        if let Ok(v) = std::env::var("ESTIMO_TOP_K")
            && let Ok(k) = v.parse::<usize>()
        {
            self.retrieval.top_k = k;
        }
        if let Ok(v) = std::env::var("ESTIMO_MAX_CONTEXT_CHUNKS")
            && let Ok(n) = v.parse::<usize>()
        {
            self.retrieval.max_context_chunks = n;
        }
        if let Ok(v) = std::env::var("ESTIMO_RETRIEVAL_STRATEGY") {
            if let Ok(strategy) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.retrieval.strategy = strategy;
            } else {
                tracing::warn!("ignoring invalid ESTIMO_RETRIEVAL_STRATEGY value: {v}");
            }
        }
        if let Ok(v) = std::env::var("ESTIMO_MAX_DISTANCE")
            && let Ok(d) = v.parse::<f32>()
        {
            self.retrieval.max_distance = Some(d);
        }
        if let Ok(v) = std::env::var("ESTIMO_QUERY_MAX_CHARS")
            && let Ok(n) = v.parse::<usize>()
        {
            self.query.max_chars = n;
        }
    }

    fn apply_env_overrides_llm(&mut self) {
        if let Ok(v) = std::env::var("ESTIMO_LLM_PROVIDER") {
            if let Ok(kind) = serde_json::from_value(serde_json::Value::String(v.clone())) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid ESTIMO_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("ESTIMO_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Ok(v) = std::env::var("ESTIMO_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("ESTIMO_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Ok(v) = std::env::var("ESTIMO_LLM_MAX_TOKENS")
            && let Ok(n) = v.parse::<u32>()
        {
            self.llm.max_tokens = n;
        }
        if let Ok(v) = std::env::var("ESTIMO_LLM_TEMPERATURE")
            && let Ok(t) = v.parse::<f32>()
        {
            self.llm.temperature = Some(t);
        }
        if let Ok(v) = std::env::var("ESTIMO_TIMEOUT_EMBEDDING")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.embedding_seconds = secs;
        }
        if let Ok(v) = std::env::var("ESTIMO_TIMEOUT_LLM")
            && let Ok(secs) = v.parse::<u64>()
        {
            self.timeouts.llm_seconds = secs;
        }
    }

    fn apply_env_overrides_gateway(&mut self) {
        if let Ok(v) = std::env::var("ESTIMO_GATEWAY_BIND") {
            self.gateway.bind = v;
        }
        if let Ok(v) = std::env::var("ESTIMO_GATEWAY_PORT")
            && let Ok(port) = v.parse::<u16>()
        {
            self.gateway.port = port;
        }
        if let Ok(v) = std::env::var("ESTIMO_GATEWAY_MAX_BODY_SIZE")
            && let Ok(size) = v.parse::<usize>()
        {
            self.gateway.max_body_size = size;
        }
        if let Ok(v) = std::env::var("ESTIMO_GATEWAY_CORS_ORIGINS") {
            self.gateway.cors_origins = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
    }

    fn apply_env_secrets(&mut self) {
        if let Ok(v) = std::env::var("ESTIMO_API_KEY")
            && !v.is_empty()
        {
            self.secrets.api_key = Some(Secret::new(v));
        }
    }
}
