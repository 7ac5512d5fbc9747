//! Vector index construction and JSON persistence.

use std::path::{Path, PathBuf};

use estimo_llm::LlmProvider;
use serde::{Deserialize, Serialize};

use crate::chunker::Chunk;
use crate::distance::DistanceMetric;
use crate::error::{IndexError, Result};

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// Exhaustive in-memory index. Entry order is insertion order, which
/// retrieval uses as its tie-break.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    version: u32,
    dimension: usize,
    metric: DistanceMetric,
    embedding_model: String,
    corpus_fingerprint: String,
    entries: Vec<IndexEntry>,
}

/// Parameters for [`VectorIndex::build_or_load`].
#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub path: PathBuf,
    pub expected_dimension: usize,
    pub batch_size: usize,
    pub metric: DistanceMetric,
    pub embedding_model: String,
    pub corpus_fingerprint: String,
}

/// Whether the index came from disk or was embedded during this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    Loaded,
    Built,
}

impl IndexOrigin {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::Built => "built",
        }
    }
}

impl VectorIndex {
    #[must_use]
    pub fn new(
        dimension: usize,
        metric: DistanceMetric,
        embedding_model: impl Into<String>,
        corpus_fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            version: FORMAT_VERSION,
            dimension,
            metric,
            embedding_model: embedding_model.into(),
            corpus_fingerprint: corpus_fingerprint.into(),
            entries: Vec::new(),
        }
    }

    /// Append one chunk with its embedding.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::DimensionMismatch` if `vector` has the wrong length.
    pub fn push(&mut self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        self.entries.push(IndexEntry { chunk, vector });
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    #[must_use]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    #[must_use]
    pub fn corpus_fingerprint(&self) -> &str {
        &self.corpus_fingerprint
    }

    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    #[must_use]
    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    /// Persist as JSON through a sibling temporary file and a rename.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IndexError::io(parent, e))?;
        }

        let bytes = serde_json::to_vec(self)?;
        let tmp = temp_path(path);
        if let Err(e) = tokio::fs::write(&tmp, &bytes).await {
            return Err(IndexError::io(&tmp, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(IndexError::io(path, e));
        }

        tracing::info!(path = %path.display(), entries = self.len(), "index saved");
        Ok(())
    }

    /// Load a persisted index and check it against the expected dimension.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::DimensionMismatch` if the stored dimension differs
    /// from `expected_dimension`, `IndexError::Corrupt` if the file is
    /// internally inconsistent, and IO/JSON errors if it cannot be read.
    pub async fn load(path: &Path, expected_dimension: usize) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| IndexError::io(path, e))?;
        let index: Self = serde_json::from_slice(&bytes)?;

        if index.version != FORMAT_VERSION {
            return Err(IndexError::Corrupt(format!(
                "unsupported format version {}",
                index.version
            )));
        }
        if index.dimension != expected_dimension {
            return Err(IndexError::DimensionMismatch {
                expected: expected_dimension,
                actual: index.dimension,
            });
        }
        if let Some(pos) = index
            .entries
            .iter()
            .position(|e| e.vector.len() != index.dimension)
        {
            return Err(IndexError::Corrupt(format!(
                "entry {pos} has {} components, header says {}",
                index.entries[pos].vector.len(),
                index.dimension
            )));
        }

        tracing::info!(path = %path.display(), entries = index.len(), "index loaded");
        Ok(index)
    }

    /// Embed `chunks` in order-preserving batches.
    ///
    /// # Errors
    ///
    /// Returns the first embedding error, or a count/dimension error if the
    /// embedder's output does not line up with the input.
    pub async fn build<E: LlmProvider>(
        chunks: &[Chunk],
        embedder: &E,
        options: &IndexOptions,
    ) -> Result<Self> {
        let mut index = Self::new(
            options.expected_dimension,
            options.metric,
            options.embedding_model.clone(),
            options.corpus_fingerprint.clone(),
        );
        let total = chunks.len();
        tracing::info!(total, batch_size = options.batch_size, "indexing started");

        for batch in chunks.chunks(options.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = embedder.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(IndexError::EmbeddingCount {
                    expected: batch.len(),
                    got: vectors.len(),
                });
            }
            for (chunk, vector) in batch.iter().zip(vectors) {
                index.push(chunk.clone(), vector)?;
            }
            tracing::debug!(progress = format_args!("{}/{total}", index.len()), "batch embedded");
        }

        Ok(index)
    }

    /// Load the index at `options.path` if present, otherwise build and persist it.
    ///
    /// A loaded index whose metric, embedding model or corpus fingerprint differs
    /// from `options` is still used; the configured metric wins.
    ///
    /// # Errors
    ///
    /// Any load, embedding or save failure. All are fatal at startup.
    pub async fn build_or_load<E: LlmProvider>(
        chunks: &[Chunk],
        embedder: &E,
        options: &IndexOptions,
    ) -> Result<(Self, IndexOrigin)> {
        if Self::exists(&options.path) {
            let mut index = Self::load(&options.path, options.expected_dimension).await?;
            index.reconcile(options);
            return Ok((index, IndexOrigin::Loaded));
        }

        let index = Self::build(chunks, embedder, options).await?;
        index.save(&options.path).await?;
        Ok((index, IndexOrigin::Built))
    }

    fn reconcile(&mut self, options: &IndexOptions) {
        if self.metric != options.metric {
            tracing::warn!(
                stored = %self.metric,
                configured = %options.metric,
                "persisted index metric differs; using configured metric"
            );
            self.metric = options.metric;
        }
        if self.embedding_model != options.embedding_model {
            tracing::warn!(
                stored = %self.embedding_model,
                configured = %options.embedding_model,
                "persisted index was built with a different embedding model; delete it to rebuild"
            );
        }
        if self.corpus_fingerprint != options.corpus_fingerprint {
            tracing::warn!(
                path = %options.path.display(),
                "corpus changed since the index was built; delete it to rebuild"
            );
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
