//! Exhaustive nearest-neighbour search over a [`VectorIndex`].

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::chunker::Chunk;
use crate::distance::cosine_similarity;
use crate::error::{IndexError, Result};
use crate::store::VectorIndex;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    /// Plain top-k by distance.
    #[default]
    Similarity,
    /// Maximal marginal relevance over the `fetch_k` nearest candidates.
    Mmr,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalConfig {
    pub strategy: SearchStrategy,
    pub top_k: usize,
    pub fetch_k: usize,
    /// Relevance weight in `[0, 1]`; 1 ignores diversity.
    pub mmr_lambda: f32,
    /// Drop hits farther than this after ranking.
    pub max_distance: Option<f32>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            strategy: SearchStrategy::Similarity,
            top_k: 3,
            fetch_k: 20,
            mmr_lambda: 0.5,
            max_distance: None,
        }
    }
}

/// One hit: the chunk, its distance to the query and its insertion position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub distance: f32,
    pub position: usize,
}

/// Hits in ascending distance; equal distances keep insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult<'a> {
    hits: Vec<ScoredChunk<'a>>,
}

impl<'a> RetrievalResult<'a> {
    #[must_use]
    pub fn hits(&self) -> &[ScoredChunk<'a>] {
        &self.hits
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredChunk<'a>> {
        self.hits.iter()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Retriever {
    config: RetrievalConfig,
}

impl Retriever {
    #[must_use]
    pub fn new(config: RetrievalConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Rank `index` against `query` with the configured strategy and threshold.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::DimensionMismatch` if `query` does not match the
    /// index dimension.
    pub fn retrieve<'a>(&self, index: &'a VectorIndex, query: &[f32]) -> Result<RetrievalResult<'a>> {
        let mut result = match self.config.strategy {
            SearchStrategy::Similarity => top_k(index, query, self.config.top_k)?,
            SearchStrategy::Mmr => mmr(
                index,
                query,
                self.config.top_k,
                self.config.fetch_k,
                self.config.mmr_lambda,
            )?,
        };
        if let Some(max) = self.config.max_distance {
            result.hits.retain(|hit| hit.distance <= max);
        }
        Ok(result)
    }
}

/// The `k` entries closest to `query`.
///
/// # Errors
///
/// Returns `IndexError::DimensionMismatch` if `query` does not match the
/// index dimension.
pub fn top_k<'a>(index: &'a VectorIndex, query: &[f32], k: usize) -> Result<RetrievalResult<'a>> {
    let mut hits = rank(index, query)?;
    hits.truncate(k);
    Ok(RetrievalResult { hits })
}

/// Greedy maximal marginal relevance over the `fetch_k` nearest entries.
///
/// Relevance and redundancy are both cosine similarities. The selection is
/// returned re-sorted by distance.
///
/// # Errors
///
/// Returns `IndexError::DimensionMismatch` if `query` does not match the
/// index dimension.
pub fn mmr<'a>(
    index: &'a VectorIndex,
    query: &[f32],
    k: usize,
    fetch_k: usize,
    lambda: f32,
) -> Result<RetrievalResult<'a>> {
    let mut candidates = rank(index, query)?;
    candidates.truncate(fetch_k.max(k));

    let entries = index.entries();
    let vector = |hit: &ScoredChunk<'_>| entries[hit.position].vector.as_slice();
    let relevance: Vec<f32> = candidates
        .iter()
        .map(|c| cosine_similarity(query, vector(c)))
        .collect();

    let target = k.min(candidates.len());
    let mut selected: Vec<usize> = Vec::with_capacity(target);
    while selected.len() < target {
        let mut best: Option<(usize, f32)> = None;
        for (i, candidate) in candidates.iter().enumerate() {
            if selected.contains(&i) {
                continue;
            }
            let redundancy = selected
                .iter()
                .map(|&j| cosine_similarity(vector(candidate), vector(&candidates[j])))
                .fold(None, |acc: Option<f32>, s| Some(acc.map_or(s, |a| a.max(s))))
                .unwrap_or(0.0);
            let score = lambda * relevance[i] - (1.0 - lambda) * redundancy;
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((i, score));
            }
        }
        match best {
            Some((i, _)) => selected.push(i),
            None => break,
        }
    }

    let mut hits: Vec<_> = selected.into_iter().map(|i| candidates[i]).collect();
    hits.sort_by(by_distance_then_position);
    Ok(RetrievalResult { hits })
}

fn rank<'a>(index: &'a VectorIndex, query: &[f32]) -> Result<Vec<ScoredChunk<'a>>> {
    if query.len() != index.dimension() {
        return Err(IndexError::DimensionMismatch {
            expected: index.dimension(),
            actual: query.len(),
        });
    }
    let metric = index.metric();
    let mut hits: Vec<_> = index
        .entries()
        .iter()
        .enumerate()
        .map(|(position, entry)| ScoredChunk {
            chunk: &entry.chunk,
            distance: metric.distance(query, &entry.vector),
            position,
        })
        .collect();
    hits.sort_by(by_distance_then_position);
    Ok(hits)
}

fn by_distance_then_position(a: &ScoredChunk<'_>, b: &ScoredChunk<'_>) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then(a.position.cmp(&b.position))
}
