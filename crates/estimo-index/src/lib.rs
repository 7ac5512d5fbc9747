//! Corpus chunking, vector indexing and similarity retrieval.
//!
//! Source records are flattened and split into overlapping character windows,
//! embedded in order-preserving batches, and held in an exhaustive in-memory
//! index that is persisted as JSON and reloaded on later runs.

pub mod chunker;
pub mod context;
pub mod distance;
pub mod error;
pub mod record;
pub mod retriever;
pub mod store;

pub use chunker::{Chunk, ChunkSource, ChunkerConfig};
pub use distance::DistanceMetric;
pub use error::{IndexError, Result};
pub use record::{SourceRecord, SubFeature};
pub use retriever::{RetrievalConfig, RetrievalResult, Retriever, ScoredChunk, SearchStrategy};
pub use store::{IndexOptions, IndexOrigin, VectorIndex};
