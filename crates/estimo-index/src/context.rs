//! Bounded context assembly from retrieval hits.

use crate::retriever::RetrievalResult;

/// Join the texts of the first `max_chunks` hits with a single space.
///
/// An empty result gives an empty context.
#[must_use]
pub fn assemble(result: &RetrievalResult<'_>, max_chunks: usize) -> String {
    result
        .iter()
        .take(max_chunks)
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::{Chunk, ChunkSource};
    use crate::distance::DistanceMetric;
    use crate::retriever::top_k;
    use crate::store::VectorIndex;

    fn index() -> VectorIndex {
        let mut index = VectorIndex::new(1, DistanceMetric::Euclidean, "m", "f");
        for (i, text) in ["first", "second", "third", "fourth"].iter().enumerate() {
            let chunk = Chunk {
                text: (*text).into(),
                source: ChunkSource {
                    record_index: i,
                    record_title: String::new(),
                },
                sequence_index: 0,
            };
            #[allow(clippy::cast_precision_loss)]
            index.push(chunk, vec![i as f32]).unwrap();
        }
        index
    }

    #[test]
    fn joins_in_retrieval_order() {
        let index = index();
        let result = top_k(&index, &[3.0], 4).unwrap();
        assert_eq!(assemble(&result, 3), "fourth third second");
    }

    #[test]
    fn max_chunks_larger_than_result_uses_all() {
        let index = index();
        let result = top_k(&index, &[0.0], 2).unwrap();
        assert_eq!(assemble(&result, 10), "first second");
    }

    #[test]
    fn empty_result_is_empty_context() {
        assert_eq!(assemble(&RetrievalResult::default(), 3), "");
    }

    #[test]
    fn zero_max_chunks_is_empty_context() {
        let index = index();
        let result = top_k(&index, &[0.0], 4).unwrap();
        assert!(assemble(&result, 0).is_empty());
    }
}
