//! Overlapping character-window chunking of flattened records.

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::record::SourceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    /// Maximum chunk length in Unicode scalar values.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks of one record.
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 750,
            chunk_overlap: 250,
        }
    }
}

impl ChunkerConfig {
    /// # Errors
    ///
    /// Returns `IndexError::InvalidChunking` when `chunk_size` is zero or
    /// `chunk_overlap` is not smaller than it.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(IndexError::InvalidChunking {
                chunk_size: self.chunk_size,
                overlap: self.chunk_overlap,
            });
        }
        Ok(())
    }
}

/// Back reference from a chunk to the record it was cut from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSource {
    pub record_index: usize,
    pub record_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: ChunkSource,
    /// Position among the chunks of the same record.
    pub sequence_index: usize,
}

/// Split every record into chunks, in corpus order.
///
/// # Errors
///
/// Returns `IndexError::InvalidChunking` if `config` is invalid.
pub fn split(records: &[SourceRecord], config: &ChunkerConfig) -> Result<Vec<Chunk>> {
    config.validate()?;

    let mut chunks = Vec::new();
    for (record_index, record) in records.iter().enumerate() {
        let text = record.flatten();
        let windows = split_chars(&text, config.chunk_size, config.chunk_overlap);
        chunks.extend(
            windows
                .into_iter()
                .enumerate()
                .map(|(sequence_index, text)| Chunk {
                    text,
                    source: ChunkSource {
                        record_index,
                        record_title: record.document_title.clone(),
                    },
                    sequence_index,
                }),
        );
    }

    tracing::info!(
        records = records.len(),
        chunks = chunks.len(),
        chunk_size = config.chunk_size,
        overlap = config.chunk_overlap,
        "corpus chunked"
    );
    Ok(chunks)
}

/// Windows of `chunk_size` chars advancing by `chunk_size - overlap`.
///
/// Stops once a window reaches the end of the text, so the last window is
/// never contained in its predecessor. Requires `overlap < chunk_size`.
fn split_chars(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::record::SubFeature;

    fn record(title: &str, description: &str) -> SourceRecord {
        SourceRecord {
            industry_name: "Retail".into(),
            document_title: title.into(),
            project_description: description.into(),
            subfeatures: vec![SubFeature {
                sub_feature_name: "push notifications".into(),
                estimated_hours: 40.0,
                hourly_rate: 75.0,
            }],
        }
    }

    fn reconstruct(chunks: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(chunk);
            } else {
                out.extend(chunk.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn default_config_values() {
        let cfg = ChunkerConfig::default();
        assert_eq!(cfg.chunk_size, 750);
        assert_eq!(cfg.chunk_overlap, 250);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn invalid_configs_rejected() {
        for (chunk_size, chunk_overlap) in [(0, 0), (10, 10), (10, 11)] {
            let cfg = ChunkerConfig {
                chunk_size,
                chunk_overlap,
            };
            assert!(matches!(
                cfg.validate(),
                Err(IndexError::InvalidChunking { .. })
            ));
            assert!(split(&[record("t", "d")], &cfg).is_err());
        }
    }

    #[test]
    fn short_record_yields_single_chunk() {
        let records = [record("POS Upgrade", "Add push notifications")];
        let chunks = split(&records, &ChunkerConfig::default()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, records[0].flatten());
        assert_eq!(chunks[0].sequence_index, 0);
        assert_eq!(chunks[0].source.record_title, "POS Upgrade");
    }

    #[test]
    fn chunks_follow_corpus_order() {
        let long = "x".repeat(2000);
        let records = [record("A", &long), record("B", "short")];
        let chunks = split(&records, &ChunkerConfig::default()).unwrap();
        assert!(chunks.len() > 2);
        let last = chunks.last().unwrap();
        assert_eq!(last.source.record_index, 1);
        assert_eq!(last.sequence_index, 0);
        let first_record: Vec<_> = chunks
            .iter()
            .filter(|c| c.source.record_index == 0)
            .map(|c| c.sequence_index)
            .collect();
        assert_eq!(first_record, (0..first_record.len()).collect::<Vec<_>>());
    }

    #[test]
    fn empty_corpus_yields_no_chunks() {
        assert!(split(&[], &ChunkerConfig::default()).unwrap().is_empty());
    }

    #[test]
    fn exact_multiple_has_no_redundant_tail() {
        let chunks = split_chars("abcdefgh", 4, 2);
        assert_eq!(chunks, vec!["abcd", "cdef", "efgh"]);
    }

    #[test]
    fn text_equal_to_chunk_size_is_one_chunk() {
        assert_eq!(split_chars("abcd", 4, 1), vec!["abcd"]);
    }

    #[test]
    fn multibyte_chars_counted_as_scalars() {
        let chunks = split_chars("ñandú café", 4, 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(reconstruct(&chunks, 1), "ñandú café");
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(split_chars("", 4, 1).is_empty());
    }

    proptest! {
        #[test]
        fn chunks_reconstruct_text(
            text in "\\PC{0,300}",
            chunk_size in 1usize..60,
            overlap_seed in 0usize..60,
        ) {
            let overlap = overlap_seed % chunk_size;
            let chunks = split_chars(&text, chunk_size, overlap);
            prop_assert_eq!(reconstruct(&chunks, overlap), text);
        }

        #[test]
        fn chunks_respect_size_bound(
            text in "\\PC{0,300}",
            chunk_size in 1usize..60,
            overlap_seed in 0usize..60,
        ) {
            let overlap = overlap_seed % chunk_size;
            for chunk in split_chars(&text, chunk_size, overlap) {
                prop_assert!(!chunk.is_empty());
                prop_assert!(chunk.chars().count() <= chunk_size);
            }
        }

        #[test]
        fn consecutive_chunks_share_overlap(
            text in "[a-z ]{0,300}",
            chunk_size in 2usize..60,
            overlap_seed in 0usize..60,
        ) {
            let overlap = overlap_seed % chunk_size;
            let chunks = split_chars(&text, chunk_size, overlap);
            for pair in chunks.windows(2) {
                let prev: Vec<char> = pair[0].chars().collect();
                let next: Vec<char> = pair[1].chars().collect();
                prop_assert_eq!(&prev[prev.len() - overlap..], &next[..overlap]);
                prop_assert!(next.len() > overlap);
            }
        }
    }
}
