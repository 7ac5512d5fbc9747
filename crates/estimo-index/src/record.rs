//! Corpus records and their flattened text form.

use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// One corpus entry describing an estimated project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceRecord {
    pub industry_name: String,
    pub document_title: String,
    pub project_description: String,
    pub subfeatures: Vec<SubFeature>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubFeature {
    pub sub_feature_name: String,
    #[serde(rename = "estimatedHours")]
    pub estimated_hours: f64,
    pub hourly_rate: f64,
}

impl SourceRecord {
    /// Render every field as text, one line per field and one per sub-feature.
    #[must_use]
    pub fn flatten(&self) -> String {
        let mut out = format!(
            "industry_name: {}\ndocument_title: {}\nproject_description: {}",
            self.industry_name, self.document_title, self.project_description
        );
        for sub in &self.subfeatures {
            let _ = write!(
                out,
                "\nsub_feature_name: {}, estimatedHours: {}, hourly_rate: {}",
                sub.sub_feature_name, sub.estimated_hours, sub.hourly_rate
            );
        }
        out
    }
}

/// Read and parse the corpus file.
///
/// A well-formed empty array is a valid, empty corpus.
///
/// # Errors
///
/// Returns `IndexError::Io` if the file cannot be read and `IndexError::Json`
/// if it is not a JSON array of records.
pub async fn load_corpus(path: &Path) -> Result<Vec<SourceRecord>> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| IndexError::io(path, e))?;
    let records: Vec<SourceRecord> = serde_json::from_slice(&bytes)?;
    tracing::info!(path = %path.display(), records = records.len(), "corpus loaded");
    Ok(records)
}

/// Stable hash over the flattened corpus, used to detect a stale persisted index.
#[must_use]
pub fn corpus_fingerprint(records: &[SourceRecord]) -> String {
    let mut hasher = blake3::Hasher::new();
    for record in records {
        let text = record.flatten();
        hasher.update(&(text.len() as u64).to_le_bytes());
        hasher.update(text.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos_upgrade() -> SourceRecord {
        SourceRecord {
            industry_name: "Retail".into(),
            document_title: "POS Upgrade".into(),
            project_description: "Add push notifications".into(),
            subfeatures: vec![SubFeature {
                sub_feature_name: "push notifications".into(),
                estimated_hours: 40.0,
                hourly_rate: 75.0,
            }],
        }
    }

    #[test]
    fn flatten_keeps_every_field() {
        let text = pos_upgrade().flatten();
        assert_eq!(
            text,
            "industry_name: Retail\n\
             document_title: POS Upgrade\n\
             project_description: Add push notifications\n\
             sub_feature_name: push notifications, estimatedHours: 40, hourly_rate: 75"
        );
    }

    #[test]
    fn flatten_fractional_numbers() {
        let mut record = pos_upgrade();
        record.subfeatures[0].estimated_hours = 12.5;
        assert!(record.flatten().ends_with("estimatedHours: 12.5, hourly_rate: 75"));
    }

    #[test]
    fn flatten_without_subfeatures_has_three_lines() {
        let record = SourceRecord {
            subfeatures: Vec::new(),
            ..pos_upgrade()
        };
        assert_eq!(record.flatten().lines().count(), 3);
    }

    #[test]
    fn parse_ignores_unknown_and_defaults_missing() {
        let json = r#"[{"industry_name":"Health","extra":true},
            {"document_title":"T","subfeatures":[{"sub_feature_name":"s","estimatedHours":3,"hourly_rate":50.5,"notes":"x"}]}]"#;
        let records: Vec<SourceRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].industry_name, "Health");
        assert!(records[0].document_title.is_empty());
        assert!(records[0].subfeatures.is_empty());
        assert_eq!(records[1].subfeatures[0].estimated_hours, 3.0);
        assert_eq!(records[1].subfeatures[0].hourly_rate, 50.5);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = corpus_fingerprint(&[pos_upgrade()]);
        let b = corpus_fingerprint(&[pos_upgrade()]);
        assert_eq!(a, b);
        let mut changed = pos_upgrade();
        changed.subfeatures[0].estimated_hours = 41.0;
        assert_ne!(a, corpus_fingerprint(&[changed]));
        assert_ne!(a, corpus_fingerprint(&[]));
    }

    #[tokio::test]
    async fn load_corpus_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(&path, serde_json::to_vec(&[pos_upgrade()]).unwrap()).unwrap();
        let records = load_corpus(&path).await.unwrap();
        assert_eq!(records, vec![pos_upgrade()]);
    }

    #[tokio::test]
    async fn load_corpus_empty_array_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(load_corpus(&path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn load_corpus_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_corpus(&dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::Io { .. }));
    }

    #[tokio::test]
    async fn load_corpus_malformed_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            load_corpus(&path).await.unwrap_err(),
            IndexError::Json(_)
        ));
    }
}
