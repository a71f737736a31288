//! Comment feature extraction
//!
//! Two strategies produce a fixed-width vector per comment:
//! - subword ids from the shared vocabulary, pooled by a trained encoder
//! - bag-of-words counts, fit once on the first split and then frozen so
//!   every split shares one column layout

mod bow;
mod encoder;
mod vocab;

pub use bow::BagOfWords;
pub use encoder::{EmbeddingTable, MeanEmbeddingEncoder, TextEncoder, ENCODER_FILE};
pub use vocab::{SubwordTokenizer, SubwordVocabulary, PAD_ID, UNK_ID};

use kibitz_core::{Error, FeatureMatrix, FeatureRow, FeatureSchema, Result, TextRecord};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::TextStrategy;
use crate::ModelError;

enum Backend {
    BagOfWords(BagOfWords),
    Subword {
        max_len: usize,
        encoder: Box<dyn TextEncoder>,
    },
}

/// Turns comment records into feature matrices
pub struct TextFeatureExtractor {
    backend: Backend,
}

impl TextFeatureExtractor {
    /// Build the extractor for a strategy; the subword strategy restores its
    /// encoder from `model_dir`
    pub fn new(strategy: &TextStrategy, model_dir: &Path) -> std::result::Result<Self, ModelError> {
        let backend = match strategy {
            TextStrategy::BagOfWords { max_features } => Backend::BagOfWords(BagOfWords::new(*max_features)),
            TextStrategy::Subword { max_len, .. } => Backend::Subword {
                max_len: *max_len,
                encoder: Box::new(MeanEmbeddingEncoder::load(model_dir)?),
            },
        };
        Ok(Self { backend })
    }

    /// Subword extractor around any encoder
    pub fn with_encoder(max_len: usize, encoder: Box<dyn TextEncoder>) -> Self {
        Self {
            backend: Backend::Subword { max_len, encoder },
        }
    }

    /// Feature rows for every record, in index order.
    ///
    /// The bag-of-words backend fits on the first call and reuses that
    /// layout afterwards.
    pub fn extract(&mut self, records: &[TextRecord], vocabulary: &SubwordVocabulary) -> Result<FeatureMatrix> {
        let start = Instant::now();

        let matrix = match &mut self.backend {
            Backend::BagOfWords(bow) => {
                if !bow.is_fitted() {
                    bow.fit(records.iter().map(|r| r.text.as_str()));
                    if bow.dim() == 0 {
                        warn!("Bag of words found no terms in {} comments", records.len());
                    }
                }
                let schema = FeatureSchema::new("text/bag-of-words", bow.dim());
                FeatureMatrix::from_rows(
                    schema,
                    records
                        .iter()
                        .map(|record| FeatureRow::new(record.index, bow.transform(&record.text))),
                )?
            }
            Backend::Subword { max_len, encoder } => {
                let tokenizer = SubwordTokenizer::new(vocabulary, *max_len);
                let schema = FeatureSchema::new("text/subword-mean", encoder.dim());
                let mut matrix = FeatureMatrix::with_capacity(schema, records.len());
                for record in records {
                    let ids = tokenizer.encode(&record.text);
                    let values = encoder.encode(&ids).map_err(|e| Error::FeatureExtraction {
                        index: record.index,
                        reason: e.to_string(),
                    })?;
                    matrix.push(FeatureRow::new(record.index, values))?;
                }
                matrix
            }
        };

        info!(
            "Extracted {} text vectors of width {} ({}) in {:.2?}",
            matrix.len(),
            matrix.dim(),
            matrix.schema().name,
            start.elapsed()
        );
        Ok(matrix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kibitz_core::PositionIndex;
    use tempfile::TempDir;

    fn records(texts: &[&str]) -> Vec<TextRecord> {
        texts
            .iter()
            .enumerate()
            .map(|(i, text)| TextRecord {
                index: PositionIndex(i),
                text: text.to_string(),
            })
            .collect()
    }

    fn vocabulary(dir: &TempDir) -> SubwordVocabulary {
        let path = dir.path().join("vocab.txt");
        std::fs::write(&path, "▁ko 10\n▁fight 10\n▁rare 1\n").unwrap();
        SubwordVocabulary::load(&path, 5).unwrap()
    }

    #[test]
    fn test_bag_of_words_layout_is_frozen() {
        let dir = TempDir::new().unwrap();
        let vocab = vocabulary(&dir);
        let mut extractor =
            TextFeatureExtractor::new(&TextStrategy::BagOfWords { max_features: 10 }, dir.path()).unwrap();

        let train = extractor
            .extract(&records(&["ko fight", "big fight"]), &vocab)
            .unwrap();
        let test = extractor
            .extract(&records(&["an unseen comment", "fight"]), &vocab)
            .unwrap();

        assert_eq!(train.dim(), 3);
        assert_eq!(test.dim(), train.dim());
        assert_eq!(test.get(PositionIndex(0)), Some(&[0.0, 0.0, 0.0][..]));
        assert_eq!(test.get(PositionIndex(1)), Some(&[0.0, 1.0, 0.0][..]));
    }

    #[test]
    fn test_subword_strategy() {
        let dir = TempDir::new().unwrap();
        let vocab = vocabulary(&dir);
        EmbeddingTable {
            vocab_size: 4,
            dim: 2,
            values: vec![0.0, 0.0, 1.0, 1.0, 2.0, 0.0, 0.0, 4.0],
        }
        .save(dir.path())
        .unwrap();

        let mut extractor = TextFeatureExtractor::new(&TextStrategy::subword(), dir.path()).unwrap();
        let matrix = extractor
            .extract(&records(&["▁ko ▁fight", "▁rare", ""]), &vocab)
            .unwrap();

        assert_eq!(matrix.dim(), 2);
        assert_eq!(matrix.get(PositionIndex(0)), Some(&[1.0, 2.0][..]));
        // rare token falls under the cutoff and becomes <unk>
        assert_eq!(matrix.get(PositionIndex(1)), Some(&[1.0, 1.0][..]));
        assert_eq!(matrix.get(PositionIndex(2)), Some(&[0.0, 0.0][..]));
    }

    #[test]
    fn test_subword_missing_encoder() {
        let dir = TempDir::new().unwrap();
        assert!(TextFeatureExtractor::new(&TextStrategy::subword(), dir.path()).is_err());
    }

    #[test]
    fn test_encoder_failure_reports_index() {
        let dir = TempDir::new().unwrap();
        let vocab = vocabulary(&dir);
        let small = MeanEmbeddingEncoder::new(EmbeddingTable::seeded(3, 2, 1)).unwrap();
        let mut extractor = TextFeatureExtractor::with_encoder(4, Box::new(small));

        let err = extractor
            .extract(&records(&["▁ko", "▁fight"]), &vocab)
            .unwrap_err();
        match err {
            Error::FeatureExtraction { index, .. } => assert_eq!(index, PositionIndex(1)),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
