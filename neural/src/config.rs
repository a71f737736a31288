//! Feature extraction configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::board::Pooling;

/// Settings shared by the board and text extractors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Directory holding `config.json`, `variables.cbor` and, for the
    /// subword strategy, `encoder.cbor`
    pub model_dir: PathBuf,

    /// Reduction applied to the trunk tensor
    pub pooling: Pooling,

    /// How comments become vectors
    pub text: TextStrategy,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models/trunk"),
            pooling: Pooling::default(),
            text: TextStrategy::default(),
        }
    }
}

/// Comment vectorisation strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextStrategy {
    /// Term counts over the most frequent training terms
    BagOfWords { max_features: usize },

    /// Subword ids run through the trained embedding encoder
    Subword {
        /// Sequence length after padding/truncation
        max_len: usize,
        /// Vocabulary entries seen fewer times map to `<unk>`
        min_count: u32,
    },
}

impl Default for TextStrategy {
    fn default() -> Self {
        TextStrategy::BagOfWords { max_features: 1000 }
    }
}

impl TextStrategy {
    pub fn subword() -> Self {
        TextStrategy::Subword {
            max_len: 64,
            min_count: 5,
        }
    }

    /// Vocabulary cutoff used when loading the shared vocabulary
    pub fn min_count(&self) -> u32 {
        match self {
            TextStrategy::Subword { min_count, .. } => *min_count,
            TextStrategy::BagOfWords { .. } => 5,
        }
    }
}
