//! Feature extraction for board snapshots and comments
//!
//! Board features come from a frozen trunk network ([`model::TrunkNet`])
//! pooled to a fixed width; comment features come either from subword ids
//! run through an embedding encoder or from bag-of-words counts.

pub mod board;
pub mod config;
pub mod model;
pub mod planes;
pub mod text;

use std::path::PathBuf;
use thiserror::Error;

// Re-export key types
pub use board::{BoardFeatureExtractor, Pooling};
pub use config::{ExtractorConfig, TextStrategy};
pub use model::{get_model, BoardModel, ChannelOutputs, ModelConfig, ModelSession, TrunkNet, TrunkWeights};
pub use text::{BagOfWords, EmbeddingTable, MeanEmbeddingEncoder, SubwordTokenizer, SubwordVocabulary, TextEncoder, TextFeatureExtractor};

/// Failures inside a model call
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid model config {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    #[error("cannot restore weights from {}: {reason}", path.display())]
    Weights { path: PathBuf, reason: String },

    #[error("model weights have not been restored")]
    NotRestored,

    #[error("input shape mismatch: {0}")]
    Shape(String),

    #[error("model produced no {0:?} channel")]
    MissingChannel(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
