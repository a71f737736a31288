// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kibitz Core - Data model and example pairing
//!
//! This crate provides the pieces of the pipeline that do not depend on any
//! model:
//! - Board, comment and choice records plus their on-disk codecs
//! - Dataset discovery by file-name matching
//! - Fixed-layout feature matrices keyed by position index
//! - The positive/negative example pair builder

#![deny(unsafe_code)]
#![deny(clippy::all)]

pub mod board;
pub mod codec;
pub mod discovery;
pub mod features;
pub mod pairs;
pub mod records;

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub use board::{BoardContainer, BoardRecord};
pub use discovery::{DatasetLayout, FileCategory, SplitFiles};
pub use features::{FeatureMatrix, FeatureRow, FeatureSchema};
pub use pairs::{Example, ExampleSet, Label};
pub use records::{ChoiceRecord, ChoicesContainer, TextRecord};

/// Player color in a Go game (Black or White)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    /// Black player
    #[serde(rename = "b", alias = "black", alias = "B")]
    Black,
    /// White player
    #[serde(rename = "w", alias = "white", alias = "W")]
    White,
}

/// State of a single board point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Stone {
    #[default]
    Empty = 0,
    Black = 1,
    White = 2,
}

impl Stone {
    /// The color occupying this point, if any
    pub fn color(&self) -> Option<Color> {
        match self {
            Stone::Empty => None,
            Stone::Black => Some(Color::Black),
            Stone::White => Some(Color::White),
        }
    }
}

/// Identity of an annotated position within one split.
///
/// Board records, comment lines and feature rows of a split all share this
/// index space; choice records refer to comments through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionIndex(pub usize);

impl PositionIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for PositionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<usize> for PositionIndex {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

/// Dataset partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Validation,
    Test,
}

impl Split {
    /// Every split, in pipeline order
    pub const ALL: [Split; 3] = [Split::Train, Split::Validation, Split::Test];

    /// Substring that identifies this split's files in the data directory
    pub fn file_key(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Validation => "val",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Split::Train => "train",
            Split::Validation => "validation",
            Split::Test => "test",
        };
        f.write_str(name)
    }
}

/// Errors raised while preparing examples.
///
/// None of these are recovered locally: a partial split would break the
/// index alignment between board and text features.
#[derive(Debug, Error)]
pub enum Error {
    /// An expected input file is missing or matched more than once
    #[error("dataset discovery failed for {scope} ({category} files): {reason}")]
    DatasetDiscovery {
        scope: String,
        category: FileCategory,
        reason: String,
    },

    /// A record could not be turned into a feature row
    #[error("feature extraction failed at record {index}: {reason}")]
    FeatureExtraction { index: PositionIndex, reason: String },

    /// The subword vocabulary is missing or malformed
    #[error("failed to load vocabulary {}: {reason}", path.display())]
    VocabularyLoad { path: PathBuf, reason: String },

    /// A choice annotation cannot yield a positive/negative pair
    #[error("malformed choice record {record}: {reason}")]
    MalformedChoice { record: usize, reason: String },

    /// Example sets with different widths were combined
    #[error("feature dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_codes() {
        let black: Color = serde_json::from_str("\"b\"").unwrap();
        let white: Color = serde_json::from_str("\"white\"").unwrap();
        assert_eq!(black, Color::Black);
        assert_eq!(white, Color::White);
        assert_eq!(serde_json::to_string(&Color::White).unwrap(), "\"w\"");
    }

    #[test]
    fn test_stone_repr() {
        let stones: Vec<Stone> = serde_json::from_str("[0, 1, 2]").unwrap();
        assert_eq!(stones, vec![Stone::Empty, Stone::Black, Stone::White]);
        assert_eq!(Stone::White.color(), Some(Color::White));
        assert!(Stone::Empty.color().is_none());
    }

    #[test]
    fn test_split_keys() {
        assert_eq!(Split::Validation.file_key(), "val");
        assert_eq!(Split::Validation.to_string(), "validation");
        assert_eq!(Split::ALL.len(), 3);
    }
}
