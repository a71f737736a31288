//! Subword vocabulary and tokenizer

use kibitz_core::{codec, Error, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

pub const PAD_TOKEN: &str = "<pad>";
pub const UNK_TOKEN: &str = "<unk>";
pub const PAD_ID: u32 = 0;
pub const UNK_ID: u32 = 1;

/// Fixed token -> id table built outside this pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct SubwordVocabulary {
    tokens: Vec<String>,
    ids: HashMap<String, u32>,
}

impl SubwordVocabulary {
    /// Load a `token count` per line file, keeping tokens seen at least
    /// `min_count` times. Ids 0 and 1 are reserved for padding and unknowns.
    pub fn load(path: &Path, min_count: u32) -> Result<Self> {
        let lines = codec::read_lines(path).map_err(|e| vocabulary_error(path, e.to_string()))?;

        let mut vocab = Self {
            tokens: vec![PAD_TOKEN.to_string(), UNK_TOKEN.to_string()],
            ids: HashMap::from([(PAD_TOKEN.to_string(), PAD_ID), (UNK_TOKEN.to_string(), UNK_ID)]),
        };

        let mut entries = 0;
        let mut dropped = 0;
        for (line_no, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (token, count) = match (fields.next(), fields.next(), fields.next()) {
                (Some(token), Some(count), None) => (token, count),
                _ => {
                    return Err(vocabulary_error(
                        path,
                        format!("line {}: expected `token count`, found {:?}", line_no + 1, line),
                    ))
                }
            };
            let count: u32 = count.parse().map_err(|_| {
                vocabulary_error(path, format!("line {}: bad count {:?}", line_no + 1, count))
            })?;
            entries += 1;

            if count < min_count {
                dropped += 1;
                continue;
            }
            if vocab.ids.contains_key(token) {
                return Err(vocabulary_error(
                    path,
                    format!("line {}: duplicate token {:?}", line_no + 1, token),
                ));
            }
            let id = vocab.tokens.len() as u32;
            vocab.tokens.push(token.to_string());
            vocab.ids.insert(token.to_string(), id);
        }

        if entries == 0 {
            return Err(vocabulary_error(path, "no entries".to_string()));
        }
        if vocab.len() == 2 {
            warn!(
                "Every vocabulary entry in {} is below min_count {}",
                path.display(),
                min_count
            );
        }

        info!(
            "Loaded vocabulary {}: {} tokens kept, {} below min_count {}",
            path.display(),
            vocab.len() - 2,
            dropped,
            min_count
        );
        Ok(vocab)
    }

    pub fn id(&self, token: &str) -> u32 {
        self.ids.get(token).copied().unwrap_or(UNK_ID)
    }

    /// Table size including the reserved ids
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.len() <= 2
    }
}

fn vocabulary_error(path: &Path, reason: String) -> Error {
    Error::VocabularyLoad {
        path: path.to_path_buf(),
        reason,
    }
}

/// Maps pre-tokenized comments to fixed-length id sequences
#[derive(Debug, Clone)]
pub struct SubwordTokenizer<'v> {
    vocab: &'v SubwordVocabulary,
    max_len: usize,
}

impl<'v> SubwordTokenizer<'v> {
    pub fn new(vocab: &'v SubwordVocabulary, max_len: usize) -> Self {
        Self { vocab, max_len }
    }

    /// Whitespace-split ids, truncated or padded to `max_len`
    pub fn encode(&self, text: &str) -> Vec<u32> {
        let mut ids: Vec<u32> = text
            .split_whitespace()
            .take(self.max_len)
            .map(|token| self.vocab.id(token))
            .collect();
        ids.resize(self.max_len, PAD_ID);
        ids
    }
}
