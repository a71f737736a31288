//! Dense comment encoders over subword ids

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use super::vocab::PAD_ID;
use crate::ModelError;

/// File name of the embedding table inside a model directory
pub const ENCODER_FILE: &str = "encoder.cbor";

/// A trained encoder mapping an id sequence to one vector
pub trait TextEncoder {
    /// Output width
    fn dim(&self) -> usize;

    fn encode(&self, ids: &[u32]) -> Result<Vec<f32>, ModelError>;
}

/// Serialized token embeddings, `values` is `[vocab_size, dim]` row-major
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingTable {
    pub vocab_size: usize,
    pub dim: usize,
    pub values: Vec<f32>,
}

impl EmbeddingTable {
    pub fn seeded(vocab_size: usize, dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let values = (0..vocab_size * dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
        Self {
            vocab_size,
            dim,
            values,
        }
    }

    pub fn save(&self, model_dir: &Path) -> Result<(), ModelError> {
        let path = model_dir.join(ENCODER_FILE);
        let mut writer = BufWriter::new(File::create(&path)?);
        ciborium::ser::into_writer(self, &mut writer).map_err(|e| ModelError::Weights {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        writer.flush()?;
        Ok(())
    }
}

/// Mean of the non-padding token embeddings; all-padding input maps to zeros
#[derive(Debug, Clone)]
pub struct MeanEmbeddingEncoder {
    embeddings: Array2<f32>,
}

impl MeanEmbeddingEncoder {
    pub fn new(table: EmbeddingTable) -> Result<Self, ModelError> {
        Self::from_table(table, Path::new("<memory>"))
    }

    /// Restore the table from `model_dir/encoder.cbor`
    pub fn load(model_dir: &Path) -> Result<Self, ModelError> {
        let path = model_dir.join(ENCODER_FILE);
        let reader = BufReader::new(File::open(&path).map_err(|e| ModelError::Weights {
            path: path.clone(),
            reason: e.to_string(),
        })?);
        let table: EmbeddingTable =
            ciborium::de::from_reader(reader).map_err(|e| ModelError::Weights {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        let encoder = Self::from_table(table, &path)?;
        info!(
            "Restored {}x{} embedding table from {}",
            encoder.embeddings.nrows(),
            encoder.embeddings.ncols(),
            path.display()
        );
        Ok(encoder)
    }

    fn from_table(table: EmbeddingTable, path: &Path) -> Result<Self, ModelError> {
        let embeddings = Array2::from_shape_vec((table.vocab_size, table.dim), table.values)
            .map_err(|e| ModelError::Weights {
                path: PathBuf::from(path),
                reason: e.to_string(),
            })?;
        Ok(Self { embeddings })
    }

    pub fn vocab_size(&self) -> usize {
        self.embeddings.nrows()
    }
}

impl TextEncoder for MeanEmbeddingEncoder {
    fn dim(&self) -> usize {
        self.embeddings.ncols()
    }

    fn encode(&self, ids: &[u32]) -> Result<Vec<f32>, ModelError> {
        let mut sum = Array1::<f32>::zeros(self.dim());
        let mut count = 0usize;
        for &id in ids.iter().filter(|&&id| id != PAD_ID) {
            if id as usize >= self.vocab_size() {
                return Err(ModelError::Shape(format!(
                    "token id {} outside the {}-entry embedding table",
                    id,
                    self.vocab_size()
                )));
            }
            sum += &self.embeddings.row(id as usize);
            count += 1;
        }
        if count > 0 {
            sum /= count as f32;
        }
        Ok(sum.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn table() -> EmbeddingTable {
        EmbeddingTable {
            vocab_size: 4,
            dim: 2,
            values: vec![9.0, 9.0, 0.0, 0.0, 1.0, 3.0, 3.0, 5.0],
        }
    }

    #[test]
    fn test_mean_skips_padding() {
        let encoder = MeanEmbeddingEncoder::new(table()).unwrap();
        assert_eq!(encoder.encode(&[2, 3, PAD_ID, PAD_ID]).unwrap(), vec![2.0, 4.0]);
        assert_eq!(encoder.encode(&[PAD_ID; 4]).unwrap(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_out_of_range_id() {
        let encoder = MeanEmbeddingEncoder::new(table()).unwrap();
        assert!(matches!(encoder.encode(&[7]), Err(ModelError::Shape(_))));
    }

    #[test]
    fn test_load_from_model_dir() {
        let dir = TempDir::new().unwrap();
        EmbeddingTable::seeded(10, 8, 5).save(dir.path()).unwrap();

        let encoder = MeanEmbeddingEncoder::load(dir.path()).unwrap();
        assert_eq!(encoder.dim(), 8);
        assert_eq!(encoder.vocab_size(), 10);
    }

    #[test]
    fn test_bad_table_shape() {
        let bad = EmbeddingTable {
            vocab_size: 3,
            dim: 2,
            values: vec![0.0; 5],
        };
        assert!(matches!(MeanEmbeddingEncoder::new(bad), Err(ModelError::Weights { .. })));
    }
}
