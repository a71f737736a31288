//! Board feature extraction
//!
//! Runs the frozen trunk on each board record and pools the trunk tensor to a
//! fixed-width vector. The width depends only on the model config and the
//! pooling mode, never on the data.

use kibitz_core::{BoardRecord, Error, FeatureMatrix, FeatureRow, FeatureSchema, PositionIndex, Result};
use ndarray::Axis;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use crate::model::{BoardModel, ModelConfig, TRUNK_CHANNEL};
use crate::ModelError;

/// How the `[rows, cols, channels]` trunk tensor is reduced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pooling {
    /// Mean across channels, one value per board point
    #[default]
    Channel,
    /// Mean across the board, one value per channel
    Spatial,
}

impl Pooling {
    /// Width of the pooled vector
    pub fn dim(&self, config: &ModelConfig) -> usize {
        match self {
            Pooling::Channel => config.board_size * config.board_size,
            Pooling::Spatial => config.trunk_channels,
        }
    }

    /// Feature layout for a model
    pub fn schema(&self, config: &ModelConfig) -> FeatureSchema {
        let name = match self {
            Pooling::Channel => "board/channel-mean",
            Pooling::Spatial => "board/spatial-mean",
        };
        FeatureSchema::new(name, self.dim(config))
    }
}

/// Turns board records into pooled trunk vectors
pub struct BoardFeatureExtractor<'m, M: BoardModel + ?Sized> {
    model: &'m M,
    pooling: Pooling,
    schema: FeatureSchema,
}

impl<'m, M: BoardModel + ?Sized> BoardFeatureExtractor<'m, M> {
    pub fn new(model: &'m M, pooling: Pooling) -> Self {
        let schema = pooling.schema(model.config());
        Self {
            model,
            pooling,
            schema,
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Pooled feature row for one record
    pub fn extract(&self, index: PositionIndex, record: &BoardRecord) -> Result<FeatureRow> {
        let values = self.pooled(record).map_err(|e| Error::FeatureExtraction {
            index,
            reason: e.to_string(),
        })?;
        let row = FeatureRow::new(index, values);
        self.schema.check(&row)?;
        Ok(row)
    }

    fn pooled(&self, record: &BoardRecord) -> std::result::Result<Vec<f32>, ModelError> {
        let size = self.model.config().board_size;
        if record.square_size() != Some(size) {
            return Err(ModelError::Shape(format!(
                "board has {} rows, network expects {}x{}",
                record.rows(),
                size,
                size
            )));
        }

        let mut outputs = self.model.extract_features(record)?;
        let trunk = outputs
            .remove(TRUNK_CHANNEL)
            .ok_or_else(|| ModelError::MissingChannel(TRUNK_CHANNEL.to_string()))?;

        let pooled = match self.pooling {
            Pooling::Channel => trunk.mean_axis(Axis(2)).map(|m| m.iter().copied().collect::<Vec<f32>>()),
            Pooling::Spatial => trunk
                .mean_axis(Axis(0))
                .and_then(|m| m.mean_axis(Axis(0)))
                .map(|m| m.to_vec()),
        };
        pooled.ok_or_else(|| ModelError::Shape("empty trunk tensor".to_string()))
    }

    /// Extract every record of a split, stopping at the first failure
    pub fn extract_all(&self, records: &[BoardRecord]) -> Result<FeatureMatrix> {
        let start = Instant::now();
        let mut matrix = FeatureMatrix::with_capacity(self.schema.clone(), records.len());

        for (i, record) in records.iter().enumerate() {
            matrix.push(self.extract(PositionIndex(i), record)?)?;
            if (i + 1) % 1000 == 0 {
                debug!("Extracted {}/{} boards", i + 1, records.len());
            }
        }

        info!(
            "Extracted {} board vectors of width {} ({:?} pooling) in {:.2?}",
            matrix.len(),
            matrix.dim(),
            self.pooling,
            start.elapsed()
        );
        Ok(matrix)
    }
}
