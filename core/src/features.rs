// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-layout feature matrices
//!
//! Every matrix carries a [`FeatureSchema`] whose width is known before any
//! record is processed, so the column layout never depends on the data.
//! Rows are keyed by [`PositionIndex`] and must arrive in index order.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::{Error, PositionIndex, Result};

/// Name and width of a feature vector layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub name: String,
    pub dim: usize,
}

impl FeatureSchema {
    pub fn new(name: impl Into<String>, dim: usize) -> Self {
        Self {
            name: name.into(),
            dim,
        }
    }

    /// Check a row against this layout
    pub fn check(&self, row: &FeatureRow) -> Result<()> {
        if row.values.len() != self.dim {
            return Err(Error::FeatureExtraction {
                index: row.index,
                reason: format!(
                    "{} vector has {} values, schema expects {}",
                    self.name,
                    row.values.len(),
                    self.dim
                ),
            });
        }
        Ok(())
    }
}

/// A feature vector tagged with the position it describes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub index: PositionIndex,
    pub values: Vec<f32>,
}

impl FeatureRow {
    pub fn new(index: PositionIndex, values: Vec<f32>) -> Self {
        Self { index, values }
    }
}

/// Ordered feature rows of one split
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    schema: FeatureSchema,
    rows: Vec<FeatureRow>,
}

impl FeatureMatrix {
    pub fn new(schema: FeatureSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn with_capacity(schema: FeatureSchema, capacity: usize) -> Self {
        Self {
            schema,
            rows: Vec::with_capacity(capacity),
        }
    }

    /// Build a matrix from rows, validating width and index order
    pub fn from_rows(schema: FeatureSchema, rows: impl IntoIterator<Item = FeatureRow>) -> Result<Self> {
        let mut matrix = Self::new(schema);
        for row in rows {
            matrix.push(row)?;
        }
        Ok(matrix)
    }

    /// Append the next row; its index must equal the current row count
    pub fn push(&mut self, row: FeatureRow) -> Result<()> {
        self.schema.check(&row)?;
        let expected = PositionIndex(self.rows.len());
        if row.index != expected {
            return Err(Error::FeatureExtraction {
                index: row.index,
                reason: format!("out-of-order {} row, expected {}", self.schema.name, expected),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn dim(&self) -> usize {
        self.schema.dim
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Values of the row for `index`
    pub fn get(&self, index: PositionIndex) -> Option<&[f32]> {
        self.rows.get(index.0).map(|row| row.values.as_slice())
    }

    /// Dense `[rows, dim]` copy
    pub fn to_array(&self) -> Array2<f32> {
        let mut array = Array2::zeros((self.rows.len(), self.schema.dim));
        for (mut out, row) in array.outer_iter_mut().zip(&self.rows) {
            for (dst, src) in out.iter_mut().zip(&row.values) {
                *dst = *src;
            }
        }
        array
    }
}
