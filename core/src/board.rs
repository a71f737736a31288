// SPDX-License-Identifier: MIT OR Apache-2.0

//! Board snapshot records

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::{codec, Color, Result, Stone};

/// One annotated Go board snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardRecord {
    /// Stone grid, row-major
    pub stones: Vec<Vec<Stone>>,
    /// The player whose turn it is
    #[serde(rename = "color")]
    pub color_to_move: Color,
    /// Move number the snapshot was taken at
    #[serde(rename = "step", default)]
    pub step_index: u32,
}

impl BoardRecord {
    /// Create an empty square board
    pub fn empty(size: usize, color_to_move: Color) -> Self {
        Self {
            stones: vec![vec![Stone::Empty; size]; size],
            color_to_move,
            step_index: 0,
        }
    }

    /// Number of rows in the grid
    pub fn rows(&self) -> usize {
        self.stones.len()
    }

    /// Side length if the grid is square, `None` for ragged or rectangular grids
    pub fn square_size(&self) -> Option<usize> {
        let rows = self.stones.len();
        self.stones
            .iter()
            .all(|row| row.len() == rows)
            .then_some(rows)
    }

    /// Get the stone at the specified point
    pub fn get(&self, row: usize, col: usize) -> Stone {
        self.stones
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or_default()
    }

    /// Place a stone, returning false when the point is off the board
    pub fn place(&mut self, row: usize, col: usize, stone: Stone) -> bool {
        match self.stones.get_mut(row).and_then(|r| r.get_mut(col)) {
            Some(point) => {
                *point = stone;
                true
            }
            None => false,
        }
    }
}

/// Serialized board container, keyed by `boards`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardContainer {
    pub boards: Vec<BoardRecord>,
}

impl BoardContainer {
    /// Load the board records of one split
    pub fn load(path: &Path) -> Result<Vec<BoardRecord>> {
        let container: BoardContainer = codec::read_container(path)?;
        debug!(
            "Loaded {} board records from {}",
            container.boards.len(),
            path.display()
        );
        Ok(container.boards)
    }
}
