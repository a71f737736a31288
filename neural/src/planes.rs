//! Input feature planes for the trunk network
//!
//! Planes are relative to the player to move, so the same shape looks the
//! same to the network whichever color plays next.

use kibitz_core::{BoardRecord, Stone};
use ndarray::Array3;

/// Plane indices
pub mod feature_planes {
    pub const OWN_STONES: usize = 0;
    pub const OPPONENT_STONES: usize = 1;
    pub const EMPTY_POINTS: usize = 2;
    pub const OWN_LIBERTIES: usize = 3;
    pub const OPPONENT_LIBERTIES: usize = 4;
    pub const ON_BOARD: usize = 5;
}

/// Number of input planes per point
pub const INPUT_PLANES: usize = 6;

/// Build `[size, size, INPUT_PLANES]` planes from a square board record
pub fn create_feature_planes(record: &BoardRecord, size: usize) -> Array3<f32> {
    use feature_planes::*;

    let own = record.color_to_move;
    let mut planes = Array3::zeros((size, size, INPUT_PLANES));

    for row in 0..size {
        for col in 0..size {
            planes[[row, col, ON_BOARD]] = 1.0;

            let stone = record.get(row, col);
            match stone.color() {
                None => planes[[row, col, EMPTY_POINTS]] = 1.0,
                Some(color) => {
                    let liberty_value = (count_liberties(record, size, row, col) as f32 / 4.0).min(1.0);
                    if color == own {
                        planes[[row, col, OWN_STONES]] = 1.0;
                        planes[[row, col, OWN_LIBERTIES]] = liberty_value;
                    } else {
                        planes[[row, col, OPPONENT_STONES]] = 1.0;
                        planes[[row, col, OPPONENT_LIBERTIES]] = liberty_value;
                    }
                }
            }
        }
    }

    planes
}

/// Empty points orthogonally adjacent to a point
fn count_liberties(record: &BoardRecord, size: usize, row: usize, col: usize) -> usize {
    let mut neighbors = Vec::with_capacity(4);
    if row > 0 {
        neighbors.push((row - 1, col));
    }
    if row + 1 < size {
        neighbors.push((row + 1, col));
    }
    if col > 0 {
        neighbors.push((row, col - 1));
    }
    if col + 1 < size {
        neighbors.push((row, col + 1));
    }

    neighbors
        .into_iter()
        .filter(|&(r, c)| record.get(r, c) == Stone::Empty)
        .count()
}
