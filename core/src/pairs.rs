// SPDX-License-Identifier: MIT OR Apache-2.0

//! Positive/negative example pairs
//!
//! Each choice record yields two examples that share the board of the correct
//! answer: one with the correct comment (label 1) and one with the first
//! remaining candidate's comment (label 0). Output order follows the choice
//! records, `(pos_0, neg_0, pos_1, neg_1, ...)`.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use tracing::{debug, info};

use crate::{ChoiceRecord, Error, FeatureMatrix, PositionIndex, Result};

/// Binary plausibility label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Label {
    Negative = 0,
    Positive = 1,
}

impl Label {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// One labeled example: board features followed by text features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    /// Position whose board features fill the front of the vector
    pub board: PositionIndex,
    /// Position whose comment features fill the back of the vector
    pub text: PositionIndex,
    pub features: Vec<f32>,
    pub label: Label,
}

/// Ordered examples of one split or fold
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExampleSet {
    examples: Vec<Example>,
    dim: usize,
}

impl ExampleSet {
    pub fn new(dim: usize) -> Self {
        Self {
            examples: Vec::new(),
            dim,
        }
    }

    /// Append an example whose width must match the set
    pub fn push(&mut self, example: Example) -> Result<()> {
        if example.features.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                found: example.features.len(),
            });
        }
        self.examples.push(example);
        Ok(())
    }

    /// Concatenate sets in the given order without reordering any example
    pub fn concat<'a>(sets: impl IntoIterator<Item = &'a ExampleSet>) -> Result<ExampleSet> {
        let mut combined: Option<ExampleSet> = None;
        for set in sets {
            match combined.as_mut() {
                None => combined = Some(set.clone()),
                Some(acc) => {
                    if acc.dim != set.dim {
                        return Err(Error::DimensionMismatch {
                            expected: acc.dim,
                            found: set.dim,
                        });
                    }
                    acc.examples.extend(set.examples.iter().cloned());
                }
            }
        }
        Ok(combined.unwrap_or_default())
    }

    /// Keep only the first `len` examples
    pub fn truncate(&mut self, len: usize) {
        self.examples.truncate(len);
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn labels(&self) -> Vec<Label> {
        self.examples.iter().map(|e| e.label).collect()
    }

    /// Count of (negative, positive) labels
    pub fn label_counts(&self) -> (usize, usize) {
        self.examples
            .iter()
            .fold((0, 0), |(neg, pos), e| match e.label {
                Label::Negative => (neg + 1, pos),
                Label::Positive => (neg, pos + 1),
            })
    }

    /// Dense `(X, y)` matrices for the classifier
    pub fn to_arrays(&self) -> (Array2<f32>, Array1<u8>) {
        let mut x = Array2::zeros((self.examples.len(), self.dim));
        for (mut row, example) in x.outer_iter_mut().zip(&self.examples) {
            for (dst, src) in row.iter_mut().zip(&example.features) {
                *dst = *src;
            }
        }
        let y = self.examples.iter().map(|e| e.label.as_u8()).collect();
        (x, y)
    }
}

/// Check that board and text matrices describe the same positions
pub fn validate_alignment(board: &FeatureMatrix, text: &FeatureMatrix) -> Result<()> {
    if board.len() != text.len() {
        return Err(Error::FeatureExtraction {
            index: PositionIndex(board.len().min(text.len())),
            reason: format!(
                "board matrix has {} rows but text matrix has {}",
                board.len(),
                text.len()
            ),
        });
    }

    for (b, t) in board.rows().iter().zip(text.rows()) {
        if b.index != t.index {
            return Err(Error::FeatureExtraction {
                index: b.index,
                reason: format!("board row {} is paired with text row {}", b.index, t.index),
            });
        }
    }

    Ok(())
}

/// Resolve `(pos_idx, neg_idx)` for one choice record.
///
/// `neg_idx` is the first candidate left after removing the answer, in the
/// original candidate order.
pub fn select_pair(choice: &ChoiceRecord, record: usize) -> Result<(PositionIndex, PositionIndex)> {
    if choice.candidate_indices.len() < 2 {
        return Err(Error::MalformedChoice {
            record,
            reason: format!(
                "needs at least 2 candidates, found {}",
                choice.candidate_indices.len()
            ),
        });
    }

    let mut remaining = choice.candidate_indices.clone();
    if choice.answer_index >= remaining.len() {
        return Err(Error::MalformedChoice {
            record,
            reason: format!(
                "answer index {} out of range for {} candidates",
                choice.answer_index,
                remaining.len()
            ),
        });
    }

    let pos_idx = remaining.remove(choice.answer_index);
    let neg_idx = remaining[0];
    Ok((pos_idx, neg_idx))
}

/// Build the labeled example pairs of one split
pub fn build(
    board_features: &FeatureMatrix,
    text_features: &FeatureMatrix,
    choices: &[ChoiceRecord],
) -> Result<ExampleSet> {
    validate_alignment(board_features, text_features)?;

    let dim = board_features.dim() + text_features.dim();
    let mut set = ExampleSet {
        examples: Vec::with_capacity(choices.len() * 2),
        dim,
    };

    for (record, choice) in choices.iter().enumerate() {
        let (pos_idx, neg_idx) = select_pair(choice, record)?;

        for candidate in &choice.candidate_indices {
            if text_features.get(*candidate).is_none() {
                return Err(Error::MalformedChoice {
                    record,
                    reason: format!(
                        "candidate {} outside the {} text rows",
                        candidate,
                        text_features.len()
                    ),
                });
            }
        }

        let board = board_features.get(pos_idx).ok_or_else(|| Error::MalformedChoice {
            record,
            reason: format!("answer {} outside the {} board rows", pos_idx, board_features.len()),
        })?;

        for (text_idx, label) in [(pos_idx, Label::Positive), (neg_idx, Label::Negative)] {
            let text = text_features
                .get(text_idx)
                .ok_or_else(|| Error::MalformedChoice {
                    record,
                    reason: format!("candidate {} has no text row", text_idx),
                })?;

            let mut features = Vec::with_capacity(dim);
            features.extend_from_slice(board);
            features.extend_from_slice(text);
            set.push(Example {
                board: pos_idx,
                text: text_idx,
                features,
                label,
            })?;
        }

        debug!("Choice {}: positive {} / negative {}", record, pos_idx, neg_idx);
    }

    info!(
        "Built {} examples of width {} from {} choice records",
        set.len(),
        set.dim(),
        choices.len()
    );
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FeatureRow, FeatureSchema};

    fn matrix(name: &str, rows: usize, dim: usize, offset: f32) -> FeatureMatrix {
        FeatureMatrix::from_rows(
            FeatureSchema::new(name, dim),
            (0..rows).map(|i| {
                FeatureRow::new(
                    PositionIndex(i),
                    (0..dim).map(|d| offset + i as f32 * 10.0 + d as f32).collect(),
                )
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_scenario_first_remaining_negative() {
        let choice = ChoiceRecord::new([7, 3, 9], 1);
        let (pos, neg) = select_pair(&choice, 0).unwrap();
        assert_eq!(pos, PositionIndex(3));
        assert_eq!(neg, PositionIndex(7));

        let board = matrix("board", 10, 2, 0.0);
        let text = matrix("text", 10, 3, 1000.0);
        let set = build(&board, &text, &[choice]).unwrap();

        let examples = set.examples();
        assert_eq!(examples.len(), 2);
        assert_eq!((examples[0].board, examples[0].text), (PositionIndex(3), PositionIndex(3)));
        assert_eq!((examples[1].board, examples[1].text), (PositionIndex(3), PositionIndex(7)));
        assert_eq!(&examples[1].features[..2], board.get(PositionIndex(3)).unwrap());
        assert_eq!(&examples[1].features[2..], text.get(PositionIndex(7)).unwrap());
    }

    #[test]
    fn test_two_candidates_answer_first() {
        let (pos, neg) = select_pair(&ChoiceRecord::new([4, 2], 0), 0).unwrap();
        assert_eq!((pos, neg), (PositionIndex(4), PositionIndex(2)));
    }

    #[test]
    fn test_label_sequence() {
        let board = matrix("board", 6, 1, 0.0);
        let text = matrix("text", 6, 1, 0.5);
        let choices = vec![
            ChoiceRecord::new([0, 1], 0),
            ChoiceRecord::new([2, 3, 4], 2),
            ChoiceRecord::new([5, 0], 1),
        ];

        let set = build(&board, &text, &choices).unwrap();
        let labels: Vec<u8> = set.labels().into_iter().map(Label::as_u8).collect();
        assert_eq!(labels, vec![1, 0, 1, 0, 1, 0]);
        assert_eq!(set.label_counts(), (3, 3));
    }

    #[test]
    fn test_build_is_repeatable() {
        let board = matrix("board", 8, 3, 0.25);
        let text = matrix("text", 8, 2, -7.5);
        let choices = vec![
            ChoiceRecord::new([1, 4, 6], 2),
            ChoiceRecord::new([0, 7], 1),
            ChoiceRecord::new([3, 5, 2], 0),
        ];

        let first = build(&board, &text, &choices).unwrap();
        let second = build(&board, &text, &choices).unwrap();
        assert_eq!(first, second);

        let (x1, y1) = first.to_arrays();
        let (x2, y2) = second.to_arrays();
        let bits = |x: &Array2<f32>| x.iter().map(|v| v.to_bits()).collect::<Vec<u32>>();
        assert_eq!(bits(&x1), bits(&x2));
        assert_eq!(y1, y2);
    }

    #[test]
    fn test_single_candidate_rejected() {
        let board = matrix("board", 3, 1, 0.0);
        let text = matrix("text", 3, 1, 0.0);
        let err = build(&board, &text, &[ChoiceRecord::new([0, 1], 0), ChoiceRecord::new([2], 0)])
            .unwrap_err();
        assert!(matches!(err, Error::MalformedChoice { record: 1, .. }));
    }

    #[test]
    fn test_out_of_range_indices_rejected() {
        let board = matrix("board", 3, 1, 0.0);
        let text = matrix("text", 3, 1, 0.0);

        let err = build(&board, &text, &[ChoiceRecord::new([0, 1], 2)]).unwrap_err();
        assert!(err.to_string().contains("answer index 2"));

        let err = build(&board, &text, &[ChoiceRecord::new([0, 1, 8], 0)]).unwrap_err();
        assert!(err.to_string().contains("outside the 3 text rows"));
    }

    #[test]
    fn test_misaligned_matrices_rejected() {
        let board = matrix("board", 4, 1, 0.0);
        let text = matrix("text", 3, 1, 0.0);
        let err = build(&board, &text, &[ChoiceRecord::new([0, 1], 0)]).unwrap_err();
        assert!(matches!(
            err,
            Error::FeatureExtraction { index: PositionIndex(3), .. }
        ));
    }

    #[test]
    fn test_concat_preserves_order() {
        let board = matrix("board", 4, 2, 0.0);
        let text = matrix("text", 4, 2, 100.0);
        let a = build(&board, &text, &[ChoiceRecord::new([0, 1], 0)]).unwrap();
        let b = build(&board, &text, &[ChoiceRecord::new([2, 3], 1), ChoiceRecord::new([1, 2], 0)]).unwrap();

        let combined = ExampleSet::concat([&a, &b]).unwrap();
        assert_eq!(combined.len(), 6);
        assert_eq!(&combined.examples()[..2], a.examples());
        assert_eq!(&combined.examples()[2..], b.examples());

        let (x, y) = combined.to_arrays();
        assert_eq!(x.dim(), (6, 4));
        assert_eq!(y.to_vec(), vec![1, 0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_concat_rejects_mixed_widths() {
        let a = ExampleSet::new(3);
        let b = ExampleSet::new(4);
        assert!(matches!(
            ExampleSet::concat([&a, &b]),
            Err(Error::DimensionMismatch { expected: 3, found: 4 })
        ));
        assert!(ExampleSet::concat(std::iter::empty::<&ExampleSet>()).unwrap().is_empty());
    }
}
