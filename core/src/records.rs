// SPDX-License-Identifier: MIT OR Apache-2.0

//! Comment and multiple-choice annotation records

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::{codec, Error, PositionIndex, Result};

/// Raw comment text attached to one annotated position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRecord {
    pub index: PositionIndex,
    pub text: String,
}

impl TextRecord {
    /// Load a comments file, one comment per line, index-aligned with the boards
    pub fn load(path: &Path) -> Result<Vec<TextRecord>> {
        let records: Vec<TextRecord> = codec::read_lines(path)?
            .into_iter()
            .enumerate()
            .map(|(i, text)| TextRecord {
                index: PositionIndex(i),
                text: text.trim().to_owned(),
            })
            .collect();
        debug!("Loaded {} comments from {}", records.len(), path.display());
        Ok(records)
    }
}

/// One multiple-choice annotation: several candidate comments, one correct
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRecord {
    /// Comment indices offered as choices, in their original order
    pub candidate_indices: Vec<PositionIndex>,
    /// Index into `candidate_indices` of the correct comment
    pub answer_index: usize,
}

impl ChoiceRecord {
    pub fn new(candidates: impl IntoIterator<Item = usize>, answer_index: usize) -> Self {
        Self {
            candidate_indices: candidates.into_iter().map(PositionIndex).collect(),
            answer_index,
        }
    }

    /// Parse a line of the form `"idx0 idx1 ... idxN\tanswer_index"`
    pub fn parse_line(line: &str, record: usize) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedChoice { record, reason };

        let (indices, answer) = line
            .split_once('\t')
            .ok_or_else(|| malformed(format!("missing tab separator in {:?}", line)))?;

        let candidate_indices = indices
            .split_whitespace()
            .map(|idx| {
                idx.parse::<usize>()
                    .map(PositionIndex)
                    .map_err(|e| malformed(format!("bad candidate index {:?}: {}", idx, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        let answer_index = answer
            .trim()
            .parse::<usize>()
            .map_err(|e| malformed(format!("bad answer index {:?}: {}", answer.trim(), e)))?;

        Ok(Self {
            candidate_indices,
            answer_index,
        })
    }

    /// Render in the line-oriented format
    pub fn to_line(&self) -> String {
        let indices: Vec<String> = self
            .candidate_indices
            .iter()
            .map(|idx| idx.0.to_string())
            .collect();
        format!("{}\t{}", indices.join(" "), self.answer_index)
    }

    /// The comment index of the correct choice, if `answer_index` is in range
    pub fn answer(&self) -> Option<PositionIndex> {
        self.candidate_indices.get(self.answer_index).copied()
    }

    /// Load choice records from a `.txt` line file or a `.cbor`/`.json` container
    pub fn load(path: &Path) -> Result<Vec<ChoiceRecord>> {
        let records = match path.extension().and_then(|ext| ext.to_str()) {
            Some("txt") => {
                let mut records = Vec::new();
                for line in codec::read_lines(path)? {
                    if line.trim().is_empty() {
                        continue;
                    }
                    records.push(ChoiceRecord::parse_line(&line, records.len())?);
                }
                records
            }
            _ => {
                let container: ChoicesContainer = codec::read_container(path)?;
                container.into_records()?
            }
        };

        debug!("Loaded {} choice records from {}", records.len(), path.display());
        Ok(records)
    }

    /// Load choice records and check them against a mirror file holding the same records
    pub fn load_mirrored(path: &Path, mirror: Option<&Path>) -> Result<Vec<ChoiceRecord>> {
        let records = ChoiceRecord::load(path)?;
        let Some(mirror) = mirror else {
            return Ok(records);
        };

        let mirrored = ChoiceRecord::load(mirror)?;
        let first_mismatch = records
            .iter()
            .zip(&mirrored)
            .position(|(a, b)| a != b)
            .or_else(|| (records.len() != mirrored.len()).then(|| records.len().min(mirrored.len())));
        if let Some(record) = first_mismatch {
            return Err(Error::MalformedChoice {
                record,
                reason: format!("{} and {} disagree", path.display(), mirror.display()),
            });
        }
        Ok(records)
    }
}

/// Serialized choices container, keyed by `choice_indices` and `answers`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoicesContainer {
    pub choice_indices: Vec<Vec<usize>>,
    pub answers: Vec<usize>,
}

impl ChoicesContainer {
    /// Zip the parallel arrays into records
    pub fn into_records(self) -> Result<Vec<ChoiceRecord>> {
        if self.choice_indices.len() != self.answers.len() {
            let record = self.choice_indices.len().min(self.answers.len());
            return Err(Error::MalformedChoice {
                record,
                reason: format!(
                    "{} candidate lists but {} answers",
                    self.choice_indices.len(),
                    self.answers.len()
                ),
            });
        }

        Ok(self
            .choice_indices
            .into_iter()
            .zip(self.answers)
            .map(|(candidates, answer)| ChoiceRecord::new(candidates, answer))
            .collect())
    }

    pub fn from_records(records: &[ChoiceRecord]) -> Self {
        Self {
            choice_indices: records
                .iter()
                .map(|r| r.candidate_indices.iter().map(|idx| idx.0).collect())
                .collect(),
            answers: records.iter().map(|r| r.answer_index).collect(),
        }
    }
}

/// Keep the first `portion` of the records.
///
/// The prefix length is `floor(portion * len)`, clamped to the record count.
pub fn take_portion(mut records: Vec<ChoiceRecord>, portion: f64) -> Vec<ChoiceRecord> {
    if !(0.0..=1.0).contains(&portion) {
        warn!("Choice portion {} outside [0, 1], clamping", portion);
    }
    let keep = (portion.clamp(0.0, 1.0) * records.len() as f64).floor() as usize;
    records.truncate(keep);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_line() {
        let record = ChoiceRecord::parse_line("7 3 9\t1", 0).unwrap();
        assert_eq!(record.candidate_indices, vec![PositionIndex(7), PositionIndex(3), PositionIndex(9)]);
        assert_eq!(record.answer_index, 1);
        assert_eq!(record.answer(), Some(PositionIndex(3)));
        assert_eq!(record.to_line(), "7 3 9\t1");
    }

    #[test]
    fn test_parse_line_errors() {
        for (line, needle) in [
            ("7 3 9 1", "tab"),
            ("7 x 9\t1", "candidate"),
            ("7 3 9\tz", "answer"),
        ] {
            let err = ChoiceRecord::parse_line(line, 4).unwrap_err();
            assert!(matches!(err, Error::MalformedChoice { record: 4, .. }));
            assert!(err.to_string().contains(needle), "{}", err);
        }
    }

    #[test]
    fn test_container_length_mismatch() {
        let container = ChoicesContainer {
            choice_indices: vec![vec![0, 1], vec![2, 3]],
            answers: vec![0],
        };
        assert!(matches!(
            container.into_records(),
            Err(Error::MalformedChoice { record: 1, .. })
        ));
    }

    #[test]
    fn test_load_line_file_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("train.choices.txt");
        std::fs::write(&path, "0 1 2\t0\n\n3 4\t1\n").unwrap();

        let records = ChoiceRecord::load(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].answer(), Some(PositionIndex(4)));
    }

    #[test]
    fn test_load_container_matches_lines() {
        let dir = TempDir::new().unwrap();
        let records = vec![ChoiceRecord::new([5, 6, 7], 2), ChoiceRecord::new([1, 0], 0)];
        let path = dir.path().join("val.choices.cbor");
        codec::write_container(&ChoicesContainer::from_records(&records), &path).unwrap();

        assert_eq!(ChoiceRecord::load(&path).unwrap(), records);
    }

    #[test]
    fn test_load_mirrored_agrees() {
        let dir = TempDir::new().unwrap();
        let records = vec![ChoiceRecord::new([5, 6, 7], 2), ChoiceRecord::new([1, 0], 0)];
        let lines = dir.path().join("train.choices.txt");
        let container = dir.path().join("train.choices.cbor");
        let text: Vec<String> = records.iter().map(ChoiceRecord::to_line).collect();
        std::fs::write(&lines, text.join("\n")).unwrap();
        codec::write_container(&ChoicesContainer::from_records(&records), &container).unwrap();

        assert_eq!(ChoiceRecord::load(&lines).unwrap(), ChoiceRecord::load(&container).unwrap());
        assert_eq!(ChoiceRecord::load_mirrored(&lines, Some(&container)).unwrap(), records);
    }

    #[test]
    fn test_load_mirrored_disagreement() {
        let dir = TempDir::new().unwrap();
        let lines = dir.path().join("train.choices.txt");
        let container = dir.path().join("train.choices.cbor");
        std::fs::write(&lines, "5 6 7\t2\n1 0\t0\n").unwrap();
        let other = vec![ChoiceRecord::new([5, 6, 7], 2), ChoiceRecord::new([1, 0], 1)];
        codec::write_container(&ChoicesContainer::from_records(&other), &container).unwrap();

        assert!(matches!(
            ChoiceRecord::load_mirrored(&lines, Some(&container)),
            Err(Error::MalformedChoice { record: 1, .. })
        ));
    }

    #[test]
    fn test_load_comments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test_comments.txt");
        std::fs::write(&path, "nice shape \nslow move\n").unwrap();

        let comments = TextRecord::load(&path).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "nice shape");
        assert_eq!(comments[1].index, PositionIndex(1));
    }

    #[test]
    fn test_take_portion_is_prefix() {
        let records: Vec<_> = (0..10).map(|i| ChoiceRecord::new([i, i + 1], 0)).collect();
        let half = take_portion(records.clone(), 0.55);
        assert_eq!(half.len(), 5);
        assert_eq!(half[..], records[..5]);

        assert_eq!(take_portion(records.clone(), 1.0).len(), 10);
        assert!(take_portion(records, 0.0).is_empty());
    }
}
