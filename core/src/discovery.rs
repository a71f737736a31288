// SPDX-License-Identifier: MIT OR Apache-2.0

//! Input file discovery
//!
//! Files in the data directory are matched by substring: the split key
//! (`train`, `val`, `test`) picks the split and a category keyword picks the
//! record kind. The vocabulary is shared by all splits. Every category must
//! resolve to exactly one file, except choices: a split may carry both a
//! line file (`.txt`) and a serialized container (`.cbor`/`.json`). The line
//! file is preferred and the container is kept as its mirror.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{Error, Result, Split};

/// Kind of input artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Boards,
    Text,
    Choices,
    Vocab,
}

impl FileCategory {
    /// Classify a file name, `None` when it belongs to no category.
    ///
    /// Keywords are checked in a fixed order so `train.choices.txt` is a
    /// choices file, not a text file.
    pub fn classify(file_name: &str) -> Option<Self> {
        let name = file_name.to_lowercase();
        if name.contains("vocab") {
            Some(FileCategory::Vocab)
        } else if name.contains("board") {
            Some(FileCategory::Boards)
        } else if name.contains("choice") {
            Some(FileCategory::Choices)
        } else if name.contains("comment") || name.contains("text") {
            Some(FileCategory::Text)
        } else {
            None
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileCategory::Boards => "board",
            FileCategory::Text => "text",
            FileCategory::Choices => "choices",
            FileCategory::Vocab => "vocab",
        };
        f.write_str(name)
    }
}

/// Resolved input files of one split
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitFiles {
    pub split: Split,
    pub boards: PathBuf,
    pub text: PathBuf,
    /// Choice records to load, the line file when present
    pub choices: PathBuf,
    /// Container holding the same records when a line file was also found
    pub choices_mirror: Option<PathBuf>,
}

/// All input files needed for a run
#[derive(Debug, Clone, Serialize)]
pub struct DatasetLayout {
    pub data_dir: PathBuf,
    pub vocab: PathBuf,
    splits: Vec<SplitFiles>,
}

impl DatasetLayout {
    /// Resolve every requested split and the shared vocabulary
    pub fn discover(data_dir: &Path, splits: &[Split]) -> Result<Self> {
        let files = list_files(data_dir)?;
        info!("Discovering inputs among {} files in {}", files.len(), data_dir.display());

        let vocab_candidates: Vec<&PathBuf> = files
            .iter()
            .filter(|path| classify_path(path) == Some(FileCategory::Vocab))
            .collect();
        let vocab = pick_one("shared", FileCategory::Vocab, &vocab_candidates)?;

        let mut resolved = Vec::with_capacity(splits.len());
        for &split in splits {
            let split_files: Vec<&PathBuf> = files
                .iter()
                .filter(|path| file_name(path).to_lowercase().contains(split.file_key()))
                .collect();

            let pick = |category: FileCategory| {
                let candidates: Vec<&PathBuf> = split_files
                    .iter()
                    .copied()
                    .filter(|path| classify_path(path) == Some(category))
                    .collect();
                pick_one(&split.to_string(), category, &candidates)
            };

            let boards = pick(FileCategory::Boards)?;
            let text = pick(FileCategory::Text)?;
            let (choices, choices_mirror) = pick_choices(&split.to_string(), &split_files)?;

            debug!(
                "{} split: boards={} text={} choices={}",
                split,
                boards.display(),
                text.display(),
                choices.display()
            );
            resolved.push(SplitFiles {
                split,
                boards,
                text,
                choices,
                choices_mirror,
            });
        }

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            vocab,
            splits: resolved,
        })
    }

    pub fn split(&self, split: Split) -> Option<&SplitFiles> {
        self.splits.iter().find(|files| files.split == split)
    }

    pub fn splits(&self) -> &[SplitFiles] {
        &self.splits
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn classify_path(path: &Path) -> Option<FileCategory> {
    FileCategory::classify(&file_name(path))
}

/// Regular files of a directory, sorted by name
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_choice_lines(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("txt")
}

/// Line file first, container as fallback; two files of one kind are ambiguous
fn pick_choices(scope: &str, split_files: &[&PathBuf]) -> Result<(PathBuf, Option<PathBuf>)> {
    let (lines, containers): (Vec<&PathBuf>, Vec<&PathBuf>) = split_files
        .iter()
        .copied()
        .filter(|path| classify_path(path) == Some(FileCategory::Choices))
        .partition(|path| is_choice_lines(path));

    match (lines.is_empty(), containers.is_empty()) {
        (true, true) => pick_one(scope, FileCategory::Choices, &[]).map(|path| (path, None)),
        (false, true) => Ok((pick_one(scope, FileCategory::Choices, &lines)?, None)),
        (true, false) => Ok((pick_one(scope, FileCategory::Choices, &containers)?, None)),
        (false, false) => {
            let primary = pick_one(scope, FileCategory::Choices, &lines)?;
            let mirror = pick_one(scope, FileCategory::Choices, &containers)?;
            Ok((primary, Some(mirror)))
        }
    }
}

fn pick_one(scope: &str, category: FileCategory, candidates: &[&PathBuf]) -> Result<PathBuf> {
    match candidates {
        [only] => Ok((*only).clone()),
        [] => Err(Error::DatasetDiscovery {
            scope: scope.to_owned(),
            category,
            reason: "no matching file".to_owned(),
        }),
        many => Err(Error::DatasetDiscovery {
            scope: scope.to_owned(),
            category,
            reason: format!(
                "ambiguous, {} files match: {}",
                many.len(),
                many.iter()
                    .map(|path| file_name(path))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), b"").unwrap();
        }
    }

    const SPLIT_FILES: [&str; 9] = [
        "train_board_inputs.cbor",
        "train_comments.tok.32000.txt",
        "train.choices.txt",
        "val_board_inputs.cbor",
        "val_comments.tok.32000.txt",
        "val.choices.txt",
        "test_board_inputs.cbor",
        "test_comments.tok.32000.txt",
        "test.choices.txt",
    ];

    #[test]
    fn test_classify() {
        assert_eq!(FileCategory::classify("vocab.32000"), Some(FileCategory::Vocab));
        assert_eq!(FileCategory::classify("train.choices.txt"), Some(FileCategory::Choices));
        assert_eq!(FileCategory::classify("val_comments.txt"), Some(FileCategory::Text));
        assert_eq!(FileCategory::classify("test_board_inputs.cbor"), Some(FileCategory::Boards));
        assert_eq!(FileCategory::classify("README.md"), None);
    }

    #[test]
    fn test_discover_all_splits() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), &SPLIT_FILES);
        touch(dir.path(), &["vocab.32000", "notes.md"]);

        let layout = DatasetLayout::discover(dir.path(), &Split::ALL).unwrap();
        assert_eq!(layout.splits().len(), 3);
        assert!(layout.vocab.ends_with("vocab.32000"));

        let val = layout.split(Split::Validation).unwrap();
        assert!(val.boards.ends_with("val_board_inputs.cbor"));
        assert!(val.text.ends_with("val_comments.tok.32000.txt"));
        assert!(val.choices.ends_with("val.choices.txt"));
    }

    #[test]
    fn test_missing_vocab() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), &SPLIT_FILES);

        let err = DatasetLayout::discover(dir.path(), &Split::ALL).unwrap_err();
        match err {
            Error::DatasetDiscovery { category, .. } => assert_eq!(category, FileCategory::Vocab),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_choice_lines_and_container() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), &SPLIT_FILES);
        touch(dir.path(), &["vocab.32000", "train.choices.cbor"]);

        let layout = DatasetLayout::discover(dir.path(), &Split::ALL).unwrap();
        let train = layout.split(Split::Train).unwrap();
        assert!(train.choices.ends_with("train.choices.txt"));
        assert!(train.choices_mirror.as_ref().unwrap().ends_with("train.choices.cbor"));
        assert_eq!(layout.split(Split::Test).unwrap().choices_mirror, None);
    }

    #[test]
    fn test_container_only_choices() {
        let dir = TempDir::new().unwrap();
        touch(
            dir.path(),
            &[
                "vocab.32000",
                "test_board_inputs.cbor",
                "test_comments.tok.32000.txt",
                "test.choices.json",
            ],
        );

        let layout = DatasetLayout::discover(dir.path(), &[Split::Test]).unwrap();
        let test = layout.split(Split::Test).unwrap();
        assert!(test.choices.ends_with("test.choices.json"));
        assert_eq!(test.choices_mirror, None);
    }

    #[test]
    fn test_ambiguous_choice_containers() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), &SPLIT_FILES);
        touch(dir.path(), &["vocab.32000", "train.choices.cbor", "train.choices.json"]);

        let err = discovery_error(DatasetLayout::discover(dir.path(), &[Split::Train]));
        assert!(err.contains("train"));
        assert!(err.contains("choices"));
        assert!(err.contains("ambiguous"));
        assert!(err.contains("train.choices.cbor, train.choices.json"));
    }

    #[test]
    fn test_missing_split_category() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), &["vocab.32000", "test_board_inputs.cbor", "test.choices.txt"]);

        let err = discovery_error(DatasetLayout::discover(dir.path(), &[Split::Test]));
        assert!(err.contains("text files"));
        assert!(err.contains("no matching file"));
    }

    fn discovery_error(result: Result<DatasetLayout>) -> String {
        match result {
            Err(err @ Error::DatasetDiscovery { .. }) => err.to_string(),
            Err(other) => panic!("unexpected error {other:?}"),
            Ok(_) => panic!("discovery should fail"),
        }
    }
}
