// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run report: console rendering and `report.json`

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use kibitz_core::{ExampleSet, Split};
use kibitz_trainer::SearchOutcome;
use serde::Serialize;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{Args, PipelineConfig};

/// File name of the structured report inside the output directory
pub const REPORT_FILE: &str = "report.json";

/// Size and balance of one assembled fold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitSummary {
    pub name: String,
    pub examples: usize,
    pub positives: usize,
    pub negatives: usize,
    pub dim: usize,
}

impl SplitSummary {
    pub fn new(name: impl Into<String>, set: &ExampleSet) -> Self {
        let (negatives, positives) = set.label_counts();
        Self {
            name: name.into(),
            examples: set.len(),
            positives,
            negatives,
            dim: set.dim(),
        }
    }

    pub fn for_split(split: Split, set: &ExampleSet) -> Self {
        Self::new(split.to_string(), set)
    }
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub notes: String,
    pub started_at: DateTime<Utc>,
    pub elapsed: String,
    pub args: Args,
    pub config: PipelineConfig,
    pub folds: Vec<SplitSummary>,
    pub outcomes: Vec<SearchOutcome>,
}

impl RunReport {
    /// Write `report.json` into `out_dir`, creating it if needed
    pub fn write(&self, out_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;
        let path = out_dir.join(REPORT_FILE);
        let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .with_context(|| format!("Failed to write JSON to {}", path.display()))?;
        writeln!(writer)?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", path.display()))?;
        Ok(path)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run: {} ({})", self.notes, self.started_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        for fold in &self.folds {
            writeln!(
                f,
                "  {:<16} {:>7} examples ({} positive / {} negative), width {}",
                fold.name, fold.examples, fold.positives, fold.negatives, fold.dim
            )?;
        }

        for outcome in &self.outcomes {
            writeln!(f)?;
            writeln!(f, "# Tuning hyper-parameters for {}", outcome.metric)?;
            writeln!(f)?;
            writeln!(f, "Best parameters set found on development set: C={}", outcome.best_params.c)?;
            writeln!(f)?;
            writeln!(f, "Grid scores on development set:")?;
            for cv in &outcome.cv_results {
                writeln!(
                    f,
                    "{:.3} (+/-{:.3}) for C={}",
                    cv.mean_score,
                    cv.std_score * 2.0,
                    cv.params.c
                )?;
            }
            writeln!(f)?;
            writeln!(f, "Detailed classification report (held-out test set):")?;
            writeln!(f)?;
            write!(f, "{}", outcome.report)?;
            writeln!(f)?;
            writeln!(f, "Test accuracy: {:.4}", outcome.eval_score)?;
        }

        writeln!(f)?;
        write!(f, "Total time: {}", self.elapsed)
    }
}

/// `HH:MM:SS` rendering of a duration
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
