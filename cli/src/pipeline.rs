// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dataset assembly and the end-to-end run
//!
//! Stages, in order:
//! 1. discover every split's files and the vocabulary
//! 2. load the vocabulary
//! 3. open the model session
//! 4. per split: extract board and text features, build example pairs
//! 5. grid search on train+validation, evaluate on test
//!
//! Any failure aborts the run. The model is only touched once discovery
//! has found every input.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use kibitz_core::records::take_portion;
use kibitz_core::{pairs, BoardContainer, ChoiceRecord, DatasetLayout, ExampleSet, Split, TextRecord};
use kibitz_neural::{BoardFeatureExtractor, ModelSession, SubwordVocabulary, TextFeatureExtractor};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::{Args, PipelineConfig};
use crate::report::{format_elapsed, RunReport, SplitSummary};

/// Assembles example sets for the discovered splits against one model session
pub struct Pipeline {
    config: PipelineConfig,
    layout: DatasetLayout,
    vocabulary: SubwordVocabulary,
    text: TextFeatureExtractor,
    session: ModelSession,
    assembled: BTreeMap<Split, ExampleSet>,
}

impl Pipeline {
    /// Discover inputs, load the vocabulary and open the model.
    ///
    /// Discovery covers all splits before any model file is read.
    pub fn open(data_dir: &Path, config: PipelineConfig) -> Result<Self> {
        let layout = DatasetLayout::discover(data_dir, &Split::ALL)?;
        let vocabulary = SubwordVocabulary::load(&layout.vocab, config.extractor.text.min_count())?;

        let model_dir = &config.extractor.model_dir;
        let session = ModelSession::open(model_dir)
            .with_context(|| format!("Failed to open model session in {}", model_dir.display()))?;
        let text = TextFeatureExtractor::new(&config.extractor.text, model_dir)
            .with_context(|| format!("Failed to set up text features from {}", model_dir.display()))?;

        Ok(Self {
            config,
            layout,
            vocabulary,
            text,
            session,
            assembled: BTreeMap::new(),
        })
    }

    /// Example pairs of one split, extracted once and cached.
    ///
    /// The train split is always assembled first so the text layout is
    /// fit on training comments.
    pub fn assemble(&mut self, split: Split) -> Result<&ExampleSet> {
        if split != Split::Train {
            self.ensure_assembled(Split::Train)?;
        }
        self.ensure_assembled(split)?;
        self.assembled
            .get(&split)
            .ok_or_else(|| anyhow!("{split} split was not assembled"))
    }

    /// Concatenation of the given splits' examples, in the given order
    pub fn assemble_combined(&mut self, splits: &[Split]) -> Result<ExampleSet> {
        for &split in splits {
            self.assemble(split)?;
        }
        let sets = splits
            .iter()
            .map(|split| {
                self.assembled
                    .get(split)
                    .ok_or_else(|| anyhow!("{split} split was not assembled"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ExampleSet::concat(sets)?)
    }

    fn ensure_assembled(&mut self, split: Split) -> Result<()> {
        if self.assembled.contains_key(&split) {
            return Ok(());
        }
        let set = self
            .extract_split(split)
            .with_context(|| format!("Failed to assemble the {split} split"))?;
        self.assembled.insert(split, set);
        Ok(())
    }

    fn extract_split(&mut self, split: Split) -> Result<ExampleSet> {
        let start = Instant::now();
        let files = self
            .layout
            .split(split)
            .ok_or_else(|| anyhow!("no input files discovered for the {split} split"))?;

        let boards = BoardContainer::load(&files.boards)?;
        let texts = TextRecord::load(&files.text)?;
        let choices = take_portion(
            ChoiceRecord::load_mirrored(&files.choices, files.choices_mirror.as_deref())?,
            self.config.portion,
        );
        info!(
            "{} split: {} boards, {} comments, {} choice records",
            split,
            boards.len(),
            texts.len(),
            choices.len()
        );

        let board_features = BoardFeatureExtractor::new(self.session.model(), self.config.extractor.pooling)
            .extract_all(&boards)?;
        let text_features = self.text.extract(&texts, &self.vocabulary)?;
        let set = pairs::build(&board_features, &text_features, &choices)?;

        info!("{} split assembled in {}", split, format_elapsed(start.elapsed()));
        Ok(set)
    }

    /// Assemble every fold, tune on train+validation and evaluate on test.
    ///
    /// Consumes the pipeline; the model session is released on return.
    pub fn run(mut self, args: &Args) -> Result<RunReport> {
        let started_at = Utc::now();
        let start = Instant::now();

        let mut combined = self.assemble_combined(&[Split::Train, Split::Validation])?;
        if let Some(cap) = self.config.max_train_examples {
            if combined.len() > cap {
                warn!("Using the first {} of {} train+validation examples", cap, combined.len());
                combined.truncate(cap);
            }
        }
        let test = self.assemble(Split::Test)?.clone();

        let mut folds: Vec<SplitSummary> = Split::ALL
            .iter()
            .filter_map(|split| {
                self.assembled
                    .get(split)
                    .map(|set| SplitSummary::for_split(*split, set))
            })
            .collect();
        folds.push(SplitSummary::new("train+validation", &combined));

        let (x_train, y_train) = combined.to_arrays();
        let (x_test, y_test) = test.to_arrays();
        info!(
            "Model selection on {} examples, evaluation on {} (width {})",
            x_train.nrows(),
            x_test.nrows(),
            x_train.ncols()
        );

        let search = &self.config.search;
        let outcomes = search
            .grid_search()
            .search_and_evaluate(
                x_train.view(),
                y_train.view(),
                x_test.view(),
                y_test.view(),
                &search.grid,
                &search.metrics,
            )
            .context("Model selection failed")?;

        Ok(RunReport {
            notes: args.notes.clone(),
            started_at,
            elapsed: format_elapsed(start.elapsed()),
            args: args.clone(),
            config: self.config.clone(),
            folds,
            outcomes,
        })
    }
}
