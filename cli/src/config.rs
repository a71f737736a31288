// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line arguments and the run configuration

use anyhow::{bail, Result};
use clap::Parser;
use kibitz_neural::{ExtractorConfig, TextStrategy};
use kibitz_trainer::SearchConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable overriding the model directory
pub const MODEL_DIR_ENV: &str = "KIBITZ_MODEL_DIR";
/// Environment variable selecting the text strategy (`bow` or `subword`)
pub const TEXT_STRATEGY_ENV: &str = "KIBITZ_TEXT_STRATEGY";

/// Command-line arguments
#[derive(Parser, Debug, Clone, Serialize)]
#[command(
    name = "kibitz",
    about = "Pair Go boards with commentary and evaluate a plausibility classifier",
    version
)]
pub struct Args {
    /// Free-form notes identifying this run
    #[arg(long)]
    pub notes: String,

    /// Directory for the run report
    #[arg(long = "out-dir", alias = "outDir")]
    pub out_dir: PathBuf,

    /// Directory holding the board, comment, choice and vocabulary files
    #[arg(long = "data-dir", alias = "dataDir")]
    pub data_dir: PathBuf,
}

/// Everything a pipeline run needs besides its input paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub extractor: ExtractorConfig,
    /// Fraction of each split's choice records to use, taken from the front
    pub portion: f64,
    pub search: SearchConfig,
    /// Prefix cap on the combined train+validation examples
    pub max_train_examples: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extractor: ExtractorConfig::default(),
            portion: 1.0,
            search: SearchConfig::default(),
            max_train_examples: None,
        }
    }
}

impl PipelineConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_overrides(
            std::env::var(MODEL_DIR_ENV).ok(),
            std::env::var(TEXT_STRATEGY_ENV).ok(),
        )?;
        Ok(config)
    }

    fn apply_overrides(&mut self, model_dir: Option<String>, text_strategy: Option<String>) -> Result<()> {
        if let Some(dir) = model_dir.filter(|d| !d.is_empty()) {
            self.extractor.model_dir = PathBuf::from(dir);
        }
        if let Some(strategy) = text_strategy {
            self.extractor.text = match strategy.to_lowercase().as_str() {
                "bow" | "bag-of-words" => TextStrategy::default(),
                "subword" => TextStrategy::subword(),
                other => bail!("{TEXT_STRATEGY_ENV} must be `bow` or `subword`, got `{other}`"),
            };
        }
        Ok(())
    }
}
