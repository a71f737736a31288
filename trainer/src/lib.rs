// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classifier training and evaluation for paired examples
//!
//! A logistic regression is tuned over its regularisation strength with
//! stratified k-fold cross-validation, once per tuning metric, then scored
//! on a held-out fold with a per-class report.

pub mod classifier;
pub mod metrics;
pub mod search;

use thiserror::Error;

pub use classifier::{Classifier, LogisticRegression};
pub use metrics::{ClassMetrics, ClassificationReport, Scoring};
pub use search::{search_and_evaluate, CvResult, GridSearch, GridSearchResult, ParamGrid, Params, SearchConfig, SearchOutcome};

/// Errors raised while fitting or scoring
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("no training examples")]
    EmptyTrainingSet,

    #[error("{rows} feature rows but {labels} labels")]
    ShapeMismatch { rows: usize, labels: usize },

    #[error("model was fit on {expected} features, input has {found}")]
    FeatureMismatch { expected: usize, found: usize },

    #[error("label {0} is not binary")]
    InvalidLabel(u8),

    #[error("classifier has not been fit")]
    NotFitted,

    #[error("cannot split {samples} samples into {folds} folds")]
    TooFewSamples { samples: usize, folds: usize },

    #[error("parameter grid is empty")]
    EmptyGrid,

    #[error("invalid hyper-parameter: {0}")]
    InvalidParam(String),
}

pub type Result<T> = std::result::Result<T, TrainerError>;
