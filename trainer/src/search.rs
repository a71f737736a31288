// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exhaustive grid search with stratified cross-validation

use ndarray::{ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::classifier::{check_rows, Classifier, LogisticRegression};
use crate::metrics::{ClassificationReport, Scoring};
use crate::{Result, TrainerError};

/// Candidate values for each hyper-parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    /// Inverse regularisation strengths
    pub c: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            c: vec![0.001, 0.01, 0.1],
        }
    }
}

impl ParamGrid {
    /// Every combination, in grid order
    pub fn candidates(&self) -> Vec<Params> {
        self.c.iter().map(|&c| Params { c }).collect()
    }
}

/// One point of the grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub c: f64,
}

/// Cross-validated score of one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvResult {
    pub params: Params,
    pub mean_score: f64,
    pub std_score: f64,
    pub fold_scores: Vec<f64>,
}

/// Best candidate of a search, refit on the full training fold
#[derive(Debug, Clone)]
pub struct GridSearchResult {
    pub scoring: Scoring,
    pub best_params: Params,
    pub best_score: f64,
    pub best_estimator: LogisticRegression,
    pub cv_results: Vec<CvResult>,
}

/// Result of tuning on one metric and evaluating on the held-out fold
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub metric: Scoring,
    pub best_params: Params,
    pub best_cv_score: f64,
    /// Accuracy of the refit estimator on the evaluation fold
    pub eval_score: f64,
    pub cv_results: Vec<CvResult>,
    pub report: ClassificationReport,
    #[serde(skip)]
    pub best_estimator: LogisticRegression,
}

/// Settings for the model-selection stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub grid: ParamGrid,
    pub metrics: Vec<Scoring>,
    pub folds: usize,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let search = GridSearch::default();
        Self {
            grid: ParamGrid::default(),
            metrics: Scoring::ALL.to_vec(),
            folds: search.folds,
            max_iter: search.max_iter,
            tol: search.tol,
        }
    }
}

impl SearchConfig {
    pub fn grid_search(&self) -> GridSearch {
        GridSearch {
            folds: self.folds,
            max_iter: self.max_iter,
            tol: self.tol,
        }
    }
}

/// Stratified k-fold grid search over logistic regression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSearch {
    pub folds: usize,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for GridSearch {
    fn default() -> Self {
        Self {
            folds: 5,
            max_iter: 1000,
            tol: 1e-4,
        }
    }
}

impl GridSearch {
    fn estimator(&self, params: Params) -> LogisticRegression {
        LogisticRegression::new(params.c).with_limits(self.max_iter, self.tol)
    }

    /// Score every candidate by cross-validation and refit the best one.
    ///
    /// Ties keep the earlier candidate.
    pub fn fit(
        &self,
        x: ArrayView2<f32>,
        y: ArrayView1<u8>,
        grid: &ParamGrid,
        scoring: Scoring,
    ) -> Result<GridSearchResult> {
        check_rows(x, y)?;
        let candidates = grid.candidates();
        if candidates.is_empty() {
            return Err(TrainerError::EmptyGrid);
        }
        let folds = stratified_folds(y, self.folds)?;

        let mut cv_results = Vec::with_capacity(candidates.len());
        for params in candidates {
            let mut fold_scores = Vec::with_capacity(folds.len());
            for (k, test_idx) in folds.iter().enumerate() {
                let train_idx = complement(x.nrows(), test_idx);
                let mut model = self.estimator(params);
                model.fit(x.select(Axis(0), &train_idx).view(), y.select(Axis(0), &train_idx).view())?;

                let x_test = x.select(Axis(0), test_idx);
                let y_test = y.select(Axis(0), test_idx);
                let predicted = model.predict(x_test.view())?;
                let score = scoring.score(y_test.view(), predicted.view());
                debug!("C={} fold {}: {}={:.4}", params.c, k, scoring, score);
                fold_scores.push(score);
            }

            let (mean_score, std_score) = mean_std(&fold_scores);
            cv_results.push(CvResult {
                params,
                mean_score,
                std_score,
                fold_scores,
            });
        }

        let mut best = &cv_results[0];
        for result in &cv_results[1..] {
            if result.mean_score > best.mean_score {
                best = result;
            }
        }
        let best_params = best.params;
        let best_score = best.mean_score;

        let mut best_estimator = self.estimator(best_params);
        best_estimator.fit(x, y)?;

        Ok(GridSearchResult {
            scoring,
            best_params,
            best_score,
            best_estimator,
            cv_results,
        })
    }

    /// Tune once per metric on the training fold and evaluate on the
    /// evaluation fold
    pub fn search_and_evaluate(
        &self,
        x_train: ArrayView2<f32>,
        y_train: ArrayView1<u8>,
        x_eval: ArrayView2<f32>,
        y_eval: ArrayView1<u8>,
        grid: &ParamGrid,
        metrics: &[Scoring],
    ) -> Result<Vec<SearchOutcome>> {
        check_rows(x_eval, y_eval)?;
        let mut outcomes = Vec::with_capacity(metrics.len());

        for &metric in metrics {
            let start = Instant::now();
            info!("Tuning hyper-parameters for {}", metric);
            let search = self.fit(x_train, y_train, grid, metric)?;

            let predicted = search.best_estimator.predict(x_eval)?;
            let eval_score = search.best_estimator.score(x_eval, y_eval)?;
            let report = ClassificationReport::new(y_eval, predicted.view());

            info!(
                "Best {} = {:.4} with C={}; held-out accuracy {:.4} ({:.2?})",
                metric,
                search.best_score,
                search.best_params.c,
                eval_score,
                start.elapsed()
            );
            outcomes.push(SearchOutcome {
                metric,
                best_params: search.best_params,
                best_cv_score: search.best_score,
                eval_score,
                cv_results: search.cv_results,
                report,
                best_estimator: search.best_estimator,
            });
        }

        Ok(outcomes)
    }
}

/// Grid search with the default fold count and solver limits
pub fn search_and_evaluate(
    x_train: ArrayView2<f32>,
    y_train: ArrayView1<u8>,
    x_eval: ArrayView2<f32>,
    y_eval: ArrayView1<u8>,
    grid: &ParamGrid,
    metrics: &[Scoring],
) -> Result<Vec<SearchOutcome>> {
    GridSearch::default().search_and_evaluate(x_train, y_train, x_eval, y_eval, grid, metrics)
}

/// Test indices of each fold. Each class is dealt round-robin across the
/// folds in its original order, so every fold keeps the class balance.
pub fn stratified_folds(y: ArrayView1<u8>, k: usize) -> Result<Vec<Vec<usize>>> {
    if k < 2 || y.len() < k {
        return Err(TrainerError::TooFewSamples {
            samples: y.len(),
            folds: k,
        });
    }

    let mut by_class: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }
    if let Some(smallest) = by_class.values().map(Vec::len).min() {
        if smallest < k {
            warn!("The least populated class has only {} members, fewer than {} folds", smallest, k);
        }
    }

    let mut folds = vec![Vec::new(); k];
    let mut next = 0;
    for indices in by_class.values() {
        for &i in indices {
            folds[next % k].push(i);
            next += 1;
        }
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }
    Ok(folds)
}

fn complement(n: usize, excluded: &[usize]) -> Vec<usize> {
    let mut keep = vec![true; n];
    for &i in excluded {
        keep[i] = false;
    }
    (0..n).filter(|&i| keep[i]).collect()
}

fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn noisy_blobs(n: usize, spread: f32, seed: u64) -> (Array2<f32>, Array1<u8>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let x = Array2::from_shape_fn((n, 3), |(i, j)| {
            let centre = if i % 2 == 1 { 1.0 } else { -1.0 };
            if j == 2 {
                rng.gen_range(-1.0..1.0)
            } else {
                centre + rng.gen_range(-spread..spread)
            }
        });
        let y = Array1::from_shape_fn(n, |i| (i % 2) as u8);
        (x, y)
    }

    #[test]
    fn test_stratified_folds_keep_balance() {
        let y = Array1::from_vec(vec![0u8, 1, 0, 1, 0, 1, 0, 1, 0, 1]);
        let folds = stratified_folds(y.view(), 5).unwrap();

        assert_eq!(folds.len(), 5);
        let mut seen: Vec<usize> = folds.iter().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        for fold in &folds {
            let positives = fold.iter().filter(|&&i| y[i] == 1).count();
            assert_eq!(fold.len(), 2);
            assert_eq!(positives, 1);
        }
    }

    #[test]
    fn test_too_few_samples() {
        let y = Array1::from_vec(vec![0u8, 1, 0]);
        assert!(matches!(
            stratified_folds(y.view(), 5),
            Err(TrainerError::TooFewSamples { samples: 3, folds: 5 })
        ));
    }

    #[test]
    fn test_grid_search_is_deterministic() {
        let (x, y) = noisy_blobs(50, 1.5, 9);
        let search = GridSearch::default();
        let a = search.fit(x.view(), y.view(), &ParamGrid::default(), Scoring::F1Macro).unwrap();
        let b = search.fit(x.view(), y.view(), &ParamGrid::default(), Scoring::F1Macro).unwrap();

        assert_eq!(a.best_params, b.best_params);
        assert_eq!(a.cv_results, b.cv_results);
        assert_eq!(a.cv_results.len(), 3);
        assert!(a.cv_results.iter().all(|r| r.fold_scores.len() == 5));
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        // Perfectly separable data: every C scores 1.0
        let (x, y) = noisy_blobs(40, 0.1, 4);
        let grid = ParamGrid { c: vec![0.5, 1.0, 2.0] };
        let result = GridSearch::default().fit(x.view(), y.view(), &grid, Scoring::Accuracy).unwrap();

        assert!(result.cv_results.iter().all(|r| r.mean_score == 1.0));
        assert_eq!(result.best_params, Params { c: 0.5 });
        assert!(result.best_estimator.is_fitted());
    }

    #[test]
    fn test_search_and_evaluate() {
        let (x_train, y_train) = noisy_blobs(60, 0.5, 1);
        let (x_eval, y_eval) = noisy_blobs(20, 0.5, 2);
        let metrics = [Scoring::PrecisionMacro, Scoring::Accuracy];

        let outcomes = search_and_evaluate(
            x_train.view(),
            y_train.view(),
            x_eval.view(),
            y_eval.view(),
            &ParamGrid::default(),
            &metrics,
        )
        .unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].metric, Scoring::PrecisionMacro);
        for outcome in &outcomes {
            assert!(outcome.eval_score > 0.9);
            assert_eq!(outcome.report.support, 20);
            assert!((outcome.report.accuracy - outcome.eval_score).abs() < 1e-12);
        }
    }

    #[test]
    fn test_empty_grid() {
        let (x, y) = noisy_blobs(10, 0.5, 3);
        let grid = ParamGrid { c: vec![] };
        assert!(matches!(
            GridSearch::default().fit(x.view(), y.view(), &grid, Scoring::Accuracy),
            Err(TrainerError::EmptyGrid)
        ));
    }
}
