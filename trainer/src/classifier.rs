// SPDX-License-Identifier: MIT OR Apache-2.0

//! Binary linear classifiers

use ndarray::{Array1, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::metrics::accuracy;
use crate::{Result, TrainerError};

/// Fit/predict/score contract used by the grid search
pub trait Classifier {
    fn fit(&mut self, x: ArrayView2<f32>, y: ArrayView1<u8>) -> Result<()>;

    fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<u8>>;

    /// Mean accuracy on the given data
    fn score(&self, x: ArrayView2<f32>, y: ArrayView1<u8>) -> Result<f64> {
        check_rows(x, y)?;
        let predicted = self.predict(x)?;
        Ok(accuracy(y, predicted.view()))
    }
}

/// L2-regularised logistic regression.
///
/// Minimises `||w||² / 2 + c * Σ log_loss` by full-batch gradient descent
/// from a zero start, so fitting is deterministic. The intercept is not
/// penalised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Inverse regularisation strength
    pub c: f64,
    pub max_iter: usize,
    /// Stop once the largest gradient component falls below this
    pub tol: f64,
    weights: Option<Array1<f64>>,
    intercept: f64,
    n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl LogisticRegression {
    pub fn new(c: f64) -> Self {
        Self {
            c,
            max_iter: 1000,
            tol: 1e-4,
            weights: None,
            intercept: 0.0,
            n_iter: 0,
        }
    }

    pub fn with_limits(mut self, max_iter: usize, tol: f64) -> Self {
        self.max_iter = max_iter;
        self.tol = tol;
        self
    }

    pub fn is_fitted(&self) -> bool {
        self.weights.is_some()
    }

    pub fn coefficients(&self) -> Option<ArrayView1<f64>> {
        self.weights.as_ref().map(|w| w.view())
    }

    /// Probability of the positive class for each row
    pub fn predict_proba(&self, x: ArrayView2<f32>) -> Result<Array1<f64>> {
        let weights = self.weights.as_ref().ok_or(TrainerError::NotFitted)?;
        if x.ncols() != weights.len() {
            return Err(TrainerError::FeatureMismatch {
                expected: weights.len(),
                found: x.ncols(),
            });
        }
        let x = x.mapv(f64::from);
        Ok((x.dot(weights) + self.intercept).mapv(sigmoid))
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: ArrayView2<f32>, y: ArrayView1<u8>) -> Result<()> {
        check_rows(x, y)?;
        if x.nrows() == 0 {
            return Err(TrainerError::EmptyTrainingSet);
        }
        if self.c.is_nan() || self.c <= 0.0 {
            return Err(TrainerError::InvalidParam(format!("c must be positive, got {}", self.c)));
        }
        if let Some(&bad) = y.iter().find(|&&label| label > 1) {
            return Err(TrainerError::InvalidLabel(bad));
        }

        let n = x.nrows() as f64;
        let x = x.mapv(f64::from);
        let targets = y.mapv(f64::from);

        // Objective scaled by 1/(c·n): mean log loss + ||w||² / (2·c·n)
        let alpha = 1.0 / (self.c * n);
        let mean_sq_norm = x.map_axis(Axis(1), |row| row.dot(&row)).sum() / n;
        let lipschitz = 0.25 * (mean_sq_norm + 1.0) + alpha;
        let step = 1.0 / lipschitz;

        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut intercept = 0.0;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iter {
            iterations += 1;
            let residual = (x.dot(&weights) + intercept).mapv(sigmoid) - &targets;
            let grad_w = x.t().dot(&residual) / n + &weights * alpha;
            let grad_b = residual.sum() / n;

            let largest = grad_w.iter().fold(grad_b.abs(), |acc, g| acc.max(g.abs()));
            if largest < self.tol {
                converged = true;
                break;
            }

            weights.scaled_add(-step, &grad_w);
            intercept -= step * grad_b;
        }

        if converged {
            debug!("Logistic regression (C={}) converged after {} iterations", self.c, iterations);
        } else {
            warn!(
                "Logistic regression (C={}) stopped at max_iter={} before reaching tol={}",
                self.c, self.max_iter, self.tol
            );
        }

        self.weights = Some(weights);
        self.intercept = intercept;
        self.n_iter = iterations;
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f32>) -> Result<Array1<u8>> {
        Ok(self.predict_proba(x)?.mapv(|p| u8::from(p >= 0.5)))
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

pub(crate) fn check_rows(x: ArrayView2<f32>, y: ArrayView1<u8>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(TrainerError::ShapeMismatch {
            rows: x.nrows(),
            labels: y.len(),
        });
    }
    Ok(())
}
