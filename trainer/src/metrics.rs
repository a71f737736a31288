// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification metrics and the per-class report

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Metric used to rank grid candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    Accuracy,
    PrecisionMacro,
    RecallMacro,
    F1Macro,
}

impl Scoring {
    /// Tuning metrics in the order they are reported
    pub const ALL: [Scoring; 4] = [
        Scoring::PrecisionMacro,
        Scoring::RecallMacro,
        Scoring::F1Macro,
        Scoring::Accuracy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scoring::Accuracy => "accuracy",
            Scoring::PrecisionMacro => "precision_macro",
            Scoring::RecallMacro => "recall_macro",
            Scoring::F1Macro => "f1_macro",
        }
    }

    pub fn score(&self, y_true: ArrayView1<u8>, y_pred: ArrayView1<u8>) -> f64 {
        match self {
            Scoring::Accuracy => accuracy(y_true, y_pred),
            Scoring::PrecisionMacro => ClassificationReport::new(y_true, y_pred).macro_avg.precision,
            Scoring::RecallMacro => ClassificationReport::new(y_true, y_pred).macro_avg.recall,
            Scoring::F1Macro => ClassificationReport::new(y_true, y_pred).macro_avg.f1,
        }
    }
}

impl fmt::Display for Scoring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fraction of matching labels, 0 for empty input
pub fn accuracy(y_true: ArrayView1<u8>, y_pred: ArrayView1<u8>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

/// Precision, recall and F1 of one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: u8,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Averaged precision, recall and F1
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Averages {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Per-class metrics with overall accuracy and averages.
///
/// Classes are the sorted union of true and predicted labels. A ratio with a
/// zero denominator counts as 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: Averages,
    pub weighted_avg: Averages,
    pub support: usize,
}

impl ClassificationReport {
    pub fn new(y_true: ArrayView1<u8>, y_pred: ArrayView1<u8>) -> Self {
        let labels: BTreeSet<u8> = y_true.iter().chain(y_pred.iter()).copied().collect();

        let classes: Vec<ClassMetrics> = labels
            .into_iter()
            .map(|label| {
                let mut tp = 0usize;
                let mut fp = 0usize;
                let mut fn_ = 0usize;
                for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
                    match (t == label, p == label) {
                        (true, true) => tp += 1,
                        (false, true) => fp += 1,
                        (true, false) => fn_ += 1,
                        (false, false) => {}
                    }
                }
                let precision = ratio(tp, tp + fp);
                let recall = ratio(tp, tp + fn_);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    label,
                    precision,
                    recall,
                    f1,
                    support: tp + fn_,
                }
            })
            .collect();

        let support = y_true.len();
        let mut macro_avg = Averages::default();
        let mut weighted_avg = Averages::default();
        if !classes.is_empty() {
            let k = classes.len() as f64;
            for class in &classes {
                macro_avg.precision += class.precision / k;
                macro_avg.recall += class.recall / k;
                macro_avg.f1 += class.f1 / k;
                if support > 0 {
                    let w = class.support as f64 / support as f64;
                    weighted_avg.precision += class.precision * w;
                    weighted_avg.recall += class.recall * w;
                    weighted_avg.f1 += class.f1 * w;
                }
            }
        }

        Self {
            classes,
            accuracy: accuracy(y_true, y_pred),
            macro_avg,
            weighted_avg,
            support,
        }
    }

    pub fn class(&self, label: u8) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.label == label)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for class in &self.classes {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                class.label, class.precision, class.recall, class.f1, class.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:>12} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", self.accuracy, self.support)?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, self.support
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_report_matches_hand_computed() {
        let y_true = array![1u8, 0, 1, 0, 1, 0];
        let y_pred = array![1u8, 0, 0, 0, 1, 1];
        let report = ClassificationReport::new(y_true.view(), y_pred.view());

        // class 1: tp=2 fp=1 fn=1, class 0: tp=2 fp=1 fn=1
        let one = report.class(1).unwrap();
        assert!((one.precision - 2.0 / 3.0).abs() < EPS);
        assert!((one.recall - 2.0 / 3.0).abs() < EPS);
        assert!((one.f1 - 2.0 / 3.0).abs() < EPS);
        assert_eq!(one.support, 3);
        assert!((report.accuracy - 4.0 / 6.0).abs() < EPS);
        assert!((report.macro_avg.f1 - 2.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn test_unbalanced_averages() {
        let y_true = array![0u8, 0, 0, 1];
        let y_pred = array![0u8, 0, 0, 0];
        let report = ClassificationReport::new(y_true.view(), y_pred.view());

        let zero = report.class(0).unwrap();
        assert!((zero.precision - 0.75).abs() < EPS);
        assert!((zero.recall - 1.0).abs() < EPS);
        let one = report.class(1).unwrap();
        assert_eq!(one.precision, 0.0);
        assert_eq!(one.f1, 0.0);

        let zero_f1 = 2.0 * 0.75 / 1.75;
        assert!((report.macro_avg.f1 - zero_f1 / 2.0).abs() < EPS);
        assert!((report.weighted_avg.f1 - zero_f1 * 0.75).abs() < EPS);
        assert!((Scoring::RecallMacro.score(y_true.view(), y_pred.view()) - 0.5).abs() < EPS);
        assert!((Scoring::Accuracy.score(y_true.view(), y_pred.view()) - 0.75).abs() < EPS);
    }

    #[test]
    fn test_report_table() {
        let y = array![0u8, 1];
        let table = ClassificationReport::new(y.view(), y.view()).to_string();
        assert!(table.contains("precision"));
        assert!(table.contains("macro avg"));
        assert!(table.contains("weighted avg"));
        assert!(table.contains("1.00"));
    }

    #[test]
    fn test_empty_input() {
        let empty = ndarray::Array1::<u8>::zeros(0);
        let report = ClassificationReport::new(empty.view(), empty.view());
        assert!(report.classes.is_empty());
        assert_eq!(report.accuracy, 0.0);
    }
}
