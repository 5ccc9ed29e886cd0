//! Confusion matrix and per-class classification metrics.

use std::fmt;

use crate::error::ForestError;

/// Counts of (true class, predicted class) pairs.
///
/// Stored row-major: entry `(t, p)` lives at `t * n_classes + p`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ConfusionMatrix {
    n_classes: usize,
    counts: Vec<usize>,
}

/// Per-class precision, recall, and F1 score.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClassMetrics {
    /// The class index.
    pub class: usize,
    /// TP / (TP + FP), 0.0 when the class was never predicted.
    pub precision: f64,
    /// TP / (TP + FN), 0.0 when the class has no true samples.
    pub recall: f64,
    /// Harmonic mean of precision and recall, 0.0 when both are zero.
    pub f1: f64,
    /// Number of true samples in this class.
    pub support: usize,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from parallel true and predicted labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | Zero labels provided |
    /// | [`ForestError::LabelCountMismatch`] | The slices differ in length |
    pub fn from_labels(
        true_labels: &[usize],
        predicted: &[usize],
        n_classes: usize,
    ) -> Result<Self, ForestError> {
        if true_labels.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        if true_labels.len() != predicted.len() {
            return Err(ForestError::LabelCountMismatch {
                n_series: predicted.len(),
                n_labels: true_labels.len(),
            });
        }
        let mut counts = vec![0usize; n_classes * n_classes];
        for (&t, &p) in true_labels.iter().zip(predicted) {
            counts[t * n_classes + p] += 1;
        }
        Ok(Self { n_classes, counts })
    }

    /// Count of samples with true class `t` predicted as `p`.
    #[must_use]
    pub fn get(&self, t: usize, p: usize) -> usize {
        self.counts[t * self.n_classes + p]
    }

    /// Total number of samples.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        let correct: usize = (0..self.n_classes).map(|c| self.get(c, c)).sum();
        match self.total() {
            0 => 0.0,
            total => correct as f64 / total as f64,
        }
    }

    /// Per-class precision, recall, F1, and support.
    #[must_use]
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        (0..self.n_classes)
            .map(|c| {
                let tp = self.get(c, c);
                let predicted: usize = (0..self.n_classes).map(|t| self.get(t, c)).sum();
                let support: usize = (0..self.n_classes).map(|p| self.get(c, p)).sum();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall == 0.0 {
                    0.0
                } else {
                    2.0 * precision * recall / (precision + recall)
                };
                ClassMetrics {
                    class: c,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect()
    }

    /// Matrix rows, one per true class.
    #[must_use]
    pub fn rows(&self) -> Vec<Vec<usize>> {
        self.counts
            .chunks(self.n_classes.max(1))
            .map(<[usize]>::to_vec)
            .collect()
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>8}", "")?;
        for p in 0..self.n_classes {
            write!(f, " pred_{p:>3}")?;
        }
        writeln!(f)?;
        for t in 0..self.n_classes {
            write!(f, "true_{t:>3}")?;
            for p in 0..self.n_classes {
                write!(f, " {:>8}", self.get(t, p))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
