//! Majority-vote prediction for the Proximity Forest ensemble.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

use proximity_distance::{TimeSeries, TimeSeriesView};

use crate::confusion::ConfusionMatrix;
use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::forest::ProximityForest;

/// Outcome of one majority vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    /// The winning class.
    pub label: usize,
    /// Votes per class, indexed by label.
    pub votes: Vec<usize>,
    /// `true` when several classes shared the top count and `label` was drawn among them.
    pub tied: bool,
}

/// Class probability distribution from normalized vote counts.
#[derive(Debug, Clone)]
pub struct ClassDistribution {
    probs: Vec<f64>,
}

impl ClassDistribution {
    pub(crate) fn new(probs: Vec<f64>) -> Self {
        Self { probs }
    }

    /// Return the predicted class (argmax of probabilities, lowest index on ties).
    #[must_use]
    pub fn predicted_class(&self) -> usize {
        let mut best = 0;
        for (idx, p) in self.probs.iter().enumerate() {
            if *p > self.probs[best] {
                best = idx;
            }
        }
        best
    }

    /// Return the top-k classes sorted by descending probability.
    #[must_use]
    pub fn top_k(&self, k: usize) -> Vec<(usize, f64)> {
        let mut indexed: Vec<(usize, f64)> = self.probs.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
        indexed.truncate(k);
        indexed
    }

    /// Return the probability distribution as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.probs
    }
}

/// Labels for a batch of queries plus how many of them were decided by a tie break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPrediction {
    pub labels: Vec<usize>,
    pub n_ties: usize,
}

/// Scores of a forest on a labeled test set.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub confusion: ConfusionMatrix,
    pub accuracy: f64,
    /// Predictions decided by a random pick among tied classes.
    pub n_ties: usize,
    pub predictions: Vec<usize>,
}

impl Vote {
    /// Pick the arg-max class of `votes`, drawing uniformly among tied maxima.
    ///
    /// `votes` holds one count per class; an all-zero array counts as a tie
    /// across every class.
    #[must_use]
    pub fn tally<R: Rng + ?Sized>(votes: Vec<usize>, rng: &mut R) -> Self {
        let top = votes.iter().copied().max().unwrap_or(0);
        let leaders: Vec<usize> = votes
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v == top)
            .map(|(class, _)| class)
            .collect();

        let (label, tied) = match leaders.as_slice() {
            [] => (0, false),
            [only] => (*only, false),
            many => (many[rng.gen_range(0..many.len())], true),
        };

        Self { label, votes, tied }
    }
}

impl ProximityForest {
    /// Predict the class of `query` by majority vote over all trees.
    ///
    /// `rng` drives nearest-exemplar tie breaks inside the trees and the
    /// draw among tied classes; with no ties it is never consulted, so the
    /// result is the same on every call.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::QueryLengthMismatch`] when `query.len() != series_length`.
    pub fn predict<R: Rng + ?Sized>(
        &self,
        query: TimeSeriesView<'_>,
        rng: &mut R,
    ) -> Result<Vote, ForestError> {
        let votes = self.count_votes(query, rng)?;
        Ok(Vote::tally(votes, rng))
    }

    /// Return normalized vote counts for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::QueryLengthMismatch`] when `query.len() != series_length`.
    pub fn predict_distribution<R: Rng + ?Sized>(
        &self,
        query: TimeSeriesView<'_>,
        rng: &mut R,
    ) -> Result<ClassDistribution, ForestError> {
        let votes = self.count_votes(query, rng)?;
        let n = self.trees.len() as f64;
        Ok(ClassDistribution::new(
            votes.into_iter().map(|v| v as f64 / n).collect(),
        ))
    }

    /// Predict a batch of queries in parallel.
    ///
    /// Each query gets its own ChaCha8 stream seeded from `rng`, so the
    /// output does not depend on thread scheduling.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::QueryLengthMismatch`] if any query has the wrong length.
    pub fn predict_batch<R: Rng + ?Sized>(
        &self,
        queries: &[TimeSeries],
        rng: &mut R,
    ) -> Result<BatchPrediction, ForestError> {
        let seeds: Vec<u64> = queries.iter().map(|_| rng.r#gen()).collect();
        let votes: Vec<Vote> = queries
            .par_iter()
            .zip(seeds)
            .map(|(query, seed)| {
                let mut query_rng = ChaCha8Rng::seed_from_u64(seed);
                self.predict(query.as_view(), &mut query_rng)
            })
            .collect::<Result<_, _>>()?;

        let n_ties = votes.iter().filter(|v| v.tied).count();
        Ok(BatchPrediction {
            labels: votes.into_iter().map(|v| v.label).collect(),
            n_ties,
        })
    }

    /// Predict every row of `test` and score against its labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::QueryLengthMismatch`] | test series length differs |
    /// | [`ForestError::EmptyDataset`] | `test` has no rows |
    /// | [`ForestError::ClassOutOfRange`] | a test label is `>= n_classes` |
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        test: &Dataset,
        rng: &mut R,
    ) -> Result<Evaluation, ForestError> {
        if test.n_classes() > self.n_classes {
            return Err(ForestError::ClassOutOfRange {
                label: test.n_classes() - 1,
                n_classes: self.n_classes,
            });
        }
        let batch = self.predict_batch(test.series(), rng)?;
        let confusion = ConfusionMatrix::from_labels(test.labels(), &batch.labels, self.n_classes)?;
        Ok(Evaluation {
            accuracy: confusion.accuracy(),
            confusion,
            n_ties: batch.n_ties,
            predictions: batch.labels,
        })
    }

    fn count_votes<R: Rng + ?Sized>(
        &self,
        query: TimeSeriesView<'_>,
        rng: &mut R,
    ) -> Result<Vec<usize>, ForestError> {
        if query.len() != self.series_length {
            return Err(ForestError::QueryLengthMismatch {
                expected: self.series_length,
                got: query.len(),
            });
        }
        let mut votes = vec![0usize; self.n_classes];
        for tree in &self.trees {
            votes[tree.predict(query, self.tie_break, rng)?] += 1;
        }
        Ok(votes)
    }
}
