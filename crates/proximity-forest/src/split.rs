//! Best-of-K random exemplar splits.

use proximity_distance::{DistanceMeasure, MeasureKind, TieBreak, TimeSeries, TimeSeriesView};
use rand::Rng;
use tracing::{debug, trace};

use crate::config::ForestConfig;
use crate::dataset::DatasetView;
use crate::error::ForestError;
use crate::node::Impurity;

/// A training row chosen to represent one branch.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Exemplar {
    /// Dataset row the exemplar was drawn from.
    pub row: usize,
    /// Its class label.
    pub label: usize,
    /// A copy of its series, kept for prediction.
    pub series: TimeSeries,
}

/// The decision stored at an internal node: a measure plus one exemplar per branch.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Splitter {
    measure: DistanceMeasure,
    exemplars: Vec<Exemplar>,
    weighted_gini: Impurity,
}

impl Splitter {
    /// Search `config.n_candidates` random splits of `view` and keep the best.
    ///
    /// Each candidate draws a measure family (or uses `tree_family` when the
    /// tree fixed one), samples its parameters against `view`, picks one
    /// random exemplar per class, and routes every row to its nearest
    /// exemplar. An exemplar's own row always routes to its own branch. The
    /// candidate with the lowest weighted Gini wins; on equal scores the
    /// first one found is kept.
    ///
    /// `view` must hold at least two classes.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::InvalidCandidateCount`] | `config.n_candidates` is zero |
    /// | [`ForestError::PartitionSizeMismatch`] | branches do not cover `view` exactly |
    /// | [`ForestError::Distance`] | a distance computation failed |
    pub fn find_best_split<'a, R: Rng + ?Sized>(
        view: &DatasetView<'a>,
        tree_family: Option<MeasureKind>,
        config: &ForestConfig,
        rng: &mut R,
    ) -> Result<(Self, Vec<DatasetView<'a>>), ForestError> {
        let stats = view.stats()?;
        let groups = view.group_by_class();
        let dataset = view.dataset();

        let mut best: Option<(DistanceMeasure, Vec<Exemplar>, Vec<Vec<usize>>, Impurity)> = None;

        for candidate in 0..config.n_candidates {
            let kind = match tree_family {
                Some(kind) => kind,
                None => config.measures[rng.gen_range(0..config.measures.len())],
            };
            let mut measure = DistanceMeasure::new(kind);
            measure.sample_parameters(&stats, rng);

            let exemplars: Vec<Exemplar> = groups
                .iter()
                .map(|(&label, rows)| {
                    let row = rows[rng.gen_range(0..rows.len())];
                    Exemplar {
                        row,
                        label,
                        series: dataset.series()[row].clone(),
                    }
                })
                .collect();

            let branches = partition(view, &measure, &exemplars, config.tie_break, rng)?;
            let weighted_gini = weighted_gini(view, &branches);
            trace!(candidate, measure = %measure, gini = %weighted_gini, "candidate split");

            let improves = best
                .as_ref()
                .is_none_or(|(_, _, _, score)| weighted_gini < *score);
            if improves {
                best = Some((measure, exemplars, branches, weighted_gini));
            }
        }

        let Some((measure, exemplars, branches, weighted_gini)) = best else {
            return Err(ForestError::InvalidCandidateCount {
                n_candidates: config.n_candidates,
            });
        };

        let covered: usize = branches.iter().map(Vec::len).sum();
        if covered != view.len() {
            return Err(ForestError::PartitionSizeMismatch {
                expected: view.len(),
                got: covered,
            });
        }

        debug!(
            measure = %measure,
            n_branches = exemplars.len(),
            parent_gini = %view.gini_impurity(),
            weighted_gini = %weighted_gini,
            "split chosen"
        );

        let views = branches
            .into_iter()
            .map(|rows| DatasetView::new(dataset, rows))
            .collect();

        Ok((
            Self {
                measure,
                exemplars,
                weighted_gini,
            },
            views,
        ))
    }

    /// Index of the branch `query` belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::Distance`] if `query` length differs from the exemplars'.
    pub fn route<R: Rng + ?Sized>(
        &self,
        query: TimeSeriesView<'_>,
        tie_break: TieBreak,
        rng: &mut R,
    ) -> Result<usize, ForestError> {
        let branch = self.measure.nearest_of(
            query,
            self.exemplars.iter().map(|e| e.series.as_view()),
            tie_break,
            rng,
        )?;
        Ok(branch)
    }

    /// The chosen measure with its sampled parameters.
    #[must_use]
    pub fn measure(&self) -> &DistanceMeasure {
        &self.measure
    }

    /// One exemplar per branch, in branch order.
    #[must_use]
    pub fn exemplars(&self) -> &[Exemplar] {
        &self.exemplars
    }

    /// Size-weighted Gini of the chosen partition.
    #[must_use]
    pub fn weighted_gini(&self) -> Impurity {
        self.weighted_gini
    }
}

/// Assign every row of `view` to the branch of its nearest exemplar.
fn partition<R: Rng + ?Sized>(
    view: &DatasetView<'_>,
    measure: &DistanceMeasure,
    exemplars: &[Exemplar],
    tie_break: TieBreak,
    rng: &mut R,
) -> Result<Vec<Vec<usize>>, ForestError> {
    let mut branches = vec![Vec::new(); exemplars.len()];

    for (k, &row) in view.rows().iter().enumerate() {
        let branch = match exemplars.iter().position(|e| e.row == row) {
            Some(own) => own,
            None => measure.nearest_of(
                view.series_of(k),
                exemplars.iter().map(|e| e.series.as_view()),
                tie_break,
                rng,
            )?,
        };
        branches[branch].push(row);
    }

    Ok(branches)
}

/// `Σ (|branch| / |parent|) * gini(branch)`.
fn weighted_gini(view: &DatasetView<'_>, branches: &[Vec<usize>]) -> Impurity {
    let parent = view.len() as f64;
    let dataset = view.dataset();
    let total = branches
        .iter()
        .filter(|rows| !rows.is_empty())
        .map(|rows| {
            let mut counts = vec![0usize; dataset.n_classes()];
            for &r in rows {
                counts[dataset.class_of(r)] += 1;
            }
            rows.len() as f64 / parent * Impurity::gini(&counts, rows.len()).value()
        })
        .sum();
    Impurity::new(total)
}
