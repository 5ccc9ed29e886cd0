//! Proximity Forest training: sequential or parallel tree construction.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument, warn};

use proximity_distance::TieBreak;

use crate::config::{FailurePolicy, ForestConfig, OobMode, TrainingMode};
use crate::dataset::{Dataset, DatasetView};
use crate::error::ForestError;
use crate::node::NodeKind;
use crate::predict::Vote;
use crate::result::{ForestResult, OobEstimate, TrainingMetadata};
use crate::tree::ProximityTree;

/// A fitted Proximity Forest ensemble.
///
/// Every tree is trained on the full, unmodified training set; diversity
/// comes only from the random measures and exemplars chosen at each split.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ProximityForest {
    pub(crate) trees: Vec<ProximityTree>,
    pub(crate) n_classes: usize,
    pub(crate) series_length: usize,
    pub(crate) tie_break: TieBreak,
}

impl ProximityForest {
    /// Assemble a forest from already trained trees.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::NoTreesTrained`] | `trees` is empty |
    /// | [`ForestError::ClassOutOfRange`] | a leaf label is `>= n_classes` |
    pub fn from_trees(
        trees: Vec<ProximityTree>,
        n_classes: usize,
        series_length: usize,
        tie_break: TieBreak,
    ) -> Result<Self, ForestError> {
        if trees.is_empty() {
            return Err(ForestError::NoTreesTrained { n_trees: 0 });
        }
        for node in trees.iter().flat_map(ProximityTree::nodes) {
            if let NodeKind::Leaf { label } = &node.kind
                && *label >= n_classes
            {
                return Err(ForestError::ClassOutOfRange {
                    label: *label,
                    n_classes,
                });
            }
        }
        Ok(Self {
            trees,
            n_classes,
            series_length,
            tie_break,
        })
    }

    /// Return the trained trees.
    #[must_use]
    pub fn trees(&self) -> &[ProximityTree] {
        &self.trees
    }

    /// Return the number of trees in the ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Return the series length the forest was trained on.
    #[must_use]
    pub fn series_length(&self) -> usize {
        self.series_length
    }

    #[must_use]
    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }
}

/// `(row, predicted label)` for each row a tree never saw in its bootstrap.
type OobVotes = Vec<(usize, usize)>;

/// Outcome of one tree slot: trained, failed, or never started.
enum TreeOutcome {
    Trained {
        tree: ProximityTree,
        oob_votes: OobVotes,
    },
    Failed(ForestError),
    OutOfTime,
}

/// Trees kept after applying the failure policy.
struct CollectedTrees {
    trees: Vec<ProximityTree>,
    oob_votes: Vec<OobVotes>,
    n_skipped: usize,
    stopped_by_time_limit: bool,
}

/// Whether starting another tree could push training past `limit`.
///
/// The next tree is assumed to take as long as the slowest one so far.
fn would_overrun(elapsed: Duration, longest_tree: Duration, limit: Option<Duration>) -> bool {
    limit.is_some_and(|limit| elapsed.saturating_add(longest_tree) >= limit)
}

/// Train the Proximity Forest ensemble.
#[instrument(skip_all, fields(n_trees = config.n_trees, n_samples = dataset.len()))]
pub(crate) fn train(config: &ForestConfig, dataset: &Dataset) -> Result<ForestResult, ForestError> {
    config.validate()?;

    let start = Instant::now();
    let longest_tree_nanos = AtomicU64::new(0);

    info!(
        n_trees = config.n_trees,
        n_samples = dataset.len(),
        n_classes = dataset.n_classes(),
        series_length = dataset.series_length(),
        n_candidates = config.n_candidates,
        n_measures = config.measures.len(),
        mode = ?config.training_mode,
        oob = ?config.oob_mode,
        "training proximity forest"
    );

    // Slot 0 always trains.
    let run_slot = |slot: usize, rng: &mut ChaCha8Rng| -> TreeOutcome {
        let longest_tree = Duration::from_nanos(longest_tree_nanos.load(Ordering::Relaxed));
        if slot > 0 && would_overrun(start.elapsed(), longest_tree, config.train_time_limit) {
            return TreeOutcome::OutOfTime;
        }
        let tree_start = Instant::now();
        let outcome = match fit_slot(dataset, config, rng) {
            Ok((tree, oob_votes)) => TreeOutcome::Trained { tree, oob_votes },
            Err(e) => TreeOutcome::Failed(e),
        };
        let nanos = u64::try_from(tree_start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        longest_tree_nanos.fetch_max(nanos, Ordering::Relaxed);
        outcome
    };

    let mut master_rng = ChaCha8Rng::seed_from_u64(config.seed);

    let outcomes: Vec<TreeOutcome> = match config.training_mode {
        TrainingMode::Sequential => {
            let mut outcomes = Vec::with_capacity(config.n_trees);
            for slot in 0..config.n_trees {
                let outcome = run_slot(slot, &mut master_rng);
                let stop = matches!(outcome, TreeOutcome::OutOfTime);
                outcomes.push(outcome);
                if stop {
                    break;
                }
            }
            outcomes
        }
        TrainingMode::Parallel => {
            // Generate per-tree seeds from the master stream.
            let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| master_rng.r#gen()).collect();
            tree_seeds
                .into_par_iter()
                .enumerate()
                .map(|(slot, seed)| run_slot(slot, &mut ChaCha8Rng::seed_from_u64(seed)))
                .collect()
        }
    };

    let collected = collect_outcomes(outcomes, config.failure_policy, config.n_trees)?;
    let trees = collected.trees;

    let oob = match config.oob_mode {
        OobMode::Disabled => None,
        OobMode::Enabled => {
            let estimate = estimate_out_of_bag(&collected.oob_votes, dataset, &mut master_rng);
            info!(
                accuracy = estimate.accuracy,
                n_evaluated = estimate.n_evaluated,
                "out-of-bag estimate"
            );
            Some(estimate)
        }
    };

    let tree_stats: Vec<_> = trees.iter().map(ProximityTree::stats).collect();
    for (i, stats) in tree_stats.iter().enumerate() {
        debug!(
            tree = i,
            n_nodes = stats.n_nodes,
            n_leaves = stats.n_leaves,
            height = stats.height,
            "tree stats"
        );
    }

    let metadata = TrainingMetadata {
        n_trees_requested: config.n_trees,
        n_trees_trained: trees.len(),
        n_trees_skipped: collected.n_skipped,
        stopped_by_time_limit: collected.stopped_by_time_limit,
        n_classes: dataset.n_classes(),
        n_samples: dataset.len(),
        series_length: dataset.series_length(),
        elapsed_secs: start.elapsed().as_secs_f64(),
        oob,
    };

    let forest = ProximityForest {
        trees,
        n_classes: dataset.n_classes(),
        series_length: dataset.series_length(),
        tie_break: config.tie_break,
    };

    info!(
        n_trees_trained = metadata.n_trees_trained,
        elapsed_secs = metadata.elapsed_secs,
        "proximity forest training complete"
    );

    Ok(ForestResult::new(forest, metadata, tree_stats))
}

/// Train one forest tree on the full dataset, first scoring a bootstrap tree
/// on its out-of-bag rows when that estimate is enabled.
fn fit_slot<R: Rng + ?Sized>(
    dataset: &Dataset,
    config: &ForestConfig,
    rng: &mut R,
) -> Result<(ProximityTree, OobVotes), ForestError> {
    let oob_votes = match config.oob_mode {
        OobMode::Disabled => Vec::new(),
        OobMode::Enabled => out_of_bag_votes(dataset, config, rng)?,
    };
    let tree = ProximityTree::fit(&dataset.view(), config, rng)?;
    Ok((tree, oob_votes))
}

/// Fit a tree on a bootstrap sample and predict every row it left out.
fn out_of_bag_votes<R: Rng + ?Sized>(
    dataset: &Dataset,
    config: &ForestConfig,
    rng: &mut R,
) -> Result<OobVotes, ForestError> {
    let n = dataset.len();
    let mut in_bag = vec![false; n];
    let bootstrap: Vec<usize> = (0..n)
        .map(|_| {
            let row = rng.gen_range(0..n);
            in_bag[row] = true;
            row
        })
        .collect();

    let tree = ProximityTree::fit(&DatasetView::new(dataset, bootstrap), config, rng)?;
    (0..n)
        .filter(|&row| !in_bag[row])
        .map(|row| {
            tree.predict(dataset.series_of(row), config.tie_break, rng)
                .map(|label| (row, label))
        })
        .collect()
}

/// Majority vote per training row over the trees that left it out of bag.
///
/// Rows that were in every bootstrap are not scored; accuracy is 0 when no
/// row was scored.
fn estimate_out_of_bag<R: Rng + ?Sized>(
    tree_votes: &[OobVotes],
    dataset: &Dataset,
    rng: &mut R,
) -> OobEstimate {
    let mut votes = vec![vec![0usize; dataset.n_classes()]; dataset.len()];
    for &(row, label) in tree_votes.iter().flatten() {
        votes[row][label] += 1;
    }

    let mut n_evaluated = 0usize;
    let mut n_correct = 0usize;
    let mut n_ties = 0usize;
    for (row, row_votes) in votes.into_iter().enumerate() {
        if row_votes.iter().all(|&v| v == 0) {
            continue;
        }
        let vote = Vote::tally(row_votes, rng);
        n_evaluated += 1;
        n_ties += usize::from(vote.tied);
        n_correct += usize::from(vote.label == dataset.class_of(row));
    }

    let accuracy = if n_evaluated == 0 {
        0.0
    } else {
        n_correct as f64 / n_evaluated as f64
    };
    OobEstimate {
        accuracy,
        n_evaluated,
        n_ties,
    }
}

/// Apply the failure policy to every slot outcome, in slot order.
fn collect_outcomes(
    outcomes: Vec<TreeOutcome>,
    failure_policy: FailurePolicy,
    n_trees: usize,
) -> Result<CollectedTrees, ForestError> {
    let mut trees = Vec::with_capacity(outcomes.len());
    let mut oob_votes = Vec::with_capacity(outcomes.len());
    let mut n_skipped = 0usize;
    let mut stopped_by_time_limit = false;

    for (slot, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            TreeOutcome::Trained {
                tree,
                oob_votes: votes,
            } => {
                trees.push(tree);
                oob_votes.push(votes);
            }
            TreeOutcome::Failed(error) => match failure_policy {
                FailurePolicy::Abort => return Err(error),
                FailurePolicy::SkipTree => {
                    warn!(tree = slot, %error, "tree failed to train, skipping");
                    n_skipped += 1;
                }
            },
            TreeOutcome::OutOfTime => stopped_by_time_limit = true,
        }
    }

    if stopped_by_time_limit {
        warn!(
            n_trees_trained = trees.len(),
            n_trees_requested = n_trees,
            "train time limit reached"
        );
    }

    if trees.is_empty() {
        return Err(ForestError::NoTreesTrained { n_trees });
    }

    Ok(CollectedTrees {
        trees,
        oob_votes,
        n_skipped,
        stopped_by_time_limit,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use proximity_distance::{MeasureKind, TimeSeries};

    use proximity_distance::TieBreak;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{ProximityForest, TreeOutcome, collect_outcomes, would_overrun};
    use crate::config::{FailurePolicy, ForestConfig, OobMode, TrainingMode};
    use crate::dataset::Dataset;
    use crate::error::ForestError;
    use crate::tree::ProximityTree;

    /// Three classes with distinct shapes: flat, rising, oscillating.
    fn make_shapes(per_class: usize) -> Dataset {
        let mut series = Vec::new();
        let mut labels = Vec::new();
        for i in 0..per_class {
            let jitter = i as f64 * 0.03;
            series.push(TimeSeries::new((0..12).map(|t| jitter + 0.01 * t as f64).collect()).unwrap());
            labels.push(0);
            series.push(TimeSeries::new((0..12).map(|t| t as f64 * 0.5 + jitter).collect()).unwrap());
            labels.push(1);
            series.push(
                TimeSeries::new((0..12).map(|t| (t as f64 * 1.3).sin() * 2.0 + jitter).collect())
                    .unwrap(),
            );
            labels.push(2);
        }
        Dataset::new(series, labels).unwrap()
    }

    #[test]
    fn trains_requested_tree_count() {
        let ds = make_shapes(5);
        let result = ForestConfig::new(4).unwrap().fit(&ds).unwrap();
        assert_eq!(result.forest().n_trees(), 4);
        assert_eq!(result.forest().n_classes(), 3);
        assert_eq!(result.forest().series_length(), 12);
        let meta = result.metadata();
        assert_eq!(meta.n_trees_requested, 4);
        assert_eq!(meta.n_trees_trained, 4);
        assert_eq!(meta.n_trees_skipped, 0);
        assert!(!meta.stopped_by_time_limit);
        assert_eq!(result.tree_stats().len(), 4);
    }

    #[test]
    fn sequential_training_is_deterministic() {
        let ds = make_shapes(5);
        let config = ForestConfig::new(3).unwrap().with_seed(9);
        let a = config.fit(&ds).unwrap();
        let b = config.fit(&ds).unwrap();
        assert_eq!(a.tree_stats(), b.tree_stats());
    }

    #[test]
    fn parallel_training_is_deterministic() {
        let ds = make_shapes(5);
        let config = ForestConfig::new(6)
            .unwrap()
            .with_training_mode(TrainingMode::Parallel)
            .with_seed(13);
        let a = config.fit(&ds).unwrap();
        let b = config.fit(&ds).unwrap();
        assert_eq!(a.tree_stats(), b.tree_stats());
    }

    #[test]
    fn zero_time_limit_still_trains_one_tree() {
        let ds = make_shapes(4);
        let result = ForestConfig::new(10)
            .unwrap()
            .with_train_time_limit(Some(Duration::ZERO))
            .fit(&ds)
            .unwrap();
        assert_eq!(result.forest().n_trees(), 1);
        assert!(result.metadata().stopped_by_time_limit);
    }

    #[test]
    fn invalid_config_rejected_at_fit() {
        let ds = make_shapes(2);
        let err = ForestConfig::new(2)
            .unwrap()
            .with_measures(Vec::<MeasureKind>::new())
            .fit(&ds)
            .unwrap_err();
        assert!(matches!(err, ForestError::NoMeasures));
    }

    #[test]
    fn skip_policy_keeps_healthy_forest() {
        let ds = make_shapes(3);
        let result = ForestConfig::new(3)
            .unwrap()
            .with_failure_policy(FailurePolicy::SkipTree)
            .fit(&ds)
            .unwrap();
        assert_eq!(result.metadata().n_trees_skipped, 0);
        assert_eq!(result.forest().n_trees(), 3);
    }

    fn trained(ds: &Dataset) -> TreeOutcome {
        let config = ForestConfig::new(1).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        TreeOutcome::Trained {
            tree: ProximityTree::fit(&ds.view(), &config, &mut rng).unwrap(),
            oob_votes: Vec::new(),
        }
    }

    fn failed() -> TreeOutcome {
        TreeOutcome::Failed(ForestError::EmptyPartition { depth: 0 })
    }

    #[test]
    fn skip_policy_drops_failed_trees() {
        let ds = make_shapes(2);
        let outcomes = vec![trained(&ds), failed(), trained(&ds), failed()];
        let collected = collect_outcomes(outcomes, FailurePolicy::SkipTree, 4).unwrap();
        assert_eq!(collected.trees.len(), 2);
        assert_eq!(collected.n_skipped, 2);
        assert!(!collected.stopped_by_time_limit);
    }

    #[test]
    fn abort_policy_returns_tree_error() {
        let ds = make_shapes(2);
        let outcomes = vec![trained(&ds), failed(), trained(&ds)];
        let err = collect_outcomes(outcomes, FailurePolicy::Abort, 3)
            .err()
            .unwrap();
        assert!(matches!(err, ForestError::EmptyPartition { depth: 0 }));
    }

    #[test]
    fn all_trees_failing_is_an_error() {
        let outcomes = vec![failed(), failed(), failed()];
        let err = collect_outcomes(outcomes, FailurePolicy::SkipTree, 3)
            .err()
            .unwrap();
        assert!(matches!(err, ForestError::NoTreesTrained { n_trees: 3 }));
    }

    #[test]
    fn out_of_time_slot_marks_the_run() {
        let ds = make_shapes(2);
        let outcomes = vec![trained(&ds), TreeOutcome::OutOfTime];
        let collected = collect_outcomes(outcomes, FailurePolicy::Abort, 5).unwrap();
        assert_eq!(collected.trees.len(), 1);
        assert!(collected.stopped_by_time_limit);
    }

    #[test]
    fn overrun_counts_the_slowest_tree() {
        let secs = Duration::from_secs;
        // 5s elapsed, slowest tree 6s, limit 10s: the next tree would end at 11s.
        assert!(would_overrun(secs(5), secs(6), Some(secs(10))));
        assert!(!would_overrun(secs(3), secs(6), Some(secs(10))));
        assert!(would_overrun(secs(10), Duration::ZERO, Some(secs(10))));
        assert!(!would_overrun(secs(1_000), secs(1_000), None));
    }

    #[test]
    fn oob_estimate_reported_when_enabled() {
        let ds = make_shapes(8);
        let result = ForestConfig::new(10)
            .unwrap()
            .with_oob_mode(OobMode::Enabled)
            .with_seed(3)
            .fit(&ds)
            .unwrap();
        let oob = result.metadata().oob.unwrap();
        assert!(oob.n_evaluated > 0);
        assert!(oob.n_evaluated <= ds.len());
        assert!(oob.n_ties <= oob.n_evaluated);
        assert!(oob.accuracy > 0.7, "oob accuracy {}", oob.accuracy);
        assert_eq!(result.forest().n_trees(), 10);
    }

    #[test]
    fn oob_estimate_is_deterministic_in_parallel() {
        let ds = make_shapes(6);
        let config = ForestConfig::new(6)
            .unwrap()
            .with_oob_mode(OobMode::Enabled)
            .with_training_mode(TrainingMode::Parallel)
            .with_seed(21);
        let a = config.fit(&ds).unwrap();
        let b = config.fit(&ds).unwrap();
        assert_eq!(a.metadata().oob, b.metadata().oob);
        assert_eq!(a.tree_stats(), b.tree_stats());
    }

    #[test]
    fn oob_estimate_absent_by_default() {
        let ds = make_shapes(3);
        let result = ForestConfig::new(2).unwrap().fit(&ds).unwrap();
        assert!(result.metadata().oob.is_none());
    }

    #[test]
    fn from_trees_rejects_empty_and_unknown_labels() {
        assert!(matches!(
            ProximityForest::from_trees(Vec::new(), 3, 12, TieBreak::Random),
            Err(ForestError::NoTreesTrained { n_trees: 0 })
        ));
        let ds = make_shapes(2);
        let tree = ProximityTree::fit(
            &ds.view(),
            &ForestConfig::new(1).unwrap(),
            &mut ChaCha8Rng::seed_from_u64(4),
        )
        .unwrap();
        assert!(matches!(
            ProximityForest::from_trees(vec![tree.clone()], 2, 12, TieBreak::Random),
            Err(ForestError::ClassOutOfRange { label: 2, n_classes: 2 })
        ));
        let forest = ProximityForest::from_trees(vec![tree], 3, 12, TieBreak::Random).unwrap();
        assert_eq!(forest.n_trees(), 1);
    }
}
