//! Training result types for Proximity Forest.

use crate::forest::ProximityForest;
use crate::tree::TreeStats;

/// Metadata about the training run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrainingMetadata {
    /// Trees the configuration asked for.
    pub n_trees_requested: usize,
    /// Trees actually in the forest.
    pub n_trees_trained: usize,
    /// Trees dropped after a training error.
    pub n_trees_skipped: usize,
    /// Whether the time limit cut training short.
    pub stopped_by_time_limit: bool,
    /// Number of distinct classes.
    pub n_classes: usize,
    /// Number of training samples.
    pub n_samples: usize,
    /// Length of every training series.
    pub series_length: usize,
    /// Wall-clock training time.
    pub elapsed_secs: f64,
    /// Out-of-bag estimate, present when training ran with `OobMode::Enabled`.
    pub oob: Option<OobEstimate>,
}

/// Training-set accuracy estimated from out-of-bag votes.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct OobEstimate {
    /// Fraction of scored rows whose out-of-bag majority matched their label.
    pub accuracy: f64,
    /// Rows left out of at least one bootstrap.
    pub n_evaluated: usize,
    /// Scored rows whose majority was decided by a random pick.
    pub n_ties: usize,
}

/// Result of Proximity Forest training.
///
/// Contains the fitted forest, training metadata and per-tree structure statistics.
#[derive(Debug)]
pub struct ForestResult {
    forest: ProximityForest,
    metadata: TrainingMetadata,
    tree_stats: Vec<TreeStats>,
}

impl ForestResult {
    pub(crate) fn new(
        forest: ProximityForest,
        metadata: TrainingMetadata,
        tree_stats: Vec<TreeStats>,
    ) -> Self {
        Self {
            forest,
            metadata,
            tree_stats,
        }
    }

    /// Borrow the fitted forest.
    #[must_use]
    pub fn forest(&self) -> &ProximityForest {
        &self.forest
    }

    /// Consume the result and return the fitted forest.
    #[must_use]
    pub fn into_forest(self) -> ProximityForest {
        self.forest
    }

    /// Return training metadata.
    #[must_use]
    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }

    /// Return node, leaf and height statistics for each trained tree.
    #[must_use]
    pub fn tree_stats(&self) -> &[TreeStats] {
        &self.tree_stats
    }
}
