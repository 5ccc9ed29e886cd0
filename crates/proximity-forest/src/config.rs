//! Run configuration for Proximity Forest training.

use std::time::Duration;

use proximity_distance::{MeasureKind, TieBreak};

use crate::dataset::Dataset;
use crate::error::ForestError;
use crate::result::ForestResult;

/// When the distance measure family is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MeasureSelection {
    /// Draw a family for every candidate at every node.
    #[default]
    PerNode,
    /// Draw one family per tree; parameters are still re-sampled per candidate.
    PerTree,
}

/// How trees are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrainingMode {
    /// One shared random stream, trees trained one after another.
    #[default]
    Sequential,
    /// Trees trained on the rayon pool, each with its own seeded stream.
    Parallel,
}

/// What happens when a single tree fails to train.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the whole forest with the tree's error.
    #[default]
    Abort,
    /// Log the error, drop the tree, keep training.
    SkipTree,
}

/// Whether training also produces an out-of-bag accuracy estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OobMode {
    /// No estimate.
    #[default]
    Disabled,
    /// Before each forest tree, fit a throwaway tree on a bootstrap sample
    /// and vote on the rows it left out.
    Enabled,
}

/// Configuration for Proximity Forest training.
///
/// Construct via [`ForestConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter           | Default              |
/// |---------------------|----------------------|
/// | `n_candidates`      | 5                    |
/// | `measures`          | `MeasureKind::ALL`   |
/// | `measure_selection` | `PerNode`            |
/// | `tie_break`         | `Random`             |
/// | `training_mode`     | `Sequential`         |
/// | `failure_policy`    | `Abort`              |
/// | `train_time_limit`  | `None`               |
/// | `oob_mode`          | `Disabled`           |
/// | `seed`              | 42                   |
#[derive(Debug, Clone)]
pub struct ForestConfig {
    pub(crate) n_trees: usize,
    pub(crate) n_candidates: usize,
    pub(crate) measures: Vec<MeasureKind>,
    pub(crate) measure_selection: MeasureSelection,
    pub(crate) tie_break: TieBreak,
    pub(crate) training_mode: TrainingMode,
    pub(crate) failure_policy: FailurePolicy,
    pub(crate) train_time_limit: Option<Duration>,
    pub(crate) oob_mode: OobMode,
    pub(crate) seed: u64,
}

impl ForestConfig {
    /// Create a new config with the given number of trees.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::InvalidTreeCount`] if `n_trees` is zero.
    pub fn new(n_trees: usize) -> Result<Self, ForestError> {
        if n_trees == 0 {
            return Err(ForestError::InvalidTreeCount { n_trees });
        }
        Ok(Self {
            n_trees,
            n_candidates: 5,
            measures: MeasureKind::ALL.to_vec(),
            measure_selection: MeasureSelection::PerNode,
            tie_break: TieBreak::Random,
            training_mode: TrainingMode::Sequential,
            failure_policy: FailurePolicy::Abort,
            train_time_limit: None,
            oob_mode: OobMode::Disabled,
            seed: 42,
        })
    }

    // --- Setters ---

    /// Set the number of candidate splits evaluated per node.
    #[must_use]
    pub fn with_n_candidates(mut self, n_candidates: usize) -> Self {
        self.n_candidates = n_candidates;
        self
    }

    /// Set the enabled distance measure families.
    #[must_use]
    pub fn with_measures(mut self, measures: Vec<MeasureKind>) -> Self {
        self.measures = measures;
        self
    }

    #[must_use]
    pub fn with_measure_selection(mut self, measure_selection: MeasureSelection) -> Self {
        self.measure_selection = measure_selection;
        self
    }

    /// Set how nearest-exemplar and majority-vote ties are resolved.
    #[must_use]
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    #[must_use]
    pub fn with_training_mode(mut self, training_mode: TrainingMode) -> Self {
        self.training_mode = training_mode;
        self
    }

    #[must_use]
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Stop adding trees once the next one would likely finish past this
    /// wall-clock limit, judged by the slowest tree built so far.
    ///
    /// The first tree is always trained.
    #[must_use]
    pub fn with_train_time_limit(mut self, limit: Option<Duration>) -> Self {
        self.train_time_limit = limit;
        self
    }

    /// Enable or disable the out-of-bag accuracy estimate.
    ///
    /// Enabling it roughly doubles training time.
    #[must_use]
    pub fn with_oob_mode(mut self, oob_mode: OobMode) -> Self {
        self.oob_mode = oob_mode;
        self
    }

    /// Set the random seed for reproducibility.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // --- Getters ---

    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    #[must_use]
    pub fn n_candidates(&self) -> usize {
        self.n_candidates
    }

    #[must_use]
    pub fn measures(&self) -> &[MeasureKind] {
        &self.measures
    }

    #[must_use]
    pub fn measure_selection(&self) -> MeasureSelection {
        self.measure_selection
    }

    #[must_use]
    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    #[must_use]
    pub fn training_mode(&self) -> TrainingMode {
        self.training_mode
    }

    #[must_use]
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    #[must_use]
    pub fn train_time_limit(&self) -> Option<Duration> {
        self.train_time_limit
    }

    #[must_use]
    pub fn oob_mode(&self) -> OobMode {
        self.oob_mode
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Check the settings that `with_*` setters leave unvalidated.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ForestError::InvalidCandidateCount`] | `n_candidates` is zero |
    /// | [`ForestError::NoMeasures`] | `measures` is empty |
    pub fn validate(&self) -> Result<(), ForestError> {
        if self.n_candidates == 0 {
            return Err(ForestError::InvalidCandidateCount {
                n_candidates: self.n_candidates,
            });
        }
        if self.measures.is_empty() {
            return Err(ForestError::NoMeasures);
        }
        Ok(())
    }

    /// Train a Proximity Forest on `dataset`.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ForestError::InvalidCandidateCount`] | `n_candidates` is zero |
    /// | [`ForestError::NoMeasures`] | `measures` is empty |
    /// | any tree error | a tree fails under [`FailurePolicy::Abort`] |
    /// | [`ForestError::NoTreesTrained`] | every tree fails under [`FailurePolicy::SkipTree`] |
    pub fn fit(&self, dataset: &Dataset) -> Result<ForestResult, ForestError> {
        crate::forest::train(self, dataset)
    }
}
