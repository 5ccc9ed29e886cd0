use std::path::PathBuf;

use proximity_distance::DistanceError;

/// Errors from dataset construction, forest training, prediction and persistence.
#[derive(Debug, thiserror::Error)]
pub enum ForestError {
    /// Returned when n_trees is zero.
    #[error("n_trees must be at least 1, got {n_trees}")]
    InvalidTreeCount {
        /// The invalid n_trees value provided.
        n_trees: usize,
    },

    /// Returned when n_candidates is zero.
    #[error("n_candidates must be at least 1, got {n_candidates}")]
    InvalidCandidateCount {
        /// The invalid n_candidates value provided.
        n_candidates: usize,
    },

    /// Returned when the enabled measure set is empty.
    #[error("at least one distance measure must be enabled")]
    NoMeasures,

    /// Returned when a dataset has zero rows.
    #[error("dataset has zero rows")]
    EmptyDataset,

    /// Returned when the number of labels differs from the number of series.
    #[error("got {n_labels} labels for {n_series} series")]
    LabelCountMismatch {
        /// Number of series provided.
        n_series: usize,
        /// Number of labels provided.
        n_labels: usize,
    },

    /// Returned when a row's series length differs from the dataset's.
    #[error("row {row} has length {got}, expected {expected}")]
    SeriesLengthMismatch {
        /// The zero-based row index.
        row: usize,
        /// The dataset's series length.
        expected: usize,
        /// The offending row's length.
        got: usize,
    },

    /// Returned when a prediction query has a different length than the training series.
    #[error("query has length {got}, forest was trained on length {expected}")]
    QueryLengthMismatch {
        /// Training series length.
        expected: usize,
        /// Query length.
        got: usize,
    },

    /// An empty subset reached tree induction. Indicates a partitioning defect.
    #[error("empty partition reached tree induction at depth {depth}")]
    EmptyPartition {
        /// Depth of the node that received the empty subset.
        depth: usize,
    },

    /// A split's branches do not account for every parent row exactly once.
    #[error("split partitions hold {got} rows, parent holds {expected}")]
    PartitionSizeMismatch {
        /// Rows in the parent subset.
        expected: usize,
        /// Total rows across all branches.
        got: usize,
    },

    /// A class label does not fit the model's class count.
    #[error("class {label} is out of range for a model with {n_classes} classes")]
    ClassOutOfRange {
        /// The offending label.
        label: usize,
        /// Classes the model knows.
        n_classes: usize,
    },

    /// Returned when every tree failed under the skip-tree failure policy.
    #[error("all {n_trees} trees failed to train")]
    NoTreesTrained {
        /// Number of trees attempted.
        n_trees: usize,
    },

    /// A distance computation failed.
    #[error(transparent)]
    Distance(#[from] DistanceError),

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },
}
