//! Error types for series validation and distance computation.

/// Errors from time series validation and distance computation.
#[derive(Debug, thiserror::Error)]
pub enum DistanceError {
    /// Returned when an empty slice is provided as a time series.
    #[error("time series must be non-empty")]
    EmptySeries,

    /// Returned when a time series contains NaN, infinity, or negative infinity.
    #[error("time series contains non-finite value at index {index}")]
    NonFiniteValue {
        /// Position of the first non-finite value found.
        index: usize,
    },

    /// Returned when two series of different lengths are compared.
    #[error("series lengths differ: {left} vs {right}")]
    LengthMismatch {
        /// Length of the first series.
        left: usize,
        /// Length of the second series.
        right: usize,
    },

    /// Returned when a nearest-exemplar query is given no exemplars.
    #[error("nearest-exemplar query needs at least one exemplar")]
    NoExemplars,

    /// Returned when a measure name does not match any known family.
    #[error("unknown distance measure '{name}'")]
    UnknownMeasure {
        /// The unrecognized name.
        name: String,
    },

    /// Returned when series statistics are requested for an empty collection.
    #[error("cannot compute statistics of zero series")]
    NoSeries,
}
