//! Distance value newtype.

use std::cmp::Ordering;
use std::fmt;

/// A non-negative distance between two series.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Distance(f64);

impl Distance {
    /// Zero distance, the distance from any series to itself.
    pub const ZERO: Self = Self(0.0);

    /// Infinite distance, used as a sentinel when early abandoning.
    pub const INFINITY: Self = Self(f64::INFINITY);

    pub(crate) fn new(value: f64) -> Self {
        Self(value)
    }

    /// Return the raw distance value.
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Total ordering comparison using [`f64::total_cmp`].
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.0)
    }
}
