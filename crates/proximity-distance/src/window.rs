//! Warping window constraints shared by the elastic kernels.

use std::fmt;
use std::ops::Range;

/// Constraint on how far an alignment may stray from the diagonal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum WarpingWindow {
    /// No constraint; every cell of the cost matrix is reachable.
    #[default]
    Full,

    /// Sakoe-Chiba band: cell (i,j) is valid only if |i - j| <= radius.
    Radius(usize),
}

impl WarpingWindow {
    /// Return the valid column range for a given row in the cost matrix.
    ///
    /// For [`Full`](Self::Full), returns `0..n_cols`. For a radius `r`, returns
    /// the intersection of `[row - r, row + r]` with `[0, n_cols)`.
    #[must_use]
    pub fn column_range(&self, row: usize, n_cols: usize) -> Range<usize> {
        match self {
            Self::Full => 0..n_cols,
            Self::Radius(r) => {
                let start = row.saturating_sub(*r);
                let end = (row + r + 1).min(n_cols);
                start..end
            }
        }
    }

    /// Return the maximum number of valid cells in any row of an `_ x m` matrix.
    #[must_use]
    pub fn band_width(&self, m: usize) -> usize {
        match self {
            Self::Full => m,
            Self::Radius(r) => (2 * r + 1).min(m),
        }
    }
}

impl fmt::Display for WarpingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Radius(r) => write!(f, "r={r}"),
        }
    }
}
