//! Summary statistics that drive data-dependent parameter sampling.

use crate::error::DistanceError;
use crate::series::TimeSeriesView;

/// Length and spread of a collection of series.
///
/// `std_dev` is the population standard deviation over every value of every
/// series, matching the range used to draw LCSS `epsilon` and ERP `g`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
    /// Length of the (first) series.
    pub length: usize,
    /// Population standard deviation of all pooled values.
    pub std_dev: f64,
}

impl SeriesStats {
    /// Compute statistics from a set of series views.
    ///
    /// # Errors
    ///
    /// Returns [`DistanceError::NoSeries`] if the iterator is empty.
    pub fn from_views<'a, I>(series: I) -> Result<Self, DistanceError>
    where
        I: IntoIterator<Item = TimeSeriesView<'a>>,
    {
        let mut length = None;
        let mut count = 0usize;
        let mut mean = 0.0;
        let mut m2 = 0.0;

        // Welford's running mean and sum of squared deviations.
        for view in series {
            length.get_or_insert(view.len());
            for &x in view.as_slice() {
                count += 1;
                let delta = x - mean;
                mean += delta / count as f64;
                m2 += delta * (x - mean);
            }
        }

        let length = length.ok_or(DistanceError::NoSeries)?;
        let variance = if count == 0 { 0.0 } else { m2 / count as f64 };

        Ok(Self {
            length,
            std_dev: variance.sqrt(),
        })
    }

    /// Largest warping radius drawn for windowed measures: `(L + 1) / 4`.
    #[must_use]
    pub fn max_window(&self) -> usize {
        (self.length + 1) / 4
    }
}
