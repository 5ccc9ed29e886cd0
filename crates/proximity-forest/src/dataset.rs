//! Labeled time series collections and the row subsets used during induction.

use std::collections::BTreeMap;

use proximity_distance::{DistanceError, SeriesStats, TimeSeries, TimeSeriesView};

use crate::error::ForestError;
use crate::node::Impurity;

/// An ordered collection of labeled rows of equal length.
///
/// Labels are dense class indices `0..C-1`; `n_classes` is one past the
/// largest label seen.
#[derive(Debug, Clone)]
pub struct Dataset {
    series: Vec<TimeSeries>,
    labels: Vec<usize>,
    series_length: usize,
    n_classes: usize,
}

impl Dataset {
    /// Build a dataset from parallel series and label vectors.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::EmptyDataset`] | `series` is empty |
    /// | [`ForestError::LabelCountMismatch`] | `labels.len() != series.len()` |
    /// | [`ForestError::SeriesLengthMismatch`] | rows have different lengths |
    pub fn new(series: Vec<TimeSeries>, labels: Vec<usize>) -> Result<Self, ForestError> {
        if series.len() != labels.len() {
            return Err(ForestError::LabelCountMismatch {
                n_series: series.len(),
                n_labels: labels.len(),
            });
        }
        let Some(first) = series.first() else {
            return Err(ForestError::EmptyDataset);
        };
        let series_length = first.len();
        for (row, s) in series.iter().enumerate() {
            if s.len() != series_length {
                return Err(ForestError::SeriesLengthMismatch {
                    row,
                    expected: series_length,
                    got: s.len(),
                });
            }
        }
        let n_classes = labels.iter().max().map_or(0, |&m| m + 1);
        Ok(Self {
            series,
            labels,
            series_length,
            n_classes,
        })
    }

    /// Append one row.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::SeriesLengthMismatch`] if `series` differs in length.
    pub fn push(&mut self, series: TimeSeries, label: usize) -> Result<(), ForestError> {
        if series.len() != self.series_length {
            return Err(ForestError::SeriesLengthMismatch {
                row: self.series.len(),
                expected: self.series_length,
                got: series.len(),
            });
        }
        self.series.push(series);
        self.labels.push(label);
        self.n_classes = self.n_classes.max(label + 1);
        Ok(())
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Always `false` for a constructed dataset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    #[must_use]
    pub fn series_length(&self) -> usize {
        self.series_length
    }

    /// Label of row `row`.
    #[must_use]
    pub fn class_of(&self, row: usize) -> usize {
        self.labels[row]
    }

    /// Series of row `row`.
    #[must_use]
    pub fn series_of(&self, row: usize) -> TimeSeriesView<'_> {
        self.series[row].as_view()
    }

    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    #[must_use]
    pub fn series(&self) -> &[TimeSeries] {
        &self.series
    }

    /// Rows per class, indexed by label.
    #[must_use]
    pub fn class_counts(&self) -> Vec<usize> {
        count_classes(self.labels.iter().copied(), self.n_classes)
    }

    /// Gini impurity over all rows.
    #[must_use]
    pub fn gini_impurity(&self) -> Impurity {
        Impurity::gini(&self.class_counts(), self.len())
    }

    /// Row indices grouped by class, in ascending label order.
    #[must_use]
    pub fn group_by_class(&self) -> BTreeMap<usize, Vec<usize>> {
        self.view().group_by_class()
    }

    /// A view over every row.
    #[must_use]
    pub fn view(&self) -> DatasetView<'_> {
        DatasetView {
            dataset: self,
            rows: (0..self.len()).collect(),
        }
    }
}

/// A subset of a [`Dataset`]'s rows, borrowed rather than copied.
///
/// Split branches are disjoint views of the same dataset.
#[derive(Debug, Clone)]
pub struct DatasetView<'a> {
    dataset: &'a Dataset,
    rows: Vec<usize>,
}

impl<'a> DatasetView<'a> {
    /// View the given row indices of `dataset`.
    #[must_use]
    pub fn new(dataset: &'a Dataset, rows: Vec<usize>) -> Self {
        Self { dataset, rows }
    }

    #[must_use]
    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    /// Dataset row indices covered by this view.
    #[must_use]
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.dataset.n_classes
    }

    #[must_use]
    pub fn series_length(&self) -> usize {
        self.dataset.series_length
    }

    /// Label of the `k`-th row of this view.
    #[must_use]
    pub fn class_of(&self, k: usize) -> usize {
        self.dataset.labels[self.rows[k]]
    }

    /// Series of the `k`-th row of this view.
    #[must_use]
    pub fn series_of(&self, k: usize) -> TimeSeriesView<'a> {
        self.dataset.series[self.rows[k]].as_view()
    }

    /// Rows per class, indexed by label.
    #[must_use]
    pub fn class_counts(&self) -> Vec<usize> {
        count_classes(
            self.rows.iter().map(|&r| self.dataset.labels[r]),
            self.dataset.n_classes,
        )
    }

    #[must_use]
    pub fn gini_impurity(&self) -> Impurity {
        Impurity::gini(&self.class_counts(), self.len())
    }

    /// Dataset row indices grouped by class, in ascending label order.
    #[must_use]
    pub fn group_by_class(&self) -> BTreeMap<usize, Vec<usize>> {
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for &row in &self.rows {
            groups.entry(self.dataset.labels[row]).or_default().push(row);
        }
        groups
    }

    /// Length and pooled spread of the viewed series.
    ///
    /// # Errors
    ///
    /// Returns [`DistanceError::NoSeries`] for an empty view.
    pub fn stats(&self) -> Result<SeriesStats, DistanceError> {
        SeriesStats::from_views(self.rows.iter().map(|&r| self.dataset.series[r].as_view()))
    }
}

fn count_classes(labels: impl Iterator<Item = usize>, n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for label in labels {
        counts[label] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(values: &[f64]) -> TimeSeries {
        TimeSeries::new(values.to_vec()).unwrap()
    }

    fn make_dataset() -> Dataset {
        Dataset::new(
            vec![ts(&[0.0, 0.0]), ts(&[0.1, 0.0]), ts(&[5.0, 5.0]), ts(&[5.1, 5.0])],
            vec![0, 0, 1, 1],
        )
        .unwrap()
    }

    #[test]
    fn derived_queries() {
        let ds = make_dataset();
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.n_classes(), 2);
        assert_eq!(ds.series_length(), 2);
        assert_eq!(ds.class_of(2), 1);
        assert_eq!(ds.series_of(3).as_slice(), &[5.1, 5.0]);
        assert_eq!(ds.class_counts(), vec![2, 2]);
        assert!((ds.gini_impurity().value() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn group_by_class_covers_every_row_once() {
        let ds = make_dataset();
        let groups = ds.group_by_class();
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
        let mut all: Vec<usize> = groups.values().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, vec![0, 1, 2, 3]);
    }

    #[test]
    fn view_queries_use_subset() {
        let ds = make_dataset();
        let view = DatasetView::new(&ds, vec![2, 3]);
        assert_eq!(view.len(), 2);
        assert_eq!(view.class_of(0), 1);
        assert_eq!(view.class_counts(), vec![0, 2]);
        assert!(view.gini_impurity().is_pure());
        assert_eq!(view.group_by_class().len(), 1);
    }

    #[test]
    fn view_stats_pool_values() {
        let ds = Dataset::new(vec![ts(&[1.0, 3.0]), ts(&[1.0, 3.0])], vec![0, 1]).unwrap();
        let stats = ds.view().stats().unwrap();
        assert_eq!(stats.length, 2);
        assert!((stats.std_dev - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            Dataset::new(vec![], vec![]),
            Err(ForestError::EmptyDataset)
        ));
    }

    #[test]
    fn rejects_label_count_mismatch() {
        let result = Dataset::new(vec![ts(&[1.0])], vec![0, 1]);
        assert!(matches!(
            result,
            Err(ForestError::LabelCountMismatch { n_series: 1, n_labels: 2 })
        ));
    }

    #[test]
    fn rejects_ragged_rows() {
        let result = Dataset::new(vec![ts(&[1.0, 2.0]), ts(&[1.0])], vec![0, 1]);
        assert!(matches!(
            result,
            Err(ForestError::SeriesLengthMismatch { row: 1, expected: 2, got: 1 })
        ));
    }

    #[test]
    fn push_grows_classes() {
        let mut ds = make_dataset();
        ds.push(ts(&[9.0, 9.0]), 4).unwrap();
        assert_eq!(ds.len(), 5);
        assert_eq!(ds.n_classes(), 5);
        assert!(ds.push(ts(&[1.0]), 0).is_err());
    }
}
