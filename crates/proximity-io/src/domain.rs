//! Domain types for proximity-io.

use proximity_distance::TimeSeries;

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Series read from a labeled CSV file, with labels still in their raw form.
///
/// Produced by [`LabeledSeriesReader`](crate::LabeledSeriesReader). Labels
/// and series are parallel vectors: `labels[i]` belongs to `series[i]`.
/// Use [`ClassEncoder`](crate::ClassEncoder) to turn this into a training
/// [`Dataset`](proximity_forest::Dataset).
#[derive(Debug)]
pub struct LabeledSeries {
    /// Raw class labels in file order.
    pub labels: Vec<String>,
    /// Validated series in the same order as `labels`.
    pub series: Vec<TimeSeries>,
}

impl LabeledSeries {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Length shared by every series, 0 when empty.
    #[must_use]
    pub fn series_length(&self) -> usize {
        self.series.first().map_or(0, TimeSeries::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experiment_name_valid() {
        let name = ExperimentName::new("gunpoint-pf_01".to_string());
        assert!(name.is_ok());
        assert_eq!(name.unwrap().as_str(), "gunpoint-pf_01");
    }

    #[test]
    fn experiment_name_rejects_empty() {
        let name = ExperimentName::new(String::new());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
    }

    #[test]
    fn experiment_name_rejects_special_chars() {
        for bad in ["my run", "a/b", "x.y", "ü"] {
            let name = ExperimentName::new(bad.to_string());
            assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })), "{bad}");
        }
    }

    #[test]
    fn labeled_series_shape() {
        let rows = LabeledSeries {
            labels: vec!["a".into(), "b".into()],
            series: vec![
                TimeSeries::new(vec![1.0, 2.0, 3.0]).unwrap(),
                TimeSeries::new(vec![4.0, 5.0, 6.0]).unwrap(),
            ],
        };
        assert_eq!(rows.len(), 2);
        assert!(!rows.is_empty());
        assert_eq!(rows.series_length(), 3);
    }
}
