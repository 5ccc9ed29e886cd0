//! Dense relabeling of raw class labels.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::path::Path;

use proximity_forest::Dataset;
use tracing::{debug, instrument};

use crate::IoError;
use crate::domain::LabeledSeries;

/// Maps raw label strings to dense class indices `0..C-1`.
///
/// Indices follow the sorted order of the distinct labels seen at fit time,
/// so the same label set always yields the same mapping regardless of row
/// order. Numeric labels come first in numeric order (`"2"` before `"10"`),
/// followed by the rest in lexicographic order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ClassEncoder {
    classes: Vec<String>,
}

impl ClassEncoder {
    /// Collect the distinct labels in `labels`.
    #[must_use]
    pub fn fit<S: AsRef<str>>(labels: &[S]) -> Self {
        let distinct: BTreeSet<&str> = labels.iter().map(AsRef::as_ref).collect();
        let mut classes: Vec<String> = distinct.into_iter().map(str::to_string).collect();
        classes.sort_by(|a, b| match (a.parse::<f64>(), b.parse::<f64>()) {
            (Ok(x), Ok(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => a.cmp(b),
        });
        debug!(n_classes = classes.len(), "class encoder fitted");
        Self { classes }
    }

    /// Number of known classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Known labels, indexed by class.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Dense index of `label`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::UnknownLabel`] if `label` was not seen by [`fit`](Self::fit).
    pub fn encode(&self, label: &str) -> Result<usize, IoError> {
        self.classes
            .iter()
            .position(|c| c == label)
            .ok_or_else(|| IoError::UnknownLabel {
                label: label.to_string(),
                n_known: self.classes.len(),
            })
    }

    /// Encode every label, failing on the first unseen one.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::UnknownLabel`] for the first unseen label.
    pub fn encode_all<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>, IoError> {
        labels.iter().map(|l| self.encode(l.as_ref())).collect()
    }

    /// Raw label of class `index`, if it exists.
    #[must_use]
    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    /// Encode the labels of `rows` and build a training [`Dataset`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::UnknownLabel`] | a row's label was not seen at fit time |
    /// | [`IoError::Dataset`] | rows differ in length or are empty |
    #[instrument(skip_all, fields(n_rows = rows.len()))]
    pub fn to_dataset(&self, rows: &LabeledSeries) -> Result<Dataset, IoError> {
        let labels = self.encode_all(&rows.labels)?;
        Ok(Dataset::new(rows.series.clone(), labels)?)
    }

    /// Load an encoder written by [`ResultWriter::write_classes`](crate::ResultWriter::write_classes).
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::FileNotFound`] | file read failed |
    /// | [`IoError::Json`] | file is not a JSON array of labels |
    pub fn load(path: &Path) -> Result<Self, IoError> {
        let text = std::fs::read_to_string(path).map_err(|e| IoError::FileNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&text).map_err(|e| IoError::Json {
            path: path.to_path_buf(),
            source: e,
        })
    }
}
