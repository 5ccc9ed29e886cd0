//! JSON result writer for evaluation and prediction outputs.

use std::fs;
use std::path::{Path, PathBuf};

use proximity_forest::{ClassMetrics, Evaluation, ForestResult, TrainingMetadata, TreeStats};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;
use crate::relabel::ClassEncoder;

/// Writes evaluation results, predictions and class labels to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_results.json`,
/// `{experiment}_predictions.json` and `{experiment}_classes.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write test-set scores and training statistics to `{experiment}_results.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all)]
    pub fn write_results(
        &self,
        training: &ForestResult,
        evaluation: &Evaluation,
        classes: &ClassEncoder,
    ) -> Result<PathBuf, IoError> {
        let path = self.file_path("results.json");

        let artifact = ResultsArtifact {
            experiment: self.experiment.as_str(),
            accuracy: evaluation.accuracy,
            n_test: evaluation.predictions.len(),
            n_ties: evaluation.n_ties,
            class_labels: classes.classes(),
            confusion_matrix: evaluation.confusion.rows(),
            class_metrics: evaluation.confusion.class_metrics(),
            training: training.metadata(),
            tree_stats: training.tree_stats(),
        };

        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "results written");
        Ok(path)
    }

    /// Write per-row predictions to `{experiment}_predictions.json`.
    ///
    /// `true_labels`, when given, must be parallel to `predicted`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(n = predicted.len()))]
    pub fn write_predictions(
        &self,
        predicted: &[usize],
        classes: Option<&ClassEncoder>,
        true_labels: Option<&[String]>,
        n_ties: usize,
    ) -> Result<PathBuf, IoError> {
        let path = self.file_path("predictions.json");

        let predictions: Vec<PredictionEntry> = predicted
            .iter()
            .enumerate()
            .map(|(row, &class)| PredictionEntry {
                row,
                predicted_class: class,
                predicted_label: classes.and_then(|c| c.decode(class)),
                true_label: true_labels.and_then(|t| t.get(row)).map(String::as_str),
            })
            .collect();

        let artifact = PredictionsArtifact {
            experiment: self.experiment.as_str(),
            n_series: predicted.len(),
            n_ties,
            predictions,
        };

        self.write_json(&path, &artifact)?;
        info!(path = %path.display(), "predictions written");
        Ok(path)
    }

    /// Write the label mapping to `{experiment}_classes.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be written.
    pub fn write_classes(&self, classes: &ClassEncoder) -> Result<PathBuf, IoError> {
        let path = self.file_path("classes.json");
        self.write_json(&path, classes)?;
        debug!(path = %path.display(), n_classes = classes.n_classes(), "class labels written");
        Ok(path)
    }

    /// Return the path where the model binary should be saved.
    ///
    /// Does not write anything, just computes `{output_dir}/{experiment}_model.bin`.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.file_path("model.bin")
    }

    fn file_path(&self, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{suffix}", self.experiment.as_str()))
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<(), IoError> {
        let json = serde_json::to_string_pretty(value).map_err(|e| IoError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;
        fs::write(path, json).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct ResultsArtifact<'a> {
    experiment: &'a str,
    accuracy: f64,
    n_test: usize,
    n_ties: usize,
    class_labels: &'a [String],
    confusion_matrix: Vec<Vec<usize>>,
    class_metrics: Vec<ClassMetrics>,
    training: &'a TrainingMetadata,
    tree_stats: &'a [TreeStats],
}

#[derive(Serialize)]
struct PredictionsArtifact<'a> {
    experiment: &'a str,
    n_series: usize,
    n_ties: usize,
    predictions: Vec<PredictionEntry<'a>>,
}

#[derive(Serialize)]
struct PredictionEntry<'a> {
    row: usize,
    predicted_class: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    predicted_label: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    true_label: Option<&'a str>,
}
