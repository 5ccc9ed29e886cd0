//! Model persistence via bincode.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::ForestError;
use crate::forest::ProximityForest;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned wrapper written ahead of the forest itself.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    format_version: u32,
    n_trees: usize,
    n_classes: usize,
    series_length: usize,
    forest: ProximityForest,
}

impl ProximityForest {
    /// Save the model to a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::SerializeModel`] | bincode encoding failed |
    /// | [`ForestError::WriteModel`] | file write failed |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        let path = path.as_ref();

        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_trees: self.trees.len(),
            n_classes: self.n_classes,
            series_length: self.series_length,
            forest: self.clone(),
        };

        let bytes = bincode::serialize(&envelope)
            .map_err(|source| ForestError::SerializeModel { source })?;

        std::fs::write(path, &bytes).map_err(|source| ForestError::WriteModel {
            path: path.to_path_buf(),
            source,
        })?;

        info!(size_bytes = bytes.len(), n_trees = self.trees.len(), "model saved");
        Ok(())
    }

    /// Load a model saved by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::ReadModel`] | file read failed |
    /// | [`ForestError::DeserializeModel`] | bincode decoding failed |
    /// | [`ForestError::IncompatibleModelVersion`] | format version mismatch |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|source| ForestError::ReadModel {
            path: path.to_path_buf(),
            source,
        })?;

        let envelope: ModelEnvelope =
            bincode::deserialize(&bytes).map_err(|source| ForestError::DeserializeModel {
                path: path.to_path_buf(),
                source,
            })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(ForestError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        debug!(
            n_trees = envelope.n_trees,
            n_classes = envelope.n_classes,
            series_length = envelope.series_length,
            "model loaded"
        );
        Ok(envelope.forest)
    }
}

#[cfg(test)]
mod tests {
    use proximity_distance::TimeSeries;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::config::ForestConfig;
    use crate::dataset::Dataset;

    fn make_forest() -> (ProximityForest, Dataset) {
        let series = (0..12)
            .map(|i| {
                let class = i % 2;
                TimeSeries::new(
                    (0..8)
                        .map(|t| class as f64 * 3.0 + (t as f64 + i as f64 * 0.1).cos())
                        .collect(),
                )
                .unwrap()
            })
            .collect();
        let labels = (0..12).map(|i| i % 2).collect();
        let ds = Dataset::new(series, labels).unwrap();
        let forest = ForestConfig::new(3).unwrap().fit(&ds).unwrap().into_forest();
        (forest, ds)
    }

    #[test]
    fn saved_model_predicts_identically() {
        let (forest, ds) = make_forest();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        forest.save(&path).unwrap();
        let loaded = ProximityForest::load(&path).unwrap();

        assert_eq!(loaded.n_trees(), forest.n_trees());
        assert_eq!(loaded.n_classes(), forest.n_classes());
        let a = forest.predict_batch(ds.series(), &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        let b = loaded.predict_batch(ds.series(), &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProximityForest::load(dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, ForestError::ReadModel { .. }));
    }

    #[test]
    fn garbage_file_is_deserialize_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.bin");
        std::fs::write(&path, b"not a model").unwrap();
        let err = ProximityForest::load(&path).unwrap_err();
        assert!(matches!(
            err,
            ForestError::DeserializeModel { .. } | ForestError::IncompatibleModelVersion { .. }
        ));
    }

    #[test]
    fn wrong_version_rejected() {
        let (forest, _) = make_forest();
        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION + 1,
            n_trees: forest.n_trees(),
            n_classes: forest.n_classes(),
            series_length: forest.series_length(),
            forest,
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.bin");
        std::fs::write(&path, bincode::serialize(&envelope).unwrap()).unwrap();
        assert!(matches!(
            ProximityForest::load(&path),
            Err(ForestError::IncompatibleModelVersion { found: 2, .. })
        ));
    }
}
