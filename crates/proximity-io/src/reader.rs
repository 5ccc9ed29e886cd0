//! CSV reader for labeled time series with full input validation.

use std::path::{Path, PathBuf};

use proximity_distance::TimeSeries;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::LabeledSeries;

/// Reads labeled time series from a CSV file.
///
/// Expected CSV format:
/// - First column is the class label, remaining columns are positional values
/// - `label,v0,v1,...,vn`
/// - An optional header row (see [`with_header`](Self::with_header))
/// - Every row must have the same number of columns as the first data row
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::EmptyDataset`] | Zero data rows |
/// | [`IoError::MissingLabel`] | Label cell is empty |
/// | [`IoError::NoValues`] | Row has a label but no values |
/// | [`IoError::InconsistentRowLength`] | Row has a different column count than the first row |
/// | [`IoError::NonFiniteValue`] | Cell is NaN, Inf, or unparseable float |
pub struct LabeledSeriesReader {
    path: PathBuf,
    has_header: bool,
}

impl LabeledSeriesReader {
    /// Create a new reader for the given CSV file path. No header row by default.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            has_header: false,
        }
    }

    /// Treat the first row as a header and skip it.
    #[must_use]
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Read and validate the CSV file.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<LabeledSeries, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so ragged rows reach the InconsistentRowLength check
        // instead of surfacing as a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(self.has_header)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        if self.has_header {
            let header = rdr.headers().map_err(|e| self.csv_error(e))?;
            debug!(columns = header.len(), "skipped CSV header");
        }

        let mut labels = Vec::new();
        let mut series = Vec::new();
        let mut expected_cols = None;

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;

            let label = record.get(0).unwrap_or("").to_string();
            if label.is_empty() {
                return Err(IoError::MissingLabel {
                    path: self.path.clone(),
                    row_index,
                });
            }
            if record.len() < 2 {
                return Err(IoError::NoValues {
                    path: self.path.clone(),
                    row_index,
                });
            }

            let expected = *expected_cols.get_or_insert(record.len());
            if record.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    label,
                    expected,
                    got: record.len(),
                });
            }

            let values = record
                .iter()
                .skip(1)
                .enumerate()
                .map(|(col_index, raw)| self.parse_value(raw, row_index, col_index))
                .collect::<Result<Vec<f64>, IoError>>()?;

            // Values are already non-empty and finite.
            let ts = TimeSeries::new(values).map_err(|_| IoError::NoValues {
                path: self.path.clone(),
                row_index,
            })?;

            labels.push(label);
            series.push(ts);
        }

        if series.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(
            n_series = series.len(),
            series_length = series[0].len(),
            "dataset loaded"
        );

        Ok(LabeledSeries { labels, series })
    }

    fn parse_value(&self, raw: &str, row_index: usize, col_index: usize) -> Result<f64, IoError> {
        match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(IoError::NonFiniteValue {
                path: self.path.clone(),
                row_index,
                col_index,
                raw: raw.to_string(),
            }),
        }
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_headerless_rows() {
        let f = write_csv("1,0.0,0.1,0.0\n2,5.0,5.1,5.0\n1,0.1,0.0,0.1\n");
        let rows = LabeledSeriesReader::new(f.path()).read().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.labels, vec!["1", "2", "1"]);
        assert_eq!(rows.series[1].as_ref(), &[5.0, 5.1, 5.0]);
    }

    #[test]
    fn read_with_header() {
        let f = write_csv("class,t0,t1\nup,1.0,2.0\ndown,2.0,1.0\n");
        let rows = LabeledSeriesReader::new(f.path())
            .with_header(true)
            .read()
            .unwrap();
        assert_eq!(rows.labels, vec!["up", "down"]);
        assert_eq!(rows.series_length(), 2);
    }

    #[test]
    fn header_without_flag_is_a_value_error() {
        let f = write_csv("class,t0,t1\nup,1.0,2.0\n");
        let result = LabeledSeriesReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::NonFiniteValue { row_index: 0, col_index: 0, .. })
        ));
    }

    #[test]
    fn whitespace_is_trimmed() {
        let f = write_csv(" a , 1.5 ,2.5\n");
        let rows = LabeledSeriesReader::new(f.path()).read().unwrap();
        assert_eq!(rows.labels[0], "a");
        assert_eq!(rows.series[0].as_ref(), &[1.5, 2.5]);
    }

    #[test]
    fn error_file_not_found() {
        let result = LabeledSeriesReader::new(Path::new("/nonexistent/train.csv")).read();
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }

    #[test]
    fn error_empty_dataset() {
        let f = write_csv("label,t0,t1\n");
        let result = LabeledSeriesReader::new(f.path()).with_header(true).read();
        assert!(matches!(result, Err(IoError::EmptyDataset { .. })));
    }

    #[test]
    fn error_inconsistent_row_length() {
        let f = write_csv("0,1.0,2.0,3.0\n1,1.0,2.0\n");
        let result = LabeledSeriesReader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::InconsistentRowLength { row_index: 1, expected: 4, got: 3, .. })
        ));
    }

    #[test]
    fn error_missing_label_and_values() {
        let f = write_csv(",1.0,2.0\n");
        assert!(matches!(
            LabeledSeriesReader::new(f.path()).read(),
            Err(IoError::MissingLabel { row_index: 0, .. })
        ));

        let f = write_csv("0\n");
        assert!(matches!(
            LabeledSeriesReader::new(f.path()).read(),
            Err(IoError::NoValues { row_index: 0, .. })
        ));
    }

    #[test]
    fn error_non_finite_values() {
        for bad in ["NaN", "inf", "abc", ""] {
            let f = write_csv(&format!("0,1.0,{bad}\n"));
            let result = LabeledSeriesReader::new(f.path()).read();
            assert!(
                matches!(result, Err(IoError::NonFiniteValue { col_index: 1, .. })),
                "{bad:?} accepted"
            );
        }
    }
}
