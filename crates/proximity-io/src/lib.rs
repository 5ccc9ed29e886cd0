//! CSV loading, label encoding, and JSON result export for proximity.

mod domain;
mod error;
mod reader;
mod relabel;
mod writer;

pub use domain::{ExperimentName, LabeledSeries};
pub use error::IoError;
pub use reader::LabeledSeriesReader;
pub use relabel::ClassEncoder;
pub use writer::ResultWriter;
