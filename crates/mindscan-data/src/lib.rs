//! Data handling for the mindscan pipelines: CSV loading, preprocessing,
//! train/test splitting, and report artifacts.

mod domain;
mod error;
mod preprocess;
mod reader;
mod split;
mod writer;

pub use domain::{Cell, Column, Dataset, ExperimentName, Table};
pub use error::DataError;
pub use preprocess::{PreprocessReport, Preprocessor};
pub use reader::{MISSING_TOKENS, TableReader, TextEncoding};
pub use split::{TrainTestSplit, train_test_split};
pub use writer::ReportWriter;
