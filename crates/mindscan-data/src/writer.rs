//! JSON report and confusion-matrix HTML writer.

use std::fs;
use std::path::{Path, PathBuf};

use plotly::layout::{Axis, Layout};
use plotly::{HeatMap, Plot};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::DataError;
use crate::domain::ExperimentName;

/// Writes per-pipeline artifacts into one directory.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_{pipeline}_report.json` and
/// `{experiment}_{pipeline}_confusion.html`.
pub struct ReportWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ReportWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, DataError> {
        fs::create_dir_all(output_dir).map_err(|e| DataError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    fn artifact_path(&self, pipeline: &str, suffix: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{pipeline}_{suffix}", self.experiment.as_str()))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), DataError> {
        fs::write(path, contents).map_err(|e| DataError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Serialize `report` to `{experiment}_{pipeline}_report.json`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Serialize`] or [`DataError::WriteFile`].
    #[instrument(skip_all, fields(pipeline = %pipeline))]
    pub fn write_report<T: Serialize>(&self, pipeline: &str, report: &T) -> Result<PathBuf, DataError> {
        let path = self.artifact_path(pipeline, "report.json");
        let json = serde_json::to_string_pretty(report).map_err(|e| DataError::Serialize {
            what: format!("{pipeline} report"),
            source: e,
        })?;
        self.write(&path, &json)?;
        info!(path = %path.display(), "report written");
        Ok(path)
    }

    /// Render a confusion matrix heatmap to `{experiment}_{pipeline}_confusion.html`.
    ///
    /// `rows[true_class][predicted_class]`; `class_names` labels both axes.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::WriteFile`] if the file cannot be written.
    #[instrument(skip_all, fields(pipeline = %pipeline))]
    pub fn write_confusion_html(
        &self,
        pipeline: &str,
        class_names: &[&str],
        rows: &[Vec<usize>],
    ) -> Result<PathBuf, DataError> {
        let path = self.artifact_path(pipeline, "confusion.html");
        let labels: Vec<String> = class_names.iter().map(|s| (*s).to_string()).collect();

        let trace = HeatMap::new(labels.clone(), labels, rows.to_vec());
        let layout = Layout::new()
            .title(format!("Confusion matrix ({pipeline})").as_str())
            .x_axis(Axis::new().title("Predicted label"))
            .y_axis(Axis::new().title("True label"));
        let mut plot = Plot::new();
        plot.add_trace(trace);
        plot.set_layout(layout);

        self.write(&path, &plot.to_html())?;
        info!(path = %path.display(), "confusion heatmap written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Serialize)]
    struct Dummy {
        accuracy: f64,
    }

    fn writer(dir: &Path) -> ReportWriter {
        ReportWriter::new(dir, ExperimentName::new("unit".into()).unwrap()).unwrap()
    }

    #[test]
    fn creates_nested_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        writer(&nested);
        assert!(nested.is_dir());
    }

    #[test]
    fn report_file_name_and_contents() {
        let dir = TempDir::new().unwrap();
        let path = writer(dir.path())
            .write_report("tree", &Dummy { accuracy: 0.75 })
            .unwrap();
        assert_eq!(path, dir.path().join("unit_tree_report.json"));
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["accuracy"], 0.75);
    }

    #[test]
    fn confusion_html_is_written() {
        let dir = TempDir::new().unwrap();
        let path = writer(dir.path())
            .write_confusion_html("forest", &["Not Depressed", "Depressed"], &[vec![5, 1], vec![2, 7]])
            .unwrap();
        assert_eq!(path, dir.path().join("unit_forest_confusion.html"));
        let html = fs::read_to_string(&path).unwrap();
        assert!(html.contains("Not Depressed"));
    }
}
