//! Scoring helpers and confusion-matrix rendering for the pipelines.

use anyhow::{Context, Result};
use mindscan_data::ReportWriter;
use mindscan_forest::ConfusionMatrix;
use mindscan_forest::metrics::{f1_score, precision_score};
use tracing::info;

/// F1 for the positive (depressed) class.
pub fn f1(y_true: &[usize], y_pred: &[usize]) -> Result<f64> {
    f1_score(y_true, y_pred).context("failed to compute F1 score")
}

/// TP / predicted positives.
pub fn precision(y_true: &[usize], y_pred: &[usize]) -> Result<f64> {
    precision_score(y_true, y_pred).context("failed to compute precision")
}

/// Where a rendered heatmap goes, if anywhere.
pub struct HeatmapSink<'a> {
    pub writer: &'a ReportWriter,
    pub pipeline: &'a str,
}

/// Print a labelled confusion matrix to stdout and, given a sink, write the
/// plotly heatmap next to the pipeline report.
pub fn plot_confusion(
    y_true: &[usize],
    y_pred: &[usize],
    class_names: &[&str],
    sink: Option<HeatmapSink<'_>>,
) -> Result<ConfusionMatrix> {
    let matrix = ConfusionMatrix::from_labels(y_true, y_pred, class_names.len())
        .context("failed to build confusion matrix")?;

    println!("\nConfusion matrix:");
    print!("{}", matrix.render(class_names));

    if let Some(HeatmapSink { writer, pipeline }) = sink {
        let path = writer
            .write_confusion_html(pipeline, class_names, matrix.as_rows())
            .context("failed to write confusion heatmap")?;
        info!(path = %path.display(), "confusion heatmap saved");
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindscan_data::ExperimentName;
    use tempfile::TempDir;

    #[test]
    fn wrappers_match_known_values() {
        assert_eq!(f1(&[1, 0, 1], &[1, 0, 1]).unwrap(), 1.0);
        assert_eq!(f1(&[1, 0], &[0, 1]).unwrap(), 0.0);
        assert!((precision(&[1, 0, 1, 0], &[1, 1, 1, 0]).unwrap() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn plot_writes_heatmap_when_asked() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path(), ExperimentName::new("t".into()).unwrap()).unwrap();
        let cm = plot_confusion(
            &[0, 1, 1],
            &[0, 1, 0],
            &["Not Depressed", "Depressed"],
            Some(HeatmapSink {
                writer: &writer,
                pipeline: "tree",
            }),
        )
        .unwrap();
        assert_eq!(cm.get(1, 0), 1);
        assert!(dir.path().join("t_tree_confusion.html").is_file());
    }

    #[test]
    fn labels_beyond_the_class_names_fail() {
        assert!(plot_confusion(&[0, 2], &[0, 1], &["a", "b"], None).is_err());
    }
}
