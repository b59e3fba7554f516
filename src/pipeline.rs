//! The decision-tree and random-forest pipelines:
//! load -> preprocess -> split -> baseline -> search -> evaluate.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use serde::Serialize;
use tracing::info;

use mindscan_data::{
    Dataset, PreprocessReport, Preprocessor, ReportWriter, TableReader, TextEncoding,
    TrainTestSplit, train_test_split,
};
use mindscan_forest::metrics::accuracy_score;
use mindscan_forest::{
    ClassMetrics, Classifier, CrossValidation, DEFAULT_EXPORT_DEPTH, DecisionTreeConfig,
    FeatureImportance, ModelSpec, ParamGrid, ParamSet, RandomForestConfig, RandomizedSearch,
    Scoring, SearchResult, TrainedModel, Trial,
};

use crate::evaluation::{self, HeatmapSink};

pub const CLASS_NAMES: [&str; 2] = ["Not Depressed", "Depressed"];

/// Columns the tree pipeline removes before encoding.
pub const TREE_DROP_COLUMNS: [&str; 6] = [
    "id",
    "Work Pressure",
    "Job Satisfaction",
    "Gender",
    "City",
    "Profession",
];

/// Search space for the decision tree.
#[must_use]
pub fn tree_grid() -> ParamGrid {
    ParamGrid::new()
        .with(
            "max_depth",
            [Some(3usize), Some(5), Some(7), Some(9), Some(11), Some(13), Some(15), None],
        )
        .with("min_samples_leaf", [1usize, 2, 5, 10, 15])
        .with("min_samples_split", [2usize, 5, 10, 15, 20])
        .with("criterion", ["entropy", "gini"])
}

/// Search space for the random forest.
#[must_use]
pub fn forest_grid() -> ParamGrid {
    ParamGrid::new()
        .with("n_estimators", [100usize, 200])
        .with("max_depth", [Some(10usize), Some(20), None])
        .with("max_features", ["sqrt"])
        .with("min_samples_split", [2usize, 5])
        .with("min_samples_leaf", [1usize, 2])
}

/// Read a `{"param": [values...]}` grid from a JSON file.
pub fn load_grid(path: &Path) -> Result<ParamGrid> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read grid file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid grid JSON in {}", path.display()))
}

/// Inputs shared by both pipelines.
pub struct Context {
    pub data: PathBuf,
    pub target: String,
    pub writer: Option<ReportWriter>,
}

/// Search budget and fold settings.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub n_iter: usize,
    pub cv: usize,
    pub seed: u64,
    pub grid: ParamGrid,
}

#[derive(Debug, Clone)]
pub struct TreeSettings {
    pub test_size: f64,
    pub split_seed: u64,
    pub model_seed: u64,
    pub drop: Vec<String>,
    pub search: SearchSettings,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            test_size: 0.3,
            split_seed: 99,
            model_seed: 1,
            drop: TREE_DROP_COLUMNS.map(String::from).to_vec(),
            search: SearchSettings {
                n_iter: 150,
                cv: 5,
                seed: 42,
                grid: tree_grid(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ForestSettings {
    pub test_size: f64,
    pub split_seed: u64,
    pub model_seed: u64,
    pub n_estimators: usize,
    pub search: SearchSettings,
}

impl Default for ForestSettings {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            split_seed: 17,
            model_seed: 42,
            n_estimators: 100,
            search: SearchSettings {
                n_iter: 10,
                cv: 3,
                seed: 42,
                grid: forest_grid(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Scores {
    pub accuracy: f64,
    pub f1: f64,
    pub precision: f64,
}

impl Scores {
    fn compute(y_true: &[usize], y_pred: &[usize]) -> Result<Self> {
        Ok(Self {
            accuracy: accuracy_score(y_true, y_pred).context("failed to compute accuracy")?,
            f1: evaluation::f1(y_true, y_pred)?,
            precision: evaluation::precision(y_true, y_pred)?,
        })
    }
}

#[derive(Serialize)]
struct SearchReport<'a> {
    scoring: Scoring,
    grid_size: usize,
    n_candidates: usize,
    n_folds: usize,
    best_score: f64,
    best_params: &'a ParamSet,
    trials: &'a [Trial],
}

/// Everything written to `{experiment}_{pipeline}_report.json`.
#[derive(Serialize)]
struct PipelineReport<'a> {
    pipeline: &'a str,
    data: String,
    preprocessing: &'a PreprocessReport,
    n_features: usize,
    n_train: usize,
    n_test: usize,
    baseline: Scores,
    search: SearchReport<'a>,
    best: Scores,
    confusion_matrix: &'a [Vec<usize>],
    class_metrics: Vec<ClassMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    importances: Option<&'a [FeatureImportance]>,
}

/// Summary printed as JSON at the end of each pipeline.
#[derive(Debug, Serialize)]
pub struct PipelineSummary {
    pub pipeline: String,
    pub n_rows: usize,
    pub n_features: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub baseline: Scores,
    pub best_cv_score: f64,
    pub best_params: ParamSet,
    pub best: Scores,
}

fn print_columns(report: &PreprocessReport) {
    println!("Retained columns: {:?}", report.retained);
    println!("Dropped columns: {:?}", report.dropped);
    println!("Encoded columns: {:?}", report.encoded);
    if report.rows_dropped > 0 {
        println!("Rows dropped for missing values: {}", report.rows_dropped);
    }
}

fn print_scores(label: &str, scores: &Scores) {
    println!("{label} accuracy: {:.4}", scores.accuracy);
    println!("{label} F1 score: {:.4}", scores.f1);
    println!("{label} precision: {:.4}", scores.precision);
}

fn load(ctx: &Context, preprocessor: &Preprocessor, encoding: TextEncoding) -> Result<(Dataset, PreprocessReport)> {
    let table = TableReader::new(&ctx.data)
        .with_encoding(encoding)
        .read()
        .with_context(|| format!("failed to read {}", ctx.data.display()))?;
    preprocessor.run(&table).context("preprocessing failed")
}

fn search(
    settings: &SearchSettings,
    scoring: Scoring,
    template: &ModelSpec,
    split: &TrainTestSplit,
) -> Result<SearchResult> {
    let grid_size = settings.grid.n_combinations()?;
    let n_candidates = settings.n_iter.min(grid_size);
    println!("\nSearch space: {grid_size} combinations");
    println!(
        "Fitting {} folds for each of {n_candidates} candidates, totalling {} fits",
        settings.cv,
        settings.cv * n_candidates
    );

    let result = RandomizedSearch::new(settings.n_iter)?
        .with_cv(CrossValidation::new(settings.cv)?.with_seed(settings.seed))
        .with_scoring(scoring)
        .with_seed(settings.seed)
        .fit(
            template,
            &settings.grid,
            split.train.features(),
            split.train.labels(),
            split.train.feature_names(),
        )
        .context("randomized search failed")?;

    println!("Best cross-validated {scoring}: {:.4}", result.best_score);
    println!("Best parameters: {}", result.best_params);
    Ok(result)
}

struct Outcome {
    scoring: Scoring,
    n_folds: usize,
    report: PreprocessReport,
    split: TrainTestSplit,
    baseline: Scores,
    result: SearchResult,
    best_predictions: Vec<usize>,
    best: Scores,
}

fn finish(
    ctx: &Context,
    pipeline: &str,
    outcome: &Outcome,
    importances: Option<&[FeatureImportance]>,
) -> Result<PipelineSummary> {
    let Outcome {
        scoring,
        n_folds,
        report,
        split,
        baseline,
        result,
        best_predictions,
        best,
    } = outcome;

    let sink = ctx.writer.as_ref().map(|writer| HeatmapSink { writer, pipeline });
    let matrix = evaluation::plot_confusion(split.test.labels(), best_predictions, &CLASS_NAMES, sink)?;

    if let Some(writer) = &ctx.writer {
        let artifact = PipelineReport {
            pipeline,
            data: ctx.data.display().to_string(),
            preprocessing: report,
            n_features: split.train.n_features(),
            n_train: split.train.n_samples(),
            n_test: split.test.n_samples(),
            baseline: *baseline,
            search: SearchReport {
                scoring: *scoring,
                grid_size: result.grid_size,
                n_candidates: result.trials.len(),
                n_folds: *n_folds,
                best_score: result.best_score,
                best_params: &result.best_params,
                trials: &result.trials,
            },
            best: *best,
            confusion_matrix: matrix.as_rows(),
            class_metrics: matrix.class_metrics(),
            importances,
        };
        writer
            .write_report(pipeline, &artifact)
            .with_context(|| format!("failed to write {pipeline} report"))?;
    }

    Ok(PipelineSummary {
        pipeline: pipeline.to_string(),
        n_rows: report.n_rows,
        n_features: split.train.n_features(),
        n_train: split.train.n_samples(),
        n_test: split.test.n_samples(),
        baseline: *baseline,
        best_cv_score: result.best_score,
        best_params: result.best_params.clone(),
        best: *best,
    })
}

const TREE: &str = "tree";
const FOREST: &str = "forest";

/// Fit the untuned template on the training side and score it on the test side.
fn fit_baseline(template: &ModelSpec, split: &TrainTestSplit) -> Result<Scores> {
    let mut classifier = Classifier::new(template.clone());
    classifier.fit(split.train.features(), split.train.labels(), split.train.feature_names())?;
    let predictions = classifier.predict(split.test.features())?;
    Scores::compute(split.test.labels(), &predictions)
}

fn predict(model: &TrainedModel, dataset: &Dataset) -> Result<Vec<usize>> {
    model
        .predict_batch(dataset.features())
        .context("prediction failed")
}

/// Decision tree: fixed column exclusions, accuracy-scored search, rule dump.
pub fn run_tree(ctx: &Context, settings: &TreeSettings) -> Result<PipelineSummary> {
    info!(data = %ctx.data.display(), "starting decision tree pipeline");
    println!("=== Decision tree ===");

    let preprocessor = Preprocessor::new(ctx.target.as_str()).with_excluded(settings.drop.iter().cloned());
    let (dataset, report) = load(ctx, &preprocessor, TextEncoding::Utf8)?;
    print_columns(&report);

    let split = train_test_split(&dataset, settings.test_size, settings.split_seed)
        .context("train/test split failed")?;

    let template = ModelSpec::DecisionTree(DecisionTreeConfig::new().with_seed(settings.model_seed));
    let baseline = fit_baseline(&template, &split).context("baseline decision tree failed")?;
    print_scores("Baseline", &baseline);

    let scoring = Scoring::Accuracy;
    let result = search(&settings.search, scoring, &template, &split)?;
    let best_predictions = predict(&result.best_model, &split.test)?;
    let best = Scores::compute(split.test.labels(), &best_predictions)?;
    print_scores("Best model", &best);

    if let Some(tree) = result.best_model.as_tree() {
        println!();
        print!("{}", tree.export_text(split.train.feature_names(), DEFAULT_EXPORT_DEPTH));
    }

    let outcome = Outcome {
        scoring,
        n_folds: settings.search.cv,
        report,
        split,
        baseline,
        result,
        best_predictions,
        best,
    };
    finish(ctx, TREE, &outcome, None)
}

/// Random forest: Latin-1 input, no exclusions, missing rows dropped,
/// weighted-F1 search, importance table.
pub fn run_forest(ctx: &Context, settings: &ForestSettings) -> Result<PipelineSummary> {
    info!(data = %ctx.data.display(), "starting random forest pipeline");
    println!("=== Random forest ===");

    let preprocessor = Preprocessor::new(ctx.target.as_str()).with_drop_missing(true);
    let (dataset, report) = load(ctx, &preprocessor, TextEncoding::Latin1)?;
    print_columns(&report);

    let split = train_test_split(&dataset, settings.test_size, settings.split_seed)
        .context("train/test split failed")?;

    let template = ModelSpec::RandomForest(
        RandomForestConfig::new(settings.n_estimators)?.with_seed(settings.model_seed),
    );
    let baseline = fit_baseline(&template, &split).context("baseline random forest failed")?;
    print_scores("Baseline", &baseline);

    let scoring = Scoring::WeightedF1;
    let result = search(&settings.search, scoring, &template, &split)?;
    let best_predictions = predict(&result.best_model, &split.test)?;
    let best = Scores::compute(split.test.labels(), &best_predictions)?;
    print_scores("Best model", &best);

    let importances = result.best_model.feature_importances(split.train.feature_names());
    println!("\n{:>4}  {:<48} {:>10}", "rank", "feature", "importance");
    for row in &importances {
        println!("{:>4}  {:<48} {:>10.6}", row.rank, row.name, row.importance);
    }

    let outcome = Outcome {
        scoring,
        n_folds: settings.search.cv,
        report,
        split,
        baseline,
        result,
        best_predictions,
        best,
    };
    finish(ctx, FOREST, &outcome, Some(&importances))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_grids_have_expected_sizes() {
        assert_eq!(tree_grid().n_combinations().unwrap(), 8 * 5 * 5 * 2);
        assert_eq!(forest_grid().n_combinations().unwrap(), 2 * 3 * 2 * 2);
    }

    #[test]
    fn built_in_grids_fit_their_models() {
        let tree = ModelSpec::DecisionTree(DecisionTreeConfig::new());
        for (name, values) in tree_grid().iter() {
            for value in values {
                tree.clone().with_param(name, value).unwrap();
            }
        }
        let forest = ModelSpec::RandomForest(RandomForestConfig::new(100).unwrap());
        for (name, values) in forest_grid().iter() {
            for value in values {
                forest.clone().with_param(name, value).unwrap();
            }
        }
    }

    #[test]
    fn grid_json_round_trips_through_a_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("grid.json");
        std::fs::write(&path, r#"{"max_depth": [3, null], "criterion": ["gini"]}"#).unwrap();
        let grid = load_grid(&path).unwrap();
        assert_eq!(grid.n_combinations().unwrap(), 2);
        assert!(load_grid(&dir.path().join("absent.json")).is_err());
    }

    fn fixture_context(writer: Option<ReportWriter>) -> Context {
        Context {
            data: PathBuf::from(env!("CARGO_MANIFEST_DIR"))
                .join("crates/mindscan-data/tests/fixtures/students_small.csv"),
            target: "Depression".to_string(),
            writer,
        }
    }

    #[test]
    fn tree_pipeline_runs_end_to_end() {
        let dir = tempfile::TempDir::new().unwrap();
        let writer =
            ReportWriter::new(dir.path(), mindscan_data::ExperimentName::new("e2e".into()).unwrap()).unwrap();
        let mut settings = TreeSettings::default();
        settings.search.n_iter = 4;
        settings.search.cv = 3;

        let summary = run_tree(&fixture_context(Some(writer)), &settings).unwrap();
        assert_eq!(summary.n_rows, 40);
        assert_eq!(summary.n_test, 12);
        assert_eq!(summary.n_train, 28);
        assert!((0.0..=1.0).contains(&summary.baseline.accuracy));
        assert!((0.0..=1.0).contains(&summary.best.accuracy));
        assert_eq!(summary.best_params.len(), 4);
        assert!(dir.path().join("e2e_tree_report.json").is_file());
        assert!(dir.path().join("e2e_tree_confusion.html").is_file());
    }

    #[test]
    fn forest_pipeline_runs_without_output_dir() {
        let mut settings = ForestSettings::default();
        settings.n_estimators = 10;
        settings.search.n_iter = 2;
        settings.search.grid = ParamGrid::new()
            .with("n_estimators", [5usize, 10])
            .with("max_depth", [Some(3usize), None]);

        let summary = run_forest(&fixture_context(None), &settings).unwrap();
        assert_eq!(summary.n_test, 8);
        assert_eq!(summary.n_train, 32);
        assert!((0.0..=1.0).contains(&summary.best.f1));
    }

    #[test]
    fn missing_target_fails_with_context() {
        let mut ctx = fixture_context(None);
        ctx.target = "Mood".to_string();
        let err = run_tree(&ctx, &TreeSettings::default()).unwrap_err();
        assert!(format!("{err:#}").contains("preprocessing failed"));
    }
}
