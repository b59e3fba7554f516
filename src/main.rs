mod evaluation;
mod pipeline;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use mindscan_data::{ExperimentName, ReportWriter};

use crate::pipeline::{Context, ForestSettings, PipelineSummary, SearchSettings, TreeSettings};

#[derive(Parser)]
#[command(name = "mindscan")]
#[command(about = "Decision-tree and random-forest depression classifiers for student survey data")]
#[command(version)]
struct Cli {
    /// Pipeline to run; both run when omitted
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the input CSV file
    #[arg(long, default_value = "data/student_depression_dataset.csv", global = true)]
    data: PathBuf,

    /// Name of the 0/1 target column
    #[arg(long, default_value = "Depression", global = true)]
    target: String,

    /// Directory for JSON reports and confusion heatmaps (nothing written when omitted)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
    #[arg(long, default_value = "baseline", global = true)]
    experiment: String,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all logging except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Randomized search knobs shared by both pipelines.
#[derive(Args, Debug, Clone)]
struct SearchArgs {
    /// JSON file mapping parameter names to candidate lists (built-in grid when omitted)
    #[arg(long)]
    grid: Option<PathBuf>,

    /// Number of parameter combinations to sample
    #[arg(long)]
    n_iter: Option<usize>,

    /// Number of cross-validation folds
    #[arg(long)]
    cv: Option<usize>,

    /// Seed for candidate sampling and fold assignment
    #[arg(long, default_value_t = 42)]
    search_seed: u64,
}

impl SearchArgs {
    fn apply(&self, mut settings: SearchSettings) -> Result<SearchSettings> {
        if let Some(path) = &self.grid {
            settings.grid = pipeline::load_grid(path)?;
        }
        if let Some(n_iter) = self.n_iter {
            settings.n_iter = n_iter;
        }
        if let Some(cv) = self.cv {
            settings.cv = cv;
        }
        settings.seed = self.search_seed;
        Ok(settings)
    }
}

#[derive(Args, Debug, Clone)]
struct TreeArgs {
    /// Fraction of rows held out for testing
    #[arg(long, default_value_t = 0.3)]
    test_size: f64,

    /// Seed for the train/test shuffle
    #[arg(long, default_value_t = 99)]
    split_seed: u64,

    /// Seed for the tree's feature sampling
    #[arg(long, default_value_t = 1)]
    model_seed: u64,

    /// Columns removed before encoding (repeatable; defaults to the built-in list)
    #[arg(long)]
    drop: Vec<String>,

    #[command(flatten)]
    search: SearchArgs,
}

impl TreeArgs {
    fn settings(&self) -> Result<TreeSettings> {
        let defaults = TreeSettings::default();
        Ok(TreeSettings {
            test_size: self.test_size,
            split_seed: self.split_seed,
            model_seed: self.model_seed,
            drop: if self.drop.is_empty() {
                defaults.drop
            } else {
                self.drop.clone()
            },
            search: self.search.apply(defaults.search)?,
        })
    }
}

#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Fraction of rows held out for testing
    #[arg(long, default_value_t = 0.2)]
    test_size: f64,

    /// Seed for the train/test shuffle
    #[arg(long, default_value_t = 17)]
    split_seed: u64,

    /// Master seed for bootstrap and feature sampling
    #[arg(long, default_value_t = 42)]
    model_seed: u64,

    /// Trees in the baseline forest
    #[arg(long, default_value_t = 100)]
    n_estimators: usize,

    #[command(flatten)]
    search: SearchArgs,
}

impl ForestArgs {
    fn settings(&self) -> Result<ForestSettings> {
        let defaults = ForestSettings::default();
        Ok(ForestSettings {
            test_size: self.test_size,
            split_seed: self.split_seed,
            model_seed: self.model_seed,
            n_estimators: self.n_estimators,
            search: self.search.apply(defaults.search)?,
        })
    }
}

#[derive(Subcommand)]
enum Command {
    /// Decision tree baseline, randomized search, and rule dump
    Tree(TreeArgs),

    /// Random forest baseline, randomized search, and importance table
    Forest(ForestArgs),

    /// Both pipelines with their default settings
    Run,
}

fn report(summary: &PipelineSummary) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    let experiment = ExperimentName::new(cli.experiment.clone())?;
    let writer = cli
        .output_dir
        .as_deref()
        .map(|dir| ReportWriter::new(dir, experiment))
        .transpose()?;
    let ctx = Context {
        data: cli.data.clone(),
        target: cli.target.clone(),
        writer,
    };

    match cli.command.unwrap_or(Command::Run) {
        Command::Tree(args) => {
            report(&pipeline::run_tree(&ctx, &args.settings()?)?)?;
        }
        Command::Forest(args) => {
            report(&pipeline::run_forest(&ctx, &args.settings()?)?)?;
        }
        Command::Run => {
            report(&pipeline::run_tree(&ctx, &TreeSettings::default())?)?;
            println!();
            report(&pipeline::run_forest(&ctx, &ForestSettings::default())?)?;
        }
    }

    Ok(())
}
