use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::info;

use proximity_distance::{MeasureKind, TieBreak};
use proximity_forest::{
    FailurePolicy, ForestConfig, MeasureSelection, OobMode, ProximityForest, TrainingMode,
};
use proximity_io::{ClassEncoder, ExperimentName, LabeledSeriesReader, ResultWriter};

#[derive(Parser)]
#[command(name = "proximity")]
#[command(about = "Proximity Forest time series classification")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Forest construction parameters.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Number of trees in the forest
    #[arg(long, default_value_t = 100)]
    n_trees: usize,

    /// Candidate splits evaluated per node (best Gini kept)
    #[arg(long, default_value_t = 5)]
    n_candidates: usize,

    /// Comma-separated distance families to draw from (defaults to all)
    #[arg(long, value_delimiter = ',')]
    measures: Vec<MeasureKind>,

    /// Draw the distance family once per tree instead of once per candidate
    #[arg(long, default_value_t = false)]
    per_tree: bool,

    /// Train trees in parallel, one seeded RNG stream per tree
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Drop trees whose training fails instead of aborting
    #[arg(long, default_value_t = false)]
    skip_failed_trees: bool,

    /// Stop adding trees once the next one would likely overrun this many seconds
    #[arg(long)]
    time_limit_secs: Option<f64>,

    /// Also estimate training accuracy from out-of-bag votes
    #[arg(long, default_value_t = false)]
    oob: bool,

    /// Nearest-exemplar tie break: "random" or "first"
    #[arg(long, default_value = "random")]
    tie_break: String,
}

#[derive(Subcommand)]
enum Command {
    /// Train on one labeled CSV, score on another, save the model and results
    Evaluate {
        /// Training CSV (first column is the class label)
        #[arg(long)]
        train: PathBuf,

        /// Test CSV in the same format
        #[arg(long)]
        test: PathBuf,

        /// Input files start with a header row
        #[arg(long, default_value_t = false)]
        header: bool,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        #[command(flatten)]
        forest: ForestArgs,
    },

    /// Label series with a saved model
    Predict {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// CSV of series to label (first column is ignored as a label)
        #[arg(long)]
        input: PathBuf,

        /// Input file starts with a header row
        #[arg(long, default_value_t = false)]
        header: bool,

        /// Class label file written by `evaluate`, for readable labels
        #[arg(long)]
        classes: Option<PathBuf>,

        /// Experiment name for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct EvaluateOutput {
    experiment: String,
    n_train: usize,
    n_test: usize,
    n_classes: usize,
    n_trees: usize,
    accuracy: f64,
    n_ties: usize,
    oob_accuracy: Option<f64>,
    elapsed_secs: f64,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    n_series: usize,
    n_ties: usize,
    model_n_trees: usize,
    model_n_classes: usize,
}

fn parse_tie_break(s: &str) -> Result<TieBreak> {
    match s {
        "random" => Ok(TieBreak::Random),
        "first" => Ok(TieBreak::First),
        other => anyhow::bail!("unknown tie break: {other} (expected random or first)"),
    }
}

fn build_config(args: &ForestArgs, seed: u64) -> Result<ForestConfig> {
    let mut config = ForestConfig::new(args.n_trees)?
        .with_n_candidates(args.n_candidates)
        .with_tie_break(parse_tie_break(&args.tie_break)?)
        .with_seed(seed);
    if !args.measures.is_empty() {
        config = config.with_measures(args.measures.clone());
    }
    if args.per_tree {
        config = config.with_measure_selection(MeasureSelection::PerTree);
    }
    if args.parallel {
        config = config.with_training_mode(TrainingMode::Parallel);
    }
    if args.skip_failed_trees {
        config = config.with_failure_policy(FailurePolicy::SkipTree);
    }
    if let Some(secs) = args.time_limit_secs {
        let limit = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("invalid time limit: {secs}"))?;
        config = config.with_train_time_limit(Some(limit));
    }
    if args.oob {
        config = config.with_oob_mode(OobMode::Enabled);
    }
    config.validate()?;
    Ok(config)
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

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Evaluate {
            train,
            test,
            header,
            experiment,
            output_dir,
            forest,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;
            let config = build_config(&forest, cli.seed)?;

            // 1. Read and encode
            let train_rows = LabeledSeriesReader::new(&train)
                .with_header(header)
                .read()
                .context("failed to read training CSV")?;
            let test_rows = LabeledSeriesReader::new(&test)
                .with_header(header)
                .read()
                .context("failed to read test CSV")?;
            let classes = ClassEncoder::fit(&train_rows.labels);
            let train_set = classes
                .to_dataset(&train_rows)
                .context("invalid training set")?;
            let test_set = classes.to_dataset(&test_rows).context("invalid test set")?;
            info!(
                n_train = train_set.len(),
                n_test = test_set.len(),
                n_classes = classes.n_classes(),
                "datasets encoded"
            );

            // 2. Train
            let result = config.fit(&train_set).context("forest training failed")?;

            // 3. Score
            let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);
            let evaluation = result
                .forest()
                .evaluate(&test_set, &mut rng)
                .context("evaluation failed")?;
            info!(
                accuracy = evaluation.accuracy,
                n_ties = evaluation.n_ties,
                "evaluation complete"
            );

            // 4. Persist model and artifacts
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            result
                .forest()
                .save(writer.model_path())
                .context("failed to save model")?;
            writer.write_classes(&classes)?;
            writer.write_results(&result, &evaluation, &classes)?;
            writer.write_predictions(
                &evaluation.predictions,
                Some(&classes),
                Some(&test_rows.labels),
                evaluation.n_ties,
            )?;

            let output = EvaluateOutput {
                experiment,
                n_train: train_set.len(),
                n_test: test_set.len(),
                n_classes: classes.n_classes(),
                n_trees: result.forest().n_trees(),
                accuracy: evaluation.accuracy,
                n_ties: evaluation.n_ties,
                oob_accuracy: result.metadata().oob.map(|oob| oob.accuracy),
                elapsed_secs: result.metadata().elapsed_secs,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            model,
            input,
            header,
            classes,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            let forest = ProximityForest::load(&model).context("failed to load model")?;
            info!(
                n_trees = forest.n_trees(),
                n_classes = forest.n_classes(),
                "model loaded"
            );
            let classes = classes
                .map(|path| ClassEncoder::load(&path))
                .transpose()
                .context("failed to read class labels")?;

            let rows = LabeledSeriesReader::new(&input)
                .with_header(header)
                .read()
                .context("failed to read input CSV")?;

            let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);
            let batch = forest
                .predict_batch(&rows.series, &mut rng)
                .context("prediction failed")?;

            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            writer.write_predictions(&batch.labels, classes.as_ref(), None, batch.n_ties)?;

            let output = PredictOutput {
                experiment,
                n_series: rows.len(),
                n_ties: batch.n_ties,
                model_n_trees: forest.n_trees(),
                model_n_classes: forest.n_classes(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
