/// CLI для обучения моделей дефолта и нарезки датасета

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use loan_risk::{
    dataset::{load_loans, split_csv},
    report::{print_comparison, write_json_report, DatasetSummary},
    FeatureEngineer, LoanSchema, ModelHarness, ModelSelection, ModelSettings, PreparedDataset,
    SplitSettings,
};

/// Loan Risk - train and compare loan default classifiers
#[derive(Parser, Debug)]
#[command(name = "loan-risk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Loans CSV file
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Model to run: "Logistic Regression", "Random Forest", "Embeddings" or "All"
    #[arg(short, long, default_value = "All")]
    solver: String,

    /// Share of rows held out for evaluation
    #[arg(long, default_value = "0.3")]
    test_fraction: f64,

    /// Seed for the split and the models; random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// JSON file with model hyperparameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write model results to this JSON file
    #[arg(long)]
    json_output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Split a large CSV into numbered files with the header repeated
    Split {
        /// CSV file to split
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for the output files
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Output file name; "{}" is replaced by the chunk number
        #[arg(long, default_value = "split_{}.csv")]
        template: String,

        /// Data rows per output file
        #[arg(long, default_value = "100000")]
        row_limit: usize,

        /// Field delimiter
        #[arg(long, default_value = ",")]
        delimiter: char,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Split {
            input,
            output_dir,
            template,
            row_limit,
            delimiter,
        }) => run_split(&input, &output_dir, &template, row_limit, delimiter),
        None => run_models(&cli),
    }
}

fn run_split(
    input: &Path,
    output_dir: &Path,
    template: &str,
    row_limit: usize,
    delimiter: char,
) -> anyhow::Result<()> {
    if !delimiter.is_ascii() {
        bail!("Delimiter must be a single ASCII character, got '{}'", delimiter);
    }

    let files = split_csv(input, output_dir, template, row_limit, delimiter as u8)
        .with_context(|| format!("Failed to split {}", input.display()))?;
    for file in &files {
        println!("{}", file.display());
    }
    Ok(())
}

fn run_models(cli: &Cli) -> anyhow::Result<()> {
    // выбор модели и доля теста проверяются до чтения данных
    let selection: ModelSelection = cli.solver.parse().context("Invalid model selection")?;
    let split = SplitSettings {
        test_fraction: cli.test_fraction,
        seed: cli.seed,
    };
    split.validate().context("Invalid test fraction")?;

    let Some(data) = cli.data.as_deref() else {
        bail!("--data is required");
    };

    let settings = match &cli.config {
        Some(path) => ModelSettings::from_json_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => ModelSettings::default(),
    };
    settings.validate().context("Invalid model settings")?;

    let schema = LoanSchema::default();
    let raw = load_loans(data, &schema)
        .with_context(|| format!("Failed to load {}", data.display()))?;
    let cleaned = FeatureEngineer::clean(&raw, &schema).context("Failed to clean loans")?;

    DatasetSummary::from_cleaned(&cleaned, &schema)?.display();

    let dataset = PreparedDataset::build(
        &cleaned.table,
        cleaned.labels.clone(),
        &schema.categorical_columns(),
        &schema.ordinal_columns(),
        selection,
    )
    .context("Failed to prepare features")?;

    let harness = ModelHarness::new(selection, settings, split);
    let output = harness.run(&dataset).context("Model run failed")?;

    print_comparison(&output);

    if let Some(path) = &cli.json_output {
        write_json_report(path, &output)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}
