//! Krishi credit CLI
//!
//! Generates synthetic farmer data, trains and selects a credit score model,
//! scores applicants and inspects saved models.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use krishi_credit_core::load_bundle;
use krishi_credit_trainer::{
    generate, read_applicant_json, read_records_csv, write_records_csv, CreditPipeline,
    PipelineConfig,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "krishi-credit")]
#[command(author = "Krishi Credit Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Agricultural credit scoring: data generation, training and scoring", long_about = None)]
struct Cli {
    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write synthetic labelled farmer records as CSV
    Generate {
        /// Number of records
        #[arg(long, default_value = "1000")]
        rows: usize,

        /// Generator seed (defaults to the configured seed)
        #[arg(long)]
        seed: Option<u64>,

        /// Output CSV path
        #[arg(short, long, default_value = "data/farmer_credit_data.csv")]
        output: PathBuf,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Train all candidate models, keep the best and save it
    Train {
        /// Labelled CSV records; synthetic records are generated when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Number of synthetic records when no input is given
        #[arg(long, default_value = "1000")]
        rows: usize,

        /// Output model path
        #[arg(short, long, default_value = "models/krishi_credit_model.bin")]
        output: PathBuf,

        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Score one applicant from a JSON file
    Predict {
        /// Saved model path
        #[arg(short, long)]
        model: PathBuf,

        /// Applicant JSON object
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show a saved model's metrics and top features
    Inspect {
        /// Saved model path
        #[arg(short, long)]
        model: PathBuf,

        /// Number of importance rows to show
        #[arg(long, default_value = "10")]
        top: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    info!("Krishi credit v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Generate {
            rows,
            seed,
            output,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let seed = seed.unwrap_or(config.seed);
            let records = generate(rows, seed).context("Failed to generate records")?;
            write_records_csv(&output, &records)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(rows, seed, path = %output.display(), "synthetic data written");
        }

        Command::Train {
            input,
            rows,
            output,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let records = match &input {
                Some(path) => read_records_csv(path)
                    .with_context(|| format!("Failed to load dataset {}", path.display()))?,
                None => {
                    info!(rows, seed = config.seed, "no input given, generating records");
                    generate(rows, config.seed).context("Failed to generate records")?
                }
            };

            let mut pipeline = CreditPipeline::new(config);
            let metrics = pipeline.train(&records).context("Training failed")?;
            pipeline
                .save(&output)
                .with_context(|| format!("Failed to save model to {}", output.display()))?;

            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }

        Command::Predict { model, input } => {
            let pipeline = CreditPipeline::from_artifact(PipelineConfig::default(), &model)
                .with_context(|| format!("Failed to load model {}", model.display()))?;
            let applicant = read_applicant_json(&input)
                .with_context(|| format!("Failed to read applicant {}", input.display()))?;

            let assessment = pipeline.predict(&applicant).context("Scoring failed")?;
            println!("{}", serde_json::to_string_pretty(&assessment)?);
        }

        Command::Inspect { model, top } => {
            let bundle = load_bundle(&model)
                .with_context(|| format!("Failed to load model {}", model.display()))?;

            println!("model:       {}", bundle.metrics.model_type);
            println!("trees:       {}", bundle.model.num_trees());
            println!("rmse:        {:.3}", bundle.metrics.rmse);
            println!("mae:         {:.3}", bundle.metrics.mae);
            println!("r2:          {:.4}", bundle.metrics.r2);
            println!("fingerprint: {}", bundle.fingerprint()?);

            let rows = bundle.top_features(top);
            if rows.is_empty() {
                println!("no feature importances recorded");
            } else {
                println!("top features:");
                for (rank, row) in rows.iter().enumerate() {
                    println!("  {:>2}. {:<28} {:.4}", rank + 1, row.feature, row.importance);
                }
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init()
        .context("Failed to set tracing subscriber")?;

    Ok(())
}

/// File configuration (or defaults) with `KRISHI_*` overrides applied
fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config.apply_env_overrides();
    config.validate().context("Invalid configuration")?;
    Ok(config)
}
