mod ingest;
mod query;
mod verdicts;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mibrief_core::Pillar;

#[derive(Debug, Parser)]
#[command(name = "mibrief-cli")]
#[command(about = "Morning intelligence brief command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate a JSON card (or an array of cards) without touching the database
    Validate {
        /// Path to the JSON file
        file: PathBuf,
    },
    /// Run the ingestion pipeline once
    Ingest {
        /// Restrict the run to one pillar (e.g. `ai_strategy`)
        #[arg(long, value_parser = parse_pillar)]
        pillar: Option<Pillar>,

        /// Generate and validate cards without writing to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the card that would be published next
    Top,
    /// Show recent ingestion runs
    Runs {
        /// Maximum number of runs to show
        #[arg(long, default_value = "10")]
        limit: i64,
    },
}

fn parse_pillar(raw: &str) -> Result<Pillar, String> {
    Pillar::parse(raw).ok_or_else(|| {
        format!(
            "unknown pillar '{raw}' (expected ai_strategy, brand_performance, competitive_intel or media_trends)"
        )
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Validation is offline and must not require a configured environment.
    if let Some(Commands::Validate { file }) = &cli.command {
        init_tracing("warn")?;
        return verdicts::run_validate(file);
    }

    let config = mibrief_core::load_app_config()?;
    init_tracing(&config.log_level)?;

    match cli.command {
        Some(Commands::Ingest { pillar, dry_run }) => {
            ingest::run_ingest(&config, pillar, dry_run).await?;
        }
        Some(Commands::Top) => {
            let store = query::connect_store(&config).await?;
            query::run_top(&store).await?;
        }
        Some(Commands::Runs { limit }) => {
            let store = query::connect_store(&config).await?;
            query::run_runs(&store, limit).await?;
        }
        Some(Commands::Validate { .. }) => {}
        None => println!("mibrief-cli: run with --help to list commands"),
    }

    Ok(())
}

fn init_tracing(default_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
