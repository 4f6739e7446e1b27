//! Atlas Ingest - Bee Atlas data ingestion tool

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use atlas_common::logging::{init_logging, LogConfig, LogLevel};
use atlas_ingest::enrich::{self, CrawlerConfig};
use atlas_ingest::sources::DataPaths;
use atlas_ingest::{pipeline, sources};
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "atlas-ingest")]
#[command(author, version, about = "Bee Atlas data ingestion tool")]
struct Cli {
    /// Task to run
    #[command(subcommand)]
    task: Task,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Task {
    /// Download, clean, and export all configured occurrence sources
    Pipeline {
        /// Staging directory for raw downloads
        #[arg(long, default_value = "data/raw")]
        raw_dir: PathBuf,

        /// Output directory for Parquet artifacts
        #[arg(long, default_value = "data/processed")]
        processed_dir: PathBuf,
    },

    /// Crawl Ecdysis record pages for iNaturalist observation links
    InatLinks {
        /// Exported Ecdysis dataset to enrich
        #[arg(short, long, default_value = "data/processed/ecdysis_wa.parquet")]
        input: PathBuf,

        /// Destination for the occurrence -> observation mapping
        #[arg(short, long, default_value = "data/processed/ecdysis_inat_links.parquet")]
        output: PathBuf,

        /// Directory for cached record pages
        #[arg(long, default_value = "data/raw/ecdysis_cache")]
        cache_dir: PathBuf,

        /// Minimum milliseconds between outbound requests
        #[arg(long, default_value_t = enrich::DEFAULT_RATE_LIMIT.as_millis() as u64)]
        rate_limit_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let mut log_config = LogConfig::with_level(log_level);
    log_config.log_file_prefix = "atlas-ingest".to_string();

    // Environment variables take precedence
    let log_config = log_config.merge_env()?;
    init_logging(&log_config)?;

    let client = reqwest::Client::new();

    match cli.task {
        Task::Pipeline {
            raw_dir,
            processed_dir,
        } => {
            info!("Running ingestion pipeline");
            let paths = DataPaths::new(raw_dir, processed_dir);
            paths.ensure_dirs()?;

            let descriptors = sources::builtin(&paths)?;
            let report = pipeline::run(&client, &descriptors).await;
            if !report.all_succeeded() {
                anyhow::bail!(
                    "{} of {} sources failed",
                    report.failed.len(),
                    descriptors.len()
                );
            }
        },
        Task::InatLinks {
            input,
            output,
            cache_dir,
            rate_limit_ms,
        } => {
            info!("Fetching iNaturalist links");
            let config =
                CrawlerConfig::ecdysis(cache_dir, Duration::from_millis(rate_limit_ms))?;
            enrich::fetch_links(&client, &input, &output, config).await?;
        },
    }

    info!("Done");
    Ok(())
}
