//! # Market News ETL
//!
//! A resilient ETL pipeline that collects financial news articles,
//! structures them into sentiment-scored records via an LLM, and loads
//! them into a Supabase table with a local CSV fallback.
//!
//! ## Features
//!
//! - Collects articles from a news section page with a politeness delay,
//!   falling back to a built-in sample corpus when fetching fails
//! - Structures raw text through an OpenAI-compatible API with retry,
//!   truncation re-ask, schema repair, and a deterministic heuristic path
//! - Loads records idempotently (upsert keyed by content-derived id),
//!   appending to a local CSV when the store is unreachable
//! - Persists each stage's artifact so stages can be re-run in isolation
//!
//! ## Usage
//!
//! ```sh
//! market_news_etl test          # offline end-to-end run
//! market_news_etl run 3         # full pipeline, up to 3 articles
//! market_news_etl structure     # replay structuring from the raw artifact
//! market_news_etl load          # replay loading from the structured artifact
//! ```
//!
//! ## Architecture
//!
//! The application follows a three-stage pipeline:
//! 1. **Collect**: fetch articles (or synthesize the sample corpus)
//! 2. **Structure**: one schema-conforming record per article segment
//! 3. **Load**: idempotent upsert into the store, or fallback CSV append
//!
//! Every stage absorbs its own failures and reports which path it took;
//! the only fatal conditions are malformed loader input and artifact I/O.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod collector;
mod config;
mod errors;
mod loader;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod store;
mod structurer;
mod utils;

use cli::{Cli, Command};
use config::PipelineConfig;
use pipeline::CancelFlag;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("market_news_etl starting up");

    let args = Cli::parse();
    debug!(?args.data_dir, "Parsed CLI arguments");

    // Early check: ensure the data dir is writable before any stage runs
    if let Err(e) = ensure_writable_dir(&args.data_dir).await {
        error!(
            path = %args.data_dir,
            error = %e,
            "Data directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let offline = matches!(args.command, Command::Test);
    let config = PipelineConfig::from_cli(&args, offline);
    let cancel = CancelFlag::new();

    match args.command {
        Command::Test => {
            info!("Running offline against the sample corpus");
            pipeline::run_pipeline(&config, 3, &cancel).await?;
        }
        Command::Run { limit } => {
            pipeline::run_pipeline(&config, limit, &cancel).await?;
        }
        Command::Structure => {
            pipeline::run_structure_stage(&config).await?;
        }
        Command::Load => {
            pipeline::run_load_stage(&config).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
